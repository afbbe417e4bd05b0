// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use serde::Serialize;

use super::engine::{egg_sales, feed_purchases, AggregateSummary, MonthlyPrice};
use crate::error::Result;
use crate::models::{PrecomputedMonth, TenantId};
use crate::sensitivity::{self, SensitivityResolver};
use crate::store::{ClassifiedTransaction, SensitivityStore};

/// Which protected metrics a viewer may not see. Hidden values are replaced
/// by zero; no field is ever dropped from a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedactionPolicy {
    pub hide_eggs: bool,
    pub hide_feed: bool,
    pub hide_profit: bool,
}

impl RedactionPolicy {
    pub fn resolve<S: SensitivityStore + ?Sized>(
        resolver: &SensitivityResolver<'_, S>,
        tenant: TenantId,
        viewer_can_view_sensitive: bool,
    ) -> Result<Self> {
        Ok(RedactionPolicy {
            hide_eggs: resolver.should_redact(
                tenant,
                sensitivity::EGGS_SOLD,
                viewer_can_view_sensitive,
            )?,
            hide_feed: resolver.should_redact(
                tenant,
                sensitivity::FEED_PURCHASED,
                viewer_can_view_sensitive,
            )?,
            hide_profit: resolver.should_redact(
                tenant,
                sensitivity::NET_PROFIT,
                viewer_can_view_sensitive,
            )?,
        })
    }

    pub fn apply(&self, summary: &mut AggregateSummary) {
        if self.hide_eggs {
            summary.eggs_sold.amount = 0.0;
            summary.eggs_sold.quantity = 0.0;
            for line in &mut summary.egg_breakdown {
                line.amount = 0.0;
                line.quantity = 0.0;
            }
        }
        if self.hide_feed {
            summary.feed_purchased.amount = 0.0;
            summary.feed_purchased.quantity = 0.0;
            for line in &mut summary.feed_breakdown {
                line.amount = 0.0;
                line.quantity = 0.0;
            }
        }
        if self.hide_profit {
            summary.net_profit = 0.0;
        }
    }

    /// Total sales as shown to the viewer. Discounts are part of sales, so
    /// hidden egg sales hide the whole figure in every report shape.
    pub fn visible_sales(&self, summary: &AggregateSummary) -> f64 {
        if self.hide_eggs {
            0.0
        } else {
            summary.total_sales()
        }
    }

    pub fn apply_to_price(&self, price: &mut MonthlyPrice) {
        if self.hide_eggs {
            price.total_amount = 0.0;
            price.total_quantity = 0.0;
            price.average_price = 0.0;
        }
    }

    /// Per-row redaction for transaction listings, using the same predicates
    /// that define the egg and feed aggregates.
    pub fn apply_to_row(&self, row: &mut ClassifiedTransaction) {
        let tx = &row.transaction;
        let hidden = (self.hide_eggs
            && egg_sales().matches(row.effective_category, tx.transaction_type))
            || (self.hide_feed
                && feed_purchases().matches(row.effective_category, tx.transaction_type));
        if hidden {
            row.transaction.amount = 0.0;
            if let Some(q) = row.transaction.quantity.as_mut() {
                *q = 0.0;
            }
        }
    }

    pub fn apply_to_precomputed(&self, month: &mut PrecomputedMonth) {
        fn zero(v: &mut Option<f64>) {
            if let Some(x) = v.as_mut() {
                *x = 0.0;
            }
        }
        if self.hide_eggs {
            zero(&mut month.total_eggs);
        }
        if self.hide_feed {
            zero(&mut month.total_feeds);
        }
        if self.hide_profit {
            zero(&mut month.net_profit);
        }
        for b in &mut month.breakdowns {
            let hidden = (self.hide_eggs && b.breakdown_type.starts_with("EGG_"))
                || (self.hide_feed && b.breakdown_type.starts_with("FEED_"));
            if hidden {
                b.quantity = 0.0;
                zero(&mut b.amount);
            }
        }
    }
}

/// Resolves the viewer's policy for `tenant` and applies it to `summary`.
pub fn redact<S: SensitivityStore + ?Sized>(
    mut summary: AggregateSummary,
    resolver: &SensitivityResolver<'_, S>,
    tenant: TenantId,
    viewer_can_view_sensitive: bool,
) -> Result<AggregateSummary> {
    RedactionPolicy::resolve(resolver, tenant, viewer_can_view_sensitive)?.apply(&mut summary);
    Ok(summary)
}
