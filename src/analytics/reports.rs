// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::engine::{
    self, shift_month, validate_month, AggregateOptions, AggregateSummary, AggregationEngine,
    MonthlyPrice, Window,
};
use super::metrics::DerivedMetrics;
use super::redaction::RedactionPolicy;
use crate::error::{LedgerError, Result};
use crate::models::{Category, PrecomputedMonth, RolePermission, TenantId};
use crate::sensitivity::SensitivityResolver;
use crate::store::{AnalyticsStore, ClassifiedTransaction, DateRange, TxFilter};

/// Net-profit gap between live figures and a precomputed month that is
/// worth a warning.
const LEDGER_DIVERGENCE_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub summary: AggregateSummary,
    pub total_sales: f64,
    pub total_expense: f64,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    pub ledger: Option<LedgerCrossCheck>,
}

/// Precomputed month shown next to live figures. Live figures always win.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerCrossCheck {
    pub precomputed: PrecomputedMonth,
    /// Live minus precomputed net profit; `None` when either side is hidden
    /// or the precomputed row carries no profit.
    pub net_profit_delta: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlySummary {
    pub year: i32,
    pub total_sales: f64,
    pub total_expense: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailingMonth {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub sales: f64,
    pub feed_expense: f64,
    pub medicine_expense: f64,
    pub labor_expense: f64,
    pub other_expense: f64,
    pub tds: f64,
    pub total_expense: f64,
    pub net_profit: f64,
}

/// What a category listing selects. PAYMENT is a transaction type, not a
/// category, so it gets its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownSelector {
    Payments,
    Category(Category),
}

impl BreakdownSelector {
    pub fn label(&self) -> &'static str {
        match self {
            BreakdownSelector::Payments => "PAYMENT",
            BreakdownSelector::Category(c) => c.as_str(),
        }
    }

    pub fn filter(&self) -> TxFilter {
        match self {
            BreakdownSelector::Payments => engine::payments(),
            BreakdownSelector::Category(Category::Egg) => engine::egg_sales(),
            BreakdownSelector::Category(Category::Feed) => engine::feed_purchases(),
            BreakdownSelector::Category(Category::Medicine) => engine::medicine_expenses(),
            BreakdownSelector::Category(Category::Other) => engine::other_expenses(),
            BreakdownSelector::Category(Category::Employee) => engine::labor_expenses(),
            BreakdownSelector::Category(c) => TxFilter::any().category(*c),
        }
    }
}

impl FromStr for BreakdownSelector {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("PAYMENT") {
            Ok(BreakdownSelector::Payments)
        } else {
            Ok(BreakdownSelector::Category(s.parse()?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub transactions: Vec<ClassifiedTransaction>,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub year: i32,
    pub month: u32,
    pub transactions: Vec<ClassifiedTransaction>,
    pub grouped_by_date: Vec<DateGroup>,
    /// Amount per unit across the month; only computed for EGG.
    pub average_price: f64,
    pub total_count: usize,
}

/// Only viewers allowed to see charts get any report.
pub fn authorize(perms: &RolePermission) -> Result<()> {
    if perms.can_view_charts {
        Ok(())
    } else {
        Err(LedgerError::Forbidden(format!(
            "role '{}' may not view charts",
            perms.role
        )))
    }
}

pub struct ReportAssembler<'a, S: AnalyticsStore + ?Sized> {
    store: &'a S,
    today: NaiveDate,
}

impl<'a, S: AnalyticsStore + ?Sized> ReportAssembler<'a, S> {
    /// `today` anchors the yearly cap and the trailing window.
    pub fn new(store: &'a S, today: NaiveDate) -> Self {
        ReportAssembler { store, today }
    }

    fn policy(&self, tenant: TenantId, perms: &RolePermission) -> Result<RedactionPolicy> {
        let resolver = SensitivityResolver::new(self.store);
        RedactionPolicy::resolve(&resolver, tenant, perms.can_view_sensitive_data)
    }

    pub fn monthly(
        &self,
        tenant: TenantId,
        perms: &RolePermission,
        year: i32,
        month: u32,
    ) -> Result<MonthlyReport> {
        authorize(perms)?;
        validate_month(month)?;

        let engine = AggregationEngine::new(self.store);
        let mut summary = engine.aggregate(
            tenant,
            Window::month(year, month),
            AggregateOptions { breakdowns: true },
        )?;
        let live_profit = summary.net_profit;

        let policy = self.policy(tenant, perms)?;
        policy.apply(&mut summary);

        let ledger = match self.store.get_precomputed_month(tenant, year, month)? {
            Some(mut precomputed) => {
                let delta = precomputed.net_profit.map(|p| live_profit - p);
                if let Some(d) = delta.filter(|d| d.abs() > LEDGER_DIVERGENCE_TOLERANCE) {
                    tracing::warn!(
                        tenant,
                        year,
                        month,
                        delta = d,
                        "precomputed ledger net profit diverges from live transactions"
                    );
                }
                policy.apply_to_precomputed(&mut precomputed);
                Some(LedgerCrossCheck {
                    precomputed,
                    net_profit_delta: if policy.hide_profit { None } else { delta },
                })
            }
            None => None,
        };

        // Derived from the redacted figures so hidden inputs stay hidden.
        let derived = DerivedMetrics::for_month(
            year,
            month,
            summary.feed_purchased.quantity,
            summary.eggs_sold.quantity,
        );

        Ok(MonthlyReport {
            year,
            month,
            total_sales: policy.visible_sales(&summary),
            total_expense: summary.total_expense(),
            summary,
            derived,
            ledger,
        })
    }

    pub fn yearly(&self, tenant: TenantId, perms: &RolePermission) -> Result<Vec<YearlySummary>> {
        authorize(perms)?;
        let engine = AggregationEngine::new(self.store);
        let policy = self.policy(tenant, perms)?;

        let mut out = Vec::new();
        for year in self.store.years_with_data(tenant)? {
            let through_month = if year == self.today.year() {
                self.today.month()
            } else {
                12
            };
            let s = engine.aggregate(
                tenant,
                Window::Year {
                    year,
                    through_month,
                },
                AggregateOptions::default(),
            )?;
            out.push(YearlySummary {
                year,
                total_sales: policy.visible_sales(&s),
                total_expense: if policy.hide_feed { 0.0 } else { s.total_expense() },
                net_profit: if policy.hide_profit { 0.0 } else { s.net_profit },
            });
        }
        out.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(out)
    }

    pub fn trailing_twelve(
        &self,
        tenant: TenantId,
        perms: &RolePermission,
    ) -> Result<Vec<TrailingMonth>> {
        authorize(perms)?;
        let engine = AggregationEngine::new(self.store);
        let policy = self.policy(tenant, perms)?;

        let mut out = Vec::with_capacity(12);
        for back in (0..12).rev() {
            let (year, month) = shift_month(self.today.year(), self.today.month(), -back);
            let mut s = engine.aggregate(
                tenant,
                Window::month(year, month),
                AggregateOptions::default(),
            )?;
            let sales = policy.visible_sales(&s);
            policy.apply(&mut s);
            // Sum of the components after redaction.
            let total_expense = s.total_expense();
            out.push(TrailingMonth {
                year,
                month,
                month_name: month_abbrev(year, month),
                sales,
                feed_expense: s.feed_purchased.amount,
                medicine_expense: s.medicine_expense,
                labor_expense: s.labor_expense,
                other_expense: s.other_expense,
                tds: s.tds,
                total_expense,
                net_profit: s.net_profit,
            });
        }
        Ok(out)
    }

    /// Monthly average egg prices per item over `range`, newest first.
    pub fn egg_prices(
        &self,
        tenant: TenantId,
        perms: &RolePermission,
        range: &DateRange,
        item: Option<&str>,
    ) -> Result<Vec<MonthlyPrice>> {
        authorize(perms)?;
        let policy = self.policy(tenant, perms)?;
        let mut prices = AggregationEngine::new(self.store).egg_prices(tenant, range, item)?;
        for p in &mut prices {
            policy.apply_to_price(p);
        }
        Ok(prices)
    }

    pub fn category_breakdown(
        &self,
        tenant: TenantId,
        perms: &RolePermission,
        year: i32,
        month: u32,
        selector: BreakdownSelector,
    ) -> Result<CategoryBreakdown> {
        authorize(perms)?;
        let range = Window::month(year, month).date_range()?;
        let policy = self.policy(tenant, perms)?;

        let mut rows = self
            .store
            .list_transactions(tenant, &range, &selector.filter())?;
        for row in &mut rows {
            policy.apply_to_row(row);
        }

        let average_price = if selector == BreakdownSelector::Category(Category::Egg) {
            let amount: f64 = rows.iter().map(|r| r.transaction.amount).sum();
            let quantity: f64 = rows.iter().filter_map(|r| r.transaction.quantity).sum();
            if quantity > 0.0 { amount / quantity } else { 0.0 }
        } else {
            0.0
        };

        let mut by_date: BTreeMap<NaiveDate, Vec<ClassifiedTransaction>> = BTreeMap::new();
        for row in &rows {
            by_date
                .entry(row.transaction.date)
                .or_default()
                .push(row.clone());
        }
        let grouped_by_date = by_date
            .into_iter()
            .map(|(date, transactions)| DateGroup {
                date,
                total_amount: transactions.iter().map(|t| t.transaction.amount).sum(),
                transactions,
            })
            .collect();

        Ok(CategoryBreakdown {
            category: selector.label().to_string(),
            year,
            month,
            total_count: rows.len(),
            transactions: rows,
            grouped_by_date,
            average_price,
        })
    }
}

fn month_abbrev(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b").to_string())
        .unwrap_or_default()
}
