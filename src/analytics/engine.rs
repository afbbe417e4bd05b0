// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use serde::Serialize;

use super::metrics::ProfitComponents;
use crate::error::{LedgerError, Result};
use crate::models::{Category, TenantId, TransactionType};
use crate::store::{
    BreakdownLine, DateRange, MonthlyItemTotals, Totals, TransactionStore, TxFilter,
};

pub const CASH_PAYMENT_LABEL: &str = "Cash Payment";
pub const UNNAMED_ITEM_LABEL: &str = "Unspecified";

/// Longest span a trailing window may cover (one hundred years).
pub const MAX_TRAILING_MONTHS: u32 = 1200;

/// Reporting window. Every variant is a whole number of calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
    Month { year: i32, month: u32 },
    /// Months `1..=through_month` of `year`.
    Year { year: i32, through_month: u32 },
    /// `months` consecutive months (1 to 1200) ending with the end month.
    Trailing { end_year: i32, end_month: u32, months: u32 },
}

impl Window {
    pub fn month(year: i32, month: u32) -> Self {
        Window::Month { year, month }
    }

    pub fn full_year(year: i32) -> Self {
        Window::Year {
            year,
            through_month: 12,
        }
    }

    pub fn date_range(&self) -> Result<DateRange> {
        match *self {
            Window::Month { year, month } => {
                let start = month_start(year, month)?;
                let (ny, nm) = shift_month(year, month, 1);
                Ok(DateRange {
                    start,
                    end: month_start(ny, nm)?,
                })
            }
            Window::Year {
                year,
                through_month,
            } => {
                validate_month(through_month)?;
                let start = month_start(year, 1)?;
                let (ny, nm) = shift_month(year, through_month, 1);
                Ok(DateRange {
                    start,
                    end: month_start(ny, nm)?,
                })
            }
            Window::Trailing {
                end_year,
                end_month,
                months,
            } => {
                if !(1..=MAX_TRAILING_MONTHS).contains(&months) {
                    return Err(LedgerError::Validation(format!(
                        "trailing window must span 1-{} months, got {}",
                        MAX_TRAILING_MONTHS, months
                    )));
                }
                validate_month(end_month)?;
                let back = i32::try_from(months - 1).unwrap_or(0);
                let (sy, sm) = shift_month(end_year, end_month, -back);
                let (ny, nm) = shift_month(end_year, end_month, 1);
                Ok(DateRange {
                    start: month_start(sy, sm)?,
                    end: month_start(ny, nm)?,
                })
            }
        }
    }
}

pub fn validate_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "month {} out of range 1-12",
            month
        )))
    }
}

pub fn month_start(year: i32, month: u32) -> Result<NaiveDate> {
    validate_month(month)?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| LedgerError::Validation(format!("year {} out of range", year)))
}

/// Moves `delta` calendar months from (year, month).
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let idx = year * 12 + (month as i32 - 1) + delta;
    (idx.div_euclid(12), (idx.rem_euclid(12) + 1) as u32)
}

// Row predicates. Redaction and the category listings reuse these so a
// redacted field always covers exactly the rows that were summed into it.

pub fn egg_sales() -> TxFilter {
    TxFilter::any()
        .category(Category::Egg)
        .types([TransactionType::Sale])
}

pub fn feed_purchases() -> TxFilter {
    TxFilter::any()
        .category(Category::Feed)
        .types([TransactionType::Purchase])
}

/// SALE is included: medicine rows are sometimes keyed in as sales.
pub fn medicine_expenses() -> TxFilter {
    TxFilter::any()
        .category(Category::Medicine)
        .types([TransactionType::Purchase, TransactionType::Sale])
}

pub fn other_expenses() -> TxFilter {
    TxFilter::any()
        .category(Category::Other)
        .types([TransactionType::Expense])
}

pub fn labor_expenses() -> TxFilter {
    TxFilter::any()
        .category(Category::Employee)
        .types([TransactionType::Expense])
}

pub fn payments() -> TxFilter {
    TxFilter::any().types([TransactionType::Payment])
}

pub fn discounts() -> TxFilter {
    TxFilter::any().types([TransactionType::Discount])
}

pub fn tds() -> TxFilter {
    TxFilter::any().types([TransactionType::Tds])
}

/// Average selling price of one egg item within one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPrice {
    pub year: i32,
    pub month: u32,
    pub item_name: String,
    /// First day of the month.
    pub price_date: NaiveDate,
    pub total_amount: f64,
    pub total_quantity: f64,
    pub average_price: f64,
}

impl MonthlyPrice {
    fn from_totals(t: MonthlyItemTotals) -> Result<Self> {
        Ok(MonthlyPrice {
            price_date: month_start(t.year, t.month)?,
            average_price: if t.quantity > 0.0 {
                t.amount / t.quantity
            } else {
                0.0
            },
            year: t.year,
            month: t.month,
            item_name: t.item_name,
            total_amount: t.amount,
            total_quantity: t.quantity,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Also compute the per-item breakdowns.
    pub breakdowns: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub tenant_id: TenantId,
    pub window: Window,
    pub eggs_sold: Totals,
    /// Quantity is in kilograms.
    pub feed_purchased: Totals,
    pub medicine_expense: f64,
    pub other_expense: f64,
    pub labor_expense: f64,
    pub payments_received: f64,
    pub discounts: f64,
    pub tds: f64,
    pub net_profit: f64,
    pub egg_breakdown: Vec<BreakdownLine>,
    pub feed_breakdown: Vec<BreakdownLine>,
    pub medicine_breakdown: Vec<BreakdownLine>,
    pub payment_breakdown: Vec<BreakdownLine>,
}

impl AggregateSummary {
    pub fn profit_components(&self) -> ProfitComponents {
        ProfitComponents {
            egg_sales: self.eggs_sold.amount,
            discounts: self.discounts,
            feed: self.feed_purchased.amount,
            medicine: self.medicine_expense,
            labor: self.labor_expense,
            other: self.other_expense,
            tds: self.tds,
        }
    }

    pub fn total_sales(&self) -> f64 {
        self.profit_components().total_sales()
    }

    pub fn total_expense(&self) -> f64 {
        self.profit_components().total_expense()
    }
}

/// Single aggregation path behind every report shape. Any failing sub-query
/// fails the whole aggregation.
pub struct AggregationEngine<'a, S: TransactionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TransactionStore + ?Sized> AggregationEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        AggregationEngine { store }
    }

    pub fn aggregate(
        &self,
        tenant: TenantId,
        window: Window,
        opts: AggregateOptions,
    ) -> Result<AggregateSummary> {
        let range = window.date_range()?;
        tracing::debug!(
            tenant,
            start = %range.start,
            end = %range.end,
            breakdowns = opts.breakdowns,
            "aggregating transactions"
        );

        let sum = |f: TxFilter| self.store.query_aggregate(tenant, &range, &f);

        let eggs_sold = sum(egg_sales())?;
        let feed_purchased = sum(feed_purchases())?;
        let medicine_expense = sum(medicine_expenses())?.amount;
        let other_expense = sum(other_expenses())?.amount;
        let labor_expense = sum(labor_expenses())?.amount;
        let payments_received = sum(payments())?.amount;
        let discount_total = sum(discounts())?.amount;
        let tds_total = sum(tds())?.amount;

        let mut summary = AggregateSummary {
            tenant_id: tenant,
            window,
            eggs_sold,
            feed_purchased,
            medicine_expense,
            other_expense,
            labor_expense,
            payments_received,
            discounts: discount_total,
            tds: tds_total,
            net_profit: 0.0,
            egg_breakdown: Vec::new(),
            feed_breakdown: Vec::new(),
            medicine_breakdown: Vec::new(),
            payment_breakdown: Vec::new(),
        };
        summary.net_profit = summary.profit_components().net_profit();

        if opts.breakdowns {
            let lines = |f: TxFilter, label: &str| {
                self.store.query_breakdown(tenant, &range, &f, label)
            };
            summary.egg_breakdown = lines(egg_sales(), UNNAMED_ITEM_LABEL)?;
            summary.feed_breakdown = lines(feed_purchases(), UNNAMED_ITEM_LABEL)?;
            summary.medicine_breakdown = lines(medicine_expenses(), UNNAMED_ITEM_LABEL)?;
            summary.payment_breakdown = lines(payments(), CASH_PAYMENT_LABEL)?;
        }
        Ok(summary)
    }

    /// Egg sale prices per (month, item) over `range`, newest month first.
    /// Rows without a positive quantity carry no price and are skipped.
    pub fn egg_prices(
        &self,
        tenant: TenantId,
        range: &DateRange,
        item: Option<&str>,
    ) -> Result<Vec<MonthlyPrice>> {
        tracing::debug!(tenant, start = %range.start, end = %range.end, ?item, "egg prices");
        self.store
            .query_monthly_item_totals(tenant, range, &egg_sales(), item, UNNAMED_ITEM_LABEL)?
            .into_iter()
            .map(MonthlyPrice::from_totals)
            .collect()
    }
}
