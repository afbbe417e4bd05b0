// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-side storage seams consumed by the analytics core, and their SQLite
//! implementation.

use chrono::NaiveDate;
use rusqlite::functions::FunctionFlags;
use std::sync::atomic::{AtomicUsize, Ordering};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;

use crate::classifier::ItemClassifier;
use crate::error::{LedgerError, Result};
use crate::models::{
    Category, PrecomputedBreakdown, PrecomputedMonth, RolePermission, TenantId, Transaction,
    TransactionType,
};

/// Half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering `first..=last`; a missing side stays open. Open ends are
    /// years 1 and 9999, which still compare correctly as YYYY-MM-DD text.
    pub fn inclusive(first: Option<NaiveDate>, last: Option<NaiveDate>) -> Result<Self> {
        let floor = NaiveDate::from_ymd_opt(1, 1, 1);
        let ceiling = NaiveDate::from_ymd_opt(9999, 12, 31);
        let start = first
            .or(floor)
            .ok_or_else(|| LedgerError::Validation("date range start".into()))?;
        let end = match last {
            Some(d) => d.succ_opt(),
            None => ceiling,
        }
        .ok_or_else(|| LedgerError::Validation("date range end".into()))?;
        if end <= start {
            return Err(LedgerError::Validation(format!(
                "date range ends before it starts ({} to {})",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }
}

/// Row predicate. `category` is matched against the *effective* category,
/// i.e. after [`ItemClassifier`] correction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxFilter {
    pub category: Option<Category>,
    pub types: Vec<TransactionType>,
}

impl TxFilter {
    pub fn any() -> Self {
        TxFilter::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn types<I: IntoIterator<Item = TransactionType>>(mut self, types: I) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn matches(&self, effective: Category, ty: TransactionType) -> bool {
        self.category.is_none_or(|c| c == effective)
            && (self.types.is_empty() || self.types.contains(&ty))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub amount: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownLine {
    pub item_name: String,
    pub quantity: f64,
    pub amount: f64,
}

/// Sums for one item within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyItemTotals {
    pub year: i32,
    pub month: u32,
    pub item_name: String,
    pub amount: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub effective_category: Category,
}

pub trait TransactionStore {
    fn query_aggregate(&self, tenant: TenantId, range: &DateRange, filter: &TxFilter)
    -> Result<Totals>;

    /// Sums grouped by item name, ordered by item name. Rows without an item
    /// name are grouped under `default_label`.
    fn query_breakdown(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
        default_label: &str,
    ) -> Result<Vec<BreakdownLine>>;

    /// Sums grouped by (year, month, item name) over rows with a positive
    /// quantity, newest month first and then by item name. `item` restricts
    /// the result to one exact item name.
    fn query_monthly_item_totals(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
        item: Option<&str>,
        default_label: &str,
    ) -> Result<Vec<MonthlyItemTotals>>;

    /// Matching rows ordered by date, then insertion order.
    fn list_transactions(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
    ) -> Result<Vec<ClassifiedTransaction>>;

    /// Distinct calendar years holding at least one row, newest first.
    fn years_with_data(&self, tenant: TenantId) -> Result<Vec<i32>>;
}

pub trait SensitivityStore {
    fn get_config(&self, tenant: TenantId, data_type: &str) -> Result<Option<bool>>;

    /// `Ok(None)` for a root tenant; `UnknownTenant` when the id does not exist.
    fn get_parent(&self, tenant: TenantId) -> Result<Option<TenantId>>;
}

pub trait LedgerStore {
    fn get_precomputed_month(
        &self,
        tenant: TenantId,
        year: i32,
        month: u32,
    ) -> Result<Option<PrecomputedMonth>>;
}

pub trait PermissionStore {
    fn role_permissions(&self, tenant: TenantId, role: &str) -> Result<Option<RolePermission>>;
}

/// Everything the report assemblers need from storage.
pub trait AnalyticsStore: TransactionStore + SensitivityStore + LedgerStore {}

impl<T: TransactionStore + SensitivityStore + LedgerStore + ?Sized> AnalyticsStore for T {}

static NEXT_STORE: AtomicUsize = AtomicUsize::new(0);

pub struct SqliteStore<'c> {
    conn: &'c Connection,
    /// Name of this store's `(category, item_name)` SQL function. Each store
    /// registers its own, so stores sharing a connection keep their keywords.
    category_fn: String,
}

impl<'c> SqliteStore<'c> {
    /// Wraps `conn` and installs an effective-category SQL function backed by
    /// `classifier`. The function is removed again when the store is dropped.
    pub fn new(conn: &'c Connection, classifier: ItemClassifier) -> Result<Self> {
        let category_fn = format!(
            "effective_category_{}",
            NEXT_STORE.fetch_add(1, Ordering::Relaxed)
        );
        conn.create_scalar_function(
            category_fn.as_str(),
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let stored: String = ctx.get(0)?;
                let item: Option<String> = ctx.get(1)?;
                Ok(match stored.parse::<Category>() {
                    Ok(cat) => classifier.classify(cat, item.as_deref()).as_str().to_string(),
                    Err(_) => stored,
                })
            },
        )?;
        Ok(SqliteStore { conn, category_fn })
    }

    /// Store using the keyword set configured in `settings`.
    pub fn from_settings(conn: &'c Connection) -> Result<Self> {
        let classifier = ItemClassifier::from_settings(conn)?;
        Self::new(conn, classifier)
    }

    pub fn conn(&self) -> &Connection {
        self.conn
    }

    fn effective_category_sql(&self) -> String {
        format!("{}(category, item_name)", self.category_fn)
    }

    fn where_clause(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
        args: &mut Vec<Value>,
    ) -> String {
        let mut sql = String::from("tenant_id = ? AND date >= ? AND date < ?");
        args.push(Value::Integer(tenant));
        args.push(Value::Text(range.start.to_string()));
        args.push(Value::Text(range.end.to_string()));
        if let Some(cat) = filter.category {
            sql.push_str(&format!(" AND {} = ?", self.effective_category_sql()));
            args.push(Value::Text(cat.as_str().to_string()));
        }
        if !filter.types.is_empty() {
            let marks = vec!["?"; filter.types.len()].join(",");
            sql.push_str(&format!(" AND transaction_type IN ({})", marks));
            for t in &filter.types {
                args.push(Value::Text(t.as_str().to_string()));
            }
        }
        sql
    }
}

impl Drop for SqliteStore<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.remove_function(&self.category_fn, 2) {
            tracing::debug!(
                function = %self.category_fn,
                error = %e,
                "could not remove SQL function"
            );
        }
    }
}

impl TransactionStore for SqliteStore<'_> {
    fn query_aggregate(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
    ) -> Result<Totals> {
        let mut args = Vec::new();
        let cond = self.where_clause(tenant, range, filter, &mut args);
        let sql = format!(
            "SELECT COALESCE(SUM(amount), 0.0), COALESCE(SUM(quantity), 0.0)
             FROM transactions WHERE {}",
            cond
        );
        let totals = self
            .conn
            .query_row(&sql, params_from_iter(args.iter()), |r| {
                Ok(Totals {
                    amount: r.get(0)?,
                    quantity: r.get(1)?,
                })
            })?;
        Ok(totals)
    }

    fn query_breakdown(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
        default_label: &str,
    ) -> Result<Vec<BreakdownLine>> {
        let mut args = vec![Value::Text(default_label.to_string())];
        let cond = self.where_clause(tenant, range, filter, &mut args);
        let sql = format!(
            "SELECT COALESCE(item_name, ?) AS item,
                    COALESCE(SUM(quantity), 0.0),
                    COALESCE(SUM(amount), 0.0)
             FROM transactions WHERE {}
             GROUP BY item ORDER BY item",
            cond
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |r| {
            Ok(BreakdownLine {
                item_name: r.get(0)?,
                quantity: r.get(1)?,
                amount: r.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn query_monthly_item_totals(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
        item: Option<&str>,
        default_label: &str,
    ) -> Result<Vec<MonthlyItemTotals>> {
        let mut args = vec![Value::Text(default_label.to_string())];
        let mut cond = self.where_clause(tenant, range, filter, &mut args);
        cond.push_str(" AND quantity IS NOT NULL AND quantity > 0");
        if let Some(name) = item {
            cond.push_str(" AND item_name = ?");
            args.push(Value::Text(name.to_string()));
        }
        let sql = format!(
            "SELECT CAST(substr(date, 1, 4) AS INTEGER) AS y,
                    CAST(substr(date, 6, 2) AS INTEGER) AS m,
                    COALESCE(item_name, ?) AS item,
                    COALESCE(SUM(amount), 0.0),
                    COALESCE(SUM(quantity), 0.0)
             FROM transactions WHERE {}
             GROUP BY y, m, item ORDER BY y DESC, m DESC, item",
            cond
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |r| {
            Ok(MonthlyItemTotals {
                year: r.get(0)?,
                month: r.get(1)?,
                item_name: r.get(2)?,
                amount: r.get(3)?,
                quantity: r.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn list_transactions(
        &self,
        tenant: TenantId,
        range: &DateRange,
        filter: &TxFilter,
    ) -> Result<Vec<ClassifiedTransaction>> {
        let mut args = Vec::new();
        let cond = self.where_clause(tenant, range, filter, &mut args);
        let sql = format!(
            "SELECT id, tenant_id, date, transaction_type, category, item_name, quantity,
                    unit, rate, amount, notes, {}
             FROM transactions WHERE {}
             ORDER BY date ASC, id ASC",
            self.effective_category_sql(),
            cond
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |r| {
            Ok(ClassifiedTransaction {
                transaction: Transaction {
                    id: r.get(0)?,
                    tenant_id: r.get(1)?,
                    date: r.get(2)?,
                    transaction_type: r.get(3)?,
                    category: r.get(4)?,
                    item_name: r.get(5)?,
                    quantity: r.get(6)?,
                    unit: r.get(7)?,
                    rate: r.get(8)?,
                    amount: r.get(9)?,
                    notes: r.get(10)?,
                },
                effective_category: r.get(11)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn years_with_data(&self, tenant: TenantId) -> Result<Vec<i32>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT CAST(substr(date, 1, 4) AS INTEGER) AS y
             FROM transactions WHERE tenant_id = ?1
             ORDER BY y DESC",
        )?;
        let rows = stmt.query_map(params![tenant], |r| r.get::<_, i32>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl SensitivityStore for SqliteStore<'_> {
    fn get_config(&self, tenant: TenantId, data_type: &str) -> Result<Option<bool>> {
        let v: Option<bool> = self
            .conn
            .query_row(
                "SELECT is_sensitive FROM sensitive_data_config
                 WHERE tenant_id = ?1 AND data_type = ?2",
                params![tenant, data_type],
                |r| r.get(0),
            )
            .optional()?;
        Ok(v)
    }

    fn get_parent(&self, tenant: TenantId) -> Result<Option<TenantId>> {
        let row: Option<Option<TenantId>> = self
            .conn
            .query_row(
                "SELECT parent_id FROM tenants WHERE id = ?1",
                params![tenant],
                |r| r.get(0),
            )
            .optional()?;
        row.ok_or(LedgerError::UnknownTenant(tenant))
    }
}

impl LedgerStore for SqliteStore<'_> {
    fn get_precomputed_month(
        &self,
        tenant: TenantId,
        year: i32,
        month: u32,
    ) -> Result<Option<PrecomputedMonth>> {
        let head = self
            .conn
            .query_row(
                "SELECT id, total_eggs, total_feeds, total_medicines, net_profit
                 FROM ledger_parses
                 WHERE tenant_id = ?1 AND year = ?2 AND month = ?3",
                params![tenant, year, month],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        PrecomputedMonth {
                            year,
                            month,
                            total_eggs: r.get(1)?,
                            total_feeds: r.get(2)?,
                            total_medicines: r.get(3)?,
                            net_profit: r.get(4)?,
                            breakdowns: Vec::new(),
                        },
                    ))
                },
            )
            .optional()?;
        let Some((parse_id, mut month_row)) = head else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT breakdown_type, quantity, amount FROM ledger_breakdowns
             WHERE ledger_parse_id = ?1 ORDER BY breakdown_type",
        )?;
        let rows = stmt.query_map(params![parse_id], |r| {
            Ok(PrecomputedBreakdown {
                breakdown_type: r.get(0)?,
                quantity: r.get(1)?,
                amount: r.get(2)?,
            })
        })?;
        for row in rows {
            month_row.breakdowns.push(row?);
        }
        Ok(Some(month_row))
    }
}

impl PermissionStore for SqliteStore<'_> {
    fn role_permissions(&self, tenant: TenantId, role: &str) -> Result<Option<RolePermission>> {
        let perm = self
            .conn
            .query_row(
                "SELECT role, can_view_sensitive_data, can_edit_transactions,
                        can_approve_transactions, can_manage_users, can_view_charts
                 FROM role_permissions WHERE tenant_id = ?1 AND role = ?2",
                params![tenant, role],
                |r| {
                    Ok(RolePermission {
                        role: r.get(0)?,
                        can_view_sensitive_data: r.get(1)?,
                        can_edit_transactions: r.get(2)?,
                        can_approve_transactions: r.get(3)?,
                        can_manage_users: r.get(4)?,
                        can_view_charts: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(perm)
    }
}
