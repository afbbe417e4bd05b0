// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

pub type TenantId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Sale,
    Purchase,
    Payment,
    Tds,
    Discount,
    Expense,
    Income,
}

impl TransactionType {
    pub const ALL: [TransactionType; 7] = [
        TransactionType::Sale,
        TransactionType::Purchase,
        TransactionType::Payment,
        TransactionType::Tds,
        TransactionType::Discount,
        TransactionType::Expense,
        TransactionType::Income,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "SALE",
            TransactionType::Purchase => "PURCHASE",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Tds => "TDS",
            TransactionType::Discount => "DISCOUNT",
            TransactionType::Expense => "EXPENSE",
            TransactionType::Income => "INCOME",
        }
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| LedgerError::Validation(format!("unknown transaction type '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Egg,
    Feed,
    Medicine,
    Other,
    Chick,
    Grower,
    Manure,
    Employee,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Egg,
        Category::Feed,
        Category::Medicine,
        Category::Other,
        Category::Chick,
        Category::Grower,
        Category::Manure,
        Category::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Egg => "EGG",
            Category::Feed => "FEED",
            Category::Medicine => "MEDICINE",
            Category::Other => "OTHER",
            Category::Chick => "CHICK",
            Category::Grower => "GROWER",
            Category::Manure => "MANURE",
            Category::Employee => "EMPLOYEE",
        }
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| LedgerError::Validation(format!("unknown category '{}'", s)))
    }
}

macro_rules! sql_text_enum {
    ($t:ty) => {
        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $t {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $t {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: LedgerError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

sql_text_enum!(TransactionType);
sql_text_enum!(Category);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub parent_id: Option<TenantId>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub tenant_id: TenantId,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub category: Category,
    pub item_name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub rate: Option<f64>,
    pub amount: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    pub role: String,
    pub can_view_sensitive_data: bool,
    pub can_edit_transactions: bool,
    pub can_approve_transactions: bool,
    pub can_manage_users: bool,
    pub can_view_charts: bool,
}

impl RolePermission {
    /// Permissions granted when a role has no row for the tenant.
    pub fn none(role: &str) -> Self {
        RolePermission {
            role: role.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityEntry {
    pub tenant_id: TenantId,
    pub data_type: String,
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedMonth {
    pub year: i32,
    pub month: u32,
    pub total_eggs: Option<f64>,
    pub total_feeds: Option<f64>,
    pub total_medicines: Option<f64>,
    pub net_profit: Option<f64>,
    pub breakdowns: Vec<PrecomputedBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedBreakdown {
    pub breakdown_type: String, // e.g. EGG_LARGE, FEED_LAYER_MASH
    pub quantity: f64,
    pub amount: Option<f64>,
}
