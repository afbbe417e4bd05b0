// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics::engine::Window;
use crate::models::{Category, TenantId, Transaction, TransactionType};
use crate::store::{ClassifiedTransaction, DateRange, SqliteStore, TransactionStore, TxFilter};
use crate::utils::{
    fmt_amount, id_for_tenant, maybe_print_json, parse_amount, parse_date, parse_month,
    pretty_table, required,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn opt_amount(sub: &clap::ArgMatches, name: &str) -> Result<Option<f64>> {
    sub.get_one::<String>(name)
        .map(|s| parse_amount(s).with_context(|| format!("Invalid --{}", name)))
        .transpose()
}

fn opt_text(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant_name = required(sub, "tenant")?;
    let tx = Transaction {
        id: 0,
        tenant_id: id_for_tenant(conn, tenant_name)?,
        date: parse_date(required(sub, "date")?)?,
        transaction_type: required(sub, "type")?.parse::<TransactionType>()?,
        category: required(sub, "category")?.parse::<Category>()?,
        item_name: opt_text(sub, "item"),
        quantity: opt_amount(sub, "qty")?,
        unit: opt_text(sub, "unit"),
        rate: opt_amount(sub, "rate")?,
        amount: parse_amount(required(sub, "amount")?)?,
        notes: opt_text(sub, "note"),
    };
    let id = insert(conn, &tx)?;
    tracing::debug!(id, tenant = tx.tenant_id, "transaction recorded");
    println!(
        "Recorded {} {} {} on {} for '{}'",
        tx.transaction_type,
        tx.category,
        fmt_amount(tx.amount),
        tx.date,
        tenant_name.trim()
    );
    Ok(())
}

/// Inserts `tx`, ignoring its `id`, and returns the new row id.
pub fn insert(conn: &Connection, tx: &Transaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(tenant_id, date, transaction_type, category, item_name,
                                  quantity, unit, rate, amount, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            tx.tenant_id,
            tx.date.to_string(),
            tx.transaction_type,
            tx.category,
            tx.item_name,
            tx.quantity,
            tx.unit,
            tx.rate,
            tx.amount,
            tx.notes
        ],
    )
    .with_context(|| format!("Insert transaction dated {}", tx.date))?;
    Ok(conn.last_insert_rowid())
}

fn all_time() -> Result<DateRange> {
    Ok(DateRange::inclusive(None, None)?)
}

pub fn query_rows(
    conn: &Connection,
    tenant: TenantId,
    sub: &clap::ArgMatches,
) -> Result<Vec<ClassifiedTransaction>> {
    let range = match sub.get_one::<String>("month") {
        Some(m) => {
            let (year, month) = parse_month(m)?;
            Window::month(year, month).date_range()?
        }
        None => all_time()?,
    };
    let mut filter = TxFilter::any();
    if let Some(c) = sub.get_one::<String>("category") {
        filter = filter.category(c.parse()?);
    }
    let store = SqliteStore::from_settings(conn)?;
    let mut rows = store.list_transactions(tenant, &range, &filter)?;
    if let Some(limit) = sub.get_one::<usize>("limit") {
        rows.truncate(*limit);
    }
    Ok(rows)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let data = query_rows(conn, tenant, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                let t = &r.transaction;
                let category = if r.effective_category == t.category {
                    t.category.to_string()
                } else {
                    format!("{} (filed {})", r.effective_category, t.category)
                };
                vec![
                    t.date.to_string(),
                    t.transaction_type.to_string(),
                    category,
                    t.item_name.clone().unwrap_or_default(),
                    t.quantity.map(|q| q.to_string()).unwrap_or_default(),
                    t.unit.clone().unwrap_or_default(),
                    fmt_amount(t.amount),
                    t.notes.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Type", "Category", "Item", "Qty", "Unit", "Amount", "Notes"],
                rows,
            )
        );
    }
    Ok(())
}
