// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::insert;
use crate::models::{Category, Transaction, TransactionType};
use crate::utils::{id_for_tenant, parse_amount, parse_date, required};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn optional_field(rec: &csv::StringRecord, idx: usize) -> Option<String> {
    rec.get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn optional_number(
    rec: &csv::StringRecord,
    idx: usize,
    what: &str,
    line: u64,
) -> Result<Option<f64>> {
    optional_field(rec, idx)
        .map(|s| parse_amount(&s).with_context(|| format!("Invalid {} on line {}", what, line)))
        .transpose()
}

/// Columns: date,type,category,item,quantity,unit,rate,amount,notes.
/// The whole file is rejected if any row is invalid.
fn import_transactions(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = required(sub, "path")?.trim();
    let tenant_id = id_for_tenant(conn, required(sub, "tenant")?)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let db_tx = conn.transaction()?;
    let mut count = 0usize;
    for result in rdr.records() {
        let rec = result?;
        let line = rec.position().map(|p| p.line()).unwrap_or_default();

        let date_raw = rec.get(0).context("date missing")?.trim();
        let date = parse_date(date_raw)
            .with_context(|| format!("Invalid transaction date '{}' on line {}", date_raw, line))?;
        let transaction_type: TransactionType = rec
            .get(1)
            .context("type missing")?
            .parse()
            .with_context(|| format!("Line {}", line))?;
        let category: Category = rec
            .get(2)
            .context("category missing")?
            .parse()
            .with_context(|| format!("Line {}", line))?;
        let amount_raw = rec.get(7).context("amount missing")?.trim();
        let amount = parse_amount(amount_raw)
            .with_context(|| format!("Invalid amount '{}' on line {}", amount_raw, line))?;

        let row = Transaction {
            id: 0,
            tenant_id,
            date,
            transaction_type,
            category,
            item_name: optional_field(&rec, 3),
            quantity: optional_number(&rec, 4, "quantity", line)?,
            unit: optional_field(&rec, 5),
            rate: optional_number(&rec, 6, "rate", line)?,
            amount,
            notes: optional_field(&rec, 8),
        };
        insert(&db_tx, &row)?;
        count += 1;
    }
    db_tx.commit()?;
    tracing::info!(tenant = tenant_id, count, path, "csv import committed");
    println!("Imported {} transactions from {}", count, path);
    Ok(())
}
