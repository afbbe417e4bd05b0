// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{PrecomputedBreakdown, TenantId};
use crate::utils::{id_for_tenant, parse_amount, parse_month, required};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("breakdown", sub)) => {
            if let Some(("add", add_m)) = sub.subcommand() {
                add_breakdown(conn, add_m)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Totals recorded for a month; `None` leaves a stored value unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthTotals {
    pub total_eggs: Option<f64>,
    pub total_feeds: Option<f64>,
    pub total_medicines: Option<f64>,
    pub net_profit: Option<f64>,
}

/// Creates or updates the precomputed row for a month and returns its id.
pub fn upsert_month(
    conn: &Connection,
    tenant: TenantId,
    year: i32,
    month: u32,
    totals: &MonthTotals,
) -> Result<i64> {
    if !(1..=12).contains(&month) {
        bail!("Invalid month number {}", month);
    }
    conn.execute(
        "INSERT INTO ledger_parses(tenant_id, year, month, total_eggs, total_feeds,
                                   total_medicines, net_profit)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(tenant_id, year, month) DO UPDATE SET
             total_eggs=COALESCE(excluded.total_eggs, total_eggs),
             total_feeds=COALESCE(excluded.total_feeds, total_feeds),
             total_medicines=COALESCE(excluded.total_medicines, total_medicines),
             net_profit=COALESCE(excluded.net_profit, net_profit),
             parsed_at=datetime('now')",
        params![
            tenant,
            year,
            month,
            totals.total_eggs,
            totals.total_feeds,
            totals.total_medicines,
            totals.net_profit
        ],
    )?;
    let id = conn.query_row(
        "SELECT id FROM ledger_parses WHERE tenant_id=?1 AND year=?2 AND month=?3",
        params![tenant, year, month],
        |r| r.get(0),
    )?;
    Ok(id)
}

pub fn add_breakdown_row(conn: &Connection, parse_id: i64, b: &PrecomputedBreakdown) -> Result<()> {
    let kind = b.breakdown_type.trim().to_uppercase();
    if kind.is_empty() {
        bail!("Breakdown type must not be empty");
    }
    conn.execute(
        "INSERT INTO ledger_breakdowns(ledger_parse_id, breakdown_type, quantity, amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![parse_id, kind, b.quantity, b.amount],
    )?;
    Ok(())
}

fn opt_number(sub: &clap::ArgMatches, name: &str) -> Result<Option<f64>> {
    sub.get_one::<String>(name)
        .map(|s| parse_amount(s).with_context(|| format!("Invalid --{}", name)))
        .transpose()
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let (year, month) = parse_month(required(sub, "month")?)?;
    let totals = MonthTotals {
        total_eggs: opt_number(sub, "eggs")?,
        total_feeds: opt_number(sub, "feeds")?,
        total_medicines: opt_number(sub, "medicines")?,
        net_profit: opt_number(sub, "net-profit")?,
    };
    upsert_month(conn, tenant, year, month, &totals)?;
    println!("Saved ledger figures for {}-{:02}", year, month);
    Ok(())
}

fn add_breakdown(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let (year, month) = parse_month(required(sub, "month")?)?;
    let parse_id = upsert_month(conn, tenant, year, month, &MonthTotals::default())?;
    let row = PrecomputedBreakdown {
        breakdown_type: required(sub, "type")?.to_string(),
        quantity: parse_amount(required(sub, "qty")?)?,
        amount: opt_number(sub, "amount")?,
    };
    add_breakdown_row(conn, parse_id, &row)?;
    println!(
        "Added {} to ledger {}-{:02}",
        row.breakdown_type.trim().to_uppercase(),
        year,
        month
    );
    Ok(())
}
