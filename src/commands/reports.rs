// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics::engine::MonthlyPrice;
use crate::analytics::reports::{CategoryBreakdown, MonthlyReport, TrailingMonth, YearlySummary};
use crate::analytics::{BreakdownSelector, ReportAssembler};
use crate::models::{RolePermission, TenantId};
use crate::permissions::permissions_for;
use crate::store::{BreakdownLine, DateRange, SqliteStore};
use crate::utils::{
    fmt_amount, id_for_tenant, maybe_print_json, parse_date, parse_month, pretty_table, required,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("monthly", sub)) => monthly(conn, sub)?,
        Some(("yearly", sub)) => yearly(conn, sub)?,
        Some(("trailing", sub)) => trailing(conn, sub)?,
        Some(("breakdown", sub)) => breakdown(conn, sub)?,
        Some(("egg-prices", sub)) => egg_prices(conn, sub)?,
        _ => {}
    }
    Ok(())
}

struct Viewer {
    tenant: TenantId,
    tenant_name: String,
    perms: RolePermission,
    today: NaiveDate,
}

fn viewer(conn: &Connection, store: &SqliteStore<'_>, sub: &clap::ArgMatches) -> Result<Viewer> {
    let tenant_name = required(sub, "tenant")?.trim().to_string();
    let tenant = id_for_tenant(conn, &tenant_name)?;
    let perms = permissions_for(store, tenant, required(sub, "role")?)?;
    let today = match sub.get_one::<String>("as-of") {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    Ok(Viewer {
        tenant,
        tenant_name,
        perms,
        today,
    })
}

pub fn monthly_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<MonthlyReport> {
    let store = SqliteStore::from_settings(conn)?;
    let v = viewer(conn, &store, sub)?;
    let (year, month) = parse_month(required(sub, "month")?)?;
    let report = ReportAssembler::new(&store, v.today)
        .monthly(v.tenant, &v.perms, year, month)
        .with_context(|| format!("Monthly report for '{}' {}-{:02}", v.tenant_name, year, month))?;
    Ok(report)
}

pub fn yearly_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<YearlySummary>> {
    let store = SqliteStore::from_settings(conn)?;
    let v = viewer(conn, &store, sub)?;
    let rows = ReportAssembler::new(&store, v.today)
        .yearly(v.tenant, &v.perms)
        .with_context(|| format!("Yearly report for '{}'", v.tenant_name))?;
    Ok(rows)
}

pub fn trailing_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TrailingMonth>> {
    let store = SqliteStore::from_settings(conn)?;
    let v = viewer(conn, &store, sub)?;
    let rows = ReportAssembler::new(&store, v.today)
        .trailing_twelve(v.tenant, &v.perms)
        .with_context(|| format!("Trailing report for '{}'", v.tenant_name))?;
    Ok(rows)
}

pub fn breakdown_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<CategoryBreakdown> {
    let store = SqliteStore::from_settings(conn)?;
    let v = viewer(conn, &store, sub)?;
    let (year, month) = parse_month(required(sub, "month")?)?;
    let selector: BreakdownSelector = required(sub, "category")?.parse()?;
    let report = ReportAssembler::new(&store, v.today)
        .category_breakdown(v.tenant, &v.perms, year, month, selector)
        .with_context(|| {
            format!(
                "{} breakdown for '{}' {}-{:02}",
                selector.label(),
                v.tenant_name,
                year,
                month
            )
        })?;
    Ok(report)
}

pub fn egg_prices_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<MonthlyPrice>> {
    let store = SqliteStore::from_settings(conn)?;
    let v = viewer(conn, &store, sub)?;
    let first = sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
    let last = sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
    let range = DateRange::inclusive(first, last)?;
    let item = sub
        .get_one::<String>("item")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    let rows = ReportAssembler::new(&store, v.today)
        .egg_prices(v.tenant, &v.perms, &range, item)
        .with_context(|| format!("Egg prices for '{}'", v.tenant_name))?;
    Ok(rows)
}

fn kv(label: &str, value: String) -> Vec<String> {
    vec![label.to_string(), value]
}

fn print_lines(title: &str, lines: &[BreakdownLine]) {
    if lines.is_empty() {
        return;
    }
    let rows = lines
        .iter()
        .map(|l| vec![l.item_name.clone(), l.quantity.to_string(), fmt_amount(l.amount)])
        .collect();
    println!("{}", title);
    println!("{}", pretty_table(&["Item", "Qty", "Amount"], rows));
}

fn monthly(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let r = monthly_report(conn, sub)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &r)? {
        return Ok(());
    }
    let s = &r.summary;
    let mut rows = vec![
        kv("Eggs sold", s.eggs_sold.quantity.to_string()),
        kv("Egg sales", fmt_amount(s.eggs_sold.amount)),
        kv("Feed purchased (kg)", s.feed_purchased.quantity.to_string()),
        kv("Feed expense", fmt_amount(s.feed_purchased.amount)),
        kv("Medicine", fmt_amount(s.medicine_expense)),
        kv("Labor", fmt_amount(s.labor_expense)),
        kv("Other", fmt_amount(s.other_expense)),
        kv("Discounts", fmt_amount(s.discounts)),
        kv("TDS", fmt_amount(s.tds)),
        kv("Payments received", fmt_amount(s.payments_received)),
        kv("Total sales", fmt_amount(r.total_sales)),
        kv("Total expense", fmt_amount(r.total_expense)),
        kv("Net profit", fmt_amount(s.net_profit)),
        kv("Days", r.derived.days_in_month.to_string()),
        kv("Estimated hens", format!("{:.0}", r.derived.estimated_hens)),
        kv("Egg lay %", format!("{:.2}", r.derived.egg_lay_percentage)),
    ];
    if let Some(ledger) = &r.ledger {
        if let Some(d) = ledger.net_profit_delta {
            rows.push(kv("Ledger net profit delta", fmt_amount(d)));
        }
    }
    println!("{}", pretty_table(&["Metric", "Value"], rows));
    print_lines("Eggs by item", &s.egg_breakdown);
    print_lines("Feed by item", &s.feed_breakdown);
    print_lines("Medicine by item", &s.medicine_breakdown);
    print_lines("Payments by item", &s.payment_breakdown);
    Ok(())
}

fn yearly(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = yearly_report(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|y| {
                vec![
                    y.year.to_string(),
                    fmt_amount(y.total_sales),
                    fmt_amount(y.total_expense),
                    fmt_amount(y.net_profit),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Year", "Sales", "Expense", "Net profit"], rows)
        );
    }
    Ok(())
}

fn trailing(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = trailing_report(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|m| {
                vec![
                    format!("{} {}", m.month_name, m.year),
                    fmt_amount(m.sales),
                    fmt_amount(m.feed_expense),
                    fmt_amount(m.medicine_expense),
                    fmt_amount(m.labor_expense),
                    fmt_amount(m.other_expense),
                    fmt_amount(m.tds),
                    fmt_amount(m.total_expense),
                    fmt_amount(m.net_profit),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Month", "Sales", "Feed", "Medicine", "Labor", "Other", "TDS", "Expense",
                    "Net profit"
                ],
                rows,
            )
        );
    }
    Ok(())
}

fn breakdown(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let r = breakdown_report(conn, sub)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &r)? {
        return Ok(());
    }
    let rows = r
        .grouped_by_date
        .iter()
        .flat_map(|g| {
            g.transactions.iter().map(move |row| {
                let t = &row.transaction;
                vec![
                    g.date.to_string(),
                    t.transaction_type.to_string(),
                    t.item_name.clone().unwrap_or_default(),
                    t.quantity.map(|q| q.to_string()).unwrap_or_default(),
                    fmt_amount(t.amount),
                    fmt_amount(g.total_amount),
                ]
            })
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Type", "Item", "Qty", "Amount", "Day total"], rows)
    );
    println!("{} rows", r.total_count);
    if r.average_price > 0.0 {
        println!("Average price: {}", fmt_amount(r.average_price));
    }
    Ok(())
}

fn egg_prices(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = egg_prices_report(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|p| {
                vec![
                    format!("{}-{:02}", p.year, p.month),
                    p.item_name.clone(),
                    p.total_quantity.to_string(),
                    fmt_amount(p.total_amount),
                    format!("{:.2}", p.average_price),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Month", "Item", "Qty", "Amount", "Avg price"], rows)
        );
    }
    Ok(())
}
