// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use henledger::analytics::{BreakdownSelector, ReportAssembler};
use henledger::commands::ledger::{self, MonthTotals};
use henledger::commands::{roles, sensitivity, tenants, transactions};
use henledger::db;
use henledger::error::LedgerError;
use henledger::models::Category::{Egg, Employee, Feed, Other};
use henledger::models::TransactionType::{Expense, Payment, Purchase, Sale};
use henledger::models::{
    Category, PrecomputedBreakdown, RolePermission, Transaction, TransactionType,
};
use henledger::permissions::permissions_for;
use henledger::store::{DateRange, SqliteStore};
use rusqlite::Connection;

fn setup() -> (Connection, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let t = tenants::create_tenant(&conn, "Green Valley", None).unwrap();
    roles::seed_defaults(&conn, t).unwrap();
    // Charts but no sensitive data.
    roles::upsert(
        &conn,
        t,
        &RolePermission {
            role: "VIEWER".into(),
            can_view_charts: true,
            ..Default::default()
        },
    )
    .unwrap();
    (conn, t)
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn add(
    conn: &Connection,
    t: i64,
    date: &str,
    ty: TransactionType,
    cat: Category,
    item: Option<&str>,
    qty: Option<f64>,
    amount: f64,
) {
    let tx = Transaction {
        id: 0,
        tenant_id: t,
        date: day(date),
        transaction_type: ty,
        category: cat,
        item_name: item.map(str::to_string),
        quantity: qty,
        unit: None,
        rate: None,
        amount,
        notes: None,
    };
    transactions::insert(conn, &tx).unwrap();
}

fn january(conn: &Connection, t: i64) {
    add(conn, t, "2024-01-03", Sale, Egg, Some("Large"), Some(9_300.0), 100_000.0);
    add(conn, t, "2024-01-04", Purchase, Feed, Some("Layer Mash"), Some(31_000.0), 40_000.0);
    add(conn, t, "2024-01-05", Purchase, Feed, Some("Shell Grit"), Some(500.0), 5_000.0);
    add(conn, t, "2024-01-10", Expense, Employee, None, None, 10_000.0);
    add(conn, t, "2024-01-20", Expense, Other, None, None, 2_000.0);
}

fn perms(conn: &Connection, t: i64, role: &str) -> RolePermission {
    let store = SqliteStore::from_settings(conn).unwrap();
    permissions_for(&store, t, role).unwrap()
}

#[test]
fn monthly_report_for_owner_has_figures_and_derived_metrics() {
    let (conn, t) = setup();
    january(&conn, t);
    let owner = perms(&conn, t, "owner");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let r = ReportAssembler::new(&store, day("2024-06-01"))
        .monthly(t, &owner, 2024, 1)
        .unwrap();

    assert_eq!(r.summary.net_profit, 43_000.0);
    assert_eq!(r.total_sales, 100_000.0);
    assert_eq!(r.total_expense, 57_000.0);
    assert_eq!(r.derived.days_in_month, 31);
    assert_eq!(r.derived.feed_purchased_tonnes, 31.0);
    assert_eq!(r.derived.estimated_hens, 10_000.0);
    assert!((r.derived.egg_lay_percentage - 3.0).abs() < 1e-9);
    assert!(r.ledger.is_none());
}

#[test]
fn redacted_fields_stay_in_the_payload_as_zero() {
    let (conn, t) = setup();
    january(&conn, t);
    let viewer = perms(&conn, t, "viewer");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let r = ReportAssembler::new(&store, day("2024-06-01"))
        .monthly(t, &viewer, 2024, 1)
        .unwrap();

    assert_eq!(r.summary.eggs_sold.amount, 0.0);
    assert_eq!(r.summary.feed_purchased.quantity, 0.0);
    assert_eq!(r.summary.net_profit, 0.0);
    // Unprotected metrics are untouched.
    assert_eq!(r.summary.medicine_expense, 5_000.0);
    // Derived metrics are built from what the viewer may see.
    assert_eq!(r.derived.estimated_hens, 0.0);
    assert!(r.summary.egg_breakdown.iter().all(|l| l.amount == 0.0));

    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["eggs_sold"]["amount"], 0.0);
    assert_eq!(v["net_profit"], 0.0);
    assert!(v.get("feed_purchased").is_some());
}

#[test]
fn explicit_non_sensitive_setting_unhides_for_viewer() {
    let (conn, t) = setup();
    january(&conn, t);
    sensitivity::upsert(&conn, t, "EGGS_SOLD", false).unwrap();
    let viewer = perms(&conn, t, "VIEWER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let r = ReportAssembler::new(&store, day("2024-06-01"))
        .monthly(t, &viewer, 2024, 1)
        .unwrap();
    assert_eq!(r.summary.eggs_sold.amount, 100_000.0);
    assert_eq!(r.summary.feed_purchased.amount, 0.0);
}

#[test]
fn roles_without_chart_access_are_forbidden() {
    let (conn, t) = setup();
    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2024-06-01"));

    let other = perms(&conn, t, "OTHER_USER");
    assert!(matches!(
        asm.monthly(t, &other, 2024, 1),
        Err(LedgerError::Forbidden(_))
    ));

    let missing = perms(&conn, t, "STRANGER");
    assert_eq!(missing, RolePermission::none("STRANGER"));
    assert!(matches!(asm.yearly(t, &missing), Err(LedgerError::Forbidden(_))));
    assert!(matches!(
        asm.trailing_twelve(t, &missing),
        Err(LedgerError::Forbidden(_))
    ));
}

#[test]
fn bad_month_is_a_validation_error() {
    let (conn, t) = setup();
    let owner = perms(&conn, t, "OWNER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let err = ReportAssembler::new(&store, day("2024-06-01"))
        .monthly(t, &owner, 2024, 0)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[test]
fn precomputed_month_is_attached_and_redacted() {
    let (conn, t) = setup();
    january(&conn, t);
    let id = ledger::upsert_month(
        &conn,
        t,
        2024,
        1,
        &MonthTotals {
            total_eggs: Some(9_000.0),
            total_feeds: Some(30_000.0),
            total_medicines: None,
            net_profit: Some(40_000.0),
        },
    )
    .unwrap();
    ledger::add_breakdown_row(
        &conn,
        id,
        &PrecomputedBreakdown {
            breakdown_type: "egg_large".into(),
            quantity: 9_000.0,
            amount: Some(95_000.0),
        },
    )
    .unwrap();

    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2024-06-01"));

    let owner = perms(&conn, t, "OWNER");
    let full = asm.monthly(t, &owner, 2024, 1).unwrap().ledger.unwrap();
    assert_eq!(full.net_profit_delta, Some(3_000.0));
    assert_eq!(full.precomputed.total_eggs, Some(9_000.0));
    assert_eq!(full.precomputed.breakdowns[0].breakdown_type, "EGG_LARGE");

    let viewer = perms(&conn, t, "VIEWER");
    let hidden = asm.monthly(t, &viewer, 2024, 1).unwrap().ledger.unwrap();
    assert_eq!(hidden.net_profit_delta, None);
    assert_eq!(hidden.precomputed.total_eggs, Some(0.0));
    assert_eq!(hidden.precomputed.net_profit, Some(0.0));
    assert_eq!(hidden.precomputed.total_medicines, None);
    assert_eq!(hidden.precomputed.breakdowns[0].quantity, 0.0);
    assert_eq!(hidden.precomputed.breakdowns[0].amount, Some(0.0));
}

#[test]
fn trailing_report_is_twelve_rows_oldest_first() {
    let (conn, t) = setup();
    add(&conn, t, "2024-02-14", Sale, Egg, None, Some(100.0), 500.0);
    add(&conn, t, "2024-02-15", Purchase, Feed, None, Some(100.0), 200.0);
    let owner = perms(&conn, t, "OWNER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let rows = ReportAssembler::new(&store, day("2024-03-10"))
        .trailing_twelve(t, &owner)
        .unwrap();

    assert_eq!(rows.len(), 12);
    assert_eq!((rows[0].year, rows[0].month), (2023, 4));
    assert_eq!(rows[0].month_name, "Apr");
    assert_eq!((rows[11].year, rows[11].month), (2024, 3));
    assert_eq!(rows[10].sales, 500.0);
    assert_eq!(rows[10].feed_expense, 200.0);
    assert_eq!(rows[10].net_profit, 300.0);
    assert!(rows[..10].iter().all(|r| r.sales == 0.0 && r.net_profit == 0.0));

    // Sparse or empty, the shape does not change.
    let empty = tenants::create_tenant(&conn, "Empty Farm", None).unwrap();
    roles::seed_defaults(&conn, empty).unwrap();
    let none = ReportAssembler::new(&store, day("2025-01-31"))
        .trailing_twelve(empty, &owner)
        .unwrap();
    assert_eq!(none.len(), 12);
    assert_eq!((none[0].year, none[0].month), (2024, 2));
}

#[test]
fn trailing_total_expense_excludes_hidden_feed() {
    let (conn, t) = setup();
    add(&conn, t, "2024-02-15", Purchase, Feed, None, Some(100.0), 200.0);
    add(&conn, t, "2024-02-16", Expense, Other, None, None, 50.0);
    let viewer = perms(&conn, t, "VIEWER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let rows = ReportAssembler::new(&store, day("2024-02-20"))
        .trailing_twelve(t, &viewer)
        .unwrap();
    let feb = &rows[11];
    assert_eq!(feb.feed_expense, 0.0);
    assert_eq!(feb.other_expense, 50.0);
    assert_eq!(feb.total_expense, 50.0);
    assert_eq!(feb.net_profit, 0.0);
}

#[test]
fn yearly_report_caps_the_current_year_only() {
    let (conn, t) = setup();
    for year in [2023, 2024] {
        for m in 1..=12 {
            add(
                &conn,
                t,
                &format!("{}-{:02}-10", year, m),
                TransactionType::Sale,
                Category::Egg,
                None,
                Some(10.0),
                100.0,
            );
        }
    }
    let owner = perms(&conn, t, "OWNER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let rows = ReportAssembler::new(&store, day("2024-06-15"))
        .yearly(t, &owner)
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].year, 2024);
    assert_eq!(rows[0].total_sales, 600.0);
    assert_eq!(rows[1].year, 2023);
    assert_eq!(rows[1].total_sales, 1_200.0);
    assert_eq!(rows[1].net_profit, 1_200.0);
}

#[test]
fn category_breakdown_groups_by_date_and_redacts_rows() {
    let (conn, t) = setup();
    add(&conn, t, "2024-04-02", Sale, Egg, Some("Large"), Some(100.0), 600.0);
    add(&conn, t, "2024-04-02", Sale, Egg, Some("Small"), Some(100.0), 400.0);
    add(&conn, t, "2024-04-05", Sale, Egg, Some("Large"), Some(200.0), 1_000.0);
    add(&conn, t, "2024-04-05", Purchase, Feed, Some("Calcium grit"), None, 70.0);

    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2024-06-01"));

    let owner = perms(&conn, t, "OWNER");
    let eggs = asm
        .category_breakdown(t, &owner, 2024, 4, BreakdownSelector::Category(Category::Egg))
        .unwrap();
    assert_eq!(eggs.category, "EGG");
    assert_eq!(eggs.total_count, 3);
    assert_eq!(eggs.grouped_by_date.len(), 2);
    assert_eq!(eggs.grouped_by_date[0].total_amount, 1_000.0);
    assert_eq!(eggs.grouped_by_date[1].transactions.len(), 1);
    assert_eq!(eggs.average_price, 5.0);

    // The grit row is filed as FEED but listed under MEDICINE.
    let feed = asm
        .category_breakdown(t, &owner, 2024, 4, "feed".parse().unwrap())
        .unwrap();
    assert_eq!(feed.total_count, 0);
    let meds = asm
        .category_breakdown(t, &owner, 2024, 4, "MEDICINE".parse().unwrap())
        .unwrap();
    assert_eq!(meds.total_count, 1);
    assert_eq!(meds.transactions[0].effective_category, Category::Medicine);
    assert_eq!(meds.transactions[0].transaction.category, Category::Feed);

    let viewer = perms(&conn, t, "VIEWER");
    let hidden = asm
        .category_breakdown(t, &viewer, 2024, 4, BreakdownSelector::Category(Category::Egg))
        .unwrap();
    assert_eq!(hidden.total_count, 3);
    assert!(hidden.transactions.iter().all(|r| r.transaction.amount == 0.0));
    assert_eq!(hidden.average_price, 0.0);
}

#[test]
fn payment_selector_matches_by_type() {
    let (conn, t) = setup();
    add(&conn, t, "2024-04-03", Payment, Egg, None, None, 900.0);
    add(&conn, t, "2024-04-04", Payment, Other, Some("Bank"), None, 100.0);
    let owner = perms(&conn, t, "OWNER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let r = ReportAssembler::new(&store, day("2024-06-01"))
        .category_breakdown(t, &owner, 2024, 4, "payment".parse().unwrap())
        .unwrap();
    assert_eq!(r.category, "PAYMENT");
    assert_eq!(r.total_count, 2);
}

fn sales_with_discount(conn: &Connection, t: i64) {
    add(conn, t, "2023-05-02", Sale, Egg, Some("Large"), Some(100.0), 1_000.0);
    add(conn, t, "2023-05-03", TransactionType::Discount, Egg, None, None, 50.0);
    add(conn, t, "2023-05-04", Purchase, Feed, Some("Layer Mash"), Some(200.0), 300.0);
    add(conn, t, "2023-05-05", Expense, Other, None, None, 100.0);
}

#[test]
fn yearly_report_redacts_each_total_on_its_own_key() {
    let (conn, t) = setup();
    sales_with_discount(&conn, t);
    let viewer = perms(&conn, t, "VIEWER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2024-06-15"));

    // Eggs and profit visible, feed left at the sensitive default.
    sensitivity::upsert(&conn, t, "EGGS_SOLD", false).unwrap();
    sensitivity::upsert(&conn, t, "NET_PROFIT", false).unwrap();
    let rows = asm.yearly(t, &viewer).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_sales, 1_050.0);
    assert_eq!(rows[0].total_expense, 0.0);
    assert_eq!(rows[0].net_profit, 650.0);

    // Now only feed is visible.
    sensitivity::upsert(&conn, t, "EGGS_SOLD", true).unwrap();
    sensitivity::upsert(&conn, t, "FEED_PURCHASED", false).unwrap();
    sensitivity::upsert(&conn, t, "NET_PROFIT", true).unwrap();
    let rows = asm.yearly(t, &viewer).unwrap();
    assert_eq!(rows[0].total_sales, 0.0);
    assert_eq!(rows[0].total_expense, 400.0);
    assert_eq!(rows[0].net_profit, 0.0);
}

#[test]
fn hidden_egg_sales_zero_total_sales_in_every_report() {
    let (conn, t) = setup();
    sales_with_discount(&conn, t);
    let viewer = perms(&conn, t, "VIEWER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2023-05-31"));

    let monthly = asm.monthly(t, &viewer, 2023, 5).unwrap();
    assert_eq!(monthly.total_sales, 0.0);
    // The discount itself is not a protected metric.
    assert_eq!(monthly.summary.discounts, 50.0);

    let yearly = asm.yearly(t, &viewer).unwrap();
    assert_eq!(yearly[0].total_sales, 0.0);

    let trailing = asm.trailing_twelve(t, &viewer).unwrap();
    assert_eq!((trailing[11].year, trailing[11].month), (2023, 5));
    assert_eq!(trailing[11].sales, 0.0);
}

fn egg_price_rows(conn: &Connection, t: i64) {
    add(conn, t, "2024-03-02", Sale, Egg, Some("Large"), Some(100.0), 600.0);
    add(conn, t, "2024-03-20", Sale, Egg, Some("Large"), Some(200.0), 900.0);
    add(conn, t, "2024-03-21", Sale, Egg, Some("Small"), Some(100.0), 400.0);
    add(conn, t, "2024-04-01", Sale, Egg, Some("Large"), Some(50.0), 300.0);
    // No quantity, no price.
    add(conn, t, "2024-04-02", Sale, Egg, Some("Large"), None, 999.0);
    add(conn, t, "2024-04-03", Purchase, Feed, Some("Layer Mash"), Some(10.0), 80.0);
}

#[test]
fn egg_prices_are_monthly_averages_newest_first() {
    let (conn, t) = setup();
    egg_price_rows(&conn, t);
    let owner = perms(&conn, t, "OWNER");
    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2024-06-01"));
    let all = DateRange::inclusive(None, None).unwrap();

    let rows = asm.egg_prices(t, &owner, &all, None).unwrap();
    let keys: Vec<(u32, &str)> = rows.iter().map(|r| (r.month, r.item_name.as_str())).collect();
    assert_eq!(keys, [(4, "Large"), (3, "Large"), (3, "Small")]);
    assert_eq!(rows[0].total_amount, 300.0);
    assert_eq!(rows[0].average_price, 6.0);
    assert_eq!(rows[0].price_date, day("2024-04-01"));
    assert_eq!(rows[1].total_quantity, 300.0);
    assert_eq!(rows[1].average_price, 5.0);

    let small = asm.egg_prices(t, &owner, &all, Some("Small")).unwrap();
    assert_eq!(small.len(), 1);
    assert_eq!(small[0].average_price, 4.0);

    let march = DateRange::inclusive(Some(day("2024-03-01")), Some(day("2024-03-20"))).unwrap();
    let rows = asm.egg_prices(t, &owner, &march, None).unwrap();
    // The Small sale on the 21st falls after the last day.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item_name, "Large");
    assert_eq!(rows[0].total_amount, 1_500.0);
}

#[test]
fn egg_prices_hide_figures_but_keep_rows() {
    let (conn, t) = setup();
    egg_price_rows(&conn, t);
    let store = SqliteStore::from_settings(&conn).unwrap();
    let asm = ReportAssembler::new(&store, day("2024-06-01"));
    let all = DateRange::inclusive(None, None).unwrap();

    let viewer = perms(&conn, t, "VIEWER");
    let rows = asm.egg_prices(t, &viewer, &all, None).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows
        .iter()
        .all(|r| r.total_amount == 0.0 && r.total_quantity == 0.0 && r.average_price == 0.0));

    let other = perms(&conn, t, "OTHER_USER");
    assert!(matches!(
        asm.egg_prices(t, &other, &all, None),
        Err(LedgerError::Forbidden(_))
    ));
}
