// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use henledger::commands::{importer, tenants};
use henledger::{cli, db};
use rusqlite::Connection;
use std::io::Write;
use tempfile::NamedTempFile;

fn base_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    tenants::create_tenant(&conn, "Hilltop", None).unwrap();
    conn
}

fn csv_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", body).unwrap();
    file.flush().unwrap();
    file
}

fn run_import(conn: &mut Connection, path: &str) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from([
        "henledger",
        "import",
        "transactions",
        "--tenant",
        "Hilltop",
        "--path",
        path,
    ]);
    if let Some(("import", import_m)) = matches.subcommand() {
        importer::handle(conn, import_m)
    } else {
        panic!("no import subcommand");
    }
}

fn count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn imports_rows_with_optional_columns() {
    let mut conn = base_conn();
    let file = csv_file(
        "date,type,category,item,quantity,unit,rate,amount,notes\n\
         2024-01-03,sale,egg,Large,9300,pcs,10.75,100000,\n\
         2024-01-04,PURCHASE,FEED,Layer Mash,31000,kg,,40000,truck 2\n\
         2024-01-31,payment,egg,,,,,70000,\n",
    );
    let padded = format!("  {}  ", file.path().to_str().unwrap());
    run_import(&mut conn, &padded).unwrap();
    assert_eq!(count(&conn), 3);

    type Row = (Option<String>, Option<f64>, Option<String>, Option<String>);
    let (item, qty, unit, notes): Row = conn
        .query_row(
            "SELECT item_name, quantity, unit, notes FROM transactions WHERE category='FEED'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(item.as_deref(), Some("Layer Mash"));
    assert_eq!(qty, Some(31_000.0));
    assert_eq!(unit.as_deref(), Some("kg"));
    assert_eq!(notes.as_deref(), Some("truck 2"));

    let payment_item: Option<String> = conn
        .query_row(
            "SELECT item_name FROM transactions WHERE transaction_type='PAYMENT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(payment_item, None);
}

#[test]
fn bad_row_rolls_back_the_whole_file() {
    let mut conn = base_conn();
    let file = csv_file(
        "date,type,category,item,quantity,unit,rate,amount,notes\n\
         2024-01-03,SALE,EGG,Large,10,,,100,\n\
         2024-01-04,PURCHASE,POULTRY,Mash,10,,,40,\n",
    );
    let err = run_import(&mut conn, file.path().to_str().unwrap()).unwrap_err();
    assert!(format!("{:#}", err).contains("unknown category"));
    assert_eq!(count(&conn), 0);
}

#[test]
fn invalid_amount_mentions_the_line() {
    let mut conn = base_conn();
    let file = csv_file(
        "date,type,category,item,quantity,unit,rate,amount,notes\n\
         2024-01-03,SALE,EGG,Large,10,,,ten,\n",
    );
    let err = run_import(&mut conn, file.path().to_str().unwrap()).unwrap_err();
    assert!(format!("{:#}", err).contains("line 2"), "{:#}", err);
    assert_eq!(count(&conn), 0);
}

#[test]
fn unknown_tenant_is_rejected() {
    let mut conn = base_conn();
    let file = csv_file("date,type,category,item,quantity,unit,rate,amount,notes\n");
    let matches = cli::build_cli().get_matches_from([
        "henledger",
        "import",
        "transactions",
        "--tenant",
        "Nowhere",
        "--path",
        file.path().to_str().unwrap(),
    ]);
    let Some(("import", import_m)) = matches.subcommand() else {
        panic!("no import subcommand");
    };
    let err = importer::handle(&mut conn, import_m).unwrap_err();
    assert!(err.to_string().contains("Tenant 'Nowhere' not found"));
}
