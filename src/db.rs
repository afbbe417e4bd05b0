// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Context;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::AppConfig;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Henledger", "henledger"));

pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("henledger.sqlite"))
}

pub fn db_path(cfg: &AppConfig) -> anyhow::Result<PathBuf> {
    match &cfg.db_path {
        Some(p) => Ok(p.clone()),
        None => default_db_path(),
    }
}

pub fn open_or_init(cfg: &AppConfig) -> anyhow::Result<Connection> {
    let path = db_path(cfg)?;
    open_at(&path, cfg.busy_timeout)
}

pub fn open_at(path: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.busy_timeout(busy_timeout)?;
    init_schema(&conn)?;
    tracing::debug!("database ready at {}", path.display());
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tenants(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parent_id INTEGER REFERENCES tenants(id) ON DELETE CASCADE, -- NULL for roots
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS role_permissions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        can_view_sensitive_data INTEGER NOT NULL DEFAULT 0,
        can_edit_transactions INTEGER NOT NULL DEFAULT 0,
        can_approve_transactions INTEGER NOT NULL DEFAULT 0,
        can_manage_users INTEGER NOT NULL DEFAULT 0,
        can_view_charts INTEGER NOT NULL DEFAULT 1,
        UNIQUE(tenant_id, role),
        FOREIGN KEY(tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS sensitive_data_config(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        data_type TEXT NOT NULL, -- EGGS_SOLD, FEED_PURCHASED, NET_PROFIT, ...
        is_sensitive INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(tenant_id, data_type),
        FOREIGN KEY(tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        transaction_type TEXT NOT NULL CHECK(transaction_type IN
            ('SALE','PURCHASE','PAYMENT','TDS','DISCOUNT','EXPENSE','INCOME')),
        category TEXT NOT NULL CHECK(category IN
            ('EGG','FEED','MEDICINE','OTHER','CHICK','GROWER','MANURE','EMPLOYEE')),
        item_name TEXT,
        quantity REAL,
        unit TEXT,
        rate REAL,
        amount REAL NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_tenant_date ON transactions(tenant_id, date);
    CREATE INDEX IF NOT EXISTS idx_transactions_tenant_category ON transactions(tenant_id, category, date);

    -- Precomputed monthly figures parsed from paper ledgers
    CREATE TABLE IF NOT EXISTS ledger_parses(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL CHECK(month >= 1 AND month <= 12),
        total_eggs REAL,
        total_feeds REAL,
        total_medicines REAL,
        net_profit REAL,
        parsed_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(tenant_id, year, month),
        FOREIGN KEY(tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS ledger_breakdowns(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ledger_parse_id INTEGER NOT NULL,
        breakdown_type TEXT NOT NULL,
        quantity REAL NOT NULL DEFAULT 0,
        amount REAL,
        FOREIGN KEY(ledger_parse_id) REFERENCES ledger_parses(id) ON DELETE CASCADE
    );
    "#,
    )
}

pub fn get_setting(conn: &Connection, key: &str) -> crate::error::Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> crate::error::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn clear_setting(conn: &Connection, key: &str) -> crate::error::Result<()> {
    conn.execute("DELETE FROM settings WHERE key=?1", params![key])?;
    Ok(())
}
