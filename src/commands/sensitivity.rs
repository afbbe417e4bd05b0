// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{SensitivityEntry, TenantId};
use crate::permissions::permissions_for;
use crate::sensitivity::{normalize_key, Resolution, SensitivityResolver};
use crate::store::SqliteStore;
use crate::utils::{id_for_tenant, maybe_print_json, parse_bool, pretty_table, required};
use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("unset", sub)) => unset(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("check", sub)) => check(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn upsert(conn: &Connection, tenant: TenantId, key: &str, sensitive: bool) -> Result<()> {
    let key = normalize_key(key)?;
    conn.execute(
        "INSERT INTO sensitive_data_config(tenant_id, data_type, is_sensitive)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(tenant_id, data_type)
         DO UPDATE SET is_sensitive=excluded.is_sensitive, updated_at=datetime('now')",
        params![tenant, key, sensitive],
    )?;
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant_name = required(sub, "tenant")?;
    let tenant = id_for_tenant(conn, tenant_name)?;
    let key = required(sub, "key")?;
    let sensitive = parse_bool(required(sub, "sensitive")?)?;
    upsert(conn, tenant, key, sensitive)?;
    println!(
        "{} is {} for '{}'",
        normalize_key(key)?,
        if sensitive { "sensitive" } else { "not sensitive" },
        tenant_name.trim()
    );
    Ok(())
}

fn unset(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let key = normalize_key(required(sub, "key")?)?;
    let n = conn.execute(
        "DELETE FROM sensitive_data_config WHERE tenant_id=?1 AND data_type=?2",
        params![tenant, key],
    )?;
    if n == 0 {
        println!("No own setting for {}; nothing removed", key);
    } else {
        println!("Removed {}; the value is inherited again", key);
    }
    Ok(())
}

pub fn entries(conn: &Connection, tenant: TenantId) -> Result<Vec<SensitivityEntry>> {
    let mut stmt = conn.prepare(
        "SELECT tenant_id, data_type, is_sensitive FROM sensitive_data_config
         WHERE tenant_id=?1 ORDER BY data_type",
    )?;
    let rows = stmt.query_map(params![tenant], |r| {
        Ok(SensitivityEntry {
            tenant_id: r.get(0)?,
            data_type: r.get(1)?,
            is_sensitive: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let data = entries(conn, tenant)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|e| vec![e.data_type.clone(), e.is_sensitive.to_string()])
            .collect();
        println!("{}", pretty_table(&["Data type", "Sensitive"], rows));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub key: String,
    #[serde(flatten)]
    pub resolution: Resolution,
    pub decided_by_name: Option<String>,
    /// Present when a role was given.
    pub hidden_for_role: Option<bool>,
}

pub fn check_key(
    conn: &Connection,
    tenant: TenantId,
    key: &str,
    role: Option<&str>,
) -> Result<CheckResult> {
    let store = SqliteStore::from_settings(conn)?;
    let resolver = SensitivityResolver::new(&store);
    let key = normalize_key(key)?;
    let resolution = resolver.resolve_with_source(tenant, &key)?;
    let decided_by_name = match resolution.decided_by {
        Some(id) => Some(conn.query_row(
            "SELECT name FROM tenants WHERE id=?1",
            params![id],
            |r| r.get::<_, String>(0),
        )?),
        None => None,
    };
    let hidden_for_role = match role {
        Some(r) => {
            let perms = permissions_for(&store, tenant, r)?;
            Some(resolver.should_redact(tenant, &key, perms.can_view_sensitive_data)?)
        }
        None => None,
    };
    Ok(CheckResult {
        key,
        resolution,
        decided_by_name,
        hidden_for_role,
    })
}

fn check(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let role = sub.get_one::<String>("role").map(|s| s.as_str());
    let res = check_key(conn, tenant, required(sub, "key")?, role)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &res)? {
        let mut rows = vec![
            vec!["Key".to_string(), res.key.clone()],
            vec![
                "Sensitive".to_string(),
                res.resolution.is_sensitive.to_string(),
            ],
            vec![
                "Decided by".to_string(),
                res.decided_by_name
                    .clone()
                    .unwrap_or_else(|| "default".to_string()),
            ],
        ];
        if let Some(h) = res.hidden_for_role {
            rows.push(vec!["Hidden for role".to_string(), h.to_string()]);
        }
        println!("{}", pretty_table(&["Field", "Value"], rows));
    }
    Ok(())
}
