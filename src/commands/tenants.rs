// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Tenant, TenantId};
use crate::utils::{id_for_tenant, maybe_print_json, pretty_table, required};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("move", sub)) => move_tenant(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = required(sub, "name")?.trim();
    let parent = sub.get_one::<String>("parent").map(|p| p.trim());
    let id = create_tenant(conn, name, parent)?;
    match parent {
        Some(p) => println!("Added tenant '{}' (id {}) under '{}'", name, id, p),
        None => println!("Added tenant '{}' (id {})", name, id),
    }
    Ok(())
}

pub fn create_tenant(conn: &Connection, name: &str, parent: Option<&str>) -> Result<TenantId> {
    if name.is_empty() {
        bail!("Tenant name must not be empty");
    }
    let parent_id = parent.map(|p| id_for_tenant(conn, p)).transpose()?;
    conn.execute(
        "INSERT INTO tenants(name, parent_id) VALUES (?1, ?2)",
        params![name, parent_id],
    )
    .with_context(|| format!("Insert tenant '{}'", name))?;
    Ok(conn.last_insert_rowid())
}

fn move_tenant(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = required(sub, "name")?;
    let parent = sub.get_one::<String>("parent");
    let id = id_for_tenant(conn, name)?;
    let parent_id = parent.map(|p| id_for_tenant(conn, p)).transpose()?;
    set_parent(conn, id, parent_id)?;
    match parent {
        Some(p) => println!("Moved '{}' under '{}'", name.trim(), p.trim()),
        None => println!("'{}' is now a root tenant", name.trim()),
    }
    Ok(())
}

/// Re-parents `tenant`, refusing links that would close a cycle.
pub fn set_parent(conn: &Connection, tenant: TenantId, parent: Option<TenantId>) -> Result<()> {
    if let Some(p) = parent {
        if ancestors_of(conn, p)?.contains(&tenant) {
            bail!("Moving tenant {} under {} would create a cycle", tenant, p);
        }
    }
    conn.execute(
        "UPDATE tenants SET parent_id=?1 WHERE id=?2",
        params![parent, tenant],
    )?;
    Ok(())
}

/// `start` followed by every ancestor. Stops early on an existing cycle.
pub fn ancestors_of(conn: &Connection, start: TenantId) -> Result<Vec<TenantId>> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut current = Some(start);
    while let Some(id) = current {
        if !seen.insert(id) {
            break;
        }
        chain.push(id);
        current = conn
            .query_row(
                "SELECT parent_id FROM tenants WHERE id=?1",
                params![id],
                |r| r.get::<_, Option<TenantId>>(0),
            )
            .optional()?
            .flatten();
    }
    Ok(chain)
}

pub fn list_tenants(conn: &Connection) -> Result<Vec<Tenant>> {
    let mut stmt = conn.prepare("SELECT id, parent_id, name FROM tenants ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(Tenant {
            id: r.get(0)?,
            parent_id: r.get(1)?,
            name: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = list_tenants(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|t| {
                let parent = t
                    .parent_id
                    .and_then(|p| data.iter().find(|o| o.id == p))
                    .map(|o| o.name.clone())
                    .unwrap_or_default();
                vec![t.id.to_string(), t.name.clone(), parent]
            })
            .collect();
        println!("{}", pretty_table(&["ID", "Name", "Parent"], rows));
    }
    Ok(())
}
