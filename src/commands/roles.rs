// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{RolePermission, TenantId};
use crate::permissions::{default_permissions, normalize_role};
use crate::utils::{id_for_tenant, maybe_print_json, pretty_table, required};
use anyhow::Result;
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("seed", sub)) => seed(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn upsert(conn: &Connection, tenant: TenantId, p: &RolePermission) -> Result<()> {
    let role = normalize_role(&p.role)?;
    conn.execute(
        "INSERT INTO role_permissions(tenant_id, role, can_view_sensitive_data,
             can_edit_transactions, can_approve_transactions, can_manage_users, can_view_charts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(tenant_id, role) DO UPDATE SET
             can_view_sensitive_data=excluded.can_view_sensitive_data,
             can_edit_transactions=excluded.can_edit_transactions,
             can_approve_transactions=excluded.can_approve_transactions,
             can_manage_users=excluded.can_manage_users,
             can_view_charts=excluded.can_view_charts",
        params![
            tenant,
            role,
            p.can_view_sensitive_data,
            p.can_edit_transactions,
            p.can_approve_transactions,
            p.can_manage_users,
            p.can_view_charts
        ],
    )?;
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let p = RolePermission {
        role: normalize_role(required(sub, "role")?)?,
        can_view_sensitive_data: sub.get_flag("view-sensitive"),
        can_edit_transactions: sub.get_flag("edit"),
        can_approve_transactions: sub.get_flag("approve"),
        can_manage_users: sub.get_flag("manage-users"),
        can_view_charts: sub.get_flag("charts"),
    };
    upsert(conn, tenant, &p)?;
    println!("Saved permissions for {}", p.role);
    Ok(())
}

/// Inserts the default roles, leaving rows that already exist untouched.
pub fn seed_defaults(conn: &Connection, tenant: TenantId) -> Result<usize> {
    let mut added = 0;
    for p in default_permissions() {
        added += conn.execute(
            "INSERT OR IGNORE INTO role_permissions(tenant_id, role, can_view_sensitive_data,
                 can_edit_transactions, can_approve_transactions, can_manage_users, can_view_charts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tenant,
                p.role,
                p.can_view_sensitive_data,
                p.can_edit_transactions,
                p.can_approve_transactions,
                p.can_manage_users,
                p.can_view_charts
            ],
        )?;
    }
    Ok(added)
}

fn seed(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tenant = id_for_tenant(conn, required(sub, "tenant")?)?;
    let n = seed_defaults(conn, tenant)?;
    println!("Seeded {} roles", n);
    Ok(())
}

pub fn list_roles(conn: &Connection, tenant: TenantId) -> Result<Vec<RolePermission>> {
    let mut stmt = conn.prepare(
        "SELECT role, can_view_sensitive_data, can_edit_transactions,
                can_approve_transactions, can_manage_users, can_view_charts
         FROM role_permissions WHERE tenant_id=?1 ORDER BY role",
    )?;
    let rows = stmt.query_map(params![tenant], |r| {
        Ok(RolePermission {
            role: r.get(0)?,
            can_view_sensitive_data: r.get(1)?,
            can_edit_transactions: r.get(2)?,
            can_approve_transactions: r.get(3)?,
            can_manage_users: r.get(4)?,
            can_view_charts: r.get(5)?,
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
    let data = list_roles(conn, tenant)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let yn = |b: bool| if b { "yes" } else { "" }.to_string();
        let rows = data
            .iter()
            .map(|p| {
                vec![
                    p.role.clone(),
                    yn(p.can_view_sensitive_data),
                    yn(p.can_edit_transactions),
                    yn(p.can_approve_transactions),
                    yn(p.can_manage_users),
                    yn(p.can_view_charts),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Role", "Sensitive", "Edit", "Approve", "Users", "Charts"],
                rows
            )
        );
    }
    Ok(())
}
