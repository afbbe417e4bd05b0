// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::ItemClassifier;
use crate::commands::tenants::{ancestors_of, list_tenants};
use crate::models::TenantId;
use crate::utils::{id_for_tenant, pretty_table};
use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub issue: &'static str,
    pub detail: String,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let tenant = m
        .get_one::<String>("tenant")
        .map(|t| id_for_tenant(conn, t))
        .transpose()?;
    let findings = diagnose(conn, tenant)?;
    if findings.is_empty() {
        println!("doctor: no issues found");
    } else {
        let rows = findings
            .into_iter()
            .map(|f| vec![f.issue.to_string(), f.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Read-only audit; nothing is rewritten.
pub fn diagnose(conn: &Connection, tenant: Option<TenantId>) -> Result<Vec<Finding>> {
    let mut out = misfiled_medicine(conn, tenant)?;
    out.extend(tenant_cycles(conn)?);
    Ok(out)
}

// 1) FEED rows the classifier counts as medicine
fn misfiled_medicine(conn: &Connection, tenant: Option<TenantId>) -> Result<Vec<Finding>> {
    let classifier = ItemClassifier::from_settings(conn)?;
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, n.name, t.item_name, t.amount
         FROM transactions t JOIN tenants n ON n.id = t.tenant_id
         WHERE t.category = 'FEED' AND t.item_name IS NOT NULL
           AND (?1 IS NULL OR t.tenant_id = ?1)
         ORDER BY t.date, t.id",
    )?;
    let mut cur = stmt.query(params![tenant])?;
    let mut out = Vec::new();
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let tenant_name: String = r.get(2)?;
        let item: String = r.get(3)?;
        let amount: f64 = r.get(4)?;
        if let Some(kw) = classifier.matching_keyword(&item) {
            out.push(Finding {
                issue: "feed_row_is_medicine",
                detail: format!(
                    "#{} {} {} '{}' {:.2} (keyword {})",
                    id, date, tenant_name, item, amount, kw
                ),
            });
        }
    }
    Ok(out)
}

// 2) Parent links that loop back
fn tenant_cycles(conn: &Connection) -> Result<Vec<Finding>> {
    let tenants = list_tenants(conn)?;
    let mut reported: HashSet<TenantId> = HashSet::new();
    let mut out = Vec::new();
    for t in &tenants {
        let chain = ancestors_of(conn, t.id)?;
        let Some(&last) = chain.last() else { continue };
        let parent_of_last = tenants
            .iter()
            .find(|o| o.id == last)
            .and_then(|o| o.parent_id);
        let Some(loop_start) = parent_of_last.filter(|p| chain.contains(p)) else {
            continue;
        };
        // Only report each loop once, keyed by its smallest member.
        let pos = chain.iter().position(|id| *id == loop_start).unwrap_or(0);
        let members = &chain[pos..];
        let key = members.iter().copied().min().unwrap_or(loop_start);
        if reported.insert(key) {
            let names: Vec<String> = members
                .iter()
                .filter_map(|id| tenants.iter().find(|o| o.id == *id))
                .map(|o| o.name.clone())
                .collect();
            out.push(Finding {
                issue: "tenant_cycle",
                detail: names.join(" -> "),
            });
        }
    }
    Ok(out)
}
