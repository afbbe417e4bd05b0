// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{ItemClassifier, KEYWORDS_SETTING};
use crate::db;
use crate::utils::{maybe_print_json, pretty_table, required};
use anyhow::{bail, Result};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("set", sub)) => set(conn, sub)?,
        Some(("reset", _)) => {
            db::clear_setting(conn, KEYWORDS_SETTING)?;
            println!("Medicine keywords reset to the built-in list");
        }
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let classifier = ItemClassifier::from_settings(conn)?;
    let data = classifier.keywords();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data.iter().map(|k| vec![k.clone()]).collect();
        println!("{}", pretty_table(&["Keyword"], rows));
    }
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let classifier = ItemClassifier::with_keywords(required(sub, "keywords")?.split(','));
    if classifier.keywords().is_empty() {
        bail!("Keyword list is empty; use 'keywords reset' to restore the defaults");
    }
    classifier.save_to_settings(conn)?;
    println!("Saved {} medicine keywords", classifier.keywords().len());
    Ok(())
}
