// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Corrects FEED ledger rows that are really medicine purchases.
//!
//! Suppliers bill supplements, grit and drugs on the same invoice as feed, so
//! entry clerks routinely file them under FEED. Aggregation treats any FEED
//! row whose item name contains one of the keywords below as MEDICINE.

use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::models::Category;

pub const KEYWORDS_SETTING: &str = "medicine_keywords";

pub const DEFAULT_MEDICINE_KEYWORDS: &[&str] = &[
    "D3",
    "VETMULIN",
    "OXYCYCLINE",
    "TIAZIN",
    "BPPS",
    "CTC",
    "SHELL GRIT",
    "ROVIMIX",
    "CHOLIMARIN",
    "ZAGROMIN",
    "G PRO NATURO",
    "NECROVET",
    "TOXOL",
    "FRA C12",
    "FRA C 12",
    "CALCI",
    "CALDLIV",
    "RESPAFEED",
    "VENTRIM",
    "VITAL",
    "MEDICINE",
    "MEDIC",
    "VITAMIN",
    "SUPPLEMENT",
    "GRIT",
    "VET",
    "NECRO",
    "TOX",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemClassifier {
    keywords: Vec<String>,
}

impl Default for ItemClassifier {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_MEDICINE_KEYWORDS.iter().copied())
    }
}

impl ItemClassifier {
    /// Keywords are trimmed and uppercased; blanks and repeats are dropped.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for k in keywords {
            let k = k.as_ref().trim().to_uppercase();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        ItemClassifier { keywords: out }
    }

    /// Loads the keyword set from the `settings` table, falling back to the
    /// built-in list when no override is stored.
    pub fn from_settings(conn: &Connection) -> Result<Self> {
        match db::get_setting(conn, KEYWORDS_SETTING)? {
            Some(raw) => Ok(Self::with_keywords(raw.split(','))),
            None => Ok(Self::default()),
        }
    }

    pub fn save_to_settings(&self, conn: &Connection) -> Result<()> {
        db::set_setting(conn, KEYWORDS_SETTING, &self.keywords.join(","))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword contained in `item_name`, compared case-insensitively.
    pub fn matching_keyword(&self, item_name: &str) -> Option<&str> {
        let upper = item_name.to_uppercase();
        self.keywords
            .iter()
            .find(|k| upper.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn is_medicine_item(&self, item_name: &str) -> bool {
        self.matching_keyword(item_name).is_some()
    }

    /// Effective category used by aggregation. Only FEED rows are ever
    /// reclassified; every other category passes through.
    pub fn classify(&self, category: Category, item_name: Option<&str>) -> Category {
        match (category, item_name) {
            (Category::Feed, Some(name)) if self.is_medicine_item(name) => Category::Medicine,
            _ => category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_rows_with_keywords_become_medicine() {
        let c = ItemClassifier::default();
        assert_eq!(
            c.classify(Category::Feed, Some("vetmulin tablets")),
            Category::Medicine
        );
        assert_eq!(
            c.classify(Category::Feed, Some("VETMULIN TABLETS")),
            Category::Medicine
        );
        assert_eq!(c.classify(Category::Feed, Some("Layer Mash")), Category::Feed);
        assert_eq!(c.classify(Category::Feed, None), Category::Feed);
    }

    #[test]
    fn classification_is_repeatable() {
        let c = ItemClassifier::default();
        for cat in Category::ALL {
            for item in [None, Some("Shell Grit 25kg"), Some("Pre-lay mash")] {
                assert_eq!(c.classify(cat, item), c.classify(cat, item));
            }
        }
    }

    #[test]
    fn other_categories_pass_through() {
        let c = ItemClassifier::default();
        assert_eq!(c.classify(Category::Egg, Some("VET SPECIAL LARGE")), Category::Egg);
        assert_eq!(c.classify(Category::Chick, Some("Vitamin pack")), Category::Chick);
    }

    #[test]
    fn custom_keywords_are_normalized() {
        let c = ItemClassifier::with_keywords([" dewormer ", "DEWORMER", "", "zinc"]);
        assert_eq!(c.keywords(), ["DEWORMER", "ZINC"]);
        assert_eq!(c.matching_keyword("Dewormer 1L"), Some("DEWORMER"));
        assert!(!c.is_medicine_item("Layer mash"));
    }
}
