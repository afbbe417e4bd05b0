// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Process configuration, read once from the environment by the binary.
/// Library code takes an `&AppConfig` or plain values instead of this global.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `HENLEDGER_DB`; platform data dir when unset.
    pub db_path: Option<PathBuf>,
    /// `HENLEDGER_LOG`, an `EnvFilter` directive.
    pub log_filter: String,
    /// `HENLEDGER_BUSY_TIMEOUT_MS`
    pub busy_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = AppConfig::default();
        if let Some(p) = lookup("HENLEDGER_DB").filter(|s| !s.trim().is_empty()) {
            cfg.db_path = Some(PathBuf::from(p.trim()));
        }
        if let Some(f) = lookup("HENLEDGER_LOG").filter(|s| !s.trim().is_empty()) {
            cfg.log_filter = f.trim().to_string();
        }
        if let Some(v) = lookup("HENLEDGER_BUSY_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) => cfg.busy_timeout = Duration::from_millis(ms),
                Err(_) => eprintln!(
                    "Ignoring HENLEDGER_BUSY_TIMEOUT_MS='{}': not a number of milliseconds",
                    v
                ),
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.log_filter, "warn");
        assert_eq!(cfg.busy_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("HENLEDGER_DB", " /tmp/farm.sqlite "),
            ("HENLEDGER_LOG", "henledger=debug"),
            ("HENLEDGER_BUSY_TIMEOUT_MS", "soon"),
        ]));
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/farm.sqlite")));
        assert_eq!(cfg.log_filter, "henledger=debug");
        assert_eq!(cfg.busy_timeout, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS));
    }
}
