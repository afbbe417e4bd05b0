// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Hierarchical "is this metric sensitive?" lookup.
//!
//! A tenant inherits its parent's setting for any data type it does not
//! configure itself. Data types nobody in the chain has configured are
//! treated as sensitive.

use serde::Serialize;
use std::collections::HashSet;

use crate::error::{LedgerError, Result};
use crate::models::TenantId;
use crate::store::SensitivityStore;

pub const EGGS_SOLD: &str = "EGGS_SOLD";
pub const FEED_PURCHASED: &str = "FEED_PURCHASED";
pub const NET_PROFIT: &str = "NET_PROFIT";

/// Canonical spelling of a data-type key.
pub fn normalize_key(key: &str) -> Result<String> {
    let k = key.trim().to_uppercase();
    if k.is_empty() {
        return Err(LedgerError::Validation("data type key is empty".into()));
    }
    Ok(k)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub is_sensitive: bool,
    /// Tenant whose row decided the outcome; `None` for the fallback default.
    pub decided_by: Option<TenantId>,
}

pub struct SensitivityResolver<'a, S: SensitivityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SensitivityStore + ?Sized> SensitivityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        SensitivityResolver { store }
    }

    pub fn resolve(&self, tenant: TenantId, key: &str) -> Result<bool> {
        Ok(self.resolve_with_source(tenant, key)?.is_sensitive)
    }

    pub fn resolve_with_source(&self, tenant: TenantId, key: &str) -> Result<Resolution> {
        let key = normalize_key(key)?;
        let mut visited = HashSet::new();
        let mut current = tenant;
        loop {
            if !visited.insert(current) {
                return Err(LedgerError::HierarchyCycle {
                    tenant: current,
                    key,
                });
            }
            if let Some(is_sensitive) = self.store.get_config(current, &key)? {
                tracing::trace!(
                    tenant,
                    decided_by = current,
                    %key,
                    is_sensitive,
                    "sensitivity resolved"
                );
                return Ok(Resolution {
                    is_sensitive,
                    decided_by: Some(current),
                });
            }
            match self.store.get_parent(current)? {
                Some(parent) => current = parent,
                None => {
                    tracing::trace!(
                        tenant,
                        %key,
                        "no sensitivity config in chain; defaulting to sensitive"
                    );
                    return Ok(Resolution {
                        is_sensitive: true,
                        decided_by: None,
                    });
                }
            }
        }
    }

    pub fn should_redact(
        &self,
        tenant: TenantId,
        key: &str,
        viewer_can_view_sensitive: bool,
    ) -> Result<bool> {
        if viewer_can_view_sensitive {
            return Ok(false);
        }
        self.resolve(tenant, key)
    }
}
