// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::models::TenantId;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Rejected input, raised before any query runs.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Tenant hierarchy cycle detected at tenant {tenant} while resolving '{key}'")]
    HierarchyCycle { tenant: TenantId, key: String },

    #[error("Tenant {0} not found")]
    UnknownTenant(TenantId),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
