// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{LedgerError, Result};
use crate::models::{RolePermission, TenantId};
use crate::store::PermissionStore;

/// Role rows seeded for a new tenant:
/// (role, sensitive, edit, approve, manage users, charts).
pub const DEFAULT_ROLES: &[(&str, bool, bool, bool, bool, bool)] = &[
    ("ADMIN", true, true, true, true, true),
    ("OWNER", true, true, true, true, true),
    ("CO_OWNER", true, true, true, true, true),
    ("MANAGER", true, true, false, false, true),
    ("AUDITOR", true, false, false, false, true),
    ("OTHER_USER", false, true, false, false, false),
];

pub fn normalize_role(role: &str) -> Result<String> {
    let r = role.trim().to_uppercase();
    if r.is_empty() {
        return Err(LedgerError::Validation("role is empty".into()));
    }
    Ok(r)
}

pub fn default_permissions() -> Vec<RolePermission> {
    DEFAULT_ROLES
        .iter()
        .map(
            |&(role, sensitive, edit, approve, manage, charts)| RolePermission {
                role: role.to_string(),
                can_view_sensitive_data: sensitive,
                can_edit_transactions: edit,
                can_approve_transactions: approve,
                can_manage_users: manage,
                can_view_charts: charts,
            },
        )
        .collect()
}

/// Effective permissions of `role` in `tenant`. A role without a row gets
/// nothing, which also denies every report.
pub fn permissions_for<S: PermissionStore + ?Sized>(
    store: &S,
    tenant: TenantId,
    role: &str,
) -> Result<RolePermission> {
    let role = normalize_role(role)?;
    match store.role_permissions(tenant, &role)? {
        Some(p) => Ok(p),
        None => {
            tracing::debug!(tenant, %role, "no role_permissions row; denying all");
            Ok(RolePermission::none(&role))
        }
    }
}
