// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission requirements and enforcement.

use super::{AuthError, TokenPayload};

/// A capability string a protected operation requires, e.g. `get:drinks`.
///
/// Declared statically per route; never derived from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission(&'static str);

impl Permission {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// List drinks (short view).
pub const GET_DRINKS: Permission = Permission::new("get:drinks");
/// List drinks with full recipes.
pub const GET_DRINKS_DETAIL: Permission = Permission::new("get:drinks-detail");
pub const POST_DRINKS: Permission = Permission::new("post:drinks");
pub const PATCH_DRINKS: Permission = Permission::new("patch:drinks");
pub const DELETE_DRINKS: Permission = Permission::new("delete:drinks");

/// Confirm `required` is among the payload's granted permissions.
///
/// A token with no `permissions` claim at all is reported separately from one
/// that is scoped but lacks this permission.
pub fn check(payload: &TokenPayload, required: Permission) -> Result<(), AuthError> {
    let granted = payload
        .permissions()
        .ok_or(AuthError::PermissionsClaimMissing)?;

    if granted.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}
