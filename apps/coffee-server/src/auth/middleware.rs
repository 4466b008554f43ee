// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route permission middleware for Axum.
//!
//! Each protected route gets its own layer carrying the permission it needs:
//!
//! ```rust,ignore
//! let gate = PermissionGate::new(state.guard.clone(), GET_DRINKS);
//! let route = get(list_drinks)
//!     .route_layer(axum::middleware::from_fn_with_state(gate, enforce_permission));
//! ```
//!
//! On success the verified [`TokenPayload`] is stored in the request
//! extensions, where the [`super::Claims`] extractor picks it up. On failure
//! the handler never runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::guard::AuthGuard;
use super::permissions::Permission;
use super::TokenPayload;

/// Middleware state: the shared guard plus this route's requirement.
#[derive(Clone)]
pub struct PermissionGate {
    guard: AuthGuard,
    required: Permission,
}

impl PermissionGate {
    pub fn new(guard: AuthGuard, required: Permission) -> Self {
        Self { guard, required }
    }

    pub fn required(&self) -> Permission {
        self.required
    }
}

/// Authorization middleware function.
pub async fn enforce_permission(
    State(gate): State<PermissionGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.guard.authorize(request.headers(), gate.required).await {
        Ok(payload) => {
            request.extensions_mut().insert::<TokenPayload>(payload);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
