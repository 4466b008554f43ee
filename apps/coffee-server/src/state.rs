// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthGuard;
use crate::storage::DrinkDatabase;

#[derive(Clone)]
pub struct AppState {
    pub drinks: Arc<DrinkDatabase>,
    pub guard: AuthGuard,
}

impl AppState {
    pub fn new(drinks: DrinkDatabase, guard: AuthGuard) -> Self {
        Self {
            drinks: Arc::new(drinks),
            guard,
        }
    }
}
