// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Drinks live in a single embedded redb file (`DATABASE_PATH`). Handlers call
//! [`DrinkDatabase`] directly; each operation is one redb transaction.

pub mod drinks;

pub use drinks::{DrinkDatabase, StoreError, StoreResult};
