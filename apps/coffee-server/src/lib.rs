// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coffee Shop Server - drink menu API behind bearer-token authorization
//!
//! Tokens are issued by an external identity provider and verified here
//! against its published key set. Each route requires one permission string
//! from the token's `permissions` claim.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification and per-route permission enforcement
//! - `config` - Environment configuration
//! - `storage` - Embedded drink database (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
