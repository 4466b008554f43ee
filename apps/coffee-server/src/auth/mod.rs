// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Bearer-token authorization for the drink API. Tokens are issued by an
//! external identity provider (Auth0-style) and only verified here.
//!
//! ## Request Flow
//!
//! 1. Client sends `Authorization: Bearer <JWT>`
//! 2. `extractor` checks the header shape and pulls out the token
//! 3. `verifier` decodes the header, checks the algorithm, finds the signing
//!    key by `kid` in the `jwks` cache, verifies the signature, then checks
//!    `exp`, `aud` and `iss`
//! 4. `permissions` checks the route's required permission against the
//!    token's `permissions` claim
//! 5. The handler runs with the verified `TokenPayload`
//!
//! `guard` composes steps 2 to 4; `middleware` attaches it per route.
//!
//! ## Security
//!
//! - Only the configured asymmetric algorithm is accepted (`none` and HMAC never)
//! - JWKS is fetched over HTTPS and cached with a TTL, refreshed on unknown `kid`
//!   at most once per minimum refresh interval
//! - No clock skew tolerance on `exp`
//! - Error responses carry a code and a generic message, never token contents

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod jwks;
pub mod middleware;
pub mod permissions;
pub mod verifier;

pub use claims::TokenPayload;
pub use error::AuthError;
pub use extractor::{extract_bearer, BearerToken, Claims};
pub use guard::AuthGuard;
pub use jwks::{HttpKeySource, KeySetCache, KeySource, SigningKeySet};
pub use middleware::{enforce_permission, PermissionGate};
pub use permissions::Permission;
pub use verifier::{TokenHeader, TokenVerifier};
