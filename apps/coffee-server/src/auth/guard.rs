// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization guard: extract → verify → enforce.

use std::future::Future;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, warn};

use super::extractor::extract_bearer;
use super::jwks::KeySetCache;
use super::permissions::{self, Permission};
use super::verifier::TokenVerifier;
use super::{AuthError, TokenPayload};

/// Composed entry point for protected operations.
///
/// Cheap to clone; all clones share one key cache. The guard holds no state
/// of its own and never retries: the only retry is the key cache's forced
/// refresh on an unknown key identifier.
#[derive(Clone)]
pub struct AuthGuard {
    keys: KeySetCache,
    verifier: Arc<TokenVerifier>,
}

impl AuthGuard {
    pub fn new(keys: KeySetCache, verifier: TokenVerifier) -> Self {
        Self {
            keys,
            verifier: Arc::new(verifier),
        }
    }

    pub fn keys(&self) -> &KeySetCache {
        &self.keys
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Extract and verify the request's token without a permission requirement.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<TokenPayload, AuthError> {
        let token = extract_bearer(headers)?;
        let header = self.verifier.inspect_header(&token)?;
        let keys = self.keys.keys_for(&header.key_id).await?;
        self.verifier.verify(&token, &keys)
    }

    /// Authenticate, then require `required`.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required: Permission,
    ) -> Result<TokenPayload, AuthError> {
        let result = match self.authenticate(headers).await {
            Ok(payload) => permissions::check(&payload, required).map(|()| payload),
            Err(e) => Err(e),
        };

        match &result {
            Ok(payload) => debug!(
                subject = payload.subject(),
                permission = %required,
                "Request authorized"
            ),
            Err(e) => warn!(
                code = e.error_code(),
                permission = %required,
                "Request rejected"
            ),
        }
        result
    }

    /// Run `operation` only if the request carries `required`.
    ///
    /// The operation receives the verified payload. On any failure it is not
    /// invoked and the failure is returned as-is.
    pub async fn invoke<F, Fut, T>(
        &self,
        headers: &HeaderMap,
        required: Permission,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(TokenPayload) -> Fut,
        Fut: Future<Output = T>,
    {
        let payload = self.authorize(headers, required).await?;
        Ok(operation(payload).await)
    }
}
