// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT verification against a signing key set.
//!
//! Order of checks:
//!
//! 1. Three segments, decodable header carrying `alg` and `kid`
//! 2. Declared algorithm equals the configured one (before any key lookup)
//! 3. `kid` present in the key set
//! 4. Signature verifies with that key
//! 5. `exp` strictly in the future, expected audience present, issuer equal
//!
//! No leeway is applied to `exp`. A [`TokenPayload`] is returned only when
//! every step passes.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use tracing::debug;

use super::claims::{RawClaims, TokenPayload};
use super::error::AuthError;
use super::extractor::BearerToken;
use super::jwks::SigningKeySet;

/// Decoded first segment of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub algorithm: Algorithm,
    pub key_id: String,
}

/// Verifies tokens for one audience, issuer and algorithm.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    audience: String,
    issuer: String,
    algorithm: Algorithm,
}

impl TokenVerifier {
    pub fn new(
        audience: impl Into<String>,
        issuer: impl Into<String>,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
            algorithm,
        }
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Decode the header and check the declared algorithm.
    ///
    /// Cheap and key-independent, so callers can learn the `kid` before
    /// consulting the key cache.
    pub fn inspect_header(&self, token: &BearerToken) -> Result<TokenHeader, AuthError> {
        let raw = token.as_str();
        if raw.split('.').count() != 3 {
            return Err(AuthError::TokenMalformed);
        }

        let header = decode_header(raw).map_err(|e| {
            debug!(error = %e, "Token header could not be decoded");
            AuthError::TokenMalformed
        })?;

        if header.alg != self.algorithm {
            debug!(declared = ?header.alg, expected = ?self.algorithm, "Token algorithm rejected");
            return Err(AuthError::TokenMalformed);
        }

        let key_id = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthError::TokenMalformed)?;

        Ok(TokenHeader {
            algorithm: header.alg,
            key_id,
        })
    }

    /// Verify `token` against `keys` at the current time.
    pub fn verify(
        &self,
        token: &BearerToken,
        keys: &SigningKeySet,
    ) -> Result<TokenPayload, AuthError> {
        self.verify_at(token, keys, chrono::Utc::now().timestamp())
    }

    /// Verify `token` against `keys` as of the Unix timestamp `now`.
    pub fn verify_at(
        &self,
        token: &BearerToken,
        keys: &SigningKeySet,
        now: i64,
    ) -> Result<TokenPayload, AuthError> {
        let header = self.inspect_header(token)?;

        let signing_key = keys.get(&header.key_id).ok_or(AuthError::KeyNotFound)?;
        if signing_key
            .algorithm
            .is_some_and(|declared| declared != self.algorithm)
        {
            debug!(kid = %header.key_id, "Matched key is registered for a different algorithm");
            return Err(AuthError::KeyNotFound);
        }

        // Signature only; claims are checked below so each failure keeps its own kind.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<RawClaims>(token.as_str(), &signing_key.key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidRsaKey(_)
                | ErrorKind::InvalidEcdsaKey
                | ErrorKind::InvalidKeyFormat => AuthError::SignatureInvalid,
                _ => {
                    debug!(error = %e, "Token rejected while decoding");
                    AuthError::TokenMalformed
                }
            })?
            .claims;

        self.check_claims(claims, now)
    }

    fn check_claims(&self, claims: RawClaims, now: i64) -> Result<TokenPayload, AuthError> {
        let expires_at = claims.exp.ok_or(AuthError::TokenMalformed)?;
        if expires_at <= now as f64 {
            return Err(AuthError::TokenExpired);
        }

        let audience = claims.aud.map(|aud| aud.into_set()).unwrap_or_default();
        if !audience.contains(&self.audience) {
            return Err(AuthError::AudienceInvalid);
        }

        let issuer = claims.iss.ok_or(AuthError::IssuerInvalid)?;
        if issuer != self.issuer {
            return Err(AuthError::IssuerInvalid);
        }

        let subject = claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(AuthError::TokenMalformed)?;

        Ok(TokenPayload::from_verified(
            subject,
            issuer,
            audience,
            expires_at.floor() as i64,
            claims.iat.map(|iat| iat.floor() as i64),
            claims.permissions,
        ))
    }
}
