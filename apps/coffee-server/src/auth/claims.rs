// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified payload handed to handlers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Claims as they appear on the wire.
///
/// Every field is optional so that a missing claim surfaces as the specific
/// verification failure for that claim rather than a generic decode error.
/// Only [`super::verifier::TokenVerifier`] reads this type, and only after the
/// signature has been checked.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,
    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience, a single string or an array
    #[serde(default)]
    pub aud: Option<Audience>,
    /// Expiration time, a NumericDate (seconds, possibly fractional)
    #[serde(default)]
    pub exp: Option<f64>,
    /// Issued at, a NumericDate
    #[serde(default)]
    pub iat: Option<f64>,
    /// Granted permissions (RBAC claim added by the identity provider)
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// The `aud` claim may be a bare string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            Audience::One(aud) => BTreeSet::from([aud]),
            Audience::Many(auds) => auds.into_iter().collect(),
        }
    }
}

/// Verified token claims.
///
/// This is the authenticated context for a request. There is no public
/// constructor and no `Deserialize` impl: a value of this type only exists
/// once the signature, expiry, audience and issuer have all been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPayload {
    subject: String,
    issuer: String,
    audience: BTreeSet<String>,
    expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    issued_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permissions: Option<BTreeSet<String>>,
}

impl TokenPayload {
    pub(crate) fn from_verified(
        subject: String,
        issuer: String,
        audience: BTreeSet<String>,
        expires_at: i64,
        issued_at: Option<i64>,
        permissions: Option<Vec<String>>,
    ) -> Self {
        Self {
            subject,
            issuer,
            audience,
            expires_at,
            issued_at,
            permissions: permissions.map(|p| p.into_iter().collect()),
        }
    }

    /// Canonical user identifier (`sub`).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &BTreeSet<String> {
        &self.audience
    }

    /// Expiry as a Unix timestamp.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    /// Granted permissions, or `None` when the token carried no `permissions` claim.
    pub fn permissions(&self) -> Option<&BTreeSet<String>> {
        self.permissions.as_ref()
    }

    /// Exact, case-sensitive membership test.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|granted| granted.contains(permission))
    }
}

#[cfg(test)]
impl TokenPayload {
    /// Build a payload without a token, for exercising code downstream of the verifier.
    pub(crate) fn for_tests(subject: &str, permissions: Option<&[&str]>) -> Self {
        Self::from_verified(
            subject.to_string(),
            "https://issuer.test/".to_string(),
            BTreeSet::from(["coffee".to_string()]),
            i64::MAX,
            None,
            permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_string_normalizes_to_singleton() {
        let raw: RawClaims = serde_json::from_str(r#"{"aud":"coffee"}"#).unwrap();
        let set = raw.aud.unwrap().into_set();
        assert_eq!(set, BTreeSet::from(["coffee".to_string()]));
    }

    #[test]
    fn audience_array_normalizes_to_set() {
        let raw: RawClaims =
            serde_json::from_str(r#"{"aud":["coffee","https://issuer.test/userinfo","coffee"]}"#)
                .unwrap();
        let set = raw.aud.unwrap().into_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("coffee"));
    }

    #[test]
    fn missing_claims_deserialize_as_none() {
        let raw: RawClaims = serde_json::from_str("{}").unwrap();
        assert!(raw.sub.is_none());
        assert!(raw.exp.is_none());
        assert!(raw.permissions.is_none());
    }

    #[test]
    fn fractional_timestamps_are_accepted() {
        let raw: RawClaims =
            serde_json::from_str(r#"{"exp":1700003600.25,"iat":1700000000.5}"#).unwrap();
        assert_eq!(raw.exp, Some(1_700_003_600.25));
        assert_eq!(raw.iat, Some(1_700_000_000.5));
    }

    #[test]
    fn mistyped_expiry_is_rejected() {
        assert!(serde_json::from_str::<RawClaims>(r#"{"exp":"tomorrow"}"#).is_err());
    }

    #[test]
    fn has_permission_is_exact_match() {
        let payload = TokenPayload::for_tests("user_1", Some(&["get:drinks", "post:drinks"]));
        assert!(payload.has_permission("get:drinks"));
        assert!(!payload.has_permission("GET:drinks"));
        assert!(!payload.has_permission("get:drinks-detail"));
    }

    #[test]
    fn absent_permissions_claim_is_distinguished_from_empty() {
        let absent = TokenPayload::for_tests("user_1", None);
        let empty = TokenPayload::for_tests("user_1", Some(&[]));
        assert!(absent.permissions().is_none());
        assert_eq!(empty.permissions().map(|p| p.len()), Some(0));
    }
}
