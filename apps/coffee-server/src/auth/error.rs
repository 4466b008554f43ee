// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization errors.
//!
//! Every variant maps to one HTTP status and one stable machine-readable code.
//! Messages are generic per category: they never echo token contents, key
//! material or upstream responses. Diagnostic detail is logged where the
//! failure is detected.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authorization failure raised by the guard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header on the request
    #[error("Authorization header is expected.")]
    AuthHeaderMissing,
    /// Header present but not `Bearer <token>`
    #[error("Authorization header must be of the form 'Bearer <token>'.")]
    AuthHeaderMalformed,
    /// Token cannot be decoded, lacks required fields or declares the wrong algorithm
    #[error("Unable to parse authentication token.")]
    TokenMalformed,
    /// Signing keys could not be fetched from the identity provider
    #[error("Signing keys are temporarily unavailable.")]
    KeySetUnavailable,
    /// No signing key matches the token's key identifier
    #[error("Unable to find the appropriate key.")]
    KeyNotFound,
    /// Signature does not verify against the matched key
    #[error("Token signature is invalid.")]
    SignatureInvalid,
    /// `exp` is not in the future
    #[error("Token expired.")]
    TokenExpired,
    /// Expected audience not present in `aud`
    #[error("Incorrect claims. Please check the audience.")]
    AudienceInvalid,
    /// `iss` does not match the identity provider
    #[error("Incorrect claims. Please check the issuer.")]
    IssuerInvalid,
    /// Verified token carries no `permissions` claim at all
    #[error("Permissions not included in token.")]
    PermissionsClaimMissing,
    /// Permissions present but the required one is not granted
    #[error("Permission not granted.")]
    PermissionDenied,
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    error: u16,
    code: &'static str,
    message: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::AuthHeaderMissing => "authorization_header_missing",
            AuthError::AuthHeaderMalformed => "invalid_header",
            AuthError::TokenMalformed => "token_malformed",
            AuthError::KeySetUnavailable => "key_set_unavailable",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::SignatureInvalid => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::AudienceInvalid => "invalid_audience",
            AuthError::IssuerInvalid => "invalid_issuer",
            AuthError::PermissionsClaimMissing => "permissions_claim_missing",
            AuthError::PermissionDenied => "permission_denied",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AuthHeaderMalformed
            | AuthError::TokenMalformed
            | AuthError::PermissionsClaimMissing => StatusCode::BAD_REQUEST,
            AuthError::AuthHeaderMissing
            | AuthError::KeyNotFound
            | AuthError::SignatureInvalid
            | AuthError::TokenExpired
            | AuthError::AudienceInvalid
            | AuthError::IssuerInvalid => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::KeySetUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            success: false,
            error: status.as_u16(),
            code: self.error_code(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401_envelope() {
        let response = AuthError::AuthHeaderMissing.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 401);
        assert_eq!(body["code"], "authorization_header_missing");
        assert_eq!(body["message"], "Authorization header is expected.");
    }

    #[tokio::test]
    async fn permission_denied_returns_403() {
        let response = AuthError::PermissionDenied.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn malformed_input_maps_to_400() {
        assert_eq!(AuthError::AuthHeaderMalformed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::TokenMalformed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::PermissionsClaimMissing.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn credential_failures_map_to_401() {
        for err in [
            AuthError::KeyNotFound,
            AuthError::SignatureInvalid,
            AuthError::TokenExpired,
            AuthError::AudienceInvalid,
            AuthError::IssuerInvalid,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{err:?}");
        }
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            AuthError::AuthHeaderMissing,
            AuthError::AuthHeaderMalformed,
            AuthError::TokenMalformed,
            AuthError::KeySetUnavailable,
            AuthError::KeyNotFound,
            AuthError::SignatureInvalid,
            AuthError::TokenExpired,
            AuthError::AudienceInvalid,
            AuthError::IssuerInvalid,
            AuthError::PermissionsClaimMissing,
            AuthError::PermissionDenied,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.error_code()).collect();
        assert_eq!(codes.len(), all.len());
    }
}
