// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token extraction and the axum extractor for verified claims.
//!
//! Use the `Claims` extractor in handlers behind the permission middleware:
//!
//! ```rust,ignore
//! async fn my_handler(Claims(payload): Claims) -> impl IntoResponse {
//!     // payload is a verified TokenPayload
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, TokenPayload};
use crate::state::AppState;

/// Compact JWT as presented by the client.
///
/// Never logged: the `Debug` impl is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Pull the bearer token out of the `Authorization` header.
///
/// Syntactic only: the header must be exactly `<scheme> <token>` separated by
/// a single space, with the scheme equal to `bearer` in any case.
pub fn extract_bearer(headers: &HeaderMap) -> Result<BearerToken, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::AuthHeaderMissing)?
        .to_str()
        .map_err(|_| AuthError::AuthHeaderMalformed)?;

    let parts: Vec<&str> = auth_header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthError::AuthHeaderMalformed);
    };

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::AuthHeaderMalformed);
    }

    Ok(BearerToken::new(*token))
}

/// Extractor for verified token claims.
///
/// Routes behind [`super::middleware::enforce_permission`] find the payload
/// already in the request extensions. Anywhere else the token is verified
/// here, without a permission requirement.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_drinks(
///     Claims(payload): Claims,
///     State(state): State<AppState>,
/// ) -> Result<Json<DrinksResponse<DrinkSummary>>, ApiError> {
///     // payload.subject() is the caller's identity
/// }
/// ```
pub struct Claims(pub TokenPayload);

impl FromRequestParts<AppState> for Claims {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already verified the token
        if let Some(payload) = parts.extensions.get::<TokenPayload>().cloned() {
            return Ok(Claims(payload));
        }

        let payload = state.guard.authenticate(&parts.headers).await?;
        Ok(Claims(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header() {
        assert_eq!(
            extract_bearer(&HeaderMap::new()).unwrap_err(),
            AuthError::AuthHeaderMissing
        );
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        for scheme in ["Bearer", "bearer", "BEARER", "bEaReR"] {
            let token = extract_bearer(&headers(&format!("{scheme} abc.def.ghi"))).unwrap();
            assert_eq!(token.as_str(), "abc.def.ghi");
        }
    }

    #[test]
    fn other_schemes_are_malformed() {
        for value in ["Basic dXNlcjpwYXNz", "Token abc", "Bearerabc"] {
            assert_eq!(
                extract_bearer(&headers(value)).unwrap_err(),
                AuthError::AuthHeaderMalformed,
                "{value}"
            );
        }
    }

    #[test]
    fn wrong_part_count_is_malformed() {
        for value in ["Bearer", "Bearer a b", "Bearer  abc"] {
            assert_eq!(
                extract_bearer(&headers(value)).unwrap_err(),
                AuthError::AuthHeaderMalformed,
                "{value:?}"
            );
        }
    }

    #[test]
    fn empty_token_is_malformed() {
        assert_eq!(
            extract_bearer(&headers("Bearer ")).unwrap_err(),
            AuthError::AuthHeaderMalformed
        );
    }

    #[test]
    fn non_ascii_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap());
        assert_eq!(extract_bearer(&headers).unwrap_err(), AuthError::AuthHeaderMalformed);
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = BearerToken::new("secret.token.value");
        assert_eq!(format!("{token:?}"), "BearerToken(..)");
    }
}
