// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use coffee_shop_server::{
    api::router,
    auth::{AuthError, AuthGuard, KeySetCache, KeySource, TokenVerifier},
    state::AppState,
    storage::DrinkDatabase,
};
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const AUDIENCE: &str = "coffee";
pub const ISSUER: &str = "https://coffee-shop.test/";

pub const PRIMARY_PEM: &str = include_str!("../fixtures/primary.pem");
pub const PRIMARY_N: &str = include_str!("../fixtures/primary.modulus");
pub const ROTATED_PEM: &str = include_str!("../fixtures/rotated.pem");
pub const ROTATED_N: &str = include_str!("../fixtures/rotated.modulus");

/// Public RS256 JWK for a fixture modulus.
pub fn rsa_jwk(kid: &str, modulus: &str) -> Value {
    json!({ "kty": "RSA", "alg": "RS256", "use": "sig", "kid": kid, "n": modulus.trim(), "e": "AQAB" })
}

/// In-memory key source whose published set can be swapped mid-test.
pub struct FakeKeySource {
    keys: Mutex<JwkSet>,
    fetches: AtomicUsize,
}

impl FakeKeySource {
    pub fn new(keys: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(jwk_set(keys)),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn primary() -> Arc<Self> {
        Self::new(vec![rsa_jwk("primary", PRIMARY_N)])
    }

    pub fn publish(&self, keys: Vec<Value>) {
        *self.keys.lock().unwrap() = jwk_set(keys);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn jwk_set(keys: Vec<Value>) -> JwkSet {
    serde_json::from_value(json!({ "keys": keys })).unwrap()
}

#[async_trait]
impl KeySource for FakeKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.keys.lock().unwrap().clone())
    }
}

pub fn guard(source: Arc<FakeKeySource>) -> AuthGuard {
    AuthGuard::new(
        KeySetCache::new(source),
        TokenVerifier::new(AUDIENCE, ISSUER, Algorithm::RS256),
    )
}

/// Claims for a token valid for the next ten minutes.
pub fn claims(permissions: &[&str]) -> Value {
    json!({
        "sub": "auth0|barista",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": chrono::Utc::now().timestamp(),
        "exp": chrono::Utc::now().timestamp() + 600,
        "permissions": permissions,
    })
}

pub fn sign(pem: &str, kid: &str, claims: &Value) -> String {
    sign_with(Algorithm::RS256, pem, kid, claims)
}

pub fn sign_with(algorithm: Algorithm, pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(algorithm);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Token signed by the primary key carrying `permissions`.
pub fn token(permissions: &[&str]) -> String {
    sign(PRIMARY_PEM, "primary", &claims(permissions))
}

/// A router over a fresh database, plus handles for assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub source: Arc<FakeKeySource>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let drinks = DrinkDatabase::open(&dir.path().join("drinks.redb")).unwrap();
        let source = FakeKeySource::primary();
        let state = AppState::new(drinks, guard(source.clone()));
        Self {
            router: router(state.clone()),
            state,
            source,
            _dir: dir,
        }
    }

    /// Same as [`TestApp::new`] with the menu reset to its seed.
    pub fn seeded() -> Self {
        let app = Self::new();
        app.state.drinks.reset().unwrap();
        app
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}
