// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end token verification through the guard and the key cache.

mod common;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use coffee_shop_server::auth::{jwks::DEFAULT_MIN_REFRESH_INTERVAL, permissions, AuthError};
use common::*;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

#[tokio::test(start_paused = true)]
async fn rotated_key_is_found_after_provider_publishes_it() {
    let source = FakeKeySource::primary();
    let guard = guard(source.clone());
    let token = sign(ROTATED_PEM, "rotated", &claims(&["get:drinks"]));

    let err = guard.authenticate(&bearer(&token)).await.unwrap_err();
    assert_eq!(err, AuthError::KeyNotFound);
    // The initial fetch already is the latest set
    assert_eq!(source.fetches(), 1);

    source.publish(vec![
        rsa_jwk("primary", PRIMARY_N),
        rsa_jwk("rotated", ROTATED_N),
    ]);
    tokio::time::advance(DEFAULT_MIN_REFRESH_INTERVAL).await;
    let payload = guard.authenticate(&bearer(&token)).await.unwrap();
    assert_eq!(payload.subject(), "auth0|barista");
    assert_eq!(source.fetches(), 2);

    // Both keys are now served from cache
    guard.authenticate(&bearer(&token)).await.unwrap();
    guard
        .authenticate(&bearer(&sign(PRIMARY_PEM, "primary", &claims(&[]))))
        .await
        .unwrap();
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn forged_key_ids_do_not_hammer_the_provider() {
    let source = FakeKeySource::primary();
    let guard = guard(source.clone());
    guard.authenticate(&bearer(&token(&[]))).await.unwrap();

    for i in 0..20 {
        let forged = sign(PRIMARY_PEM, &format!("forged-{i}"), &claims(&[]));
        let err = guard.authenticate(&bearer(&forged)).await.unwrap_err();
        assert_eq!(err, AuthError::KeyNotFound);
    }
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn single_bit_signature_change_is_rejected() {
    let guard = guard(FakeKeySource::primary());
    let token = token(&["get:drinks"]);
    guard.authenticate(&bearer(&token)).await.unwrap();

    let (signed, signature) = token.rsplit_once('.').unwrap();
    let mut bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let tampered = format!("{signed}.{}", URL_SAFE_NO_PAD.encode(&bytes));

    let err = guard.authenticate(&bearer(&tampered)).await.unwrap_err();
    assert_eq!(err, AuthError::SignatureInvalid);
}

#[tokio::test]
async fn validly_signed_expired_token_is_rejected() {
    let guard = guard(FakeKeySource::primary());
    let mut expired = claims(&["get:drinks"]);
    expired["exp"] = serde_json::json!(chrono::Utc::now().timestamp() - 60);

    let err = guard
        .authenticate(&bearer(&sign(PRIMARY_PEM, "primary", &expired)))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::TokenExpired);
}

#[tokio::test]
async fn unexpected_algorithm_is_rejected_without_fetching_keys() {
    let source = FakeKeySource::primary();
    let guard = guard(source.clone());

    let rs384 = sign_with(Algorithm::RS384, PRIMARY_PEM, "primary", &claims(&["get:drinks"]));
    assert_eq!(
        guard.authenticate(&bearer(&rs384)).await.unwrap_err(),
        AuthError::TokenMalformed
    );

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("primary".to_string());
    let hs256 = encode(
        &header,
        &claims(&["get:drinks"]),
        &EncodingKey::from_secret(PRIMARY_N.as_bytes()),
    )
    .unwrap();
    assert_eq!(
        guard.authenticate(&bearer(&hs256)).await.unwrap_err(),
        AuthError::TokenMalformed
    );

    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn audience_and_issuer_must_match() {
    let guard = guard(FakeKeySource::primary());

    let mut other_audience = claims(&[]);
    other_audience["aud"] = serde_json::json!(["billing", "reports"]);
    assert_eq!(
        guard
            .authenticate(&bearer(&sign(PRIMARY_PEM, "primary", &other_audience)))
            .await
            .unwrap_err(),
        AuthError::AudienceInvalid
    );

    let mut other_issuer = claims(&[]);
    other_issuer["iss"] = serde_json::json!("https://evil.test/");
    assert_eq!(
        guard
            .authenticate(&bearer(&sign(PRIMARY_PEM, "primary", &other_issuer)))
            .await
            .unwrap_err(),
        AuthError::IssuerInvalid
    );
}

#[tokio::test]
async fn permissions_claim_is_required_for_authorization() {
    let guard = guard(FakeKeySource::primary());
    let mut no_permissions = claims(&[]);
    no_permissions
        .as_object_mut()
        .unwrap()
        .remove("permissions");
    let token = sign(PRIMARY_PEM, "primary", &no_permissions);

    // Authentication alone does not look at permissions
    guard.authenticate(&bearer(&token)).await.unwrap();
    assert_eq!(
        guard
            .authorize(&bearer(&token), permissions::GET_DRINKS)
            .await
            .unwrap_err(),
        AuthError::PermissionsClaimMissing
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_tokens_share_one_fetch() {
    let source = FakeKeySource::primary();
    let guard = guard(source.clone());

    let mut tasks = Vec::new();
    for i in 0..100 {
        let guard = guard.clone();
        let mut claims = claims(&["get:drinks"]);
        claims["sub"] = serde_json::json!(format!("auth0|customer-{i}"));
        let token = sign(PRIMARY_PEM, "primary", &claims);
        tasks.push(tokio::spawn(async move {
            guard
                .authorize(&bearer(&token), permissions::GET_DRINKS)
                .await
                .map(|payload| payload.subject().to_string())
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let subject = task.await.unwrap().unwrap();
        assert_eq!(subject, format!("auth0|customer-{i}"));
    }
    assert_eq!(source.fetches(), 1);
}
