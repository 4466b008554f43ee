// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Refresh policy
//!
//! - Keys are cached with a configurable TTL (10 minutes by default)
//! - A key identifier that is not in the cached set triggers one forced
//!   refresh, since the provider may have rotated keys since the last fetch,
//!   but only once the cached set is older than the minimum refresh interval
//! - Concurrent refreshes are coalesced: whoever holds the refresh lock
//!   fetches, everyone queued behind it takes that attempt's outcome, failures
//!   included
//! - Each fetch is bounded by a timeout
//!
//! The cached set is an `Arc<SigningKeySet>` swapped under a write lock. Readers
//! clone the `Arc` and keep a consistent snapshot for the rest of the request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default upper bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum age of the cached set before an unknown `kid` may force a refresh.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Where signing keys come from.
///
/// Production uses [`HttpKeySource`]; tests plug in an in-memory set.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the complete current key set.
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the provider's well-known JWKS document over HTTPS.
pub struct HttpKeySource {
    jwks_url: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source for the given JWKS endpoint
    /// (e.g. `https://tenant.auth0.com/.well-known/jwks.json`).
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .https_only(true)
            .build()?;
        Ok(Self::with_client(jwks_url, client))
    }

    /// Create a source that fetches through a caller-supplied client.
    pub fn with_client(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            client,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.jwks_url, error = %e, "JWKS request failed");
                AuthError::KeySetUnavailable
            })?;

        if !response.status().is_success() {
            warn!(
                url = %self.jwks_url,
                status = %response.status(),
                "JWKS endpoint returned non-success status"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        response.json::<JwkSet>().await.map_err(|e| {
            warn!(url = %self.jwks_url, error = %e, "JWKS document is not a valid key set");
            AuthError::KeySetUnavailable
        })
    }
}

/// One usable verification key.
#[derive(Clone)]
pub struct SigningKey {
    /// Algorithm declared by the key entry, if any
    pub algorithm: Option<Algorithm>,
    /// Public key reconstructed from the JWK components
    pub key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Verification keys indexed by key identifier.
///
/// Built once per fetch and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, SigningKey>,
}

impl SigningKeySet {
    /// Convert a JWKS document, skipping entries that cannot verify signatures
    /// (no `kid`, encryption-only, unsupported key type, bad components).
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                debug!("Skipping JWK without key identifier");
                continue;
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                debug!(kid, "Skipping encryption-only JWK");
                continue;
            }
            match jwk_to_signing_key(jwk) {
                Some(key) => {
                    keys.insert(kid.to_string(), key);
                }
                None => warn!(kid, "Skipping unusable JWK"),
            }
        }
        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// Last successfully installed key set.
struct CacheEntry {
    keys: Arc<SigningKeySet>,
    fetched_at: Instant,
}

/// Cached keys plus the outcome of the latest fetch attempt.
#[derive(Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Completed fetch attempts, failed ones included
    attempts: u64,
    /// Set when the latest attempt failed
    last_error: Option<AuthError>,
}

/// Keys as seen by one caller, with the attempt count at the time.
struct Snapshot {
    keys: Arc<SigningKeySet>,
    fetched_at: Instant,
    attempt: u64,
}

/// Shared, refreshable cache of the provider's signing keys.
#[derive(Clone)]
pub struct KeySetCache {
    source: Arc<dyn KeySource>,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
    state: Arc<RwLock<CacheState>>,
    /// Serializes fetches so a burst of misses results in one request
    refresh_lock: Arc<Mutex<()>>,
}

impl KeySetCache {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            state: Arc::new(RwLock::new(CacheState::default())),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with custom fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Create with a custom minimum age before an unknown `kid` may force a refresh.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Current key set, fetching if the cache is empty or older than the TTL.
    pub async fn get_keys(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        self.current().await.map(|snapshot| snapshot.keys)
    }

    /// Key set guaranteed to contain `kid`.
    ///
    /// On a miss the set is refreshed once before giving up with
    /// [`AuthError::KeyNotFound`], unless the installed set is younger than the
    /// minimum refresh interval.
    pub async fn keys_for(&self, kid: &str) -> Result<Arc<SigningKeySet>, AuthError> {
        let snapshot = self.current().await?;
        if snapshot.keys.contains(kid) {
            return Ok(snapshot.keys);
        }
        if snapshot.fetched_at.elapsed() < self.min_refresh_interval {
            debug!(kid, "Key identifier unknown, key set too recent to refresh");
            return Err(AuthError::KeyNotFound);
        }

        debug!(kid, "Key identifier not in cached set, forcing refresh");
        let snapshot = self.fetch_after(snapshot.attempt).await?;
        if snapshot.keys.contains(kid) {
            Ok(snapshot.keys)
        } else {
            debug!(kid, "Key identifier unknown after refresh");
            Err(AuthError::KeyNotFound)
        }
    }

    /// Force refresh the JWKS cache.
    ///
    /// Joins a fetch already in flight instead of starting another one.
    pub async fn refresh(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        let seen = self.state.read().await.attempts;
        self.fetch_after(seen).await.map(|snapshot| snapshot.keys)
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let state = self.state.read().await;
        state
            .entry
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
    }

    fn fresh_snapshot(&self, state: &CacheState) -> Option<Snapshot> {
        state
            .entry
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| Snapshot {
                keys: entry.keys.clone(),
                fetched_at: entry.fetched_at,
                attempt: state.attempts,
            })
    }

    async fn current(&self) -> Result<Snapshot, AuthError> {
        let seen = {
            let state = self.state.read().await;
            if let Some(snapshot) = self.fresh_snapshot(&state) {
                return Ok(snapshot);
            }
            state.attempts
        };
        self.fetch_after(seen).await
    }

    /// Fetch unless an attempt completed after `seen`, in which case its
    /// outcome is returned as-is, failure included.
    async fn fetch_after(&self, seen: u64) -> Result<Snapshot, AuthError> {
        let _guard = self.refresh_lock.lock().await;
        {
            let state = self.state.read().await;
            if state.attempts > seen {
                if let Some(err) = state.last_error {
                    return Err(err);
                }
                if let Some(entry) = state.entry.as_ref() {
                    return Ok(Snapshot {
                        keys: entry.keys.clone(),
                        fetched_at: entry.fetched_at,
                        attempt: state.attempts,
                    });
                }
            }
        }
        self.fetch_and_swap().await
    }

    /// Fetch from the source and record the outcome. Caller holds `refresh_lock`.
    async fn fetch_and_swap(&self) -> Result<Snapshot, AuthError> {
        let result = self.fetch_key_set().await;

        let mut state = self.state.write().await;
        state.attempts += 1;
        match result {
            Ok(keys) => {
                let keys = Arc::new(keys);
                let fetched_at = Instant::now();
                state.entry = Some(CacheEntry {
                    keys: keys.clone(),
                    fetched_at,
                });
                state.last_error = None;
                info!(keys = keys.len(), attempt = state.attempts, "Signing key set refreshed");
                Ok(Snapshot {
                    keys,
                    fetched_at,
                    attempt: state.attempts,
                })
            }
            Err(err) => {
                state.last_error = Some(err);
                Err(err)
            }
        }
    }

    async fn fetch_key_set(&self) -> Result<SigningKeySet, AuthError> {
        let jwks = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?self.fetch_timeout, "JWKS fetch timed out");
                return Err(AuthError::KeySetUnavailable);
            }
        };

        let keys = SigningKeySet::from_jwks(&jwks);
        if keys.is_empty() {
            warn!("JWKS document contains no usable signing keys");
            return Err(AuthError::KeySetUnavailable);
        }
        Ok(keys)
    }
}

/// Convert a JWK to a verification key.
fn jwk_to_signing_key(jwk: &Jwk) -> Option<SigningKey> {
    let algorithm = jwk.common.key_algorithm.and_then(signing_algorithm);
    let key = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok()?,
        AlgorithmParameters::EllipticCurve(ec) => {
            DecodingKey::from_ec_components(&ec.x, &ec.y).ok()?
        }
        _ => return None,
    };
    Some(SigningKey { algorithm, key })
}

/// Map a JWK `alg` to a signature algorithm. Encryption algorithms map to `None`.
fn signing_algorithm(alg: KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}
