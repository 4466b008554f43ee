// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and validated
//! before the server binds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Identity provider domain (e.g. `tenant.us.auth0.com`) | Required |
//! | `API_AUDIENCE` | Expected JWT audience claim | Required |
//! | `ALGORITHMS` | Expected JWT signing algorithm (asymmetric only) | `RS256` |
//! | `JWKS_CACHE_TTL_SECS` | Signing key cache lifetime | `600` |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Upper bound on one JWKS fetch | `10` |
//! | `JWKS_MIN_REFRESH_SECS` | Minimum key set age before an unknown `kid` forces a refresh | `30` |
//! | `DATABASE_PATH` | redb file holding drinks | `data/drinks.redb` |
//! | `RESET_DATABASE` | Drop all drinks and reseed on startup | `false` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, DEFAULT_MIN_REFRESH_INTERVAL};

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const API_AUDIENCE_ENV: &str = "API_AUDIENCE";
pub const ALGORITHMS_ENV: &str = "ALGORITHMS";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const JWKS_MIN_REFRESH_ENV: &str = "JWKS_MIN_REFRESH_SECS";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const RESET_DATABASE_ENV: &str = "RESET_DATABASE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DATABASE_PATH: &str = "data/drinks.redb";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub domain: String,
    pub audience: String,
    pub algorithm: Algorithm,
    /// `https://<domain>/`, compared verbatim against `iss`
    pub issuer: String,
    /// `https://<domain>/.well-known/jwks.json`
    pub jwks_url: Url,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    /// Minimum age of the cached set before an unknown `kid` forces a refresh
    pub min_refresh_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth: AuthSettings,
    pub database_path: PathBuf,
    pub reset_database: bool,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let domain = get(AUTH0_DOMAIN_ENV).ok_or(ConfigError::Missing(AUTH0_DOMAIN_ENV))?;
        let audience = get(API_AUDIENCE_ENV).ok_or(ConfigError::Missing(API_AUDIENCE_ENV))?;
        let algorithm = match get(ALGORITHMS_ENV) {
            Some(raw) => parse_algorithm(&raw)?,
            None => Algorithm::RS256,
        };

        let issuer_url = issuer_url(&domain)?;
        let jwks_url = issuer_url
            .join(".well-known/jwks.json")
            .map_err(|e| ConfigError::invalid(AUTH0_DOMAIN_ENV, e.to_string()))?;

        let cache_ttl = match get(JWKS_CACHE_TTL_ENV) {
            Some(raw) => Duration::from_secs(parse_number(JWKS_CACHE_TTL_ENV, &raw)?),
            None => DEFAULT_CACHE_TTL,
        };
        let fetch_timeout = match get(JWKS_FETCH_TIMEOUT_ENV) {
            Some(raw) => match parse_number(JWKS_FETCH_TIMEOUT_ENV, &raw)? {
                0 => return Err(ConfigError::invalid(JWKS_FETCH_TIMEOUT_ENV, "must be positive")),
                secs => Duration::from_secs(secs),
            },
            None => DEFAULT_FETCH_TIMEOUT,
        };
        let min_refresh_interval = match get(JWKS_MIN_REFRESH_ENV) {
            Some(raw) => Duration::from_secs(parse_number(JWKS_MIN_REFRESH_ENV, &raw)?),
            None => DEFAULT_MIN_REFRESH_INTERVAL,
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip = IpAddr::from_str(&host).map_err(|e| ConfigError::invalid(HOST_ENV, e.to_string()))?;
        let port = match get(PORT_ENV) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None => LogFormat::default(),
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(raw) if raw.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::invalid(
                    LOG_FORMAT_ENV,
                    format!("expected `json` or `pretty`, got `{other}`"),
                ))
            }
        };

        let reset_database = match get(RESET_DATABASE_ENV).as_deref() {
            None => false,
            Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
            Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
            Some(other) => {
                return Err(ConfigError::invalid(
                    RESET_DATABASE_ENV,
                    format!("expected a boolean, got `{other}`"),
                ))
            }
        };

        Ok(Self {
            auth: AuthSettings {
                domain,
                audience,
                algorithm,
                issuer: issuer_url.to_string(),
                jwks_url,
                cache_ttl,
                fetch_timeout,
                min_refresh_interval,
            },
            database_path: get(DATABASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            reset_database,
            bind_addr: SocketAddr::new(ip, port),
            log_format,
        })
    }
}

/// Accept only asymmetric signature algorithms. `none` does not parse at all.
fn parse_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(raw)
        .map_err(|_| ConfigError::invalid(ALGORITHMS_ENV, format!("unknown algorithm `{raw}`")))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(ConfigError::invalid(
            ALGORITHMS_ENV,
            "symmetric algorithms are not accepted",
        )),
        asymmetric => Ok(asymmetric),
    }
}

fn issuer_url(domain: &str) -> Result<Url, ConfigError> {
    let host = domain
        .trim_start_matches("https://")
        .trim_end_matches('/');
    if host.is_empty() || host.contains('/') {
        return Err(ConfigError::invalid(AUTH0_DOMAIN_ENV, "expected a bare domain"));
    }
    Url::parse(&format!("https://{host}/"))
        .map_err(|e| ConfigError::invalid(AUTH0_DOMAIN_ENV, e.to_string()))
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|e| ConfigError::invalid(name, e.to_string()))
}
