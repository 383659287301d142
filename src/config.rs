// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Parsing works on
//! a variable map so tests never touch the process environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_ISSUER_DOMAIN` | Identity provider domain (JWKS discovery) | Required |
//! | `AUTH_JWKS_URL` | Override for the JWKS endpoint | `https://{domain}/.well-known/jwks.json` |
//! | `AUTH_ISSUER` | Expected `iss` claim (`none` disables the check) | `https://{domain}/` |
//! | `AUTH_AUDIENCE` | Expected `aud` claim | Not checked |
//! | `AUTH_ALGORITHM` | Allow-listed signature algorithm (asymmetric only) | `RS256` |
//! | `AUTH_PROVIDERS` | Comma-separated identity provider prefixes | `github,auth0` |
//! | `AUTH_JWKS_REQUESTS_PER_MINUTE` | JWKS fetch ceiling | `1` |
//! | `AUTH_JWKS_CACHE_CAPACITY` | Max cached signing keys | `64` |
//! | `AUTH_CLOCK_SKEW_SECONDS` | Leeway for `exp`/`nbf` | `60` |
//! | `DATA_DIR` | Directory for the identity database | In-memory store |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; HTTPS when both set | HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::auth::jwks::{DEFAULT_CACHE_CAPACITY, DEFAULT_FETCH_LIMIT};
use crate::identity::ProviderAllowList;

pub const ISSUER_DOMAIN_ENV: &str = "AUTH_ISSUER_DOMAIN";
pub const JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const ALGORITHM_ENV: &str = "AUTH_ALGORITHM";
pub const PROVIDERS_ENV: &str = "AUTH_PROVIDERS";
pub const JWKS_RPM_ENV: &str = "AUTH_JWKS_REQUESTS_PER_MINUTE";
pub const JWKS_CAPACITY_ENV: &str = "AUTH_JWKS_CACHE_CAPACITY";
pub const CLOCK_SKEW_ENV: &str = "AUTH_CLOCK_SKEW_SECONDS";

/// Environment variable name for the identity database directory.
///
/// When unset the service keeps identities in memory only.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Well-known JWKS path on the issuer domain.
pub const JWKS_DISCOVERY_PATH: &str = ".well-known/jwks.json";

/// Default clock skew tolerance in seconds.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u64 = 60;

/// Upper bound accepted for the clock skew tolerance.
pub const MAX_CLOCK_SKEW_SECONDS: u64 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Token verification and identity creation settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity provider domain.
    pub issuer_domain: String,
    /// JWKS endpoint.
    pub jwks_url: String,
    /// Expected `iss`, if checked.
    pub expected_issuer: Option<String>,
    /// Expected `aud`, if checked.
    pub audience: Option<String>,
    /// The only accepted signature algorithm.
    pub algorithm: Algorithm,
    /// Providers allowed to create new identities.
    pub providers: ProviderAllowList,
    pub jwks_requests_per_minute: u32,
    pub jwks_cache_capacity: usize,
    pub clock_skew_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            auth: AuthConfig::from_vars(vars)?,
            server: ServerConfig::from_vars(vars)?,
        })
    }
}

impl AuthConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer_domain = non_empty(vars, ISSUER_DOMAIN_ENV)
            .ok_or_else(|| ConfigError::MissingEnvVar(ISSUER_DOMAIN_ENV.to_string()))?
            .to_string();
        let issuer_base = issuer_base_url(&issuer_domain)?;

        let jwks_url = match non_empty(vars, JWKS_URL_ENV) {
            Some(url) => Url::parse(url)
                .map_err(|e| invalid(JWKS_URL_ENV, e.to_string()))?
                .to_string(),
            None => issuer_base
                .join(JWKS_DISCOVERY_PATH)
                .map_err(|e| invalid(ISSUER_DOMAIN_ENV, e.to_string()))?
                .to_string(),
        };

        let expected_issuer = match non_empty(vars, ISSUER_ENV) {
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => Some(value.to_string()),
            None => Some(issuer_base.to_string()),
        };

        let algorithm = match non_empty(vars, ALGORITHM_ENV) {
            Some(value) => parse_algorithm(value)?,
            None => Algorithm::RS256,
        };

        let providers = match non_empty(vars, PROVIDERS_ENV) {
            Some(value) => value
                .parse::<ProviderAllowList>()
                .map_err(|reason| invalid(PROVIDERS_ENV, reason))?,
            None => ProviderAllowList::default(),
        };

        let jwks_requests_per_minute =
            parse_positive::<u32>(vars, JWKS_RPM_ENV)?.unwrap_or(DEFAULT_FETCH_LIMIT);
        let jwks_cache_capacity =
            parse_positive::<usize>(vars, JWKS_CAPACITY_ENV)?.unwrap_or(DEFAULT_CACHE_CAPACITY);

        let clock_skew_seconds = match non_empty(vars, CLOCK_SKEW_ENV) {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|e| {
                    invalid(CLOCK_SKEW_ENV, format!("must be an integer, got '{value}': {e}"))
                })?;
                if secs > MAX_CLOCK_SKEW_SECONDS {
                    return Err(invalid(
                        CLOCK_SKEW_ENV,
                        format!("must not exceed {MAX_CLOCK_SKEW_SECONDS} seconds, got {secs}"),
                    ));
                }
                secs
            }
            None => DEFAULT_CLOCK_SKEW_SECONDS,
        };

        Ok(Self {
            issuer_domain,
            jwks_url,
            expected_issuer,
            audience: non_empty(vars, AUDIENCE_ENV).map(str::to_string),
            algorithm,
            providers,
            jwks_requests_per_minute,
            jwks_cache_capacity,
            clock_skew_seconds,
        })
    }
}

impl ServerConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = non_empty(vars, HOST_ENV).unwrap_or("0.0.0.0").to_string();

        let port = match non_empty(vars, PORT_ENV) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|e| invalid(PORT_ENV, format!("'{value}': {e}")))?,
            None => 8080,
        };

        let tls = match (non_empty(vars, TLS_CERT_ENV), non_empty(vars, TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(invalid(
                    TLS_CERT_ENV,
                    format!("{TLS_CERT_ENV} and {TLS_KEY_ENV} must be set together"),
                ))
            }
        };

        let log_format = match non_empty(vars, LOG_FORMAT_ENV) {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(value) if value.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(value) => {
                return Err(invalid(
                    LOG_FORMAT_ENV,
                    format!("expected 'json' or 'pretty', got '{value}'"),
                ))
            }
            None => LogFormat::Pretty,
        };

        Ok(Self {
            host,
            port,
            data_dir: non_empty(vars, DATA_DIR_ENV).map(PathBuf::from),
            tls,
            log_format,
        })
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// `https://{domain}/`, or the value itself when it already carries a scheme.
fn issuer_base_url(domain: &str) -> Result<Url, ConfigError> {
    let candidate = if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    let mut url = Url::parse(&candidate).map_err(|e| invalid(ISSUER_DOMAIN_ENV, e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid(ISSUER_DOMAIN_ENV, format!("'{domain}' has no host")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(value)
        .map_err(|_| invalid(ALGORITHM_ENV, format!("unknown algorithm '{value}'")))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(invalid(
            ALGORITHM_ENV,
            format!("{value} is symmetric; an asymmetric algorithm is required"),
        )),
        other => Ok(other),
    }
}

fn parse_positive<T>(vars: &HashMap<String, String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let Some(value) = non_empty(vars, name) else {
        return Ok(None);
    };
    let parsed: T = value
        .parse()
        .map_err(|e| invalid(name, format!("must be a positive integer, got '{value}': {e}")))?;
    if parsed == T::default() {
        return Err(invalid(name, "must be greater than 0"));
    }
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityProvider;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(ISSUER_DOMAIN_ENV.to_string(), "tenant.auth0.com".to_string())])
    }

    fn with(mut vars: HashMap<String, String>, name: &str, value: &str) -> HashMap<String, String> {
        vars.insert(name.to_string(), value.to_string());
        vars
    }

    #[test]
    fn defaults_follow_issuer_domain() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(
            config.auth.jwks_url,
            "https://tenant.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(
            config.auth.expected_issuer.as_deref(),
            Some("https://tenant.auth0.com/")
        );
        assert_eq!(config.auth.algorithm, Algorithm::RS256);
        assert_eq!(config.auth.jwks_requests_per_minute, 1);
        assert_eq!(config.auth.jwks_cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.auth.clock_skew_seconds, 60);
        assert!(config.auth.audience.is_none());
        assert!(config.auth.providers.contains(&IdentityProvider::Github));

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.data_dir.is_none());
        assert!(config.server.tls.is_none());
        assert_eq!(config.server.log_format, LogFormat::Pretty);
    }

    #[test]
    fn issuer_domain_is_required() {
        let err = Config::from_vars(&HashMap::new()).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnvVar(ISSUER_DOMAIN_ENV.to_string()));
    }

    #[test]
    fn explicit_jwks_url_and_issuer_override_defaults() {
        let vars = with(base_vars(), JWKS_URL_ENV, "http://127.0.0.1:9000/keys");
        let vars = with(vars, ISSUER_ENV, "none");
        let config = AuthConfig::from_vars(&vars).unwrap();

        assert_eq!(config.jwks_url, "http://127.0.0.1:9000/keys");
        assert!(config.expected_issuer.is_none());
    }

    #[test]
    fn symmetric_algorithms_are_refused() {
        let vars = with(base_vars(), ALGORITHM_ENV, "HS256");
        assert!(matches!(
            AuthConfig::from_vars(&vars),
            Err(ConfigError::InvalidValue { .. })
        ));

        let vars = with(base_vars(), ALGORITHM_ENV, "ES256");
        assert_eq!(AuthConfig::from_vars(&vars).unwrap().algorithm, Algorithm::ES256);
    }

    #[test]
    fn zero_fetch_ceiling_is_refused() {
        let vars = with(base_vars(), JWKS_RPM_ENV, "0");
        assert!(AuthConfig::from_vars(&vars).is_err());

        let vars = with(base_vars(), JWKS_RPM_ENV, "10");
        assert_eq!(AuthConfig::from_vars(&vars).unwrap().jwks_requests_per_minute, 10);
    }

    #[test]
    fn providers_are_parsed() {
        let vars = with(base_vars(), PROVIDERS_ENV, "google-oauth2");
        let config = AuthConfig::from_vars(&vars).unwrap();
        assert!(config.providers.contains(&IdentityProvider::Google));
        assert!(!config.providers.contains(&IdentityProvider::Github));
    }

    #[test]
    fn clock_skew_is_bounded() {
        let vars = with(base_vars(), CLOCK_SKEW_ENV, "3600");
        assert!(AuthConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let vars = with(base_vars(), TLS_CERT_ENV, "/etc/tls/cert.pem");
        assert!(ServerConfig::from_vars(&vars).is_err());

        let vars = with(vars, TLS_KEY_ENV, "/etc/tls/key.pem");
        let server = ServerConfig::from_vars(&vars).unwrap();
        assert_eq!(
            server.tls,
            Some(TlsPaths {
                cert: PathBuf::from("/etc/tls/cert.pem"),
                key: PathBuf::from("/etc/tls/key.pem"),
            })
        );
    }

    #[test]
    fn log_format_and_data_dir() {
        let vars = with(base_vars(), LOG_FORMAT_ENV, "JSON");
        let vars = with(vars, DATA_DIR_ENV, "/data");
        let server = ServerConfig::from_vars(&vars).unwrap();
        assert_eq!(server.log_format, LogFormat::Json);
        assert_eq!(server.data_dir, Some(PathBuf::from("/data")));

        let vars = with(base_vars(), LOG_FORMAT_ENV, "xml");
        assert!(ServerConfig::from_vars(&vars).is_err());
    }
}
