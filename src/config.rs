// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by the client. Configuration is loaded from the environment once, when
//! the account's `ApiClient` is constructed.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BRD_API_BASE_URL` | Base URL of the wallet API | `https://api.breadwallet.com` |
//! | `BRD_TOKEN_PATH` | Token issuance path, relative to the base URL | `/token` |
//! | `BRD_TOKEN_TIMEOUT_SECS` | Upper bound for one token fetch | `15` |
//! | `BRD_REQUEST_TIMEOUT_SECS` | Per-request transport timeout | `30` |
//! | `BRD_AUTH_SCHEME` | `Authorization` scheme name | `bread` |
//! | `BRD_CLIENT_TOKEN` | Client token; switches the scheme to `bread2` | Optional |
//! | `BRD_WALLET_ID` | Value for `X-Wallet-Id` on signed requests | Optional |
//! | `BRD_USER_AGENT` | `User-Agent` header | `breadwallet/<version>` |
//! | `BRD_MAX_REDIRECTS` | Same-origin redirects followed per request | `5` |
//! | `BRD_MAINNET` | Resolve addresses against mainnet services | `true` |
//! | `BRD_RESOLVER_CACHE_TTL_SECS` | Address resolution cache TTL | `300` |
//! | `DATA_DIR` | Directory for device key, device id and token | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,brd_auth_client=debug` |

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const API_BASE_URL_ENV: &str = "BRD_API_BASE_URL";
pub const TOKEN_PATH_ENV: &str = "BRD_TOKEN_PATH";
pub const TOKEN_TIMEOUT_ENV: &str = "BRD_TOKEN_TIMEOUT_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "BRD_REQUEST_TIMEOUT_SECS";
pub const AUTH_SCHEME_ENV: &str = "BRD_AUTH_SCHEME";
pub const CLIENT_TOKEN_ENV: &str = "BRD_CLIENT_TOKEN";
pub const WALLET_ID_ENV: &str = "BRD_WALLET_ID";
pub const USER_AGENT_ENV: &str = "BRD_USER_AGENT";
pub const MAX_REDIRECTS_ENV: &str = "BRD_MAX_REDIRECTS";
pub const MAINNET_ENV: &str = "BRD_MAINNET";
pub const RESOLVER_CACHE_TTL_ENV: &str = "BRD_RESOLVER_CACHE_TTL_SECS";

/// Environment variable name for the device state directory.
///
/// Holds the device id, the device private key and the current token. On
/// mobile builds this points at the platform's protected app container.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_API_BASE_URL: &str = "https://api.breadwallet.com";
pub const DEFAULT_TOKEN_PATH: &str = "/token";
pub const DEFAULT_AUTH_SCHEME: &str = "bread";
pub const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_TOKEN_TIMEOUT_SECS: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_REDIRECTS: usize = 5;
const DEFAULT_RESOLVER_CACHE_TTL_SECS: u64 = 300;

/// Settings for one account's API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub token_path: String,
    /// Bound on a single token fetch; expiry counts as a server rejection.
    pub token_timeout: Duration,
    pub request_timeout: Duration,
    pub auth_scheme: String,
    pub client_token: Option<String>,
    pub wallet_id: Option<String>,
    pub user_agent: String,
    pub max_redirects: usize,
    pub is_mainnet: bool,
    pub resolver_cache_ttl: Duration,
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            token_timeout: Duration::from_secs(DEFAULT_TOKEN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            client_token: None,
            wallet_id: None,
            user_agent: default_user_agent(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            is_mainnet: true,
            resolver_cache_ttl: Duration::from_secs(DEFAULT_RESOLVER_CACHE_TTL_SECS),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_or_default(API_BASE_URL_ENV, DEFAULT_API_BASE_URL),
            token_path: env_or_default(TOKEN_PATH_ENV, DEFAULT_TOKEN_PATH),
            token_timeout: Duration::from_secs(env_parsed(
                TOKEN_TIMEOUT_ENV,
                DEFAULT_TOKEN_TIMEOUT_SECS,
            )),
            request_timeout: Duration::from_secs(env_parsed(
                REQUEST_TIMEOUT_ENV,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            auth_scheme: env_or_default(AUTH_SCHEME_ENV, DEFAULT_AUTH_SCHEME),
            client_token: env_optional(CLIENT_TOKEN_ENV),
            wallet_id: env_optional(WALLET_ID_ENV),
            user_agent: env_optional(USER_AGENT_ENV).unwrap_or(defaults.user_agent),
            max_redirects: env_parsed(MAX_REDIRECTS_ENV, DEFAULT_MAX_REDIRECTS),
            is_mainnet: env_flag(MAINNET_ENV, true),
            resolver_cache_ttl: Duration::from_secs(env_parsed(
                RESOLVER_CACHE_TTL_ENV,
                DEFAULT_RESOLVER_CACHE_TTL_SECS,
            )),
            data_dir: PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
        }
    }

    /// Absolute URL of the token issuance endpoint.
    pub fn token_url(&self) -> String {
        join_url(&self.api_base_url, &self.token_path)
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_user_agent() -> String {
    format!("breadwallet/{}", env!("CARGO_PKG_VERSION"))
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_parsed<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env_optional(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, fallback = %default, "Ignoring malformed value");
            default
        }),
        None => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env_optional(name).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!(variable = name, value = %v, fallback = default, "Ignoring malformed flag");
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.token_url(), "https://api.breadwallet.com/token");
        assert_eq!(config.auth_scheme, "bread");
        assert_eq!(config.token_timeout, Duration::from_secs(15));
        assert_eq!(config.max_redirects, 5);
        assert!(config.is_mainnet);
        assert!(config.user_agent.starts_with("breadwallet/"));
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("https://a.example/", "/token"), "https://a.example/token");
        assert_eq!(join_url("https://a.example", "token"), "https://a.example/token");
        assert_eq!(
            join_url("https://a.example/api/", "v1/me"),
            "https://a.example/api/v1/me"
        );
    }
}
