// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance.
//!
//! One `POST {base}/token` with `{"pubKey", "deviceID"}` returns
//! `{"token"}`. The fetcher performs exactly one round trip and never
//! retries; retry policy belongs to the coordinator's callers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::credential::Credential;
use crate::error::AuthError;

/// Exchanges the device identity for a fresh credential.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch(&self, device_id: &str, public_key: &str) -> Result<Credential, AuthError>;
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    #[serde(rename = "pubKey")]
    pub_key: &'a str,
    #[serde(rename = "deviceID")]
    device_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Token fetcher talking to the real token endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenFetcher {
    token_url: String,
    timeout: Duration,
    http: Client,
}

impl HttpTokenFetcher {
    /// `http` must not be the authenticating pipeline's client wrapper; the
    /// token call itself is unsigned.
    pub fn new(token_url: impl Into<String>, timeout: Duration, http: Client) -> Self {
        Self {
            token_url: token_url.into(),
            timeout,
            http,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn round_trip(&self, body: &TokenRequest<'_>) -> Result<Credential, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ServerRejected(format!(
                "token request returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ServerRejected(format!("invalid token response: {e}")))?;

        match parsed.token.map(|t| t.trim().to_string()) {
            Some(token) if !token.is_empty() => Ok(Credential::new(token)),
            _ => Err(AuthError::ServerRejected(
                "token response did not include token".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TokenFetcher for HttpTokenFetcher {
    async fn fetch(&self, device_id: &str, public_key: &str) -> Result<Credential, AuthError> {
        debug!(url = %self.token_url, "Requesting API token");
        let body = TokenRequest {
            pub_key: public_key,
            device_id,
        };

        // Outer bound in case the body read stalls after headers arrive.
        match tokio::time::timeout(self.timeout, self.round_trip(&body)).await {
            Ok(result) => {
                if let Err(e) = &result {
                    warn!(error = %e, "Token request failed");
                }
                result
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Token request timed out");
                Err(AuthError::ServerRejected(format!(
                    "token request timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

fn classify_transport_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::ServerRejected(format!("token request timed out: {e}"))
    } else {
        AuthError::Network(format!("token request failed: {e}"))
    }
}
