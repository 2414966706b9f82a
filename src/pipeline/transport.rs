// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP transport seam.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::ClientConfig;

/// Sends one HTTP request. TLS, DNS and pooling live behind this.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl Transport for Client {
    async fn dispatch(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.execute(request).await
    }
}

/// Build the shared reqwest client.
///
/// Automatic redirects are disabled: the pipeline follows them itself so it
/// can re-sign each hop.
pub fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.request_timeout)
        .redirect(Policy::none())
        .user_agent(config.user_agent.clone())
        .build()
}
