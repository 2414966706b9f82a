// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Client
//!
//! The narrow surface callers use: send signed or unsigned requests,
//! invalidate the credential, and ask whether the device has an identity.
//! One `ApiClient` exists per account; construct it on account creation
//! and drop it (after [`ApiClient::wipe`]) when the account goes away.

use std::sync::Arc;

use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::auth::{
    AuthCoordinator, AuthScheme, CredentialStore, HttpTokenFetcher, RequestSigner,
    SigningIdentity, TokenFetcher,
};
use crate::config::{join_url, ClientConfig};
use crate::error::ApiError;
use crate::pipeline::{build_http_client, ApiRequest, AuthenticatingHttpPipeline, Transport};

/// Authenticated client for the wallet API.
#[derive(Debug)]
pub struct ApiClient {
    config: ClientConfig,
    user_agent: HeaderValue,
    coordinator: Arc<AuthCoordinator>,
    pipeline: AuthenticatingHttpPipeline,
}

impl ApiClient {
    /// Build a client that talks HTTP through reqwest.
    pub fn new(
        config: ClientConfig,
        identity: Arc<dyn SigningIdentity>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let http = build_http_client(&config)?;
        let fetcher = Arc::new(HttpTokenFetcher::new(
            config.token_url(),
            config.token_timeout,
            http.clone(),
        ));
        Self::with_parts(config, identity, store, fetcher, Arc::new(http))
    }

    /// Build a client from explicit collaborators.
    pub fn with_parts(
        config: ClientConfig,
        identity: Arc<dyn SigningIdentity>,
        store: Arc<dyn CredentialStore>,
        fetcher: Arc<dyn TokenFetcher>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        Url::parse(&config.api_base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid API base URL: {e}")))?;
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid user agent: {e}")))?;

        let coordinator = Arc::new(AuthCoordinator::new(identity, store, fetcher));
        let scheme =
            AuthScheme::new(config.auth_scheme.clone()).with_client_token(config.client_token.clone());
        let signer =
            RequestSigner::new(coordinator.clone(), scheme).with_wallet_id(config.wallet_id.clone());
        let pipeline = AuthenticatingHttpPipeline::new(signer, transport, config.max_redirects);

        info!(
            base_url = %config.api_base_url,
            device_id = %coordinator.device_id(),
            has_identity = coordinator.has_identity(),
            "API client ready"
        );

        Ok(Self {
            config,
            user_agent,
            coordinator,
            pipeline,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<AuthCoordinator> {
        &self.coordinator
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = join_url(&self.config.api_base_url, path);
        Url::parse(&joined).map_err(|e| ApiError::InvalidRequest(format!("invalid URL {joined}: {e}")))
    }

    /// Send a request signed with the device credential.
    ///
    /// Before onboarding (no device key) the request goes out unsigned.
    pub async fn send_authenticated(&self, request: ApiRequest) -> Result<Response, ApiError> {
        self.pipeline.send(self.with_user_agent(request), true).await
    }

    pub async fn send_unauthenticated(&self, request: ApiRequest) -> Result<Response, ApiError> {
        self.pipeline.send(self.with_user_agent(request), false).await
    }

    /// Drop the current credential; the next signed request fetches a new one.
    pub fn invalidate_credential(&self) {
        self.coordinator.invalidate();
    }

    pub fn has_identity(&self) -> bool {
        self.coordinator.has_identity()
    }

    /// Fetch a credential ahead of the first signed request.
    pub async fn prefetch_token(&self) {
        self.coordinator.prefetch_token().await;
    }

    /// Forget the credential for a wiped account.
    pub fn wipe(&self) {
        self.coordinator.reset();
    }

    /// `GET` a JSON document, mapping non-2xx statuses to [`ApiError::Status`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        authenticated: bool,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::get(self.url(path)?).accept("application/json");
        let response = if authenticated {
            self.send_authenticated(request).await?
        } else {
            self.send_unauthenticated(request).await?
        };
        read_json(response).await
    }

    fn with_user_agent(&self, mut request: ApiRequest) -> ApiRequest {
        request
            .headers
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());
        request
    }
}

/// Decode a JSON body from a successful response.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "Request returned non-success status");
        return Err(ApiError::Status { status, body });
    }
    response
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
