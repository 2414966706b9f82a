// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authenticating HTTP Pipeline
//!
//! Owns the challenge retry policy for outgoing requests.
//!
//! ## Send cycle
//!
//! 1. Sign the request (or send unsigned when no device key exists yet)
//! 2. Dispatch, following same-origin redirects and re-signing each hop
//! 3. On a challenge, invalidate the credential the request was signed with
//!    and run the cycle once more
//! 4. A second challenge ends with [`AuthError::ChallengeExhausted`]
//!
//! Every other status, 4xx and 5xx included, is returned to the caller
//! unchanged.

pub mod challenge;
pub mod redirect;
pub mod request;
pub mod transport;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{Credential, RequestSigner};
use crate::error::{ApiError, AuthError};

pub use challenge::is_challenge;
pub use request::ApiRequest;
pub use transport::{build_http_client, Transport};

/// Challenge retries per request.
const MAX_CHALLENGE_RETRIES: u32 = 1;

/// A request in the form it goes on the wire.
struct Prepared {
    request: ApiRequest,
    /// Credential the request is signed with; `None` when unsigned.
    credential: Option<Credential>,
}

/// Final response of one dispatch, after redirects.
struct Dispatched {
    response: reqwest::Response,
    credential: Option<Credential>,
}

/// Signs, dispatches and retries challenged requests.
pub struct AuthenticatingHttpPipeline {
    signer: RequestSigner,
    transport: Arc<dyn Transport>,
    max_redirects: usize,
}

impl std::fmt::Debug for AuthenticatingHttpPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatingHttpPipeline")
            .field("scheme", &self.signer.scheme().name())
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

impl AuthenticatingHttpPipeline {
    pub fn new(signer: RequestSigner, transport: Arc<dyn Transport>, max_redirects: usize) -> Self {
        Self {
            signer,
            transport,
            max_redirects,
        }
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// Send `request`, signing it when `requires_auth` is set.
    pub async fn send(
        &self,
        request: ApiRequest,
        requires_auth: bool,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        loop {
            let prepared = self.prepare(request.clone(), requires_auth).await?;
            let Dispatched {
                response,
                credential,
            } = self.dispatch(prepared, requires_auth).await?;

            let Some(credential) = credential else {
                return Ok(response);
            };
            if !is_challenge(
                response.status(),
                response.headers(),
                self.signer.scheme().name(),
            ) {
                return Ok(response);
            }

            if retries >= MAX_CHALLENGE_RETRIES {
                warn!(
                    status = %response.status(),
                    url = %request.url,
                    "Request challenged again after credential refresh"
                );
                return Err(AuthError::ChallengeExhausted.into());
            }

            info!(status = %response.status(), url = %request.url, "Credential challenged; refreshing");
            self.signer.coordinator().invalidate_if(&credential);
            retries += 1;
        }
    }

    async fn prepare(&self, request: ApiRequest, requires_auth: bool) -> Result<Prepared, ApiError> {
        if !requires_auth {
            return Ok(Prepared {
                request,
                credential: None,
            });
        }

        match self.signer.decorate(request.clone()).await {
            Ok(signed) => Ok(Prepared {
                request: signed.request,
                credential: Some(signed.credential),
            }),
            Err(AuthError::NoKeyAvailable) => {
                debug!(url = %request.url, "No device key; sending unsigned");
                Ok(Prepared {
                    request,
                    credential: None,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn dispatch(&self, mut prepared: Prepared, requires_auth: bool) -> Result<Dispatched, ApiError> {
        let mut hops = 0;
        loop {
            let response = self
                .transport
                .dispatch(prepared.request.clone().into_reqwest())
                .await?;

            let Some(location) = redirect::redirect_target(
                &prepared.request.url,
                response.status(),
                response.headers(),
            ) else {
                return Ok(Dispatched {
                    response,
                    credential: prepared.credential,
                });
            };

            if !redirect::same_origin(&prepared.request.url, &location) {
                debug!(from = %prepared.request.url, to = %location, "Not following cross-origin redirect");
                return Ok(Dispatched {
                    response,
                    credential: prepared.credential,
                });
            }
            if hops >= self.max_redirects {
                warn!(url = %prepared.request.url, hops, "Redirect limit reached");
                return Ok(Dispatched {
                    response,
                    credential: prepared.credential,
                });
            }

            hops += 1;
            debug!(from = %prepared.request.url, to = %location, hops, "Following redirect");
            let next = redirect::follow(prepared.request, response.status(), location);
            prepared = self.prepare(next, requires_auth).await?;
        }
    }
}
