// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the authenticated request pipeline.
//!
//! Authentication problems are normalized into [`AuthError`] before they
//! reach callers, so UI and business logic never inspect raw status codes to
//! detect an auth failure. Transport failures are carried unchanged inside
//! [`ApiError::Transport`].

use reqwest::StatusCode;

use crate::storage::StorageError;

/// Text shown to users for failures that a retry may fix.
const TRY_AGAIN_MESSAGE: &str = "Please try again.";

/// Authentication error type.
///
/// `Clone` because the outcome of one credential refresh is handed to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No device identity is provisioned (pre-onboarding).
    #[error("no device signing key is provisioned")]
    NoKeyAvailable,

    /// The token endpoint could not be reached.
    #[error("token endpoint unreachable: {0}")]
    Network(String),

    /// The token endpoint answered with a non-2xx status, a malformed body,
    /// or did not answer within the fetch timeout.
    #[error("token endpoint rejected the request: {0}")]
    ServerRejected(String),

    /// A token could not be obtained; wraps the underlying cause.
    #[error("authentication unavailable: {0}")]
    AuthUnavailable(Box<AuthError>),

    /// The request was challenged again after one credential refresh.
    #[error("request was challenged again after a credential refresh")]
    ChallengeExhausted,

    /// The device key failed to produce a signature.
    #[error("request signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// Wrap a token acquisition failure into the composite variant.
    pub fn unavailable(cause: AuthError) -> Self {
        match cause {
            already @ AuthError::AuthUnavailable(_) => already,
            other => AuthError::AuthUnavailable(Box::new(other)),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NoKeyAvailable => "no_key_available",
            AuthError::Network(_) => "network_error",
            AuthError::ServerRejected(_) => "server_rejected",
            AuthError::AuthUnavailable(_) => "auth_unavailable",
            AuthError::ChallengeExhausted => "challenge_exhausted",
            AuthError::Signing(_) => "signing_failed",
        }
    }

    /// Innermost cause, looking through `AuthUnavailable`.
    pub fn root_cause(&self) -> &AuthError {
        match self {
            AuthError::AuthUnavailable(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Whether a later attempt by the caller could succeed without user
    /// action (onboarding is user action).
    pub fn is_transient(&self) -> bool {
        match self.root_cause() {
            AuthError::Network(_) | AuthError::ServerRejected(_) => true,
            AuthError::ChallengeExhausted => true,
            AuthError::NoKeyAvailable | AuthError::Signing(_) => false,
            AuthError::AuthUnavailable(_) => false,
        }
    }

    /// Message suitable for display; never contains raw network text.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NoKeyAvailable => "Set up your wallet to continue.",
            AuthError::Signing(_) => "Your device could not sign this request.",
            AuthError::Network(_)
            | AuthError::ServerRejected(_)
            | AuthError::AuthUnavailable(_)
            | AuthError::ChallengeExhausted => TRY_AGAIN_MESSAGE,
        }
    }
}

/// Caller-facing error for requests issued through the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Transport failure, surfaced unchanged.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Non-2xx status. Only the JSON helpers on `ApiClient` produce this;
    /// the pipeline passes such responses through.
    #[error("request returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response was invalid: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// The authentication error, if this is one.
    pub fn auth(&self) -> Option<&AuthError> {
        match self {
            ApiError::Auth(err) => Some(err),
            _ => None,
        }
    }
}
