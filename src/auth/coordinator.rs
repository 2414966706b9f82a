// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-flight credential refresh.
//!
//! ## State machine
//!
//! - `Idle`: no fetch running. The store may or may not hold a credential.
//! - `InFlight`: exactly one token fetch is running. Every caller that needs
//!   a credential meanwhile joins that fetch instead of starting its own.
//! - `Failed`: the last fetch failed. Behaves like `Idle`; the error is kept
//!   for diagnostics only and the next `ensure_token` fetches again.
//!
//! ## Cancellation
//!
//! The running fetch is a [`Shared`] future and the coordinator only keeps a
//! weak handle to it. Each waiter holds a strong clone, so dropping one
//! waiter leaves the fetch running for the others. When the last waiter is
//! dropped the fetch is dropped with it and the next caller starts over.
//!
//! ## Locking
//!
//! Coordinator state and every credential store write are guarded by one
//! mutex, which is never held across an await point. Store writes under it
//! only touch memory; `FileCredentialStore` persists off the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::{debug, info, warn};

use super::credential::{Credential, CredentialStore};
use super::identity::SigningIdentity;
use super::token::TokenFetcher;
use crate::error::AuthError;

type RefreshFuture = BoxFuture<'static, Result<Credential, AuthError>>;

enum RefreshState {
    Idle,
    InFlight {
        generation: u64,
        handle: WeakShared<RefreshFuture>,
    },
    Failed(AuthError),
}

struct Inner {
    state: RefreshState,
    /// Bumped for every refresh started and on `reset`; a refresh only
    /// installs its result while its generation is still current.
    generation: u64,
}

/// Owns the credential lifecycle for one device account.
pub struct AuthCoordinator {
    identity: Arc<dyn SigningIdentity>,
    store: Arc<dyn CredentialStore>,
    fetcher: Arc<dyn TokenFetcher>,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for AuthCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCoordinator")
            .field("device_id", &self.identity.device_id())
            .field("has_identity", &self.identity.has_key())
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AuthCoordinator {
    pub fn new(
        identity: Arc<dyn SigningIdentity>,
        store: Arc<dyn CredentialStore>,
        fetcher: Arc<dyn TokenFetcher>,
    ) -> Self {
        Self {
            identity,
            store,
            fetcher,
            inner: Arc::new(Mutex::new(Inner {
                state: RefreshState::Idle,
                generation: 0,
            })),
        }
    }

    /// Return the current credential, fetching one if none is stored.
    ///
    /// Concurrent callers share a single fetch and all receive its outcome.
    /// Fails with `NoKeyAvailable` before any network access when the device
    /// has no key, and with `AuthUnavailable` when the fetch fails.
    pub async fn ensure_token(&self) -> Result<Credential, AuthError> {
        if let Some(credential) = self.store.current() {
            return Ok(credential);
        }

        let public_key = self.identity.public_key_encoded()?;

        let refresh = {
            let mut inner = lock(&self.inner);
            if let Some(credential) = self.store.current() {
                return Ok(credential);
            }

            let joined = match &inner.state {
                RefreshState::InFlight { handle, generation } => {
                    let upgraded = handle.upgrade();
                    if upgraded.is_some() {
                        debug!(generation, "Joining in-flight credential refresh");
                    }
                    upgraded
                }
                RefreshState::Idle | RefreshState::Failed(_) => None,
            };

            match joined {
                Some(refresh) => refresh,
                None => self.start_refresh(&mut inner, public_key),
            }
        };

        refresh.await
    }

    fn start_refresh(&self, inner: &mut Inner, public_key: String) -> Shared<RefreshFuture> {
        inner.generation += 1;
        let generation = inner.generation;

        let fetcher = self.fetcher.clone();
        let store = self.store.clone();
        let state = self.inner.clone();
        let device_id = self.identity.device_id().to_string();

        let refresh: RefreshFuture = async move {
            debug!(generation, "Fetching API token");
            let result = fetcher
                .fetch(&device_id, &public_key)
                .await
                .map_err(AuthError::unavailable);

            let mut inner = lock(&state);
            if inner.generation != generation {
                debug!(generation, "Discarding credential from a reset session");
                return result;
            }
            match &result {
                Ok(credential) => {
                    store.set(credential.clone());
                    inner.state = RefreshState::Idle;
                    info!(generation, "Installed new API token");
                }
                Err(e) => {
                    inner.state = RefreshState::Failed(e.clone());
                    warn!(generation, error = %e, "Credential refresh failed");
                }
            }
            result
        }
        .boxed();

        let shared = refresh.shared();
        if let Some(handle) = shared.downgrade() {
            inner.state = RefreshState::InFlight { generation, handle };
        }
        shared
    }

    /// Fetch a credential ahead of the first request. Failures are logged and
    /// otherwise ignored; the next `ensure_token` tries again.
    pub async fn prefetch_token(&self) {
        if !self.identity.has_key() {
            return;
        }
        if let Err(e) = self.ensure_token().await {
            warn!(error = %e, "Token prefetch failed");
        }
    }

    /// The stored credential, without fetching.
    pub fn current(&self) -> Option<Credential> {
        self.store.current()
    }

    /// Clear the stored credential. The next `ensure_token` fetches.
    pub fn invalidate(&self) {
        let _inner = lock(&self.inner);
        self.store.clear();
        debug!("Credential invalidated");
    }

    /// Clear the stored credential only if it is still `rejected`.
    ///
    /// Requests that were challenged with a credential another request has
    /// already replaced must not discard the replacement. Returns whether
    /// the store was cleared.
    pub fn invalidate_if(&self, rejected: &Credential) -> bool {
        let _inner = lock(&self.inner);
        if self.store.current().as_ref() == Some(rejected) {
            self.store.clear();
            debug!("Rejected credential invalidated");
            true
        } else {
            false
        }
    }

    /// Forget the credential and orphan any running refresh (wallet wipe).
    ///
    /// A refresh started before the reset still completes for its waiters
    /// but its credential is never installed.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.generation += 1;
        inner.state = RefreshState::Idle;
        self.store.clear();
        info!("Credential state reset");
    }

    /// Whether a signing key is provisioned.
    pub fn has_identity(&self) -> bool {
        self.identity.has_key()
    }

    pub fn device_id(&self) -> &str {
        self.identity.device_id()
    }

    /// Sign with the device key; the key itself never leaves the identity.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AuthError> {
        self.identity.sign(message)
    }

    /// Whether a fetch is currently running.
    pub fn is_refreshing(&self) -> bool {
        match &lock(&self.inner).state {
            RefreshState::InFlight { handle, .. } => handle.upgrade().is_some(),
            RefreshState::Idle | RefreshState::Failed(_) => false,
        }
    }

    /// Error from the most recent refresh, if it failed.
    pub fn last_failure(&self) -> Option<AuthError> {
        match &lock(&self.inner).state {
            RefreshState::Failed(e) => Some(e.clone()),
            RefreshState::Idle | RefreshState::InFlight { .. } => None,
        }
    }
}
