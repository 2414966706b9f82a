// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles shared by the auth and pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::coordinator::AuthCoordinator;
use super::credential::{Credential, CredentialStore, InMemoryCredentialStore};
use super::identity::DeviceIdentity;
use super::token::TokenFetcher;
use crate::error::AuthError;

/// Issues `token-1`, `token-2`, ... after an optional delay, or fails every
/// call when built with [`ScriptedFetcher::failing`].
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    delay: Duration,
    failure: Option<AuthError>,
    seen: Mutex<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(failure: AuthError, delay: Duration) -> Self {
        Self {
            delay,
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(device_id, public_key)` of every call.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenFetcher for ScriptedFetcher {
    async fn fetch(&self, device_id: &str, public_key: &str) -> Result<Credential, AuthError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen
            .lock()
            .unwrap()
            .push((device_id.to_string(), public_key.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Credential::new(format!("token-{call}"))),
        }
    }
}

/// In-memory store that counts `clear` calls.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryCredentialStore,
    clears: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CredentialStore for CountingStore {
    fn current(&self) -> Option<Credential> {
        self.inner.current()
    }

    fn set(&self, credential: Credential) {
        self.inner.set(credential);
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear();
    }
}

/// Coordinator over a fixed test key.
pub struct Harness {
    pub identity: Arc<DeviceIdentity>,
    pub store: Arc<CountingStore>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub coordinator: Arc<AuthCoordinator>,
}

impl Harness {
    pub fn new(fetcher: ScriptedFetcher) -> Self {
        let identity = DeviceIdentity::from_secret_bytes("device-1", &[7u8; 32]).unwrap();
        Self::with_identity(identity, fetcher)
    }

    pub fn with_identity(identity: DeviceIdentity, fetcher: ScriptedFetcher) -> Self {
        let identity = Arc::new(identity);
        let store = Arc::new(CountingStore::new());
        let fetcher = Arc::new(fetcher);
        let coordinator = Arc::new(AuthCoordinator::new(
            identity.clone(),
            store.clone(),
            fetcher.clone(),
        ));
        Self {
            identity,
            store,
            fetcher,
            coordinator,
        }
    }
}
