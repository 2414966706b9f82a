// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The opaque API credential and where it lives.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::storage::DeviceStorage;

/// Opaque bearer token issued by the token endpoint.
///
/// Carries no client-side structure and no expiry; it is invalidated only
/// by a server challenge or by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Holder of the single current credential.
///
/// Implementations must tolerate concurrent callers.
pub trait CredentialStore: Send + Sync {
    fn current(&self) -> Option<Credential>;
    fn set(&self, credential: Credential);
    fn clear(&self);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    current: Mutex<Option<Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn current(&self) -> Option<Credential> {
        lock(&self.current).clone()
    }

    fn set(&self, credential: Credential) {
        *lock(&self.current) = Some(credential);
    }

    fn clear(&self) {
        *lock(&self.current) = None;
    }
}

/// Store backed by the token file in device storage.
///
/// Reads are served from memory and mutations take effect in memory
/// immediately. The token file is brought up to date afterwards, on the
/// blocking pool when called inside a Tokio runtime, so callers holding
/// locks never wait on fsync. Each disk sync writes the latest value, so
/// the file always ends in the state of the last mutation.
///
/// A failed disk write is logged and the in-memory value still takes
/// effect, so the running session keeps working and the next launch simply
/// fetches a new token.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    state: Arc<FileState>,
}

#[derive(Debug)]
struct FileState {
    storage: DeviceStorage,
    cached: Mutex<Versioned>,
    /// Version of `cached` last written to disk.
    persisted: Mutex<u64>,
}

#[derive(Debug)]
struct Versioned {
    credential: Option<Credential>,
    version: u64,
}

impl FileCredentialStore {
    /// Open the store, loading any token persisted by a previous run.
    pub fn open(storage: DeviceStorage) -> Self {
        let cached = match storage.read_optional(storage.paths().token()) {
            Ok(Some(raw)) => {
                let token = String::from_utf8_lossy(&raw).trim().to_string();
                (!token.is_empty()).then(|| Credential::new(token))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token; starting without one");
                None
            }
        };
        Self {
            state: Arc::new(FileState {
                storage,
                cached: Mutex::new(Versioned {
                    credential: cached,
                    version: 0,
                }),
                persisted: Mutex::new(0),
            }),
        }
    }

    /// Write any pending change to disk on the calling thread.
    pub fn flush(&self) {
        self.state.sync_to_disk();
    }

    fn replace(&self, credential: Option<Credential>) {
        {
            let mut cached = lock(&self.state.cached);
            cached.credential = credential;
            cached.version += 1;
        }
        let state = self.state.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || state.sync_to_disk());
            }
            Err(_) => state.sync_to_disk(),
        }
    }
}

impl FileState {
    fn sync_to_disk(&self) {
        let mut persisted = lock(&self.persisted);
        let (credential, version) = {
            let cached = lock(&self.cached);
            (cached.credential.clone(), cached.version)
        };
        if version <= *persisted {
            return;
        }

        let path = self.storage.paths().token();
        match credential {
            Some(credential) => {
                if let Err(e) = self.storage.write_atomic(path, credential.as_str().as_bytes()) {
                    warn!(error = %e, "Failed to persist token");
                }
            }
            None => {
                if let Err(e) = self.storage.delete(path) {
                    warn!(error = %e, "Failed to delete persisted token");
                }
            }
        }
        *persisted = version;
    }
}

impl CredentialStore for FileCredentialStore {
    fn current(&self) -> Option<Credential> {
        lock(&self.state.cached).credential.clone()
    }

    fn set(&self, credential: Credential) {
        self.replace(Some(credential));
    }

    fn clear(&self) {
        self.replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_set_get_clear() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(store.current(), None);

        store.set(Credential::new("t1"));
        assert_eq!(store.current(), Some(Credential::new("t1")));

        store.set(Credential::new("t2"));
        assert_eq!(store.current(), Some(Credential::new("t2")));

        store.clear();
        assert_eq!(store.current(), None);
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", Credential::new("secret-token"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn file_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DeviceStorage::open(dir.path()).unwrap();

        let store = FileCredentialStore::open(storage.clone());
        store.set(Credential::new("persisted"));

        let reopened = FileCredentialStore::open(storage.clone());
        assert_eq!(reopened.current(), Some(Credential::new("persisted")));

        reopened.clear();
        assert_eq!(FileCredentialStore::open(storage).current(), None);
    }

    #[tokio::test]
    async fn async_writes_leave_last_value_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DeviceStorage::open(dir.path()).unwrap();
        let store = FileCredentialStore::open(storage.clone());

        store.set(Credential::new("first"));
        store.clear();
        store.set(Credential::new("last"));
        assert_eq!(store.current(), Some(Credential::new("last")));

        store.flush();
        let reopened = FileCredentialStore::open(storage.clone());
        assert_eq!(reopened.current(), Some(Credential::new("last")));

        store.clear();
        store.flush();
        assert_eq!(FileCredentialStore::open(storage).current(), None);
    }

    #[tokio::test]
    async fn memory_updates_before_disk_sync() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DeviceStorage::open(dir.path()).unwrap();
        let store = FileCredentialStore::open(storage);

        // No yield between the mutation and the read.
        store.set(Credential::new("now"));
        assert_eq!(store.current(), Some(Credential::new("now")));
        store.clear();
        assert_eq!(store.current(), None);
    }

    #[test]
    fn concurrent_writers_leave_one_value() {
        let store = std::sync::Arc::new(InMemoryCredentialStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.set(Credential::new(format!("t{i}"))))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let current = store.current().unwrap();
        assert!(current.as_str().starts_with('t'));
    }
}
