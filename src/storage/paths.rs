// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the device state layout.

use std::path::{Path, PathBuf};

/// File holding the stable device identifier.
const DEVICE_ID_FILE: &str = "device_id";
/// File holding the device private key (PKCS#8 PEM).
const DEVICE_KEY_FILE: &str = "key.pem";
/// File holding the current opaque API token.
const TOKEN_FILE: &str = "token";

/// Storage path utilities for one account's device state.
#[derive(Debug, Clone)]
pub struct DevicePaths {
    root: PathBuf,
}

impl DevicePaths {
    /// Create paths under a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all device state.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory with the identity material (id + key).
    pub fn device_dir(&self) -> PathBuf {
        self.root.join("device")
    }

    pub fn device_id(&self) -> PathBuf {
        self.device_dir().join(DEVICE_ID_FILE)
    }

    /// Path to the device private key. NEVER read outside identity loading.
    pub fn device_key(&self) -> PathBuf {
        self.device_dir().join(DEVICE_KEY_FILE)
    }

    pub fn token(&self) -> PathBuf {
        self.root.join(TOKEN_FILE)
    }
}
