// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem operations for device state.
//!
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written key or token behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use super::DevicePaths;

/// Error type for device storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Storage not initialized
    #[error("Storage not initialized")]
    NotInitialized,
    /// Stored key material could not be parsed
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Device state storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct DeviceStorage {
    paths: DevicePaths,
    initialized: bool,
}

impl DeviceStorage {
    /// Create a new DeviceStorage instance.
    ///
    /// Does NOT create the directory structure. Call `initialize()` first.
    pub fn new(paths: DevicePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Create and initialize storage under `root`.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let mut storage = Self::new(DevicePaths::new(root));
        storage.initialize()?;
        Ok(storage)
    }

    pub fn paths(&self) -> &DevicePaths {
        &self.paths
    }

    /// Create the directory structure. Safe to call multiple times.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(self.paths.device_dir())?;
        self.initialized = true;
        Ok(())
    }

    /// Read a file, returning `None` when it does not exist.
    pub fn read_optional(&self, path: impl AsRef<Path>) -> StorageResult<Option<Vec<u8>>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let mut file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Write raw bytes (atomic write via rename).
    pub fn write_atomic(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Delete a file. Deleting a missing file is not an error.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        match fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove all device state (account wipe).
    pub fn wipe(&mut self) -> StorageResult<()> {
        match fs::remove_dir_all(self.paths.root()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.initialize()
    }
}
