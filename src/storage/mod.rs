// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Device Storage Module
//!
//! Persists the per-account device state the authenticated pipeline needs
//! between launches: the device id, the device signing key and the single
//! current API token.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   device/
//!     device_id       # Stable identifier sent to the token endpoint
//!     key.pem         # Device private key (NEVER leaves identity loading)
//!   token             # Opaque API token (at most one)
//! ```
//!
//! ## Important Notes
//!
//! - This module uses **normal filesystem I/O**; on device builds the data
//!   directory lives in the platform's protected container
//! - Wiping the account removes the whole directory

pub mod device_fs;
pub mod paths;

pub use device_fs::{DeviceStorage, StorageError, StorageResult};
pub use paths::DevicePaths;
