// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BRD Auth Client - Authenticated Request Pipeline
//!
//! This crate signs every wallet API request with the device's secp256k1
//! key, keeps one opaque bearer credential per account, refreshes it with a
//! single shared fetch, and recovers once when the server challenges it.
//!
//! ## Modules
//!
//! - `auth` - Device identity, credentials, token refresh, request signing
//! - `pipeline` - Dispatch with challenge retry and redirect re-signing
//! - `client` - Caller-facing `ApiClient`
//! - `address` - PayID, FIO and domain name resolution
//! - `storage` - Persisted device state (device id, key, token)

pub mod address;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, AuthError};
