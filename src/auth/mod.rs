// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Device-key request signing for the wallet backend.
//!
//! ## Auth Flow
//!
//! 1. A request marked as authenticated asks [`AuthCoordinator`] for a
//!    credential
//! 2. With no credential stored, the coordinator runs one token fetch
//!    (`POST /token` with `pubKey` and `deviceID`), shared by every
//!    concurrent caller
//! 3. [`RequestSigner`] builds the canonical request string, signs it with
//!    the device key and sets:
//!    - `Date` (the exact timestamp that was signed)
//!    - `Authorization: bread <token>:<signature>`
//!    - `X-Wallet-Id` when a wallet id is configured
//! 4. On a challenge the pipeline invalidates the credential it used and
//!    repeats steps 1-3 once
//!
//! ## Security
//!
//! - The private key never leaves [`DeviceIdentity`]
//! - Credentials redact themselves in `Debug` output
//! - Only the coordinator writes the credential store

pub mod canonical;
pub mod coordinator;
pub mod credential;
pub mod identity;
pub mod signer;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use canonical::CanonicalRequest;
pub use coordinator::AuthCoordinator;
pub use credential::{Credential, CredentialStore, FileCredentialStore, InMemoryCredentialStore};
pub use identity::{DeviceIdentity, Signature, SigningIdentity};
pub use signer::{AuthScheme, RequestSigner, SignedRequest};
pub use token::{HttpTokenFetcher, TokenFetcher};
