// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device signing identity.
//!
//! The device key is a secp256k1 key. Requests are signed with a compact,
//! recoverable ECDSA signature over the double SHA-256 of the canonical
//! request string, so the server can recover the public key it registered
//! at token issuance. Public keys and signatures travel Base58 encoded.
//!
//! The private key never leaves [`DeviceIdentity`]: callers hand it bytes
//! and get a signature back.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use k256::SecretKey;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::storage::{DeviceStorage, StorageError, StorageResult};

/// Compact signature length: header byte + r (32) + s (32).
const COMPACT_SIGNATURE_LEN: usize = 65;
/// Base value of the compact signature header byte.
const COMPACT_HEADER_BASE: u8 = 27;
/// Header flag marking that the signer's public key is compressed.
const COMPRESSED_KEY_FLAG: u8 = 4;

/// Something that can sign on behalf of this device.
pub trait SigningIdentity: Send + Sync {
    fn device_id(&self) -> &str;

    /// Whether a key is provisioned. `false` before onboarding.
    fn has_key(&self) -> bool;

    /// Base58 encoded compressed public key.
    fn public_key_encoded(&self) -> Result<String, AuthError>;

    /// Raw compact signature over `message`.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AuthError>;
}

/// A signature produced for one outgoing request.
///
/// `timestamp` is the exact `Date` header value that went into the signed
/// canonical string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    raw: Vec<u8>,
    timestamp: String,
}

impl Signature {
    pub fn new(raw: Vec<u8>, timestamp: impl Into<String>) -> Self {
        Self {
            raw,
            timestamp: timestamp.into(),
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Base58 form used in the `Authorization` header.
    pub fn encoded(&self) -> String {
        bs58::encode(&self.raw).into_string()
    }
}

/// The secp256k1 identity of this device.
pub struct DeviceIdentity {
    device_id: String,
    key: Option<SigningKey>,
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("has_key", &self.key.is_some())
            .finish()
    }
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>, key: SigningKey) -> Self {
        Self {
            device_id: device_id.into(),
            key: Some(key),
        }
    }

    /// Identity of a device that has not been onboarded yet.
    pub fn without_key(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            key: None,
        }
    }

    /// Fresh in-memory identity with a random key.
    pub fn generate(device_id: impl Into<String>) -> Self {
        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        Self::new(device_id, SigningKey::from(&secret))
    }

    /// Build from a raw 32-byte secp256k1 secret.
    pub fn from_secret_bytes(device_id: impl Into<String>, secret: &[u8]) -> StorageResult<Self> {
        let key = SigningKey::from_slice(secret)
            .map_err(|e| StorageError::InvalidKey(format!("Invalid secret: {e}")))?;
        Ok(Self::new(device_id, key))
    }

    /// Build from a PEM encoded private key (SEC1 or PKCS#8).
    pub fn from_pem(device_id: impl Into<String>, pem_bytes: &[u8]) -> StorageResult<Self> {
        let secret = secret_key_from_pem(pem_bytes)?;
        Ok(Self::new(device_id, SigningKey::from(&secret)))
    }

    /// Load the identity persisted in `storage`.
    ///
    /// The device id is created on first use. A missing key file yields an
    /// identity without key rather than an error.
    pub fn load(storage: &DeviceStorage) -> StorageResult<Self> {
        let device_id = load_or_create_device_id(storage)?;
        match storage.read_optional(storage.paths().device_key())? {
            Some(pem_bytes) => Self::from_pem(device_id, &pem_bytes),
            None => Ok(Self::without_key(device_id)),
        }
    }

    /// Generate a key for this device and persist it (account creation).
    ///
    /// Replaces any existing key.
    pub fn provision(storage: &DeviceStorage) -> StorageResult<Self> {
        let device_id = load_or_create_device_id(storage)?;
        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        let pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| StorageError::InvalidKey(format!("PEM encoding failed: {e}")))?;
        storage.write_atomic(storage.paths().device_key(), pem.as_bytes())?;
        info!(device_id = %device_id, "Provisioned device signing key");
        Ok(Self::new(device_id, SigningKey::from(&secret)))
    }

    fn key(&self) -> Result<&SigningKey, AuthError> {
        self.key.as_ref().ok_or(AuthError::NoKeyAvailable)
    }
}

impl SigningIdentity for DeviceIdentity {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn has_key(&self) -> bool {
        self.key.is_some()
    }

    fn public_key_encoded(&self) -> Result<String, AuthError> {
        Ok(encode_public_key(self.key()?.verifying_key()))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AuthError> {
        sign_compact(self.key()?, message)
    }
}

/// SHA-256 applied twice, the digest the server verifies signatures over.
pub fn double_sha256(message: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(message);
    Sha256::digest(first).into()
}

/// Recover the Base58 public key that produced a compact signature.
///
/// Mirrors the server-side check; used to verify signed requests in tests
/// and diagnostics.
pub fn recover_signer(message: &[u8], compact: &[u8]) -> Result<String, AuthError> {
    if compact.len() != COMPACT_SIGNATURE_LEN {
        return Err(AuthError::Signing(format!(
            "compact signature must be {COMPACT_SIGNATURE_LEN} bytes, got {}",
            compact.len()
        )));
    }
    let header = compact[0]
        .checked_sub(COMPACT_HEADER_BASE + COMPRESSED_KEY_FLAG)
        .ok_or_else(|| AuthError::Signing("unsupported signature header".to_string()))?;
    let recovery_id = RecoveryId::from_byte(header)
        .ok_or_else(|| AuthError::Signing("invalid recovery id".to_string()))?;
    let signature = EcdsaSignature::from_slice(&compact[1..])
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    let key = VerifyingKey::recover_from_prehash(&double_sha256(message), &signature, recovery_id)
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    Ok(encode_public_key(&key))
}

fn sign_compact(key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, AuthError> {
    let digest = double_sha256(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| AuthError::Signing(e.to_string()))?;

    let mut compact = Vec::with_capacity(COMPACT_SIGNATURE_LEN);
    compact.push(COMPACT_HEADER_BASE + COMPRESSED_KEY_FLAG + recovery_id.to_byte());
    compact.extend_from_slice(&signature.to_bytes());
    Ok(compact)
}

fn encode_public_key(key: &VerifyingKey) -> String {
    bs58::encode(key.to_encoded_point(true).as_bytes()).into_string()
}

fn secret_key_from_pem(pem_bytes: &[u8]) -> StorageResult<SecretKey> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| StorageError::InvalidKey(format!("Invalid UTF-8: {e}")))?;
    let pem = pem::parse(pem_str.trim())
        .map_err(|e| StorageError::InvalidKey(format!("Invalid PEM: {e}")))?;

    SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| SecretKey::from_pkcs8_der(pem.contents()))
        .map_err(|e| StorageError::InvalidKey(format!("Invalid key format: {e}")))
}

fn load_or_create_device_id(storage: &DeviceStorage) -> StorageResult<String> {
    let path = storage.paths().device_id();
    if let Some(raw) = storage.read_optional(&path)? {
        let existing = String::from_utf8_lossy(&raw).trim().to_string();
        if !existing.is_empty() {
            return Ok(existing);
        }
    }
    let device_id = Uuid::new_v4().to_string();
    storage.write_atomic(&path, device_id.as_bytes())?;
    Ok(device_id)
}
