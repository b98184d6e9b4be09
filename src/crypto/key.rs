//! AES-256 key material

use super::wire::KEY_LEN;
use crate::domain::errors::CryptoError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 256-bit encryption key, wiped from memory on drop
///
/// Accepts standard base64 (44 characters) or 64 hex characters.
///
/// # Examples
///
/// ```
/// use phiscribe::crypto::EncryptionKey;
///
/// let key = EncryptionKey::generate();
/// let parsed = EncryptionKey::from_encoded(&key.to_base64()).unwrap();
/// assert_eq!(format!("{parsed:?}"), "EncryptionKey([REDACTED])");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Wraps raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a base64 or hex encoded key
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CryptoError::NotConfigured);
        }

        let mut bytes = if encoded.len() == KEY_LEN * 2
            && encoded.chars().all(|c| c.is_ascii_hexdigit())
        {
            decode_hex(encoded)?
        } else {
            STANDARD
                .decode(encoded)
                .map_err(|e| CryptoError::InvalidKey(format!("not valid base64: {e}")))?
        };

        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {len}"
            )));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Generates a fresh key from the OS random number generator
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Base64 form, for `keygen` output and configuration files
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, CryptoError> {
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| CryptoError::InvalidKey(format!("not valid hex: {e}")))
        })
        .collect()
}
