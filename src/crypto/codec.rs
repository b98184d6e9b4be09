//! Backend field cipher holding the long-term key

use super::key::EncryptionKey;
use super::wire::{self, NONCE_LEN};
use super::BlobCodec;
use crate::domain::errors::CryptoError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

/// AES-256-GCM codec for PHI fields at rest
///
/// A cipher built without a key is *unconfigured*: every non-empty operation
/// fails with [`CryptoError::NotConfigured`] so callers can refuse work up
/// front.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Option<Aes256Gcm>,
}

impl FieldCipher {
    /// Creates a configured cipher
    pub fn new(key: &EncryptionKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Some(Aes256Gcm::new(key)),
        }
    }

    /// Creates a cipher without a key
    pub fn unconfigured() -> Self {
        Self { cipher: None }
    }

    /// Parses an encoded key; empty input yields an unconfigured cipher
    pub fn from_encoded_key(encoded: Option<&str>) -> Result<Self, CryptoError> {
        match encoded.map(str::trim).filter(|s| !s.is_empty()) {
            Some(encoded) => Ok(Self::new(&EncryptionKey::from_encoded(encoded)?)),
            None => Ok(Self::unconfigured()),
        }
    }

    fn cipher(&self) -> Result<&Aes256Gcm, CryptoError> {
        self.cipher.as_ref().ok_or(CryptoError::NotConfigured)
    }
}

impl BlobCodec for FieldCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let cipher = self.cipher()?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        // Output is ciphertext || tag
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed);
        Ok(wire::encode(&blob))
    }

    fn decrypt(&self, blob: &str) -> Result<String, CryptoError> {
        if blob.is_empty() {
            return Ok(String::new());
        }
        let cipher = self.cipher()?;

        let bytes = wire::decode(blob)?;
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::MalformedInput("plaintext is not valid UTF-8".to_string()))
    }

    fn is_configured(&self) -> bool {
        self.cipher.is_some()
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("configured", &self.is_configured())
            .finish()
    }
}
