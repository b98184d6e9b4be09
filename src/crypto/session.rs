//! Session-scoped codec for less-trusted contexts
//!
//! Holds only an ephemeral key handed out for one session. It is written
//! against the detached-tag AEAD API and lays out the blob by explicit
//! offsets rather than relying on the combined `ciphertext || tag` output, so
//! a disagreement about the wire format between the two codecs shows up in
//! the parity tests instead of in production data.

use super::key::EncryptionKey;
use super::wire::{MIN_BLOB_LEN, NONCE_LEN, TAG_LEN};
use super::BlobCodec;
use crate::domain::errors::CryptoError;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

const NO_AAD: &[u8] = b"";

/// Codec bound to one ephemeral session key
pub struct SessionCodec {
    cipher: Aes256Gcm,
}

impl SessionCodec {
    /// Binds a codec to the given session key
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Generates a fresh session key and a codec bound to it
    pub fn ephemeral() -> (Self, EncryptionKey) {
        let key = EncryptionKey::generate();
        (Self::new(&key), key)
    }
}

impl BlobCodec for SessionCodec {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut out = vec![0u8; NONCE_LEN + plaintext.len() + TAG_LEN];
        OsRng.fill_bytes(&mut out[..NONCE_LEN]);

        let body_end = NONCE_LEN + plaintext.len();
        out[NONCE_LEN..body_end].copy_from_slice(plaintext.as_bytes());

        let (head, rest) = out.split_at_mut(NONCE_LEN);
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(head), NO_AAD, &mut rest[..plaintext.len()])
            .map_err(|_| CryptoError::EncryptionFailed)?;
        out[body_end..].copy_from_slice(&tag);

        Ok(STANDARD.encode(&out))
    }

    fn decrypt(&self, blob: &str) -> Result<String, CryptoError> {
        if blob.is_empty() {
            return Ok(String::new());
        }

        let raw = STANDARD
            .decode(blob.trim())
            .map_err(|e| CryptoError::MalformedInput(format!("invalid base64: {e}")))?;
        if raw.len() < MIN_BLOB_LEN {
            return Err(CryptoError::MalformedInput(format!(
                "decoded length {} is shorter than {MIN_BLOB_LEN} bytes",
                raw.len()
            )));
        }

        let tag_start = raw.len() - TAG_LEN;
        let nonce = Nonce::from_slice(&raw[..NONCE_LEN]);
        let tag = GenericArray::from_slice(&raw[tag_start..]);
        let mut body = raw[NONCE_LEN..tag_start].to_vec();

        self.cipher
            .decrypt_in_place_detached(nonce, NO_AAD, &mut body, tag)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        String::from_utf8(body)
            .map_err(|_| CryptoError::MalformedInput("plaintext is not valid UTF-8".to_string()))
    }

    fn is_configured(&self) -> bool {
        true
    }
}
