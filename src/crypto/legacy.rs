//! Reading PHI fields written before the explicit encryption flag existed
//!
//! New writes always go through [`protect`], which records whether the value
//! is ciphertext. Records without the flag are classified with
//! [`looks_encrypted`], which is a migration aid only: plaintext that happens
//! to be long base64-shaped text is misclassified, and ciphertext shorter than
//! the threshold is read as plaintext.

use super::BlobCodec;
use crate::domain::errors::CryptoError;
use serde::{Deserialize, Serialize};

/// Values at or below this length are never treated as ciphertext
pub const HEURISTIC_MIN_LEN: usize = 100;

/// Returns true when an unflagged value is probably an encrypted blob
///
/// Requires length above [`HEURISTIC_MIN_LEN`], only base64 alphabet
/// characters, and no `:` or line break (both frequent in transcripts).
pub fn looks_encrypted(value: &str) -> bool {
    value.len() > HEURISTIC_MIN_LEN
        && !value.contains(':')
        && !value.contains('\n')
        && !value.contains('\r')
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

/// A stored PHI field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedField {
    /// Stored value (ciphertext or plaintext)
    pub value: String,

    /// Explicit flag; `None` for records predating the flag
    #[serde(default)]
    pub encrypted: Option<bool>,
}

impl ProtectedField {
    /// Wraps a value from a legacy record without a flag
    pub fn legacy(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            encrypted: None,
        }
    }
}

/// How a revealed value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealOrigin {
    /// Flagged (or classified) as plaintext
    Plaintext,
    /// Flagged as encrypted and decrypted
    Decrypted,
    /// Unflagged, classified as ciphertext and decrypted; should be re-written with a flag
    HeuristicDecrypted,
    /// Unflagged, looked like ciphertext but did not decrypt
    HeuristicPlaintextFallback,
}

/// Plaintext of a protected field along with how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedField {
    pub text: String,
    pub origin: RevealOrigin,
}

/// Encrypts a value and records the explicit flag
pub fn protect(codec: &dyn BlobCodec, text: &str) -> Result<ProtectedField, CryptoError> {
    Ok(ProtectedField {
        value: codec.encrypt(text)?,
        encrypted: Some(true),
    })
}

/// Reveals a protected field
///
/// Flagged fields hard-fail on any decryption error. Unflagged fields that
/// look encrypted but fail with [`CryptoError::MalformedInput`] or
/// [`CryptoError::AuthenticationFailed`] are returned as plaintext.
pub fn read_protected(
    codec: &dyn BlobCodec,
    field: &ProtectedField,
) -> Result<RevealedField, CryptoError> {
    match field.encrypted {
        Some(true) => Ok(RevealedField {
            text: codec.decrypt(&field.value)?,
            origin: RevealOrigin::Decrypted,
        }),
        Some(false) => Ok(plaintext(field, RevealOrigin::Plaintext)),
        None if !looks_encrypted(&field.value) => Ok(plaintext(field, RevealOrigin::Plaintext)),
        None => match codec.decrypt(&field.value) {
            Ok(text) => {
                tracing::warn!(
                    target: "phiscribe::audit",
                    value_len = field.value.len(),
                    "Unflagged legacy field decrypted via heuristic; re-write it with an explicit flag"
                );
                Ok(RevealedField {
                    text,
                    origin: RevealOrigin::HeuristicDecrypted,
                })
            }
            Err(CryptoError::MalformedInput(_) | CryptoError::AuthenticationFailed) => {
                tracing::debug!(
                    value_len = field.value.len(),
                    "Base64-shaped legacy field did not decrypt, treating as plaintext"
                );
                Ok(plaintext(field, RevealOrigin::HeuristicPlaintextFallback))
            }
            Err(e) => Err(e),
        },
    }
}

fn plaintext(field: &ProtectedField, origin: RevealOrigin) -> RevealedField {
    RevealedField {
        text: field.value.clone(),
        origin,
    }
}
