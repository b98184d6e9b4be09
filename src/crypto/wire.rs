//! Encrypted blob wire format
//!
//! ```text
//! +-----------+---------------------+-----------+
//! | nonce(12) | ciphertext (n >= 0) | tag(16)   |
//! +-----------+---------------------+-----------+
//! ```
//!
//! The concatenation is then encoded with standard padded base64. Every
//! consumer of encrypted fields (both codecs in this crate, export tooling,
//! UIs) must produce and accept exactly this layout.

use crate::domain::errors::CryptoError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// Shortest decodable blob (empty ciphertext)
pub const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN;

/// Encodes raw blob bytes for storage or transport
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a blob and checks the minimum length
///
/// Errors are always [`CryptoError::MalformedInput`]; tag verification is the
/// codec's job.
pub fn decode(blob: &str) -> Result<Vec<u8>, CryptoError> {
    let bytes = STANDARD
        .decode(blob.trim())
        .map_err(|e| CryptoError::MalformedInput(format!("invalid base64: {e}")))?;

    if bytes.len() < MIN_BLOB_LEN {
        return Err(CryptoError::MalformedInput(format!(
            "decoded length {} is shorter than {MIN_BLOB_LEN} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}
