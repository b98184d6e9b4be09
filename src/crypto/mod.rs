//! Authenticated encryption of PHI fields
//!
//! Two independently written codecs share one wire format (see [`wire`]):
//!
//! - [`FieldCipher`] runs in the backend with the long-term key
//! - [`SessionCodec`] runs where only an ephemeral session key is available
//!
//! A blob produced by either must decrypt with the other under the same key.
//!
//! # Examples
//!
//! ```rust
//! use phiscribe::crypto::{BlobCodec, EncryptionKey, FieldCipher, SessionCodec};
//!
//! let key = EncryptionKey::generate();
//! let backend = FieldCipher::new(&key);
//! let session = SessionCodec::new(&key);
//!
//! let blob = backend.encrypt("Иванов Петр").unwrap();
//! assert_eq!(session.decrypt(&blob).unwrap(), "Иванов Петр");
//! ```

pub mod codec;
pub mod key;
pub mod legacy;
pub mod session;
pub mod wire;

pub use codec::FieldCipher;
pub use key::EncryptionKey;
pub use legacy::{looks_encrypted, protect, read_protected, ProtectedField, RevealOrigin, RevealedField};
pub use session::SessionCodec;

use crate::domain::errors::CryptoError;

/// Text-in, text-out authenticated encryption
///
/// `encrypt("")` and `decrypt("")` both return `""`.
pub trait BlobCodec: Send + Sync {
    /// Encrypts plaintext into an encoded `nonce || ciphertext || tag` blob
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Decrypts an encoded blob
    ///
    /// Checks decodability, then minimum length, then the AEAD tag.
    fn decrypt(&self, blob: &str) -> Result<String, CryptoError>;

    /// Whether the codec holds a key
    fn is_configured(&self) -> bool;
}
