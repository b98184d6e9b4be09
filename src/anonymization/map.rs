//! Reversible placeholder map

use crate::crypto::BlobCodec;
use crate::domain::errors::ScribeError;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder token to original substring
///
/// Built fresh for each source text and never reused across unrelated texts.
/// Values are PHI: the map is only persisted encrypted, and its `Debug`
/// output lists placeholders only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymizationMap {
    entries: BTreeMap<String, String>,
}

impl AnonymizationMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a placeholder; an existing entry keeps its first original
    ///
    /// Returns false when the placeholder was already present.
    pub fn insert(&mut self, placeholder: impl Into<String>, original: impl Into<String>) -> bool {
        match self.entries.entry(placeholder.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(original.into());
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Original value for a placeholder
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).map(String::as_str)
    }

    /// Whether a placeholder is present
    pub fn contains(&self, placeholder: &str) -> bool {
        self.entries.contains_key(placeholder)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in placeholder order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Placeholders ordered by descending length, ties broken lexicographically
    ///
    /// Reversal must use this order, otherwise a key that is a textual prefix
    /// of a longer key corrupts the longer key's remainder.
    pub fn keys_longest_first(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        keys
    }

    /// Serializes to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encrypts the JSON form for persistence
    pub fn encrypt_with(&self, codec: &dyn BlobCodec) -> Result<String> {
        Ok(codec.encrypt(&self.to_json()?)?)
    }

    /// Decrypts a persisted map
    pub fn decrypt_with(codec: &dyn BlobCodec, blob: &str) -> Result<Self> {
        let json = codec.decrypt(blob)?;
        if json.is_empty() {
            return Err(ScribeError::Serialization(
                "encrypted anonymization map is empty".to_string(),
            ));
        }
        Self::from_json(&json)
    }

    /// SHA-256 hex digest of the placeholder keys, for correlating log events
    ///
    /// Originals never enter the digest.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for key in self.entries.keys() {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Debug for AnonymizationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnonymizationMap")
            .field("placeholders", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnonymizationMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
