//! Placeholder reversal

use super::boundary::replace_bounded;
use super::map::AnonymizationMap;

/// Restores original values in generated text
///
/// Keys are applied longest first so that a key which is a textual prefix of
/// a longer key never consumes part of it. Placeholders absent from the map
/// are left as they are.
///
/// # Examples
///
/// ```
/// use phiscribe::anonymization::{deanonymize, AnonymizationMap};
///
/// let map: AnonymizationMap = [("[A]", "xx"), ("[AB]", "yy")].into_iter().collect();
/// assert_eq!(deanonymize("[AB] and [C]", &map), "yy and [C]");
/// ```
pub fn deanonymize(text: &str, map: &AnonymizationMap) -> String {
    let mut restored = text.to_string();
    for key in map.keys_longest_first() {
        if let Some(original) = map.get(key) {
            let (next, _) = replace_bounded(&restored, key, original);
            restored = next;
        }
    }
    restored
}
