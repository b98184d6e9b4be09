//! Unicode-aware boundary matching
//!
//! ASCII word-boundary primitives (`\b` in many regex dialects) treat Cyrillic
//! letters as non-word characters, so "Петр" would match inside "Петров".
//! These helpers check neighbours with [`char::is_alphabetic`] instead, which
//! covers Latin, Cyrillic and every other script.
//!
//! A side of the needle is only constrained when the needle's own edge
//! character on that side is a letter or digit. Placeholders such as `[AGE]`
//! are delimited by their brackets and may sit directly against text.

/// True for letters of any script
pub fn is_letter(c: char) -> bool {
    c.is_alphabetic()
}

fn blocks(edge: char, neighbour: char) -> bool {
    if edge.is_numeric() {
        return is_letter(neighbour) || neighbour.is_numeric();
    }
    is_letter(edge) && is_letter(neighbour)
}

fn is_bounded(haystack: &str, start: usize, end: usize, needle: &str) -> bool {
    let (Some(first), Some(last)) = (needle.chars().next(), needle.chars().next_back()) else {
        return false;
    };

    if let Some(before) = haystack[..start].chars().next_back() {
        if blocks(first, before) {
            return false;
        }
    }
    if let Some(after) = haystack[end..].chars().next() {
        if blocks(last, after) {
            return false;
        }
    }
    true
}

/// Iterator over byte offsets of bounded, non-overlapping matches
pub struct BoundedMatches<'h, 'n> {
    haystack: &'h str,
    needle: &'n str,
    pos: usize,
}

impl Iterator for BoundedMatches<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.needle.is_empty() {
            return None;
        }
        while self.pos <= self.haystack.len() {
            let offset = self.haystack[self.pos..].find(self.needle)?;
            let start = self.pos + offset;
            let end = start + self.needle.len();

            if is_bounded(self.haystack, start, end, self.needle) {
                self.pos = end;
                return Some(start);
            }

            // Rejected: resume one character later so overlapping candidates are still seen
            let step = self.haystack[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.pos = start + step;
        }
        None
    }
}

/// Finds every bounded occurrence of `needle` in `haystack`
///
/// # Examples
///
/// ```
/// use phiscribe::anonymization::boundary::find_bounded;
///
/// let hits: Vec<usize> = find_bounded("Петр и Петров", "Петр").collect();
/// assert_eq!(hits, vec![0]);
/// ```
pub fn find_bounded<'h, 'n>(haystack: &'h str, needle: &'n str) -> BoundedMatches<'h, 'n> {
    BoundedMatches {
        haystack,
        needle,
        pos: 0,
    }
}

/// Replaces every bounded occurrence of `needle`, returning the new text and
/// the number of replacements
pub fn replace_bounded(haystack: &str, needle: &str, replacement: &str) -> (String, usize) {
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    let mut count = 0;

    for start in find_bounded(haystack, needle) {
        out.push_str(&haystack[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
        count += 1;
    }

    if count == 0 {
        return (haystack.to_string(), 0);
    }
    out.push_str(&haystack[last..]);
    (out, count)
}
