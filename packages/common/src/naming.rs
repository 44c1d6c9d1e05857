use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Separator that replaces whitespace, `-` and `_` runs in canonical keys.
pub const SEPARATOR: char = '_';

/// A normalized asset name.
///
/// Keys double as index lookup keys and as storage filename stems, so the
/// alphabet is restricted to `[a-z0-9_]` with no leading, trailing or
/// repeated separators. The only way to build one is through [`normalize`]
/// or [`normalize_bounded`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalKey({})", self.0)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CanonicalKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(normalize(&s))
    }
}

/// Normalize a free-form label into its canonical key.
///
/// Never fails: labels with no usable characters produce an empty key, which
/// callers treat as a miss.
pub fn normalize(label: &str) -> CanonicalKey {
    let mut out = String::with_capacity(label.len());
    let mut pending_separator = false;

    for c in label.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }

        if c.is_whitespace() || c == '-' || c == SEPARATOR {
            pending_separator = !out.is_empty();
            continue;
        }

        let folded = match c {
            'a'..='z' | '0'..='9' => None,
            'æ' => Some("ae"),
            'œ' => Some("oe"),
            'ß' => Some("ss"),
            'ø' => Some("o"),
            'ł' => Some("l"),
            'đ' => Some("d"),
            _ => continue,
        };

        if pending_separator {
            out.push(SEPARATOR);
            pending_separator = false;
        }
        match folded {
            Some(s) => out.push_str(s),
            None => out.push(c),
        }
    }

    CanonicalKey(out)
}

/// Normalize and bound the key to at most `max_chars` characters.
///
/// Truncation never leaves a dangling separator, so the result is still a
/// fixed point of [`normalize`].
pub fn normalize_bounded(label: &str, max_chars: usize) -> CanonicalKey {
    let CanonicalKey(mut key) = normalize(label);
    if key.len() > max_chars {
        // Keys are ASCII, so byte and char offsets agree.
        key.truncate(max_chars);
        while key.ends_with(SEPARATOR) {
            key.pop();
        }
    }
    CanonicalKey(key)
}
