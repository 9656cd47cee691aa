//! Names from the string table.
//!
//! The string table holds plain null-terminated byte strings. Content tools
//! write Shift-JIS as readily as ASCII, so names stay raw bytes and are only
//! decoded (lossily) for display.

use std::borrow::Cow;
use std::fmt;

/// A name borrowed from the loaded file's string table.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name<'a>(&'a [u8]);

impl<'a> Name<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Name(bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The name as UTF-8, with invalid sequences replaced.
    pub fn to_str_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.0)
    }

    /// See [`make_canonical_name`].
    pub fn canonical(&self) -> Name<'a> {
        Name(make_canonical_name(self.0))
    }
}

impl<'a> From<&'a str> for Name<'a> {
    fn from(s: &'a str) -> Self {
        Name(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Name<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Name(bytes)
    }
}

impl AsRef<[u8]> for Name<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

impl PartialEq<str> for Name<'_> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Name<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl fmt::Debug for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_str_lossy(), f)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Name<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_str_lossy())
    }
}

/// Normalize an object name for matching across naming conventions.
///
/// Keeps the bytes after the last `-`, then cuts them at the first `_` whose
/// following segment is empty or not purely ASCII letters:
/// `enemy-Goomba_A01` becomes `Goomba`, while `Koopa_Troopa` is kept.
pub fn make_canonical_name(raw: &[u8]) -> &[u8] {
    let tail = match raw.iter().rposition(|&b| b == b'-') {
        Some(dash) => &raw[dash + 1..],
        None => raw,
    };

    let mut from = 0;
    while let Some(found) = tail[from..].iter().position(|&b| b == b'_') {
        let cut = from + found;
        let rest = &tail[cut + 1..];
        let segment = rest.iter().position(|&b| b == b'_').map_or(rest, |end| &rest[..end]);
        if segment.is_empty() || !segment.iter().all(u8::is_ascii_alphabetic) {
            return &tail[..cut];
        }
        from = cut + 1;
    }
    tail
}
