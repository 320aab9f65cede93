//! Raw byte strings used for path segments and link targets.

use std::borrow::Borrow;
use std::fmt;

/// An immutable sequence of raw bytes.
///
/// Filesystem names are not guaranteed to be valid UTF-8, so path segments are
/// kept as bytes and only decoded (lossily) for display.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByteString(Vec<u8>);

impl ByteString {
    /// Create an empty byte string.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Borrow the raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Number of bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `byte` occurs anywhere in the string.
    pub fn contains(&self, byte: u8) -> bool {
        self.0.contains(&byte)
    }

    /// Returns `true` if the string ends with `suffix`.
    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.0.ends_with(suffix)
    }

    /// Decode as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Decode as UTF-8 if valid.
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&[u8]> for ByteString {
    fn from(b: &[u8]) -> Self {
        Self(b.to_vec())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for ByteString {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<str> for ByteString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_string_keeps_invalid_utf8() {
        let raw = vec![b'a', 0xff, b'b'];
        let s = ByteString::from(raw.clone());
        assert_eq!(s.as_bytes(), raw.as_slice());
        assert_eq!(s.to_str(), None);
        assert_eq!(s.to_string_lossy(), "a\u{fffd}b");
    }

    #[test]
    fn byte_string_ordering_is_bytewise() {
        let a = ByteString::from("a");
        let b = ByteString::from("b");
        let upper = ByteString::from("B");
        assert!(a < b);
        assert!(upper < a);
    }

    #[test]
    fn byte_string_compares_with_str() {
        let s = ByteString::from("name");
        assert_eq!(s, "name");
        assert!(s.contains(b'm'));
        assert!(!s.contains(b'/'));
    }
}
