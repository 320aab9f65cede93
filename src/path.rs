//! Provider-tagged paths made of raw byte segments.
//!
//! A [`Path`] is an immutable value: an [`Origin`] naming the provider (and the
//! provider instance, e.g. which archive file or which document tree) that owns
//! it, an absolute flag, and an ordered list of name segments. Equality and
//! ordering are structural, so paths from different origins never compare equal
//! even when their string forms match.
//!
//! ## URI forms
//!
//! | Scheme | Example |
//! |--------|---------|
//! | `file` | `file:///home/user/a.txt` |
//! | `archive` | `archive:///home/user/x.zip#/inner/dir` |
//! | `content` | `content://com.example.provider/item/42` (the handle, verbatim) |
//! | `document` | `document://com.example.documents/primary%3ADownload#/sub/file` |
//!
//! Segments are percent-encoded, so names that are not valid UTF-8 survive the
//! round trip.

use std::fmt;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

use crate::{ByteString, FsError};

const SEPARATOR: u8 = b'/';

const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Provider scheme carried by every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Scheme {
    /// Local POSIX filesystem.
    File,
    /// Read-only archive contents.
    Archive,
    /// Opaque capability handles.
    Content,
    /// Externally owned document trees.
    Document,
}

impl Scheme {
    /// The scheme string used in URIs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::Archive => "archive",
            Scheme::Content => "content",
            Scheme::Document => "document",
        }
    }

    /// Look up a scheme by its URI string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "file" => Some(Scheme::File),
            "archive" => Some(Scheme::Archive),
            "content" => Some(Scheme::Content),
            "document" => Some(Scheme::Document),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one granted document tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeUri {
    /// Authority of the service that owns the tree.
    pub authority: String,
    /// Identifier of the document at the top of the tree.
    pub tree_id: String,
}

impl TreeUri {
    /// Create a tree identity.
    pub fn new(authority: impl Into<String>, tree_id: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            tree_id: tree_id.into(),
        }
    }
}

/// An opaque capability handle understood by a content resolver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentHandle(String);

impl ContentHandle {
    /// Wrap a handle string.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Best-effort display name: the decoded last segment of the handle.
    pub fn display_name(&self) -> String {
        let tail = self
            .0
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(self.0.as_str());
        percent_decode_str(tail).decode_utf8_lossy().into_owned()
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The provider instance a path belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    /// The local filesystem.
    Local,
    /// Inside the archive stored at this local file.
    Archive(Arc<std::path::PathBuf>),
    /// A single capability handle. Content paths have no segments.
    Content(ContentHandle),
    /// Inside a granted document tree.
    Document(Arc<TreeUri>),
}

impl Origin {
    /// Scheme of the provider owning this origin.
    pub fn scheme(&self) -> Scheme {
        match self {
            Origin::Local => Scheme::File,
            Origin::Archive(_) => Scheme::Archive,
            Origin::Content(_) => Scheme::Content,
            Origin::Document(_) => Scheme::Document,
        }
    }
}

/// A provider-tagged path.
///
/// # Examples
///
/// ```rust
/// use polyfs::Path;
///
/// let p = Path::local("/home/user/../user/docs");
/// assert_eq!(p.normalize().to_string(), "/home/user/docs");
/// assert_eq!(p.name_count(), 5);
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    origin: Origin,
    absolute: bool,
    segments: Vec<ByteString>,
}

impl Path {
    /// Parse slash-separated bytes into a path owned by `origin`.
    ///
    /// A leading `/` makes the path absolute; empty segments are dropped.
    pub fn parse(origin: Origin, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        Self {
            origin,
            absolute: bytes.first() == Some(&SEPARATOR),
            segments: split_segments(bytes),
        }
    }

    /// A local filesystem path.
    pub fn local(bytes: impl AsRef<[u8]>) -> Self {
        Self::parse(Origin::Local, bytes)
    }

    /// A local filesystem path from a standard library path.
    pub fn from_std(path: &std::path::Path) -> Self {
        use std::os::unix::ffi::OsStrExt;
        Self::local(path.as_os_str().as_bytes())
    }

    /// Root of the archive stored at `archive_file`.
    pub fn archive_root(archive_file: impl Into<std::path::PathBuf>) -> Self {
        Self::parse(Origin::Archive(Arc::new(archive_file.into())), b"/")
    }

    /// The path for a capability handle.
    pub fn content(handle: impl Into<String>) -> Self {
        Self {
            origin: Origin::Content(ContentHandle::new(handle)),
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// Root of a granted document tree.
    pub fn document_root(tree: TreeUri) -> Self {
        Self::parse(Origin::Document(Arc::new(tree)), b"/")
    }

    /// The provider instance owning this path.
    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Scheme of the owning provider.
    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.origin.scheme()
    }

    /// Returns `true` for absolute paths.
    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns `true` for an absolute path with no segments.
    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty() && !matches!(self.origin, Origin::Content(_))
    }

    /// The name segments.
    #[inline]
    pub fn segments(&self) -> &[ByteString] {
        &self.segments
    }

    /// Number of name segments.
    #[inline]
    pub fn name_count(&self) -> usize {
        self.segments.len()
    }

    /// The last segment, if any.
    pub fn file_name(&self) -> Option<&ByteString> {
        self.segments.last()
    }

    /// The path without its last segment.
    ///
    /// Returns `None` for roots, single-segment relative paths and content
    /// handles, which have no hierarchy.
    pub fn parent(&self) -> Option<Path> {
        if matches!(self.origin, Origin::Content(_)) || self.segments.is_empty() {
            return None;
        }
        if !self.absolute && self.segments.len() == 1 {
            return None;
        }
        Some(Self {
            origin: self.origin.clone(),
            absolute: self.absolute,
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The root of this path's origin, for absolute paths.
    pub fn root(&self) -> Option<Path> {
        if !self.absolute || matches!(self.origin, Origin::Content(_)) {
            return None;
        }
        Some(Self {
            origin: self.origin.clone(),
            absolute: true,
            segments: Vec::new(),
        })
    }

    /// Append a single name segment.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `name` is empty or contains `/`
    /// - [`FsError::NotSupported`] on content handles
    pub fn resolve_name(&self, name: impl Into<ByteString>) -> Result<Path, FsError> {
        self.check_hierarchical("resolve")?;
        let name = name.into();
        if name.is_empty() {
            return Err(FsError::InvalidPath {
                path: self.to_string(),
                reason: "empty name",
            });
        }
        if name.contains(SEPARATOR) {
            return Err(FsError::InvalidPath {
                path: name.to_string(),
                reason: "name contains a separator",
            });
        }
        let mut segments = self.segments.clone();
        segments.push(name);
        Ok(self.with_segments(self.absolute, segments))
    }

    /// Parse `rel` as a slash-separated path and resolve it against this one.
    ///
    /// An absolute `rel` replaces this path (keeping the origin).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] on content handles
    pub fn join(&self, rel: impl AsRef<[u8]>) -> Result<Path, FsError> {
        self.check_hierarchical("join")?;
        let other = Path::parse(self.origin.clone(), rel);
        self.resolve(&other)
    }

    /// Resolve `other` against this path.
    ///
    /// # Errors
    ///
    /// - [`FsError::ProviderMismatch`] if `other` has a different origin
    pub fn resolve(&self, other: &Path) -> Result<Path, FsError> {
        self.check_same_origin(other)?;
        if other.absolute {
            return Ok(other.clone());
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Ok(self.with_segments(self.absolute, segments))
    }

    /// Resolve `name` against this path's parent.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if there is no parent or `name` is invalid
    pub fn resolve_sibling(&self, name: impl Into<ByteString>) -> Result<Path, FsError> {
        match self.parent() {
            Some(parent) => parent.resolve_name(name),
            None if !self.absolute && self.segments.len() == 1 => {
                Path::parse(self.origin.clone(), b"").resolve_name(name)
            }
            None => Err(FsError::InvalidPath {
                path: self.to_string(),
                reason: "no parent",
            }),
        }
    }

    /// Resolve `rel` against this path and refuse results outside of it.
    ///
    /// The joined path is normalized first, so `a/../b` is accepted while
    /// `../b` is rejected.
    ///
    /// # Errors
    ///
    /// - [`FsError::ThreatDetected`] if the normalized result escapes `self`
    pub fn resolve_within(&self, rel: impl AsRef<[u8]>) -> Result<Path, FsError> {
        let base = self.normalize();
        let mut segments = base.segments.clone();
        segments.extend(split_segments(rel.as_ref()));
        let joined = self.with_segments(self.absolute, segments).normalize_relative_strict();
        match joined {
            Some(p) if p.starts_with(&base) => Ok(p),
            _ => Err(FsError::ThreatDetected {
                path: String::from_utf8_lossy(rel.as_ref()).into_owned(),
                reason: format!("escapes {base}"),
            }),
        }
    }

    /// The relative path that leads from this path to `other`.
    ///
    /// # Errors
    ///
    /// - [`FsError::ProviderMismatch`] if the origins differ
    /// - [`FsError::InvalidPath`] if one path is absolute and the other is not
    pub fn relativize(&self, other: &Path) -> Result<Path, FsError> {
        self.check_same_origin(other)?;
        if self.absolute != other.absolute {
            return Err(FsError::InvalidPath {
                path: other.to_string(),
                reason: "cannot relativize between absolute and relative paths",
            });
        }
        let common = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .count();
        let ups = self.segments.len() - common;
        let mut segments: Vec<ByteString> =
            std::iter::repeat_n(ByteString::from(".."), ups).collect();
        segments.extend(other.segments[common..].iter().cloned());
        Ok(self.with_segments(false, segments))
    }

    /// Collapse `.` segments and removable `..` segments.
    ///
    /// `..` at the root of an absolute path is dropped; leading `..` of a
    /// relative path is kept.
    pub fn normalize(&self) -> Path {
        let mut out: Vec<ByteString> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment.as_bytes() {
                b"." => {}
                b".." => match out.last() {
                    Some(last) if last.as_bytes() != b".." => {
                        out.pop();
                    }
                    _ if self.absolute => {}
                    _ => out.push(segment.clone()),
                },
                _ => out.push(segment.clone()),
            }
        }
        self.with_segments(self.absolute, out)
    }

    /// Returns `true` if `other` is a segment-wise prefix of this path.
    pub fn starts_with(&self, other: &Path) -> bool {
        self.origin == other.origin
            && self.absolute == other.absolute
            && self.segments.starts_with(&other.segments)
    }

    /// Returns `true` if `other` is a segment-wise suffix of this path.
    ///
    /// An absolute `other` must be equal to this path.
    pub fn ends_with(&self, other: &Path) -> bool {
        if other.absolute {
            return self == other;
        }
        self.origin == other.origin && self.segments.ends_with(&other.segments)
    }

    /// The slash-joined byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        if let Origin::Content(handle) = &self.origin {
            return handle.as_str().as_bytes().to_vec();
        }
        let mut out = Vec::new();
        if self.absolute {
            out.push(SEPARATOR);
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.extend_from_slice(segment.as_bytes());
        }
        out
    }

    /// The local filesystem path.
    pub fn to_std_path(&self) -> std::path::PathBuf {
        use std::os::unix::ffi::OsStrExt;
        std::path::PathBuf::from(std::ffi::OsStr::from_bytes(&self.to_bytes()))
    }

    /// Encode as a URI that [`Path::from_uri`] parses back into this path.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] for relative paths
    pub fn to_uri(&self) -> Result<String, FsError> {
        if !self.absolute {
            return Err(FsError::InvalidPath {
                path: self.to_string(),
                reason: "relative paths have no URI",
            });
        }
        let encoded = encode_absolute(&self.segments);
        Ok(match &self.origin {
            Origin::Local => format!("file://{encoded}"),
            Origin::Archive(file) => {
                let file_segments = split_segments(&Path::from_std_bytes(file));
                format!("archive://{}#{encoded}", encode_absolute(&file_segments))
            }
            Origin::Content(handle) => handle.as_str().to_string(),
            Origin::Document(tree) => format!(
                "document://{}/{}#{encoded}",
                tree.authority,
                utf8_percent_encode(&tree.tree_id, SEGMENT)
            ),
        })
    }

    /// Parse a URI produced by [`Path::to_uri`].
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if the URI is malformed
    /// - [`FsError::NotSupported`] if the scheme is unknown
    pub fn from_uri(uri: &str) -> Result<Path, FsError> {
        let url = Url::parse(uri).map_err(|_| FsError::InvalidPath {
            path: uri.to_string(),
            reason: "malformed URI",
        })?;
        let scheme = Scheme::from_name(url.scheme()).ok_or(FsError::NotSupported {
            operation: "unknown scheme",
        })?;
        let inner = |url: &Url| -> Vec<ByteString> { decode_segments(url.fragment().unwrap_or("/")) };
        // `Url` resolves `.` and `..` while parsing; segments come from the raw text.
        let raw = raw_path(uri);
        let path = match scheme {
            Scheme::File => Path {
                origin: Origin::Local,
                absolute: true,
                segments: decode_segments(raw),
            },
            Scheme::Archive => {
                let mut file = Vec::new();
                for segment in decode_segments(raw) {
                    file.push(SEPARATOR);
                    file.extend_from_slice(segment.as_bytes());
                }
                Path {
                    origin: Origin::Archive(Arc::new(std_path_from_bytes(&file))),
                    absolute: true,
                    segments: inner(&url),
                }
            }
            Scheme::Content => Path::content(uri),
            Scheme::Document => {
                let authority = url.host_str().unwrap_or_default().to_string();
                let tree_id = raw
                    .split(char::from(SEPARATOR))
                    .find(|s| !s.is_empty())
                    .ok_or(FsError::InvalidPath {
                        path: uri.to_string(),
                        reason: "missing tree identifier",
                    })?;
                let tree_id = percent_decode_str(tree_id).decode_utf8_lossy().into_owned();
                Path {
                    origin: Origin::Document(Arc::new(TreeUri { authority, tree_id })),
                    absolute: true,
                    segments: inner(&url),
                }
            }
        };
        Ok(path)
    }

    pub(crate) fn check_scheme(&self, expected: Scheme) -> Result<(), FsError> {
        let found = self.scheme();
        if found == expected {
            Ok(())
        } else {
            Err(FsError::ProviderMismatch { expected, found })
        }
    }

    fn check_same_origin(&self, other: &Path) -> Result<(), FsError> {
        if self.origin.scheme() != other.origin.scheme() {
            return Err(FsError::ProviderMismatch {
                expected: self.scheme(),
                found: other.scheme(),
            });
        }
        if self.origin != other.origin {
            return Err(FsError::InvalidPath {
                path: other.to_string(),
                reason: "belongs to another provider instance",
            });
        }
        Ok(())
    }

    fn check_hierarchical(&self, operation: &'static str) -> Result<(), FsError> {
        if matches!(self.origin, Origin::Content(_)) {
            return Err(FsError::NotSupported { operation });
        }
        Ok(())
    }

    fn with_segments(&self, absolute: bool, segments: Vec<ByteString>) -> Path {
        Path {
            origin: self.origin.clone(),
            absolute,
            segments,
        }
    }

    /// Like [`normalize`](Self::normalize) but `None` when a `..` would climb
    /// above the start of the path.
    fn normalize_relative_strict(&self) -> Option<Path> {
        let mut out: Vec<ByteString> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment.as_bytes() {
                b"." => {}
                b".." => {
                    out.pop()?;
                }
                _ => out.push(segment.clone()),
            }
        }
        Some(self.with_segments(self.absolute, out))
    }

    fn from_std_bytes(path: &std::path::Path) -> Vec<u8> {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::Archive(file) => write!(f, "archive:{}#{}", file.display(), self),
            Origin::Document(tree) => write!(f, "document:{}/{}#{}", tree.authority, tree.tree_id, self),
            origin => write!(f, "{}:{}", origin.scheme(), self),
        }
    }
}

/// The path component of `uri` as written, without authority, query or
/// fragment.
fn raw_path(uri: &str) -> &str {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    rest.find('/').map_or("", |start| &rest[start..])
}

fn split_segments(bytes: &[u8]) -> Vec<ByteString> {
    bytes
        .split(|b| *b == SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(ByteString::from)
        .collect()
}

fn encode_absolute(segments: &[ByteString]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.extend(percent_encoding::percent_encode(segment.as_bytes(), SEGMENT));
    }
    out
}

fn decode_segments(encoded: &str) -> Vec<ByteString> {
    encoded
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| ByteString::from(percent_decode_str(s).collect::<Vec<u8>>()))
        .collect()
}

fn std_path_from_bytes(bytes: &[u8]) -> std::path::PathBuf {
    use std::os::unix::ffi::OsStrExt;
    std::path::PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}
