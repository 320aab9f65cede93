//! # polyfs
//!
//! A unified virtual filesystem over heterogeneous backends: the local POSIX
//! filesystem, read-only archives, opaque content handles and externally
//! owned document trees.
//!
//! Every backend is a **provider** implementing the same capability contract.
//! Every [`Path`] carries the identity of the provider that owns it, so a
//! [`Registry`] can route any operation without the caller knowing which
//! backend is involved.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use polyfs::{ArchiveProvider, FsError, FsExt, Registry};
//!
//! fn archive_readme(registry: &Registry, archive: &ArchiveProvider) -> Result<Vec<u8>, FsError> {
//!     let root = archive.open_archive("/tmp/bundle.zip")?;
//!     registry.read_all(&root.join("docs/README.md")?)
//! }
//!
//! let registry = Registry::new();
//! let archive = Arc::new(ArchiveProvider::new());
//! registry.register(archive.clone());
//! # let _ = archive_readme;
//! ```
//!
//! ---
//!
//! ## Providers
//!
//! | Provider | Scheme | Backed by |
//! |----------|--------|-----------|
//! | [`LocalProvider`] | `file` | POSIX system calls (Linux, Android) |
//! | [`ArchiveProvider`] | `archive` | zip and tar files, read-only |
//! | [`ContentProvider`] | `content` | a host [`ContentResolver`] |
//! | [`DocumentProvider`] | `document` | a host [`DocumentBackend`] |
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! Core:      FsRead + FsWrite + FsDir          = Fs
//! Extended:  Fs + FsLink + FsPermissions        = FsFull
//! Provider:  FsFull + scheme() + xattrs()       = Provider
//! ```
//!
//! [`Fs`] and [`FsFull`] have **blanket implementations**. Operations a
//! backend cannot perform fail with [`FsError::NotSupported`].
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FsError>`. Errors include context, and
//! [`FsError::kind`] gives the provider-independent category:
//!
//! ```rust
//! use polyfs::{ErrorKind, FsError};
//!
//! let err = FsError::PermissionDenied {
//!     path: "/secret".into(),
//!     operation: "read",
//! };
//! assert_eq!(err.to_string(), "read: permission denied: /secret");
//! assert_eq!(err.kind(), ErrorKind::AccessDenied);
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. Providers keep their
//! caches behind interior mutability, so a provider can be shared through an
//! `Arc` without locking at the call site. Streams and channels are
//! single-owner.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Metadata`], [`Permissions`], [`DocumentConfig`], etc., plus `FsExtJson` |

// Private modules
mod archive;
mod bytes;
mod content;
pub(crate) mod copy;
mod document;
mod error;
mod ext;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod local;
mod path;
mod registry;
mod traits;
mod types;
mod view;

// Public re-exports - error types
pub use error::{ErrorKind, FsError, SyscallError};

// Public re-exports - paths
pub use bytes::ByteString;
pub use path::{ContentHandle, Origin, Path, Scheme, TreeUri};

// Public re-exports - core types
pub use types::{
    AccessMode, CopyOptions, DIRECTORY_MIME_TYPE, DirEntry, FileType, GENERIC_MIME_TYPE, Interrupt,
    Metadata, OpenOptions, Permissions, ProgressListener,
};

// Public re-exports - capability contract
pub use traits::{
    Channel, Fs, FsDir, FsFull, FsLink, FsPermissions, FsRead, FsWrite, FsXattr, Provider,
    ReadDirIter, SECURITY_CONTEXT_XATTR,
};

// Public re-exports - providers
pub use archive::{
    ArchiveConfig, ArchiveEntry, ArchiveItem, ArchiveProvider, ArchiveTree, NameEncoding,
};
pub use content::{ContentProvider, ContentResolver};
pub use document::{
    DEFAULT_CACHE_CAPACITY, DocumentBackend, DocumentConfig, DocumentId, DocumentIdCache,
    DocumentProvider, DocumentRow,
};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use local::LocalProvider;

// Public re-exports - routing and front ends
pub use ext::FsExt;
pub use registry::Registry;
pub use view::{DEFAULT_GROUP, DEFAULT_OWNER, FileView, ViewSession};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
