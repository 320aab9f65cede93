//! Symlink and hard link operations.

use crate::{ByteString, FsError, Metadata, Path};

/// Symlink and hard link operations.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsLink`.
pub trait FsLink: Send + Sync {
    /// Create a symbolic link at `link` pointing to the raw `target`.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `link` already exists
    /// - [`FsError::NotSupported`] if the provider has no symlinks
    fn symlink(&self, link: &Path, target: &ByteString) -> Result<(), FsError>;

    /// Create a hard link at `link` to the existing entry `original`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `original` does not exist
    /// - [`FsError::AlreadyExists`] if `link` already exists
    fn hard_link(&self, link: &Path, original: &Path) -> Result<(), FsError>;

    /// Read the raw target of a symbolic link.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::NotSupported`] if the provider has no symlinks
    fn read_link(&self, path: &Path) -> Result<ByteString, FsError>;

    /// Get metadata without following symlinks.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError>;
}
