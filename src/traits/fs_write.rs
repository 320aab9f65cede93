//! Write, delete, rename, copy and move operations.

use std::fs::File;
use std::io::{self, Read, Seek, Write};

use crate::{ByteString, CopyOptions, FsError, OpenOptions, Path};

/// A seekable byte channel.
///
/// Channels are single-owner handles and are not internally synchronized.
pub trait Channel: Read + Write + Seek + Send {
    /// Current size of the underlying file.
    fn size(&mut self) -> io::Result<u64>;

    /// Shrink or extend the underlying file to `size` bytes.
    fn truncate(&mut self, size: u64) -> io::Result<()>;
}

impl Channel for File {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.set_len(size)
    }
}

/// Mutating operations for a provider.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Open a file for writing with the given flags.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::AlreadyExists`] if `create_new` is set and the file exists
    /// - [`FsError::ReadOnly`] if the provider is read-only, of kind
    ///   [`ErrorKind::NotSupported`](crate::ErrorKind::NotSupported)
    fn open_write(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError>;

    /// Open a seekable channel with the given flags.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] if the backend has no random access
    fn open_channel(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Channel>, FsError>;

    /// Delete a file, symlink or empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::DirectoryNotEmpty`] if the directory has entries
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Rename an entry within its parent directory, returning the new path.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `new_name` is not a single segment
    /// - [`FsError::NotFound`] if the path does not exist
    fn rename(&self, path: &Path, new_name: &ByteString) -> Result<Path, FsError>;

    /// Copy `source` to `target`.
    ///
    /// Directories are copied shallowly (the directory itself, not its
    /// entries). Progress and cancellation follow `options`.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `target` exists and `replace_existing` is unset
    /// - [`FsError::Interrupted`] if `options.interrupt` fired between chunks
    fn copy(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError>;

    /// Move `source` to `target`.
    ///
    /// Uses a native rename when possible and falls back to copy-then-delete
    /// unless `atomic_move` is set.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `target` exists and `replace_existing` is unset
    fn move_to(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError>;
}
