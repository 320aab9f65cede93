//! Read operations.

use std::io::Read;

use crate::{AccessMode, FsError, Metadata, Path};

/// Read operations for a provider.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access; providers use interior mutability for their caches.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::IsADirectory`] if the path is a directory
    /// - [`FsError::ProviderMismatch`] if the path belongs to another provider
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, FsError>;

    /// Get metadata for a path (follows symlinks).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;

    /// Verify that `mode` access is possible.
    ///
    /// Succeeds with `Ok(())` or fails with the reason access is impossible.
    /// [`AccessMode::EXISTS`] only checks existence.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::PermissionDenied`] if access is denied
    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError>;

    /// Check if a path exists.
    ///
    /// Performs a real probe: `Ok(false)` only when the probe fails with
    /// "not found"; other failures are returned.
    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.check_access(path, AccessMode::EXISTS) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == crate::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_read_is_object_safe() {
        fn _check(_: &dyn FsRead) {}
    }

    #[test]
    fn fs_read_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: FsRead>() {
            _assert_send_sync::<T>();
        }
    }
}
