//! Attribute setters.

use std::time::SystemTime;

use crate::{FsError, Path, Permissions};

/// Ownership, mode and timestamp setters.
///
/// Setters never follow a symlink at `path`.
pub trait FsPermissions: Send + Sync {
    /// Set the permission bits.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::NotSupported`] if the provider has no permission bits
    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError>;

    /// Change the numeric owner and/or group. `None` leaves a value unchanged.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the caller may not change ownership
    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError>;

    /// Set modification and/or access time. `None` leaves a value unchanged.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] if the provider cannot set times
    fn set_times(
        &self,
        path: &Path,
        modified: Option<SystemTime>,
        accessed: Option<SystemTime>,
    ) -> Result<(), FsError>;
}
