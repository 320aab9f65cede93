//! # Provider Traits
//!
//! The capability contract every backend implements.
//!
//! ## Trait Layers
//!
//! ```text
//! Core:      FsRead + FsWrite + FsDir          = Fs
//! Extended:  Fs + FsLink + FsPermissions        = FsFull
//! Provider:  FsFull + scheme() + xattrs()       = Provider
//! ```
//!
//! [`Fs`] and [`FsFull`] have blanket implementations. [`Provider`] is
//! implemented explicitly because it names the scheme a backend owns.
//!
//! Every provider implements every component trait. Operations a backend cannot
//! perform fail with [`FsError::NotSupported`](crate::FsError::NotSupported)
//! rather than silently doing nothing, so callers can probe capabilities by
//! calling them.
//!
//! ## Object Safety
//!
//! All traits are object-safe; the registry stores providers as
//! `Arc<dyn Provider>`.

mod fs_dir;
mod fs_link;
mod fs_permissions;
mod fs_read;
mod fs_write;
mod fs_xattr;

pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_link::FsLink;
pub use fs_permissions::FsPermissions;
pub use fs_read::FsRead;
pub use fs_write::{Channel, FsWrite};
pub use fs_xattr::{FsXattr, SECURITY_CONTEXT_XATTR};

use crate::Scheme;

/// Basic provider surface: reading, writing and directories.
pub trait Fs: FsRead + FsWrite + FsDir {}

impl<T: FsRead + FsWrite + FsDir> Fs for T {}

/// [`Fs`] plus links and attribute setters.
pub trait FsFull: Fs + FsLink + FsPermissions {}

impl<T: Fs + FsLink + FsPermissions> FsFull for T {}

/// A backend registered under one scheme.
pub trait Provider: FsFull {
    /// The scheme whose paths this provider owns.
    fn scheme(&self) -> Scheme;

    /// Extended attribute support, if the backend has it.
    fn xattrs(&self) -> Option<&dyn FsXattr> {
        None
    }
}
