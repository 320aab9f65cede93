//! Core value types shared by every provider.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use crate::{ByteString, FsError, Path};

/// MIME type marking an entry that stands for a directory.
pub const DIRECTORY_MIME_TYPE: &str = "vnd.android.document/directory";

/// MIME type for content of unknown type.
pub const GENERIC_MIME_TYPE: &str = "application/octet-stream";

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Anything else.
    Other,
}

impl FileType {
    /// Derive the type from the `S_IFMT` bits of a Unix mode.
    pub fn from_mode(mode: u32) -> Self {
        match mode & 0o170000 {
            0o100000 => FileType::File,
            0o040000 => FileType::Directory,
            0o120000 => FileType::Symlink,
            0o020000 => FileType::CharDevice,
            0o060000 => FileType::BlockDevice,
            0o010000 => FileType::Fifo,
            0o140000 => FileType::Socket,
            _ => FileType::Other,
        }
    }
}

/// Metadata for a filesystem entry.
///
/// Providers fill what their backend knows. Timestamps default to the Unix
/// epoch and ownership fields to `None` when unknown.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits.
    pub permissions: Permissions,
    /// Creation time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub created: SystemTime,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub modified: SystemTime,
    /// Last access time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub accessed: SystemTime,
    /// Inode number, or 0 if the backend has none.
    pub inode: u64,
    /// Number of hard links.
    pub nlink: u64,
    /// Numeric owner id.
    pub uid: Option<u32>,
    /// Numeric group id.
    pub gid: Option<u32>,
    /// Owner name, where the backend stores names.
    pub owner: Option<String>,
    /// Group name, where the backend stores names.
    pub group: Option<String>,
    /// MIME type reported by the backend.
    pub mime_type: Option<String>,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }

    /// Returns `true` for anything that is not a file, directory or symlink.
    #[inline]
    pub fn is_other(&self) -> bool {
        !(self.is_file() || self.is_dir() || self.is_symlink())
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            permissions: Permissions::default_file(),
            created: SystemTime::UNIX_EPOCH,
            modified: SystemTime::UNIX_EPOCH,
            accessed: SystemTime::UNIX_EPOCH,
            inode: 0,
            nlink: 1,
            uid: None,
            gid: None,
            owner: None,
            group: None,
            mime_type: None,
        }
    }
}

/// A directory entry returned from `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (last segment only).
    pub name: ByteString,
    /// Full path to the entry.
    pub path: Path,
    /// Type of the entry, when the listing reports it.
    pub file_type: Option<FileType>,
}

/// Unix-style permissions stored as a mode bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        (self.0 & 0o222) == 0
    }

    /// Default permissions for a new file (0o644 = rw-r--r--).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o644)
    }

    /// Default permissions for a new directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// Flags for opening a file, composed rather than positional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenOptions {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create the file if it doesn't exist.
    pub create: bool,
    /// Create the file, failing if it exists.
    pub create_new: bool,
    /// Truncate to zero length.
    pub truncate: bool,
    /// Writes go to the end of the file.
    pub append: bool,
}

impl OpenOptions {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        create_new: false,
        truncate: false,
        append: false,
    };

    /// Write access with create and truncate.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        create_new: false,
        truncate: true,
        append: false,
    };

    /// Read and write access to an existing file.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        create: false,
        create_new: false,
        truncate: false,
        append: false,
    };

    /// Append mode, creating the file if needed.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        create: true,
        create_new: false,
        truncate: false,
        append: true,
    };

    /// Exclusive creation of a new file for writing.
    pub const CREATE_NEW: Self = Self {
        read: false,
        write: true,
        create: false,
        create_new: true,
        truncate: false,
        append: false,
    };

    /// Returns `true` if any flag implies modifying the file.
    pub const fn is_write(&self) -> bool {
        self.write || self.append || self.truncate || self.create || self.create_new
    }
}

/// Which accesses an access check should verify. All `false` checks existence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessMode {
    /// Check read access.
    pub read: bool,
    /// Check write access.
    pub write: bool,
    /// Check execute access.
    pub execute: bool,
}

impl AccessMode {
    /// Existence only.
    pub const EXISTS: Self = Self {
        read: false,
        write: false,
        execute: false,
    };
    /// Read access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        execute: false,
    };
    /// Write access.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        execute: false,
    };
    /// Execute access.
    pub const EXECUTE: Self = Self {
        read: false,
        write: false,
        execute: true,
    };
}

/// Cooperative cancellation flag shared between a caller and a long copy.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// A fresh, un-triggered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fail with [`FsError::Interrupted`] if cancellation has been requested.
    pub fn check(&self, path: &Path) -> Result<(), FsError> {
        if self.is_interrupted() {
            Err(FsError::Interrupted {
                path: path.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Callback receiving the cumulative number of bytes transferred.
pub type ProgressListener = Arc<dyn Fn(u64) + Send + Sync>;

/// Options for copy and move operations.
#[derive(Clone)]
pub struct CopyOptions {
    /// Overwrite an existing target instead of failing.
    pub replace_existing: bool,
    /// Copy ownership, mode, times and every extended attribute.
    pub copy_attributes: bool,
    /// Copy symbolic links themselves rather than their targets.
    pub no_follow_links: bool,
    /// A move must be a single atomic rename; never fall back to copying.
    pub atomic_move: bool,
    /// Minimum time between two progress callbacks.
    pub progress_interval: Duration,
    /// Progress callback.
    pub progress: Option<ProgressListener>,
    /// Cancellation flag checked between chunks.
    pub interrupt: Interrupt,
}

impl CopyOptions {
    /// Default interval between progress callbacks.
    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

    /// Set [`replace_existing`](Self::replace_existing).
    pub fn with_replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    /// Set [`copy_attributes`](Self::copy_attributes).
    pub fn with_copy_attributes(mut self, copy: bool) -> Self {
        self.copy_attributes = copy;
        self
    }

    /// Set [`no_follow_links`](Self::no_follow_links).
    pub fn with_no_follow_links(mut self, no_follow: bool) -> Self {
        self.no_follow_links = no_follow;
        self
    }

    /// Set [`atomic_move`](Self::atomic_move).
    pub fn with_atomic_move(mut self, atomic: bool) -> Self {
        self.atomic_move = atomic;
        self
    }

    /// Install a progress callback reporting at most once per `interval`.
    pub fn with_progress(
        mut self,
        interval: Duration,
        listener: impl Fn(u64) + Send + Sync + 'static,
    ) -> Self {
        self.progress_interval = interval;
        self.progress = Some(Arc::new(listener));
        self
    }

    /// Share `interrupt` with the operation.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Report `bytes` to the progress callback, if any.
    pub(crate) fn notify(&self, bytes: u64) {
        if let Some(listener) = &self.progress {
            listener(bytes);
        }
    }
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            replace_existing: false,
            copy_attributes: false,
            no_follow_links: false,
            atomic_move: false,
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
            progress: None,
            interrupt: Interrupt::default(),
        }
    }
}

impl fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("replace_existing", &self.replace_existing)
            .field("copy_attributes", &self.copy_attributes)
            .field("no_follow_links", &self.no_follow_links)
            .field("atomic_move", &self.atomic_move)
            .field("progress_interval", &self.progress_interval)
            .field("progress", &self.progress.is_some())
            .field("interrupted", &self.interrupt.is_interrupted())
            .finish()
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}
