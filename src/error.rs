//! Error types shared by every provider.

use std::fmt;
use std::io;

use crate::Scheme;

/// Filesystem error type with contextual variants.
///
/// Every backend failure is normalized into one of these variants. Use
/// [`FsError::kind`] to branch on the category without caring which provider
/// produced the error.
///
/// # Examples
///
/// ```rust
/// use polyfs::{ErrorKind, FsError};
///
/// let err = FsError::NotFound { path: "/missing".into() };
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert!(err.to_string().contains("/missing"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: String,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: String,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: String,
    },

    /// Expected a non-directory but found a directory.
    #[error("is a directory: {path}")]
    IsADirectory {
        /// The path that is a directory.
        path: String,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: String,
    },

    /// Operation is not supported by this provider.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// A path created by one provider was handed to another.
    #[error("provider mismatch: expected {expected} path, got {found} path")]
    ProviderMismatch {
        /// Scheme of the provider that received the path.
        expected: Scheme,
        /// Scheme the path actually belongs to.
        found: Scheme,
    },

    /// A long-running operation observed its interruption signal.
    #[error("interrupted: {path}")]
    Interrupted {
        /// The path being processed when the interruption was observed.
        path: String,
    },

    /// Too many symbolic links were followed while resolving a path.
    #[error("too many levels of symbolic links: {path}")]
    FilesystemLoop {
        /// The path being resolved.
        path: String,
    },

    /// Provider is read-only. Its kind is [`ErrorKind::NotSupported`].
    #[error("read-only filesystem: {operation}")]
    ReadOnly {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Path or name cannot be used.
    #[error("invalid path: {path} ({reason})")]
    InvalidPath {
        /// The offending path or name.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A path escaped its root (e.g. an archive entry named `../../etc/passwd`).
    #[error("threat detected: {reason} in {path}")]
    ThreatDetected {
        /// The path where the threat was detected.
        path: String,
        /// Description of the threat.
        reason: String,
    },

    /// A native system call failed.
    #[error("{source}: {path}")]
    Syscall {
        /// The path (or `from -> to` pair) the call operated on.
        path: String,
        /// The failing call and its errno.
        #[source]
        source: SyscallError,
    },

    /// An operation failed and the cleanup attempted afterwards failed too.
    #[error("{primary} (cleanup also failed: {cleanup})")]
    WithCleanup {
        /// The error that caused the operation to fail.
        #[source]
        primary: Box<FsError>,
        /// The secondary failure raised while cleaning up.
        cleanup: Box<FsError>,
    },

    /// Generic backend error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Provider-independent error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// No such file or directory.
    NotFound,
    /// Entry already exists.
    AlreadyExists,
    /// Access denied.
    AccessDenied,
    /// A path component is not a directory.
    NotADirectory,
    /// The target is a directory.
    IsADirectory,
    /// The directory is not empty.
    DirectoryNotEmpty,
    /// The provider cannot perform the operation.
    NotSupported,
    /// The path belongs to another provider.
    ProviderMismatch,
    /// The operation was cancelled.
    Interrupted,
    /// The mount is read-only (`EROFS`).
    ReadOnly,
    /// Too many levels of symbolic links.
    FilesystemLoop,
    /// The path or name is malformed.
    InvalidPath,
    /// The path escaped its root.
    TraversalRejected,
    /// Any other I/O failure.
    Io,
}

impl FsError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FsError::PermissionDenied { .. } => ErrorKind::AccessDenied,
            FsError::NotADirectory { .. } => ErrorKind::NotADirectory,
            FsError::IsADirectory { .. } => ErrorKind::IsADirectory,
            FsError::DirectoryNotEmpty { .. } => ErrorKind::DirectoryNotEmpty,
            FsError::NotSupported { .. } => ErrorKind::NotSupported,
            FsError::ProviderMismatch { .. } => ErrorKind::ProviderMismatch,
            FsError::Interrupted { .. } => ErrorKind::Interrupted,
            FsError::ReadOnly { .. } => ErrorKind::NotSupported,
            FsError::FilesystemLoop { .. } => ErrorKind::FilesystemLoop,
            FsError::InvalidPath { .. } => ErrorKind::InvalidPath,
            FsError::ThreatDetected { .. } => ErrorKind::TraversalRejected,
            FsError::Syscall { source, .. } => source.kind(),
            FsError::WithCleanup { primary, .. } => primary.kind(),
            FsError::Backend(_) => ErrorKind::Io,
            FsError::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorKind::NotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied,
                io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
                io::ErrorKind::Interrupted => ErrorKind::Interrupted,
                _ => ErrorKind::Io,
            },
        }
    }

    /// Returns `true` if this error means the provider cannot do the operation.
    #[inline]
    pub fn is_not_supported(&self) -> bool {
        self.kind() == ErrorKind::NotSupported
    }

    /// Native errno, when the error came from a system call.
    pub fn errno(&self) -> Option<i32> {
        match self {
            FsError::Syscall { source, .. } => Some(source.errno),
            FsError::WithCleanup { primary, .. } => primary.errno(),
            _ => None,
        }
    }

    /// Attach a failure raised while cleaning up after this error.
    pub fn with_cleanup(self, cleanup: FsError) -> FsError {
        FsError::WithCleanup {
            primary: Box::new(self),
            cleanup: Box::new(cleanup),
        }
    }

    /// Wrap an I/O error raised while operating on `path`.
    pub(crate) fn io(operation: &'static str, path: impl fmt::Display, source: io::Error) -> Self {
        let path = path.to_string();
        match FsError::from(source) {
            FsError::Io { source, .. } => FsError::Io {
                operation,
                path,
                source,
            },
            FsError::NotFound { .. } => FsError::NotFound { path },
            FsError::PermissionDenied { .. } => FsError::PermissionDenied { path, operation },
            FsError::AlreadyExists { .. } => FsError::AlreadyExists { path, operation },
            FsError::Interrupted { .. } => FsError::Interrupted { path },
            other => other,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(error: io::Error) -> Self {
        // Errors that crossed an io::Read/io::Write boundary come back intact.
        if error.get_ref().is_some_and(|inner| inner.is::<FsError>()) {
            if let Some(inner) = error.into_inner() {
                if let Ok(fs_error) = inner.downcast::<FsError>() {
                    return *fs_error;
                }
            }
            return FsError::Backend("lost wrapped error".into());
        }
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound {
                path: String::new(),
            },
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied {
                path: String::new(),
                operation: "io",
            },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: String::new(),
                operation: "io",
            },
            io::ErrorKind::Interrupted => FsError::Interrupted {
                path: String::new(),
            },
            _ => FsError::Io {
                operation: "io",
                path: String::new(),
                source: error,
            },
        }
    }
}

impl From<FsError> for io::Error {
    fn from(error: FsError) -> Self {
        // Interrupted maps to Other so read loops do not retry a cancelled copy.
        let kind = match error.kind() {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::AccessDenied => io::ErrorKind::PermissionDenied,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::NotSupported => io::ErrorKind::Unsupported,
            ErrorKind::InvalidPath => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}

/// A failed system call: the call name and the errno it left behind.
///
/// Displays as `"{call}: {strerror(errno)}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallError {
    /// Name of the failing call, e.g. `"open"`.
    pub call: &'static str,
    /// The errno value. Never zero.
    pub errno: i32,
}

impl SyscallError {
    /// Create from a call name and errno. An errno of zero becomes `EIO`.
    pub fn new(call: &'static str, errno: i32) -> Self {
        let errno = if errno == 0 { libc::EIO } else { errno };
        Self { call, errno }
    }

    /// Capture the calling thread's current errno.
    pub fn last(call: &'static str) -> Self {
        Self::new(call, io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }

    /// Human readable description of the errno.
    pub fn description(&self) -> String {
        let text = io::Error::from_raw_os_error(self.errno).to_string();
        let suffix = format!(" (os error {})", self.errno);
        match text.strip_suffix(&suffix) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }

    /// Category derived from the errno.
    pub fn kind(&self) -> ErrorKind {
        match self.errno {
            libc::EACCES | libc::EPERM => ErrorKind::AccessDenied,
            libc::EEXIST => ErrorKind::AlreadyExists,
            libc::EISDIR => ErrorKind::IsADirectory,
            libc::ELOOP => ErrorKind::FilesystemLoop,
            libc::ENOTDIR => ErrorKind::NotADirectory,
            libc::ENOTEMPTY => ErrorKind::DirectoryNotEmpty,
            libc::ENOENT => ErrorKind::NotFound,
            libc::EROFS => ErrorKind::ReadOnly,
            libc::EINTR => ErrorKind::Interrupted,
            libc::ENOTSUP => ErrorKind::NotSupported,
            _ => ErrorKind::Io,
        }
    }

    /// Attach the path the call operated on.
    pub fn at(self, path: impl fmt::Display) -> FsError {
        FsError::Syscall {
            path: path.to_string(),
            source: self,
        }
    }

    /// Attach both paths of a two-path call such as `rename`.
    pub fn between(self, from: impl fmt::Display, to: impl fmt::Display) -> FsError {
        FsError::Syscall {
            path: format!("{from} -> {to}"),
            source: self,
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.call, self.description())
    }
}

impl std::error::Error for SyscallError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_not_found_display() {
        let err = FsError::NotFound {
            path: "/missing".into(),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn fs_error_already_exists_display() {
        let err = FsError::AlreadyExists {
            path: "/exists".into(),
            operation: "create",
        };
        assert_eq!(err.to_string(), "create: already exists: /exists");
    }

    #[test]
    fn fs_error_from_io_not_found() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::NotFound { .. }));
    }

    #[test]
    fn fs_error_from_io_permission_denied() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "test");
        assert_eq!(FsError::from(io_err).kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn fs_error_from_io_interrupted() {
        let io_err = io::Error::new(io::ErrorKind::Interrupted, "test");
        assert_eq!(FsError::from(io_err).kind(), ErrorKind::Interrupted);
    }

    #[test]
    fn fs_error_from_io_other() {
        let io_err = io::Error::other("test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::Io { .. }));
        assert_eq!(fs_err.kind(), ErrorKind::Io);
    }

    #[test]
    fn fs_error_survives_io_round_trip() {
        let original = FsError::DirectoryNotEmpty { path: "/d".into() };
        let io_err: io::Error = original.into();
        let back = FsError::from(io_err);
        assert!(matches!(back, FsError::DirectoryNotEmpty { ref path } if path == "/d"));
    }

    #[test]
    fn syscall_zero_errno_becomes_eio() {
        let err = SyscallError::new("read", 0);
        assert_eq!(err.errno, libc::EIO);
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn syscall_errno_table() {
        let cases = [
            (libc::ENOENT, ErrorKind::NotFound),
            (libc::EACCES, ErrorKind::AccessDenied),
            (libc::EPERM, ErrorKind::AccessDenied),
            (libc::EEXIST, ErrorKind::AlreadyExists),
            (libc::EISDIR, ErrorKind::IsADirectory),
            (libc::ENOTDIR, ErrorKind::NotADirectory),
            (libc::ENOTEMPTY, ErrorKind::DirectoryNotEmpty),
            (libc::ELOOP, ErrorKind::FilesystemLoop),
            (libc::EROFS, ErrorKind::ReadOnly),
            (libc::EBADF, ErrorKind::Io),
        ];
        for (errno, kind) in cases {
            assert_eq!(SyscallError::new("call", errno).kind(), kind, "errno {errno}");
        }
    }

    #[test]
    fn syscall_display_names_call_and_description() {
        let err = SyscallError::new("open", libc::ENOENT);
        let text = err.to_string();
        assert!(text.starts_with("open: "));
        assert!(!text.contains("os error"));
        let fs_err = err.at("/nope");
        assert_eq!(fs_err.errno(), Some(libc::ENOENT));
        assert!(fs_err.to_string().ends_with(": /nope"));
    }

    #[test]
    fn cleanup_keeps_primary_kind() {
        let err = FsError::NotFound { path: "/a".into() }
            .with_cleanup(FsError::Backend("delete failed".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let text = err.to_string();
        assert!(text.contains("not found: /a"));
        assert!(text.contains("delete failed"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn read_only_provider_reports_not_supported() {
        let err = FsError::ReadOnly { operation: "remove" };
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(err.is_not_supported());
        assert_eq!(err.to_string(), "read-only filesystem: remove");
    }
}
