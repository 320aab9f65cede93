//! Provider for opaque content handles.
//!
//! A content path is a single capability handle with no parent and no
//! children. Everything the provider knows about it comes from a
//! [`ContentResolver`].

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::{
    AccessMode, ByteString, Channel, ContentHandle, CopyOptions, DIRECTORY_MIME_TYPE, FileType,
    FsDir, FsError, FsLink, FsPermissions, FsRead, FsWrite, Metadata, OpenOptions, Origin, Path,
    Permissions, Provider, ReadDirIter, Scheme,
};

/// Host capability that opens and describes content handles.
///
/// # Object Safety
///
/// This trait is object-safe; [`ContentProvider`] holds it as
/// `Arc<dyn ContentResolver>`.
pub trait ContentResolver: Send + Sync {
    /// MIME type of the handle, `None` if the host does not know it.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the handle does not resolve
    fn mime_type(&self, handle: &ContentHandle) -> Result<Option<String>, FsError>;

    /// Size in bytes, `None` if the host does not know it.
    fn size(&self, handle: &ContentHandle) -> Result<Option<u64>, FsError>;

    /// Open the handle for reading.
    fn open_read(&self, handle: &ContentHandle) -> Result<Box<dyn Read + Send>, FsError>;

    /// Open the handle for writing. `options.append` must not truncate.
    fn open_write(&self, handle: &ContentHandle, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError>;

    /// Open a seekable channel. Unsupported unless the host offers one.
    fn open_channel(&self, _handle: &ContentHandle, _options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        Err(FsError::NotSupported {
            operation: "content channel",
        })
    }

    /// Delete the resource behind the handle.
    fn delete(&self, handle: &ContentHandle) -> Result<(), FsError>;
}

/// Provider for `content` paths.
#[derive(Clone)]
pub struct ContentProvider {
    resolver: Arc<dyn ContentResolver>,
}

impl std::fmt::Debug for ContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentProvider").finish_non_exhaustive()
    }
}

impl ContentProvider {
    /// Create a provider over `resolver`.
    pub fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self { resolver }
    }
}

fn handle(path: &Path) -> Result<&ContentHandle, FsError> {
    match path.origin() {
        Origin::Content(handle) => Ok(handle),
        other => Err(FsError::ProviderMismatch {
            expected: Scheme::Content,
            found: other.scheme(),
        }),
    }
}

fn not_supported(operation: &'static str) -> FsError {
    FsError::NotSupported { operation }
}

impl FsRead for ContentProvider {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, FsError> {
        self.resolver.open_read(handle(path)?)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let handle = handle(path)?;
        let mime_type = self.resolver.mime_type(handle)?;
        let file_type = if mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE) {
            FileType::Directory
        } else {
            FileType::File
        };
        let size = match self.resolver.size(handle)? {
            Some(size) => size,
            None => {
                tracing::debug!(%handle, "content size unknown");
                0
            }
        };
        Ok(Metadata {
            file_type,
            size,
            mime_type,
            ..Metadata::default()
        })
    }

    /// The MIME lookup doubles as the existence check. Directories only
    /// check existence; execute is always denied; read and write open the
    /// handle, writing in append mode so nothing is truncated.
    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        let handle = handle(path)?;
        let mime_type = self.resolver.mime_type(handle)?;
        if mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE) {
            return Ok(());
        }
        if mode.execute {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation: "execute",
            });
        }
        if mode.write {
            drop(self.resolver.open_write(handle, OpenOptions::APPEND)?);
        }
        if mode.read {
            drop(self.resolver.open_read(handle)?);
        }
        Ok(())
    }
}

impl FsWrite for ContentProvider {
    fn open_write(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError> {
        self.resolver.open_write(handle(path)?, options)
    }

    fn open_channel(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        self.resolver.open_channel(handle(path)?, options)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        self.resolver.delete(handle(path)?)
    }

    fn rename(&self, _path: &Path, _new_name: &ByteString) -> Result<Path, FsError> {
        Err(not_supported("rename content"))
    }

    fn copy(&self, _source: &Path, _target: &Path, _options: &CopyOptions) -> Result<(), FsError> {
        Err(not_supported("copy content"))
    }

    fn move_to(&self, _source: &Path, _target: &Path, _options: &CopyOptions) -> Result<(), FsError> {
        Err(not_supported("move content"))
    }
}

impl FsDir for ContentProvider {
    fn read_dir(&self, _path: &Path) -> Result<ReadDirIter, FsError> {
        Err(not_supported("list content"))
    }

    fn create_dir(&self, _path: &Path) -> Result<(), FsError> {
        Err(not_supported("create content directory"))
    }
}

impl FsLink for ContentProvider {
    fn symlink(&self, _link: &Path, _target: &ByteString) -> Result<(), FsError> {
        Err(not_supported("symlink content"))
    }

    fn hard_link(&self, _link: &Path, _original: &Path) -> Result<(), FsError> {
        Err(not_supported("hard link content"))
    }

    fn read_link(&self, _path: &Path) -> Result<ByteString, FsError> {
        Err(not_supported("read content link"))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.metadata(path)
    }
}

impl FsPermissions for ContentProvider {
    fn set_permissions(&self, _path: &Path, _perm: Permissions) -> Result<(), FsError> {
        Err(not_supported("set content permissions"))
    }

    fn set_owner(&self, _path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<(), FsError> {
        Err(not_supported("set content owner"))
    }

    fn set_times(
        &self,
        _path: &Path,
        _modified: Option<SystemTime>,
        _accessed: Option<SystemTime>,
    ) -> Result<(), FsError> {
        Err(not_supported("set content times"))
    }
}

impl Provider for ContentProvider {
    fn scheme(&self) -> Scheme {
        Scheme::Content
    }
}
