//! Scheme-keyed provider table.
//!
//! The [`Registry`] routes every operation to the provider owning the path's
//! scheme. Copies and moves whose two paths belong to different providers
//! are carried out by streaming bytes from one provider into the other.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::copy::copy_stream;
use crate::{
    AccessMode, ByteString, Channel, CopyOptions, ErrorKind, FileType, FsDir, FsError, FsLink,
    FsPermissions, FsRead, FsWrite, Metadata, OpenOptions, Path, Permissions, Provider,
    ReadDirIter, Scheme,
};

/// Routes operations to registered providers by scheme.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use polyfs::{ArchiveProvider, Registry, Scheme};
///
/// let registry = Registry::new();
/// registry.register(Arc::new(ArchiveProvider::new()));
/// assert!(registry.get(Scheme::Archive).is_some());
/// assert!(registry.get(Scheme::Document).is_none());
/// ```
pub struct Registry {
    providers: RwLock<HashMap<Scheme, Arc<dyn Provider>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `provider` under its scheme, returning the provider it
    /// replaced.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Option<Arc<dyn Provider>> {
        let scheme = provider.scheme();
        tracing::debug!(%scheme, "registering provider");
        self.providers.write().insert(scheme, provider)
    }

    /// Remove the provider for `scheme`.
    pub fn unregister(&self, scheme: Scheme) -> Option<Arc<dyn Provider>> {
        self.providers.write().remove(&scheme)
    }

    /// The provider registered for `scheme`.
    pub fn get(&self, scheme: Scheme) -> Option<Arc<dyn Provider>> {
        self.providers.read().get(&scheme).cloned()
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<Scheme> {
        let mut schemes: Vec<Scheme> = self.providers.read().keys().copied().collect();
        schemes.sort();
        schemes
    }

    /// The provider owning `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] if nothing is registered for the scheme
    pub fn provider_for(&self, path: &Path) -> Result<Arc<dyn Provider>, FsError> {
        self.get(path.scheme()).ok_or(FsError::NotSupported {
            operation: "no provider registered for scheme",
        })
    }

    /// Parse `uri` into a path owned by a registered provider.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if the URI is malformed
    /// - [`FsError::NotSupported`] if the scheme is unknown or unregistered
    pub fn path_from_uri(&self, uri: &str) -> Result<Path, FsError> {
        let path = Path::from_uri(uri)?;
        self.provider_for(&path)?;
        Ok(path)
    }

    fn copy_foreign(
        &self,
        source_fs: &dyn Provider,
        source: &Path,
        target_fs: &dyn Provider,
        target: &Path,
        options: &CopyOptions,
    ) -> Result<(), FsError> {
        if options.atomic_move {
            return Err(FsError::NotSupported {
                operation: "atomic copy between providers",
            });
        }
        let source_meta = if options.no_follow_links {
            source_fs.symlink_metadata(source)?
        } else {
            source_fs.metadata(source)?
        };
        let target_exists = match target_fs.symlink_metadata(target) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e),
        };
        if target_exists && !options.replace_existing {
            return Err(FsError::AlreadyExists {
                path: target.to_string(),
                operation: "copy",
            });
        }

        match source_meta.file_type {
            FileType::File => {
                if target_exists {
                    target_fs.remove(target)?;
                }
                let mut reader = source_fs.open_read(source)?;
                if let Err(e) = stream_to(target_fs, target, &mut *reader, options) {
                    if e.kind() == ErrorKind::Interrupted {
                        return Err(e);
                    }
                    return Err(match target_fs.remove(target) {
                        Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => e.with_cleanup(cleanup),
                        _ => e,
                    });
                }
            }
            FileType::Directory => {
                if target_exists {
                    target_fs.remove(target)?;
                }
                target_fs.create_dir(target)?;
                options.notify(source_meta.size);
            }
            FileType::Symlink => {
                let link_target = source_fs.read_link(source)?;
                if target_exists {
                    target_fs.remove(target)?;
                }
                target_fs.symlink(target, &link_target)?;
                options.notify(source_meta.size);
            }
            _ => {
                return Err(FsError::NotSupported {
                    operation: "copy special file between providers",
                });
            }
        }

        let accessed = options.copy_attributes.then_some(source_meta.accessed);
        if let Err(e) = target_fs.set_times(target, Some(source_meta.modified), accessed) {
            if e.is_not_supported() {
                tracing::debug!(%target, "target cannot store times");
            } else {
                tracing::warn!(%target, error = %e, "cannot copy times");
            }
        }
        Ok(())
    }

    fn move_foreign(
        &self,
        source_fs: &dyn Provider,
        source: &Path,
        target_fs: &dyn Provider,
        target: &Path,
        options: &CopyOptions,
    ) -> Result<(), FsError> {
        if options.atomic_move {
            return Err(FsError::NotSupported {
                operation: "atomic move between providers",
            });
        }
        let copy_options = CopyOptions {
            copy_attributes: true,
            no_follow_links: true,
            ..options.clone()
        };
        self.copy_foreign(source_fs, source, target_fs, target, &copy_options)?;
        match source_fs.remove(source) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
            Err(e) => Err(match target_fs.remove(target) {
                Ok(()) => e,
                Err(cleanup) => e.with_cleanup(cleanup),
            }),
        }
    }
}

fn stream_to(
    target_fs: &dyn Provider,
    target: &Path,
    reader: &mut dyn Read,
    options: &CopyOptions,
) -> Result<u64, FsError> {
    let mut writer = target_fs.open_write(target, OpenOptions::CREATE_NEW)?;
    copy_stream(reader, &mut *writer, target, options)
}

impl FsRead for Registry {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, FsError> {
        self.provider_for(path)?.open_read(path)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.provider_for(path)?.metadata(path)
    }

    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        self.provider_for(path)?.check_access(path, mode)
    }

    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        self.provider_for(path)?.exists(path)
    }
}

impl FsWrite for Registry {
    fn open_write(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError> {
        self.provider_for(path)?.open_write(path, options)
    }

    fn open_channel(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        self.provider_for(path)?.open_channel(path, options)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        self.provider_for(path)?.remove(path)
    }

    fn rename(&self, path: &Path, new_name: &ByteString) -> Result<Path, FsError> {
        self.provider_for(path)?.rename(path, new_name)
    }

    fn copy(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
        let source_fs = self.provider_for(source)?;
        if source.scheme() == target.scheme() {
            return source_fs.copy(source, target, options);
        }
        let target_fs = self.provider_for(target)?;
        tracing::debug!(%source, %target, "copying between providers");
        self.copy_foreign(&*source_fs, source, &*target_fs, target, options)
    }

    fn move_to(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
        let source_fs = self.provider_for(source)?;
        if source.scheme() == target.scheme() {
            return source_fs.move_to(source, target, options);
        }
        let target_fs = self.provider_for(target)?;
        tracing::debug!(%source, %target, "moving between providers");
        self.move_foreign(&*source_fs, source, &*target_fs, target, options)
    }
}

impl FsDir for Registry {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        self.provider_for(path)?.read_dir(path)
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        self.provider_for(path)?.create_dir(path)
    }
}

impl FsLink for Registry {
    fn symlink(&self, link: &Path, target: &ByteString) -> Result<(), FsError> {
        self.provider_for(link)?.symlink(link, target)
    }

    fn hard_link(&self, link: &Path, original: &Path) -> Result<(), FsError> {
        self.provider_for(link)?.hard_link(link, original)
    }

    fn read_link(&self, path: &Path) -> Result<ByteString, FsError> {
        self.provider_for(path)?.read_link(path)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.provider_for(path)?.symlink_metadata(path)
    }
}

impl FsPermissions for Registry {
    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        self.provider_for(path)?.set_permissions(path, perm)
    }

    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        self.provider_for(path)?.set_owner(path, uid, gid)
    }

    fn set_times(
        &self,
        path: &Path,
        modified: Option<SystemTime>,
        accessed: Option<SystemTime>,
    ) -> Result<(), FsError> {
        self.provider_for(path)?.set_times(path, modified, accessed)
    }
}
