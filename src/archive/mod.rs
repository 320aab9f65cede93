//! Read-only provider for zip and tar archives.
//!
//! An archive is opened on first use: its entry list is read once and
//! materialized into an [`ArchiveTree`] kept until [`ArchiveProvider::close_archive`].
//! Entry content is never cached; every read reopens the container.

mod item;
mod reader;
mod tree;

pub use item::{ArchiveEntry, ArchiveItem};
pub use tree::ArchiveTree;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::{
    AccessMode, ByteString, Channel, CopyOptions, DirEntry, FileType, FsDir, FsError, FsLink,
    FsPermissions, FsRead, FsWrite, Metadata, OpenOptions, Origin, Path, Permissions, Provider,
    ReadDirIter, Scheme,
};

/// Longest zip symlink target read from entry content.
const MAX_LINK_TARGET: u64 = 4096;

/// How raw entry names become path segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NameEncoding {
    /// Keep the stored bytes unchanged.
    #[default]
    Raw,
    /// Replace invalid UTF-8 with U+FFFD.
    Utf8Lossy,
}

/// Archive provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveConfig {
    /// Entry-name decoding policy.
    pub name_encoding: NameEncoding,
}

impl ArchiveConfig {
    /// Set the entry-name decoding policy.
    pub fn with_name_encoding(mut self, encoding: NameEncoding) -> Self {
        self.name_encoding = encoding;
        self
    }

    pub(crate) fn decode_name(&self, raw: &[u8]) -> ByteString {
        match self.name_encoding {
            NameEncoding::Raw => ByteString::from(raw),
            NameEncoding::Utf8Lossy => ByteString::from(String::from_utf8_lossy(raw).into_owned()),
        }
    }
}

/// Provider for `archive` paths.
///
/// # Example
///
/// ```rust,no_run
/// use polyfs::{ArchiveProvider, FsDir};
///
/// let archives = ArchiveProvider::new();
/// let root = archives.open_archive("/tmp/bundle.zip")?;
/// for entry in archives.read_dir(&root)? {
///     println!("{}", entry?.name);
/// }
/// # Ok::<(), polyfs::FsError>(())
/// ```
#[derive(Debug, Default)]
pub struct ArchiveProvider {
    config: ArchiveConfig,
    open: RwLock<HashMap<PathBuf, Arc<ArchiveTree>>>,
}

impl ArchiveProvider {
    /// Create a provider with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with `config`.
    pub fn with_config(config: ArchiveConfig) -> Self {
        Self {
            config,
            open: RwLock::default(),
        }
    }

    /// Open the archive stored at `file` and return its root path.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] if the file is neither zip nor tar
    /// - I/O errors from reading the container
    pub fn open_archive(&self, file: impl Into<PathBuf>) -> Result<Path, FsError> {
        let root = Path::archive_root(file);
        self.tree(&root)?;
        Ok(root)
    }

    /// Forget the tree of the archive at `file`. Returns `true` if it was open.
    ///
    /// Paths into it stay valid; the next access reopens the archive.
    pub fn close_archive(&self, file: &std::path::Path) -> bool {
        let closed = self.open.write().remove(file).is_some();
        if closed {
            tracing::debug!(archive = %file.display(), "closed archive");
        }
        closed
    }

    /// The materialized tree of the archive `path` points into.
    ///
    /// # Errors
    ///
    /// - [`FsError::ProviderMismatch`] for non-archive paths
    pub fn tree(&self, path: &Path) -> Result<Arc<ArchiveTree>, FsError> {
        let file = archive_file(path)?;
        if let Some(tree) = self.open.read().get(file.as_path()) {
            return Ok(Arc::clone(tree));
        }

        let root = Path::parse(path.origin().clone(), b"/");
        let entries = reader::read_entries(file, &root, &self.config)?;
        let count = entries.len();
        let tree = Arc::new(ArchiveTree::materialize(root, entries));
        tracing::debug!(archive = %file.display(), entries = count, items = tree.len(), "opened archive");

        let mut open = self.open.write();
        Ok(Arc::clone(open.entry(PathBuf::clone(file)).or_insert(tree)))
    }

    fn link_target(&self, file: &std::path::Path, item: &ArchiveItem) -> Result<ByteString, FsError> {
        let entry = item.entry().ok_or_else(|| not_a_link(item.path()))?;
        if entry.file_type != FileType::Symlink {
            return Err(not_a_link(item.path()));
        }
        if let Some(target) = &entry.link_name {
            return Ok(target.clone());
        }
        // Zip stores the target as the entry's content.
        let mut target = Vec::new();
        reader::open_data(file, entry.data, item.path())?
            .take(MAX_LINK_TARGET)
            .read_to_end(&mut target)
            .map_err(|e| FsError::io("read link", item.path(), e))?;
        Ok(ByteString::from(target))
    }

    fn resolve<'t>(
        &self,
        tree: &'t ArchiveTree,
        file: &std::path::Path,
        path: &Path,
    ) -> Result<&'t ArchiveItem, FsError> {
        tree.follow(path, |item| self.link_target(file, item))
    }
}

fn archive_file(path: &Path) -> Result<&Arc<PathBuf>, FsError> {
    match path.origin() {
        Origin::Archive(file) => Ok(file),
        other => Err(FsError::ProviderMismatch {
            expected: Scheme::Archive,
            found: other.scheme(),
        }),
    }
}

fn not_a_link(path: &Path) -> FsError {
    FsError::InvalidPath {
        path: path.to_string(),
        reason: "not a symbolic link",
    }
}

fn read_only(operation: &'static str) -> FsError {
    FsError::ReadOnly { operation }
}

impl FsRead for ArchiveProvider {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, FsError> {
        let tree = self.tree(path)?;
        let file = archive_file(path)?;
        let item = self.resolve(&tree, file, path)?;
        let entry = match item.entry() {
            Some(entry) if item.file_type() != FileType::Directory => entry,
            _ => {
                return Err(FsError::IsADirectory {
                    path: path.to_string(),
                });
            }
        };
        reader::open_data(file, entry.data, path)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let tree = self.tree(path)?;
        let item = self.resolve(&tree, archive_file(path)?, path)?;
        Ok(item.metadata())
    }

    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        let meta = self.metadata(path)?;
        if mode.write {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation: "write",
            });
        }
        if mode.execute && !meta.is_dir() && meta.permissions.mode() & 0o111 == 0 {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation: "execute",
            });
        }
        Ok(())
    }
}

impl FsWrite for ArchiveProvider {
    fn open_write(&self, _path: &Path, _options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError> {
        Err(read_only("open_write"))
    }

    fn open_channel(&self, _path: &Path, options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        if options.is_write() {
            return Err(read_only("open_channel"));
        }
        Err(FsError::NotSupported {
            operation: "seekable archive channel",
        })
    }

    fn remove(&self, _path: &Path) -> Result<(), FsError> {
        Err(read_only("remove"))
    }

    fn rename(&self, _path: &Path, _new_name: &ByteString) -> Result<Path, FsError> {
        Err(read_only("rename"))
    }

    fn copy(&self, _source: &Path, _target: &Path, _options: &CopyOptions) -> Result<(), FsError> {
        Err(read_only("copy"))
    }

    fn move_to(&self, _source: &Path, _target: &Path, _options: &CopyOptions) -> Result<(), FsError> {
        Err(read_only("move"))
    }
}

impl FsDir for ArchiveProvider {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let tree = self.tree(path)?;
        let item = self.resolve(&tree, archive_file(path)?, path)?;
        if item.file_type() != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }
        // Listed under the requested path, even when reached through a link.
        let entries = item
            .children()
            .filter_map(|child| {
                let name = child.file_name()?.clone();
                let file_type = tree.get(child).map(ArchiveItem::file_type);
                Some(path.resolve_name(name.clone()).map(|path| DirEntry {
                    name,
                    path,
                    file_type,
                }))
            })
            .collect();
        Ok(ReadDirIter::from_vec(entries))
    }

    fn create_dir(&self, _path: &Path) -> Result<(), FsError> {
        Err(read_only("create_dir"))
    }
}

impl FsLink for ArchiveProvider {
    fn symlink(&self, _link: &Path, _target: &ByteString) -> Result<(), FsError> {
        Err(read_only("symlink"))
    }

    fn hard_link(&self, _link: &Path, _original: &Path) -> Result<(), FsError> {
        Err(read_only("hard_link"))
    }

    fn read_link(&self, path: &Path) -> Result<ByteString, FsError> {
        let tree = self.tree(path)?;
        let item = tree.require(path)?;
        self.link_target(archive_file(path)?, item)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let tree = self.tree(path)?;
        Ok(tree.require(path)?.metadata())
    }
}

impl FsPermissions for ArchiveProvider {
    fn set_permissions(&self, _path: &Path, _perm: Permissions) -> Result<(), FsError> {
        Err(read_only("set_permissions"))
    }

    fn set_owner(&self, _path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<(), FsError> {
        Err(read_only("set_owner"))
    }

    fn set_times(
        &self,
        _path: &Path,
        _modified: Option<SystemTime>,
        _accessed: Option<SystemTime>,
    ) -> Result<(), FsError> {
        Err(read_only("set_times"))
    }
}

impl Provider for ArchiveProvider {
    fn scheme(&self) -> Scheme {
        Scheme::Archive
    }
}
