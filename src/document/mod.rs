//! Provider for externally-owned document trees.
//!
//! A document tree is addressed by identifiers, not names. The provider maps
//! each path to an identifier by walking down from the tree root and scanning
//! child listings for matching display names, and remembers every identifier
//! it sees in a [`DocumentIdCache`]. Mutations invalidate the affected paths
//! before calling the backend and again after it succeeds.

mod backend;
mod cache;
mod copy_move;

pub use backend::{DocumentBackend, DocumentId, DocumentRow};
pub use cache::{DEFAULT_CACHE_CAPACITY, DocumentIdCache};

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::{
    AccessMode, ByteString, Channel, CopyOptions, DIRECTORY_MIME_TYPE, DirEntry, ErrorKind,
    FileType, FsDir, FsError, FsLink, FsPermissions, FsRead, FsWrite, GENERIC_MIME_TYPE,
    Metadata, OpenOptions, Origin, Path, Permissions, Provider, ReadDirIter, Scheme, TreeUri,
};

/// Authorities known to reject accelerated copies and removals.
const DEFAULT_COPY_REMOVE_UNSUPPORTED: [&str; 3] = [
    "com.android.externalstorage.documents",
    "com.android.mtp.documents",
    "com.android.shell.documents",
];

/// Authorities known to reject accelerated moves.
const DEFAULT_MOVE_UNSUPPORTED: [&str; 1] = ["com.android.mtp.documents"];

/// Tuning for a [`DocumentProvider`].
///
/// # Examples
///
/// ```rust
/// use polyfs::DocumentConfig;
///
/// let config = DocumentConfig::default().with_cache_capacity(128);
/// assert!(!config.supports_copy("com.android.mtp.documents"));
/// assert!(config.supports_move("com.android.externalstorage.documents"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DocumentConfig {
    /// Authorities whose accelerated copy is skipped.
    pub copy_unsupported: Vec<String>,
    /// Authorities whose accelerated move is skipped.
    pub move_unsupported: Vec<String>,
    /// Authorities whose accelerated remove is skipped.
    pub remove_unsupported: Vec<String>,
    /// Maximum number of cached identifiers.
    pub cache_capacity: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| (*s).to_owned()).collect();
        Self {
            copy_unsupported: owned(&DEFAULT_COPY_REMOVE_UNSUPPORTED),
            move_unsupported: owned(&DEFAULT_MOVE_UNSUPPORTED),
            remove_unsupported: owned(&DEFAULT_COPY_REMOVE_UNSUPPORTED),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl DocumentConfig {
    /// Replace the copy-unsupported authority list.
    pub fn with_copy_unsupported<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.copy_unsupported = authorities.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the move-unsupported authority list.
    pub fn with_move_unsupported<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.move_unsupported = authorities.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the remove-unsupported authority list.
    pub fn with_remove_unsupported<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_unsupported = authorities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the identifier-cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Parse a configuration from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// - [`FsError::Backend`] if the JSON is malformed
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, FsError> {
        serde_json::from_str(json).map_err(|e| FsError::Backend(format!("document config: {e}")))
    }

    /// Returns `true` unless accelerated copy is known broken for `authority`.
    pub fn supports_copy(&self, authority: &str) -> bool {
        !self.copy_unsupported.iter().any(|a| a == authority)
    }

    /// Returns `true` unless accelerated move is known broken for `authority`.
    pub fn supports_move(&self, authority: &str) -> bool {
        !self.move_unsupported.iter().any(|a| a == authority)
    }

    /// Returns `true` unless accelerated remove is known broken for `authority`.
    pub fn supports_remove(&self, authority: &str) -> bool {
        !self.remove_unsupported.iter().any(|a| a == authority)
    }
}

/// Provider for `document` paths.
///
/// # Examples
///
/// ```rust,ignore
/// let provider = DocumentProvider::new(Arc::new(my_backend));
/// let root = Path::document_root(TreeUri::new("com.example.docs", "root"));
/// let id = provider.document_id(&root.join("notes/today.txt")?)?;
/// ```
pub struct DocumentProvider {
    backend: Arc<dyn DocumentBackend>,
    cache: DocumentIdCache,
    config: DocumentConfig,
}

impl std::fmt::Debug for DocumentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProvider")
            .field("cached_ids", &self.cache.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn tree(path: &Path) -> Result<&Arc<TreeUri>, FsError> {
    match path.origin() {
        Origin::Document(tree) if path.is_absolute() => Ok(tree),
        Origin::Document(_) => Err(FsError::InvalidPath {
            path: path.to_string(),
            reason: "document paths must be absolute",
        }),
        other => Err(FsError::ProviderMismatch {
            expected: Scheme::Document,
            found: other.scheme(),
        }),
    }
}

fn display_name<'a>(path: &Path, name: &'a ByteString) -> Result<&'a str, FsError> {
    name.to_str().ok_or_else(|| FsError::InvalidPath {
        path: path.to_string(),
        reason: "document names must be UTF-8",
    })
}

fn not_supported(operation: &'static str) -> FsError {
    FsError::NotSupported { operation }
}

fn is_directory(row: &DocumentRow) -> bool {
    row.mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE)
}

impl DocumentProvider {
    /// Create a provider with the default configuration.
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_config(backend, DocumentConfig::default())
    }

    /// Create a provider with `config`.
    pub fn with_config(backend: Arc<dyn DocumentBackend>, config: DocumentConfig) -> Self {
        Self {
            backend,
            cache: DocumentIdCache::new(config.cache_capacity),
            config,
        }
    }

    /// The provider configuration.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// The identifier cache.
    pub fn cache(&self) -> &DocumentIdCache {
        &self.cache
    }

    /// Resolve `path` to its backend identifier.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if some segment has no matching child
    /// - [`FsError::ProviderMismatch`] if `path` is not a document path
    pub fn document_id(&self, path: &Path) -> Result<DocumentId, FsError> {
        let tree = tree(path)?;
        self.resolve(tree, &path.normalize())
    }

    fn resolve(&self, tree: &Arc<TreeUri>, path: &Path) -> Result<DocumentId, FsError> {
        if let Some(id) = self.cache.get(path) {
            return Ok(DocumentId::new(Arc::clone(tree), id));
        }
        let id = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => {
                let parent_id = self.resolve(tree, &parent)?;
                tracing::debug!(%path, "document id cache miss");
                self.find_child(&parent, &parent_id, name)?
                    .ok_or_else(|| FsError::NotFound {
                        path: path.to_string(),
                    })?
            }
            _ => self.backend.tree_root_id(tree)?,
        };
        self.cache.insert(path.clone(), id.clone());
        Ok(DocumentId::new(Arc::clone(tree), id))
    }

    /// Scan `parent`'s children for `name`, caching every child on the way.
    fn find_child(
        &self,
        parent: &Path,
        parent_id: &DocumentId,
        name: &ByteString,
    ) -> Result<Option<String>, FsError> {
        let mut found = None;
        for row in self.backend.query_children(parent_id)? {
            if let Ok(child) = parent.resolve_name(row.display_name.as_str()) {
                self.cache.insert(child, row.document_id.clone());
            }
            if found.is_none() && row.display_name.as_bytes() == name.as_bytes() {
                found = Some(row.document_id);
            }
        }
        Ok(found)
    }

    /// Drop cached identifiers at and below `path`.
    fn invalidate(&self, path: &Path) {
        self.cache.remove_tree(path);
    }

    fn row(&self, path: &Path) -> Result<(DocumentId, DocumentRow), FsError> {
        let id = self.document_id(path)?;
        let row = self.backend.query_document(&id)?;
        Ok((id, row))
    }

    /// Rename within the parent, returning the new path and the identifier
    /// the backend assigned.
    pub(crate) fn rename_document(&self, path: &Path, new_name: &ByteString) -> Result<(Path, DocumentId), FsError> {
        let tree = tree(path)?;
        let path = path.normalize();
        let target = path.resolve_sibling(new_name.clone())?;
        let name = display_name(&target, new_name)?;
        let id = self.resolve(tree, &path)?;
        self.invalidate(&path);
        self.invalidate(&target);
        let renamed = self.backend.rename_document(&id, name)?;
        self.invalidate(&path);
        self.invalidate(&target);
        Ok((target, renamed))
    }

    /// Create a document of `mime_type` at `path`.
    ///
    /// The backend may pick a different display name when one is taken, so
    /// the new identifier is not cached.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] for the tree root
    /// - [`FsError::NotFound`] if the parent does not exist
    pub fn create(&self, path: &Path, mime_type: &str) -> Result<DocumentId, FsError> {
        let tree = tree(path)?;
        let path = path.normalize();
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(FsError::InvalidPath {
                path: path.to_string(),
                reason: "cannot create the tree root",
            });
        };
        let name = display_name(&path, name)?;
        self.invalidate(&path);
        let parent_id = self.resolve(tree, &parent)?;
        self.backend.create_document(&parent_id, mime_type, name)
    }

    fn writable_document(&self, path: &Path, options: OpenOptions) -> Result<DocumentId, FsError> {
        match self.document_id(path) {
            Ok(_) if options.create_new => Err(FsError::AlreadyExists {
                path: path.to_string(),
                operation: "create",
            }),
            Ok(id) => Ok(id),
            Err(e) if e.kind() == ErrorKind::NotFound && (options.create || options.create_new) => {
                self.create(path, GENERIC_MIME_TYPE)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the document at `path`, preferring the backend's accelerated
    /// removal from its parent.
    fn remove_document(&self, path: &Path) -> Result<(), FsError> {
        let tree = tree(path)?;
        let path = path.normalize();
        let id = self.resolve(tree, &path)?;
        let parent_id = match path.parent() {
            Some(parent) if self.config.supports_remove(&tree.authority) => {
                Some(self.resolve(tree, &parent)?)
            }
            _ => None,
        };
        self.invalidate(&path);
        match parent_id {
            Some(parent_id) => match self.backend.remove_document(&id, &parent_id) {
                Err(e) if e.is_not_supported() => {
                    tracing::debug!(%path, "accelerated remove unsupported, deleting");
                    self.backend.delete_document(&id)?;
                }
                other => other?,
            },
            None => self.backend.delete_document(&id)?,
        }
        self.invalidate(&path);
        Ok(())
    }
}

impl FsRead for DocumentProvider {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, FsError> {
        let id = self.document_id(path)?;
        self.backend.open_read(&id)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let (_, row) = self.row(path)?;
        let directory = is_directory(&row);
        let mode = match (directory, row.writable) {
            (true, true) => 0o777,
            (true, false) => 0o555,
            (false, true) => 0o666,
            (false, false) => 0o444,
        };
        let modified = row.last_modified.unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(Metadata {
            file_type: if directory {
                FileType::Directory
            } else {
                FileType::File
            },
            size: row.size.unwrap_or(0),
            permissions: Permissions::from_mode(mode),
            modified,
            accessed: modified,
            mime_type: row.mime_type,
            ..Metadata::default()
        })
    }

    /// Directories only check existence; execute is always denied; read and
    /// write open the document, writing in append mode.
    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        let (id, row) = self.row(path)?;
        if is_directory(&row) {
            return Ok(());
        }
        if mode.execute {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation: "execute",
            });
        }
        if mode.write {
            drop(self.backend.open_write(&id, OpenOptions::APPEND)?);
        }
        if mode.read {
            drop(self.backend.open_read(&id)?);
        }
        Ok(())
    }

    /// Probes the backend without trusting a cached identifier.
    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        tree(path)?;
        self.cache.remove(&path.normalize());
        match self.check_access(path, AccessMode::EXISTS) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl FsWrite for DocumentProvider {
    fn open_write(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError> {
        let id = self.writable_document(path, options)?;
        self.backend.open_write(&id, options)
    }

    fn open_channel(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        let id = self.writable_document(path, options)?;
        self.backend.open_channel(&id, options)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        self.remove_document(path)
    }

    fn rename(&self, path: &Path, new_name: &ByteString) -> Result<Path, FsError> {
        self.rename_document(path, new_name).map(|(target, _)| target)
    }

    fn copy(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
        copy_move::copy(self, source, target, options)
    }

    fn move_to(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
        copy_move::move_to(self, source, target, options)
    }
}

impl FsDir for DocumentProvider {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let path = path.normalize();
        let (id, row) = self.row(&path)?;
        if !is_directory(&row) {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }
        let mut entries = Vec::new();
        for row in self.backend.query_children(&id)? {
            let child = match path.resolve_name(row.display_name.as_str()) {
                Ok(child) => child,
                Err(e) => {
                    tracing::warn!(%path, name = %row.display_name, error = %e, "skipping unusable document name");
                    continue;
                }
            };
            self.cache.insert(child.clone(), row.document_id.clone());
            let file_type = if is_directory(&row) {
                FileType::Directory
            } else {
                FileType::File
            };
            entries.push(Ok(DirEntry {
                name: ByteString::from(row.display_name),
                path: child,
                file_type: Some(file_type),
            }));
        }
        Ok(ReadDirIter::from_vec(entries))
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        if self.exists(path)? {
            return Err(FsError::AlreadyExists {
                path: path.to_string(),
                operation: "create directory",
            });
        }
        self.create(path, DIRECTORY_MIME_TYPE).map(drop)
    }
}

impl FsLink for DocumentProvider {
    fn symlink(&self, _link: &Path, _target: &ByteString) -> Result<(), FsError> {
        Err(not_supported("symlink document"))
    }

    fn hard_link(&self, _link: &Path, _original: &Path) -> Result<(), FsError> {
        Err(not_supported("hard link document"))
    }

    fn read_link(&self, _path: &Path) -> Result<ByteString, FsError> {
        Err(not_supported("read document link"))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.metadata(path)
    }
}

impl FsPermissions for DocumentProvider {
    fn set_permissions(&self, _path: &Path, _perm: Permissions) -> Result<(), FsError> {
        Err(not_supported("set document permissions"))
    }

    fn set_owner(&self, _path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<(), FsError> {
        Err(not_supported("set document owner"))
    }

    fn set_times(
        &self,
        _path: &Path,
        _modified: Option<SystemTime>,
        _accessed: Option<SystemTime>,
    ) -> Result<(), FsError> {
        Err(not_supported("set document times"))
    }
}

impl Provider for DocumentProvider {
    fn scheme(&self) -> Scheme {
        Scheme::Document
    }
}

#[cfg(test)]
pub(crate) mod fake;

#[cfg(test)]
mod tests {
    use super::fake::FakeBackend;
    use super::*;

    const AUTHORITY: &str = "com.example.docs";

    fn setup() -> (Arc<FakeBackend>, DocumentProvider, Path) {
        let backend = Arc::new(FakeBackend::new());
        backend.add_dir("root", "notes", "d-notes");
        backend.add_file("d-notes", "today.txt", "f-today", b"hello");
        backend.add_file("d-notes", "other.txt", "f-other", b"x");
        let provider = DocumentProvider::new(backend.clone());
        let root = Path::document_root(TreeUri::new(AUTHORITY, "root"));
        (backend, provider, root)
    }

    #[test]
    fn second_resolution_is_served_from_cache() {
        let (backend, fs, root) = setup();
        let path = root.join("notes/today.txt").unwrap();
        let first = fs.document_id(&path).unwrap();
        let listings = backend.calls("query_children");
        let second = fs.document_id(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id, "f-today");
        assert_eq!(backend.calls("query_children"), listings);
    }

    #[test]
    fn listing_caches_siblings() {
        let (backend, fs, root) = setup();
        fs.document_id(&root.join("notes/today.txt").unwrap()).unwrap();
        let listings = backend.calls("query_children");
        assert_eq!(
            fs.document_id(&root.join("notes/other.txt").unwrap()).unwrap().id,
            "f-other"
        );
        assert_eq!(backend.calls("query_children"), listings);
    }

    #[test]
    fn missing_child_is_not_found() {
        let (_, fs, root) = setup();
        let err = fs.document_id(&root.join("notes/nope").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn root_resolves_to_tree_id() {
        let (_, fs, root) = setup();
        assert_eq!(fs.document_id(&root).unwrap().id, "root");
    }

    #[test]
    fn metadata_and_listing() {
        let (_, fs, root) = setup();
        let notes = root.join("notes").unwrap();
        assert!(fs.metadata(&notes).unwrap().is_dir());
        let file = fs.metadata(&notes.join("today.txt").unwrap()).unwrap();
        assert!(file.is_file());
        assert_eq!(file.size, 5);

        let mut names: Vec<String> = fs
            .read_dir(&notes)
            .unwrap()
            .collect_all()
            .unwrap()
            .into_iter()
            .map(|e| e.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["other.txt", "today.txt"]);
        assert_eq!(
            fs.read_dir(&notes.join("today.txt").unwrap()).err().unwrap().kind(),
            ErrorKind::NotADirectory
        );
    }

    #[test]
    fn rename_drops_stale_id() {
        let (_, fs, root) = setup();
        let old = root.join("notes/today.txt").unwrap();
        fs.document_id(&old).unwrap();
        let new = fs.rename(&old, &"renamed.txt".into()).unwrap();
        assert_eq!(new, root.join("notes/renamed.txt").unwrap());
        assert_eq!(fs.document_id(&old).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.document_id(&new).unwrap().id, "f-today");
    }

    #[test]
    fn remove_falls_back_to_delete() {
        let (backend, fs, root) = setup();
        let path = root.join("notes/today.txt").unwrap();
        fs.remove(&path).unwrap();
        assert_eq!(backend.calls("remove_document"), 1);
        assert_eq!(backend.calls("delete_document"), 1);
        assert!(!fs.exists(&path).unwrap());
    }

    #[test]
    fn remove_skips_acceleration_for_listed_authorities() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_file("root", "a.txt", "f-a", b"a");
        let fs = DocumentProvider::new(backend.clone());
        let root = Path::document_root(TreeUri::new("com.android.mtp.documents", "root"));
        fs.remove(&root.join("a.txt").unwrap()).unwrap();
        assert_eq!(backend.calls("remove_document"), 0);
        assert_eq!(backend.calls("delete_document"), 1);
    }

    #[test]
    fn exists_ignores_stale_cache() {
        let (backend, fs, root) = setup();
        let path = root.join("notes/today.txt").unwrap();
        fs.document_id(&path).unwrap();
        backend.delete_behind_the_back("f-today");
        assert!(!fs.exists(&path).unwrap());
    }

    #[test]
    fn write_creates_with_generic_mime_type() {
        let (backend, fs, root) = setup();
        let path = root.join("notes/new.bin").unwrap();
        fs.open_write(&path, OpenOptions::WRITE)
            .unwrap()
            .write_all(b"data")
            .unwrap();
        let (_, row) = fs.row(&path).unwrap();
        assert_eq!(row.mime_type.as_deref(), Some(GENERIC_MIME_TYPE));
        assert_eq!(backend.content(&row.document_id), b"data");
        assert_eq!(
            fs.open_write(&path, OpenOptions::CREATE_NEW).err().unwrap().kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn create_dir_rejects_existing() {
        let (_, fs, root) = setup();
        let dir = root.join("fresh").unwrap();
        fs.create_dir(&dir).unwrap();
        assert!(fs.metadata(&dir).unwrap().is_dir());
        assert_eq!(fs.create_dir(&dir).unwrap_err().kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn access_checks() {
        let (_, fs, root) = setup();
        let file = root.join("notes/today.txt").unwrap();
        assert!(fs.check_access(&file, AccessMode::READ).is_ok());
        assert!(fs.check_access(&file, AccessMode::WRITE).is_ok());
        assert_eq!(
            fs.check_access(&file, AccessMode::EXECUTE).unwrap_err().kind(),
            ErrorKind::AccessDenied
        );
        assert!(fs.check_access(&root.join("notes").unwrap(), AccessMode::EXECUTE).is_ok());
    }

    #[test]
    fn rejects_foreign_and_relative_paths() {
        let (_, fs, _) = setup();
        assert_eq!(
            fs.document_id(&Path::local("/x")).unwrap_err().kind(),
            ErrorKind::ProviderMismatch
        );
        let tree = Origin::Document(Arc::new(TreeUri::new(AUTHORITY, "root")));
        assert_eq!(
            fs.document_id(&Path::parse(tree, "a/b")).unwrap_err().kind(),
            ErrorKind::InvalidPath
        );
    }

    #[test]
    fn config_defaults_and_builders() {
        let config = DocumentConfig::default();
        assert!(!config.supports_copy("com.android.shell.documents"));
        assert!(!config.supports_remove("com.android.externalstorage.documents"));
        assert!(!config.supports_move("com.android.mtp.documents"));
        assert!(config.supports_move("com.android.shell.documents"));
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);

        let config = config.with_copy_unsupported(["x"]).with_cache_capacity(8);
        assert!(!config.supports_copy("x"));
        assert!(config.supports_copy("com.android.shell.documents"));
        assert_eq!(config.cache_capacity, 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json_keeps_defaults() {
        let config = DocumentConfig::from_json(r#"{"cache_capacity": 16}"#).unwrap();
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.move_unsupported, ["com.android.mtp.documents"]);
        assert!(DocumentConfig::from_json("{").is_err());
    }
}
