//! Directory tree materialization from a flat entry list.

use std::collections::HashMap;

use crate::{ByteString, FileType, FsError, Path};

use super::item::{ArchiveEntry, ArchiveItem};

/// Upper bound on symlink hops while resolving inside a tree.
const MAX_LINK_HOPS: usize = 40;

/// The directory tree of one archive, keyed by path.
#[derive(Debug)]
pub struct ArchiveTree {
    root: Path,
    items: HashMap<Path, ArchiveItem>,
}

impl ArchiveTree {
    /// Build a tree under `root` from `entries`, in archive order.
    ///
    /// - Names are resolved under `root` and normalized; names that escape
    ///   it or normalize to the root itself are dropped.
    /// - The first entry for a path wins.
    /// - The root and every missing ancestor are synthesized as directories.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use polyfs::{ArchiveEntry, ArchiveTree, Path};
    ///
    /// let root = Path::archive_root("/tmp/a.zip");
    /// let tree = ArchiveTree::materialize(
    ///     root.clone(),
    ///     [ArchiveEntry::new("a/b/c.txt"), ArchiveEntry::new("a/d/")],
    /// );
    /// assert_eq!(tree.len(), 5);
    /// assert!(tree.get(&root.join("a/b").unwrap()).unwrap().is_synthesized());
    /// ```
    pub fn materialize(root: Path, entries: impl IntoIterator<Item = ArchiveEntry>) -> Self {
        let root = root.normalize();
        let mut items: HashMap<Path, ArchiveItem> = HashMap::new();

        for entry in entries {
            let path = match root.resolve_within(entry.name.as_bytes()) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(%root, name = %entry.name, error = %e, "skipping archive entry");
                    continue;
                }
            };
            if path == root {
                tracing::debug!(%root, name = %entry.name, "skipping archive entry naming the root");
                continue;
            }
            if items.contains_key(&path) {
                tracing::warn!(%path, "duplicate archive entry, keeping the first");
                continue;
            }
            items.insert(path.clone(), ArchiveItem::from_entry(path, entry));
        }

        items
            .entry(root.clone())
            .or_insert_with(|| ArchiveItem::synthesized(root.clone()));

        let known: Vec<Path> = items.keys().cloned().collect();
        for path in known {
            let mut child = path;
            while let Some(parent) = child.parent() {
                let existed = items.contains_key(&parent);
                items
                    .entry(parent.clone())
                    .or_insert_with(|| ArchiveItem::synthesized(parent.clone()))
                    .add_child(child);
                if existed {
                    break;
                }
                child = parent;
            }
        }

        Self { root, items }
    }

    /// The tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of items, the root included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`: the root is always present.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item. `path` is normalized first.
    pub fn get(&self, path: &Path) -> Option<&ArchiveItem> {
        self.items.get(&path.normalize())
    }

    /// All paths in lexicographic order.
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.items.keys().collect();
        paths.sort();
        paths
    }

    /// Look up an item, failing with [`FsError::NotFound`].
    pub(crate) fn require(&self, path: &Path) -> Result<&ArchiveItem, FsError> {
        self.get(path).ok_or_else(|| FsError::NotFound {
            path: path.to_string(),
        })
    }

    /// Follow symlinks from `path` until a non-link item.
    ///
    /// `link_target` reads a link item's target. Relative targets resolve
    /// against the link's parent; absolute targets against the tree root.
    pub(crate) fn follow(
        &self,
        path: &Path,
        link_target: impl Fn(&ArchiveItem) -> Result<ByteString, FsError>,
    ) -> Result<&ArchiveItem, FsError> {
        let mut item = self.require(path)?;
        for _ in 0..MAX_LINK_HOPS {
            if item.file_type() != FileType::Symlink {
                return Ok(item);
            }
            let target = link_target(item)?;
            let base = item.path().parent().unwrap_or_else(|| self.root.clone());
            item = self.require(&base.join(target.as_bytes())?)?;
        }
        Err(FsError::FilesystemLoop {
            path: path.to_string(),
        })
    }
}
