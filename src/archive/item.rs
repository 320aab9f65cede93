//! Flat archive entries and the tree items built from them.

use std::collections::BTreeSet;
use std::time::SystemTime;

use crate::{ByteString, FileType, Metadata, Path, Permissions};

/// Where an entry's bytes live inside the container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryData {
    /// No stored bytes (directories, synthesized items).
    Empty,
    /// Uncompressed bytes at `offset`.
    Stored { offset: u64, size: u64 },
    /// A raw deflate stream at `offset`.
    Deflated { offset: u64, compressed_size: u64 },
    /// Bytes at `offset` of the decompressed stream of a gzip container.
    Gzipped { offset: u64, size: u64 },
    /// Present but unreadable by this crate.
    Unsupported(&'static str),
}

/// One record of an archive's flat entry list.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Entry name as stored, `/`-separated.
    pub name: ByteString,
    /// Entry type.
    pub file_type: FileType,
    /// Uncompressed size.
    pub size: u64,
    /// Size as stored in the container.
    pub compressed_size: u64,
    /// Whether the entry data is encrypted.
    pub encrypted: bool,
    /// Permission bits, if recorded.
    pub mode: Option<u32>,
    /// Last modification time.
    pub modified: SystemTime,
    /// Numeric owner id.
    pub uid: Option<u32>,
    /// Numeric group id.
    pub gid: Option<u32>,
    /// Owner name.
    pub owner: Option<String>,
    /// Group name.
    pub group: Option<String>,
    /// Symlink target stored in the header (tar).
    pub link_name: Option<ByteString>,
    /// Per-entry comment (zip).
    pub comment: Option<String>,
    pub(crate) data: EntryData,
}

impl ArchiveEntry {
    /// An entry classified by its name: a trailing `/` marks a directory.
    pub fn new(name: impl Into<ByteString>) -> Self {
        let name = name.into();
        let file_type = if name.ends_with(b"/") {
            FileType::Directory
        } else {
            FileType::File
        };
        Self {
            name,
            file_type,
            size: 0,
            compressed_size: 0,
            encrypted: false,
            mode: None,
            modified: SystemTime::UNIX_EPOCH,
            uid: None,
            gid: None,
            owner: None,
            group: None,
            link_name: None,
            comment: None,
            data: EntryData::Empty,
        }
    }

    /// Override the classified type.
    pub fn with_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    /// Set the uncompressed size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn with_data(mut self, data: EntryData) -> Self {
        self.data = data;
        self
    }
}

/// A node of a materialized archive tree.
///
/// Synthesized directories (parents no entry named explicitly) carry no
/// entry.
#[derive(Debug, Clone)]
pub struct ArchiveItem {
    path: Path,
    entry: Option<ArchiveEntry>,
    children: BTreeSet<Path>,
}

impl ArchiveItem {
    pub(crate) fn from_entry(path: Path, entry: ArchiveEntry) -> Self {
        Self {
            path,
            entry: Some(entry),
            children: BTreeSet::new(),
        }
    }

    pub(crate) fn synthesized(path: Path) -> Self {
        Self {
            path,
            entry: None,
            children: BTreeSet::new(),
        }
    }

    pub(crate) fn add_child(&mut self, child: Path) {
        self.children.insert(child);
    }

    /// Path of this item inside the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The archive entry, or `None` for a synthesized directory.
    pub fn entry(&self) -> Option<&ArchiveEntry> {
        self.entry.as_ref()
    }

    /// Returns `true` if no entry named this item.
    pub fn is_synthesized(&self) -> bool {
        self.entry.is_none()
    }

    /// Type of the item. Synthesized items are directories.
    pub fn file_type(&self) -> FileType {
        self.entry.as_ref().map_or(FileType::Directory, |e| e.file_type)
    }

    /// Children in lexicographic order.
    pub fn children(&self) -> impl Iterator<Item = &Path> {
        self.children.iter()
    }

    /// Attributes as [`Metadata`].
    pub fn metadata(&self) -> Metadata {
        let file_type = self.file_type();
        let default_mode = match file_type {
            FileType::Directory => Permissions::default_dir(),
            FileType::Symlink => Permissions::from_mode(0o777),
            _ => Permissions::default_file(),
        };
        let Some(entry) = &self.entry else {
            return Metadata {
                file_type,
                permissions: default_mode,
                ..Metadata::default()
            };
        };
        Metadata {
            file_type,
            size: entry.size,
            permissions: entry.mode.map_or(default_mode, Permissions::from_mode),
            modified: entry.modified,
            accessed: entry.modified,
            uid: entry.uid,
            gid: entry.gid,
            owner: entry.owner.clone(),
            group: entry.group.clone(),
            ..Metadata::default()
        }
    }
}
