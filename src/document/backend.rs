//! The host service a document tree lives in.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::{Channel, FsError, OpenOptions, TreeUri};

/// A document inside a granted tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    /// The tree the identifier was resolved in.
    pub tree: Arc<TreeUri>,
    /// The backend's identifier.
    pub id: String,
}

impl DocumentId {
    /// Pair an identifier with its tree.
    pub fn new(tree: Arc<TreeUri>, id: impl Into<String>) -> Self {
        Self { tree, id: id.into() }
    }
}

/// One row of a document listing or query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentRow {
    /// Backend identifier.
    pub document_id: String,
    /// Name shown to users; unique among siblings.
    pub display_name: String,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// Size in bytes, if known.
    pub size: Option<u64>,
    /// Last modification time, if known.
    pub last_modified: Option<SystemTime>,
    /// Whether the document accepts writes.
    pub writable: bool,
}

/// Host service behind a document tree.
///
/// Identifier resolution, caching and fallbacks live in
/// [`DocumentProvider`](super::DocumentProvider); a backend only performs
/// single calls. The accelerated calls ([`remove_document`](Self::remove_document),
/// [`copy_document`](Self::copy_document), [`move_document`](Self::move_document))
/// default to [`FsError::NotSupported`], which makes the provider fall back
/// to plain calls.
pub trait DocumentBackend: Send + Sync {
    /// Identifier of the document at the top of `tree`.
    fn tree_root_id(&self, tree: &TreeUri) -> Result<String, FsError> {
        Ok(tree.tree_id.clone())
    }

    /// List the children of `parent`.
    fn query_children(&self, parent: &DocumentId) -> Result<Vec<DocumentRow>, FsError>;

    /// Describe one document.
    fn query_document(&self, document: &DocumentId) -> Result<DocumentRow, FsError>;

    /// Create a document under `parent`; the backend may alter the name.
    fn create_document(
        &self,
        parent: &DocumentId,
        mime_type: &str,
        display_name: &str,
    ) -> Result<DocumentId, FsError>;

    /// Rename a document, returning its possibly new identifier.
    fn rename_document(&self, document: &DocumentId, display_name: &str) -> Result<DocumentId, FsError>;

    /// Delete a document and, for directories, everything below it.
    fn delete_document(&self, document: &DocumentId) -> Result<(), FsError>;

    /// Remove a document from one parent.
    fn remove_document(&self, _document: &DocumentId, _parent: &DocumentId) -> Result<(), FsError> {
        Err(FsError::NotSupported {
            operation: "remove document",
        })
    }

    /// Copy a document into `target_parent`, keeping its name.
    fn copy_document(&self, _source: &DocumentId, _target_parent: &DocumentId) -> Result<DocumentId, FsError> {
        Err(FsError::NotSupported {
            operation: "copy document",
        })
    }

    /// Move a document between parents, keeping its name.
    fn move_document(
        &self,
        _source: &DocumentId,
        _source_parent: &DocumentId,
        _target_parent: &DocumentId,
    ) -> Result<DocumentId, FsError> {
        Err(FsError::NotSupported {
            operation: "move document",
        })
    }

    /// Open a document for reading.
    fn open_read(&self, document: &DocumentId) -> Result<Box<dyn Read + Send>, FsError>;

    /// Open a document for writing.
    fn open_write(&self, document: &DocumentId, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError>;

    /// Open a seekable channel.
    fn open_channel(&self, _document: &DocumentId, _options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        Err(FsError::NotSupported {
            operation: "document channel",
        })
    }
}
