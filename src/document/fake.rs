//! In-memory document backend that counts its calls.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{DocumentBackend, DocumentId, DocumentRow};
use crate::{DIRECTORY_MIME_TYPE, FsError, OpenOptions};

struct Doc {
    parent: String,
    name: String,
    mime: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    docs: BTreeMap<String, Doc>,
    next_id: u64,
}

impl State {
    fn get(&self, id: &str) -> Result<&Doc, FsError> {
        self.docs.get(id).ok_or_else(|| FsError::NotFound { path: id.to_owned() })
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Doc, FsError> {
        self.docs
            .get_mut(id)
            .ok_or_else(|| FsError::NotFound { path: id.to_owned() })
    }

    fn remove_tree(&mut self, id: &str) {
        let children: Vec<String> = self
            .docs
            .iter()
            .filter(|(_, doc)| doc.parent == id)
            .map(|(child, _)| child.clone())
            .collect();
        for child in children {
            self.remove_tree(&child);
        }
        self.docs.remove(id);
    }
}

pub(crate) struct FakeBackend {
    state: Arc<Mutex<State>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    accelerated: bool,
    fail_rename: AtomicBool,
    fail_delete: AtomicBool,
    fail_reads: AtomicBool,
    reissue_on_rename: AtomicBool,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        let mut state = State::default();
        state.docs.insert(
            "root".to_owned(),
            Doc {
                parent: String::new(),
                name: String::new(),
                mime: DIRECTORY_MIME_TYPE.to_owned(),
                data: Vec::new(),
            },
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            calls: Mutex::new(HashMap::new()),
            accelerated: false,
            fail_rename: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            reissue_on_rename: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_acceleration(mut self) -> Self {
        self.accelerated = true;
        self
    }

    pub(crate) fn fail_rename(&self) {
        self.fail_rename.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Renamed documents get a fresh identifier, `r-{old}`.
    pub(crate) fn reissue_on_rename(&self) {
        self.reissue_on_rename.store(true, Ordering::SeqCst);
    }

    fn insert(&self, parent: &str, name: &str, id: &str, mime: &str, data: &[u8]) {
        self.state.lock().docs.insert(
            id.to_owned(),
            Doc {
                parent: parent.to_owned(),
                name: name.to_owned(),
                mime: mime.to_owned(),
                data: data.to_vec(),
            },
        );
    }

    pub(crate) fn add_dir(&self, parent: &str, name: &str, id: &str) {
        self.insert(parent, name, id, DIRECTORY_MIME_TYPE, b"");
    }

    pub(crate) fn add_file(&self, parent: &str, name: &str, id: &str, data: &[u8]) {
        self.insert(parent, name, id, "text/plain", data);
    }

    pub(crate) fn delete_behind_the_back(&self, id: &str) {
        self.state.lock().remove_tree(id);
    }

    pub(crate) fn content(&self, id: &str) -> Vec<u8> {
        self.state
            .lock()
            .docs
            .get(id)
            .map(|doc| doc.data.clone())
            .unwrap_or_default()
    }

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }

    fn record(&self, name: &'static str) {
        *self.calls.lock().entry(name).or_default() += 1;
    }

    fn unsupported(operation: &'static str) -> FsError {
        FsError::NotSupported { operation }
    }

    fn row(id: &str, doc: &Doc) -> DocumentRow {
        let directory = doc.mime == DIRECTORY_MIME_TYPE;
        DocumentRow {
            document_id: id.to_owned(),
            display_name: doc.name.clone(),
            mime_type: Some(doc.mime.clone()),
            size: (!directory).then_some(doc.data.len() as u64),
            last_modified: None,
            writable: true,
        }
    }
}

struct FakeWriter {
    state: Arc<Mutex<State>>,
    id: String,
}

impl Write for FakeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let doc = state.get_mut(&self.id).map_err(io::Error::from)?;
        doc.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DocumentBackend for FakeBackend {
    fn query_children(&self, parent: &DocumentId) -> Result<Vec<DocumentRow>, FsError> {
        self.record("query_children");
        let state = self.state.lock();
        state.get(&parent.id)?;
        Ok(state
            .docs
            .iter()
            .filter(|(_, doc)| doc.parent == parent.id)
            .map(|(id, doc)| Self::row(id, doc))
            .collect())
    }

    fn query_document(&self, document: &DocumentId) -> Result<DocumentRow, FsError> {
        self.record("query_document");
        let state = self.state.lock();
        Ok(Self::row(&document.id, state.get(&document.id)?))
    }

    fn create_document(
        &self,
        parent: &DocumentId,
        mime_type: &str,
        display_name: &str,
    ) -> Result<DocumentId, FsError> {
        self.record("create_document");
        let mut state = self.state.lock();
        state.get(&parent.id)?;
        state.next_id += 1;
        let id = format!("n{}", state.next_id);
        state.docs.insert(
            id.clone(),
            Doc {
                parent: parent.id.clone(),
                name: display_name.to_owned(),
                mime: mime_type.to_owned(),
                data: Vec::new(),
            },
        );
        Ok(DocumentId::new(Arc::clone(&parent.tree), id))
    }

    fn rename_document(&self, document: &DocumentId, display_name: &str) -> Result<DocumentId, FsError> {
        self.record("rename_document");
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(FsError::PermissionDenied {
                path: document.id.clone(),
                operation: "rename",
            });
        }
        let mut state = self.state.lock();
        state.get_mut(&document.id)?.name = display_name.to_owned();
        if !self.reissue_on_rename.load(Ordering::SeqCst) {
            return Ok(document.clone());
        }
        let id = format!("r-{}", document.id);
        if let Some(doc) = state.docs.remove(&document.id) {
            state.docs.insert(id.clone(), doc);
        }
        for doc in state.docs.values_mut().filter(|doc| doc.parent == document.id) {
            doc.parent = id.clone();
        }
        Ok(DocumentId::new(Arc::clone(&document.tree), id))
    }

    fn delete_document(&self, document: &DocumentId) -> Result<(), FsError> {
        self.record("delete_document");
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(FsError::PermissionDenied {
                path: document.id.clone(),
                operation: "delete",
            });
        }
        let mut state = self.state.lock();
        state.get(&document.id)?;
        state.remove_tree(&document.id);
        Ok(())
    }

    fn remove_document(&self, document: &DocumentId, _parent: &DocumentId) -> Result<(), FsError> {
        self.record("remove_document");
        if !self.accelerated {
            return Err(Self::unsupported("remove document"));
        }
        let mut state = self.state.lock();
        state.get(&document.id)?;
        state.remove_tree(&document.id);
        Ok(())
    }

    fn copy_document(&self, source: &DocumentId, target_parent: &DocumentId) -> Result<DocumentId, FsError> {
        self.record("copy_document");
        if !self.accelerated {
            return Err(Self::unsupported("copy document"));
        }
        let mut state = self.state.lock();
        let doc = state.get(&source.id)?;
        let copy = Doc {
            parent: target_parent.id.clone(),
            name: doc.name.clone(),
            mime: doc.mime.clone(),
            data: doc.data.clone(),
        };
        state.next_id += 1;
        let id = format!("c{}", state.next_id);
        state.docs.insert(id.clone(), copy);
        Ok(DocumentId::new(Arc::clone(&target_parent.tree), id))
    }

    fn move_document(
        &self,
        source: &DocumentId,
        _source_parent: &DocumentId,
        target_parent: &DocumentId,
    ) -> Result<DocumentId, FsError> {
        self.record("move_document");
        if !self.accelerated {
            return Err(Self::unsupported("move document"));
        }
        self.state.lock().get_mut(&source.id)?.parent = target_parent.id.clone();
        Ok(source.clone())
    }

    fn open_read(&self, document: &DocumentId) -> Result<Box<dyn Read + Send>, FsError> {
        self.record("open_read");
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FsError::Backend(format!("{}: read failed", document.id)));
        }
        let data = self.state.lock().get(&document.id)?.data.clone();
        Ok(Box::new(io::Cursor::new(data)))
    }

    fn open_write(&self, document: &DocumentId, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError> {
        self.record("open_write");
        {
            let mut state = self.state.lock();
            let doc = state.get_mut(&document.id)?;
            if options.truncate {
                doc.data.clear();
            }
        }
        Ok(Box::new(FakeWriter {
            state: Arc::clone(&self.state),
            id: document.id.clone(),
        }))
    }
}
