//! Copy and move between document paths.
//!
//! Backend-native copy and move are tried first when both sides share an
//! authority that is not known to reject them. A [`FsError::NotSupported`]
//! answer falls back to streaming the bytes through a newly created
//! document.

use crate::copy::copy_stream;
use crate::{
    CopyOptions, DIRECTORY_MIME_TYPE, ErrorKind, FsError, FsRead, FsWrite, GENERIC_MIME_TYPE,
    OpenOptions, Path,
};

use super::{DocumentId, DocumentProvider, display_name, is_directory, tree};

pub(super) fn copy(
    fs: &DocumentProvider,
    source: &Path,
    target: &Path,
    options: &CopyOptions,
) -> Result<(), FsError> {
    if options.atomic_move {
        return Err(FsError::NotSupported {
            operation: "atomic copy",
        });
    }
    let source_tree = tree(source)?;
    let target_tree = tree(target)?;
    let source = source.normalize();
    let target = target.normalize();
    if source == target {
        notify_size(fs, &fs.document_id(&source)?, options);
        return Ok(());
    }
    prepare_target(fs, &target, "copy", options)?;
    let (Some(target_parent), Some(target_name)) = (target.parent(), target.file_name()) else {
        return Err(FsError::InvalidPath {
            path: target.to_string(),
            reason: "cannot copy onto the tree root",
        });
    };
    let target_name = display_name(&target, target_name)?;

    if source_tree.authority == target_tree.authority && fs.config.supports_copy(&source_tree.authority) {
        let source_id = fs.document_id(&source)?;
        let parent_id = fs.document_id(&target_parent)?;
        fs.invalidate(&target);
        match fs.backend.copy_document(&source_id, &parent_id) {
            Ok(copied) => {
                let copied = if source.file_name().map(|n| n.as_bytes()) == Some(target_name.as_bytes()) {
                    copied
                } else {
                    rename_copy(fs, copied, target_name)?
                };
                fs.invalidate(&target);
                notify_size(fs, &copied, options);
                return Ok(());
            }
            Err(e) if e.is_not_supported() => {
                tracing::debug!(%source, %target, "accelerated copy unsupported, copying manually");
            }
            Err(e) => return Err(e),
        }
    }
    copy_manually(fs, &source, &target, options)
}

pub(super) fn move_to(
    fs: &DocumentProvider,
    source: &Path,
    target: &Path,
    options: &CopyOptions,
) -> Result<(), FsError> {
    let source_tree = tree(source)?;
    let target_tree = tree(target)?;
    let source = source.normalize();
    let target = target.normalize();
    if source == target {
        notify_size(fs, &fs.document_id(&source)?, options);
        return Ok(());
    }
    let (Some(source_parent), Some(target_parent), Some(target_name)) =
        (source.parent(), target.parent(), target.file_name())
    else {
        return Err(FsError::InvalidPath {
            path: format!("{source} -> {target}"),
            reason: "cannot move the tree root",
        });
    };
    let target_name = display_name(&target, target_name)?;
    let source_id = fs.document_id(&source)?;
    prepare_target(fs, &target, "move", options)?;

    if source_tree == target_tree && source_parent == target_parent {
        let (_, renamed) = fs.rename_document(&source, &target_name.into())?;
        notify_size(fs, &renamed, options);
        return Ok(());
    }

    if source_tree.authority == target_tree.authority && fs.config.supports_move(&source_tree.authority) {
        let source_parent_id = fs.document_id(&source_parent)?;
        let target_parent_id = fs.document_id(&target_parent)?;
        fs.invalidate(&source);
        fs.invalidate(&target);
        match fs
            .backend
            .move_document(&source_id, &source_parent_id, &target_parent_id)
        {
            Ok(moved) => {
                fs.invalidate(&source);
                let moved = if source.file_name().map(|n| n.as_bytes()) == Some(target_name.as_bytes()) {
                    moved
                } else {
                    fs.backend.rename_document(&moved, target_name)?
                };
                fs.invalidate(&target);
                notify_size(fs, &moved, options);
                return Ok(());
            }
            Err(e) if e.is_not_supported() => {
                tracing::debug!(%source, %target, "accelerated move unsupported, moving by copy");
            }
            Err(e) => return Err(e),
        }
    }

    if options.atomic_move {
        return Err(FsError::NotSupported {
            operation: "atomic move",
        });
    }
    let row = fs.backend.query_document(&source_id)?;
    if is_directory(&row) && !fs.backend.query_children(&source_id)?.is_empty() {
        return Err(FsError::DirectoryNotEmpty {
            path: source.to_string(),
        });
    }
    copy(fs, &source, &target, options)?;
    // The copy stays in place if the source cannot be removed.
    fs.remove(&source)
}

/// Clear the way for `target`, failing unless replacement was requested.
fn prepare_target(
    fs: &DocumentProvider,
    target: &Path,
    operation: &'static str,
    options: &CopyOptions,
) -> Result<(), FsError> {
    if fs.exists(target)? {
        if !options.replace_existing {
            return Err(FsError::AlreadyExists {
                path: target.to_string(),
                operation,
            });
        }
        fs.remove(target)?;
    }
    Ok(())
}

/// Give an accelerated copy its requested name, deleting it if that fails.
fn rename_copy(fs: &DocumentProvider, copied: DocumentId, name: &str) -> Result<DocumentId, FsError> {
    match fs.backend.rename_document(&copied, name) {
        Ok(renamed) => Ok(renamed),
        Err(e) => Err(match fs.backend.delete_document(&copied) {
            Ok(()) => e,
            Err(cleanup) => e.with_cleanup(cleanup),
        }),
    }
}

fn copy_manually(
    fs: &DocumentProvider,
    source: &Path,
    target: &Path,
    options: &CopyOptions,
) -> Result<(), FsError> {
    let source_id = fs.document_id(source)?;
    let row = fs.backend.query_document(&source_id)?;
    if is_directory(&row) {
        let created = fs.create(target, DIRECTORY_MIME_TYPE)?;
        notify_size(fs, &created, options);
        return Ok(());
    }
    let mime_type = row.mime_type.unwrap_or_else(|| {
        tracing::warn!(%source, fallback = GENERIC_MIME_TYPE, "document has no MIME type");
        GENERIC_MIME_TYPE.to_owned()
    });
    let created = fs.create(target, &mime_type)?;
    match stream_copy(fs, &source_id, &created, target, options) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Interrupted => Err(e),
        Err(e) => {
            fs.invalidate(target);
            Err(match fs.backend.delete_document(&created) {
                Ok(()) => e,
                Err(cleanup) => e.with_cleanup(cleanup),
            })
        }
    }
}

fn stream_copy(
    fs: &DocumentProvider,
    source: &DocumentId,
    target_id: &DocumentId,
    target: &Path,
    options: &CopyOptions,
) -> Result<u64, FsError> {
    let mut reader = fs.backend.open_read(source)?;
    let mut writer = fs.backend.open_write(target_id, OpenOptions::WRITE)?;
    copy_stream(&mut *reader, &mut *writer, target, options)
}

/// Report the size of `document` to the progress callback, if one is set.
fn notify_size(fs: &DocumentProvider, document: &DocumentId, options: &CopyOptions) {
    if options.progress.is_none() {
        return;
    }
    match fs.backend.query_document(document) {
        Ok(row) => options.notify(row.size.unwrap_or(0)),
        Err(e) => tracing::warn!(id = %document.id, error = %e, "cannot query size for progress"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::FakeBackend;
    use super::*;
    use crate::{FsDir, TreeUri};
    use parking_lot::Mutex;
    use std::io::Read;
    use std::sync::Arc;

    fn root(authority: &str) -> Path {
        Path::document_root(TreeUri::new(authority, "root"))
    }

    fn setup(backend: FakeBackend) -> (Arc<FakeBackend>, DocumentProvider) {
        let backend = Arc::new(backend);
        backend.add_dir("root", "src", "d-src");
        backend.add_dir("root", "dst", "d-dst");
        backend.add_file("d-src", "file", "f-file", b"payload bytes");
        let fs = DocumentProvider::new(backend.clone());
        (backend, fs)
    }

    fn read(fs: &DocumentProvider, path: &Path) -> Vec<u8> {
        let mut out = Vec::new();
        fs.open_read(path).unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn accelerated_copy_renames_when_names_differ() {
        let (backend, fs) = setup(FakeBackend::new().with_acceleration());
        let root = root("com.example.docs");
        let target = root.join("dst/renamed").unwrap();
        fs.copy(&root.join("src/file").unwrap(), &target, &CopyOptions::default())
            .unwrap();
        assert_eq!(backend.calls("copy_document"), 1);
        assert_eq!(backend.calls("rename_document"), 1);
        assert_eq!(read(&fs, &target), b"payload bytes");
    }

    #[test]
    fn failed_rename_after_copy_removes_the_copy() {
        let backend = FakeBackend::new().with_acceleration();
        backend.fail_rename();
        let (backend, fs) = setup(backend);
        let root = root("com.example.docs");
        let err = fs
            .copy(
                &root.join("src/file").unwrap(),
                &root.join("dst/renamed").unwrap(),
                &CopyOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert_eq!(backend.calls("delete_document"), 1);
        assert!(fs.read_dir(&root.join("dst").unwrap()).unwrap().collect_all().unwrap().is_empty());
    }

    #[test]
    fn unsupported_copy_falls_back_to_identical_bytes() {
        let (backend, fs) = setup(FakeBackend::new());
        let root = root("com.example.docs");
        let target = root.join("dst/file").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = CopyOptions::default().with_progress(std::time::Duration::ZERO, move |n| sink.lock().push(n));
        fs.copy(&root.join("src/file").unwrap(), &target, &options).unwrap();
        assert_eq!(backend.calls("copy_document"), 1);
        assert_eq!(read(&fs, &target), b"payload bytes");
        assert_eq!(seen.lock().last().copied(), Some(13));
    }

    #[test]
    fn listed_authority_never_tries_acceleration() {
        let (backend, fs) = setup(FakeBackend::new().with_acceleration());
        let root = root("com.android.externalstorage.documents");
        fs.copy(
            &root.join("src/file").unwrap(),
            &root.join("dst/file").unwrap(),
            &CopyOptions::default(),
        )
        .unwrap();
        assert_eq!(backend.calls("copy_document"), 0);
    }

    #[test]
    fn copy_onto_existing_target() {
        let (backend, fs) = setup(FakeBackend::new());
        backend.add_file("d-dst", "file", "f-old", b"old");
        let root = root("com.example.docs");
        let source = root.join("src/file").unwrap();
        let target = root.join("dst/file").unwrap();
        let err = fs.copy(&source, &target, &CopyOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        fs.copy(&source, &target, &CopyOptions::default().with_replace_existing(true))
            .unwrap();
        assert_eq!(read(&fs, &target), b"payload bytes");
    }

    #[test]
    fn atomic_copy_is_not_supported() {
        let (_, fs) = setup(FakeBackend::new());
        let root = root("com.example.docs");
        let err = fs
            .copy(
                &root.join("src/file").unwrap(),
                &root.join("dst/file").unwrap(),
                &CopyOptions::default().with_atomic_move(true),
            )
            .unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn failed_manual_copy_deletes_partial_target() {
        let backend = FakeBackend::new();
        backend.fail_reads();
        let (backend, fs) = setup(backend);
        let root = root("com.example.docs");
        let target = root.join("dst/file").unwrap();
        fs.copy(&root.join("src/file").unwrap(), &target, &CopyOptions::default())
            .unwrap_err();
        assert_eq!(backend.calls("delete_document"), 1);
        assert!(!fs.exists(&target).unwrap());
    }

    #[test]
    fn move_within_parent_is_a_rename() {
        let (backend, fs) = setup(FakeBackend::new().with_acceleration());
        let root = root("com.example.docs");
        let source = root.join("src/file").unwrap();
        let target = root.join("src/moved").unwrap();
        fs.move_to(&source, &target, &CopyOptions::default()).unwrap();
        assert_eq!(backend.calls("rename_document"), 1);
        assert_eq!(backend.calls("move_document"), 0);
        assert_eq!(fs.document_id(&target).unwrap().id, "f-file");
        assert_eq!(fs.document_id(&source).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn rename_move_reports_size_of_renamed_document() {
        let (backend, fs) = setup(FakeBackend::new());
        backend.reissue_on_rename();
        let root = root("com.example.docs");
        let source = root.join("src/file").unwrap();
        let target = root.join("src/moved").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = CopyOptions::default().with_progress(std::time::Duration::ZERO, move |n| sink.lock().push(n));

        fs.move_to(&source, &target, &options).unwrap();
        assert_eq!(fs.document_id(&target).unwrap().id, "r-f-file");
        assert_eq!(*seen.lock(), [13u64]);
        assert_eq!(backend.content("r-f-file"), b"payload bytes");
    }

    #[test]
    fn accelerated_move_drops_stale_ids() {
        let (backend, fs) = setup(FakeBackend::new().with_acceleration());
        let root = root("com.example.docs");
        let source = root.join("src/file").unwrap();
        let target = root.join("dst/file").unwrap();
        fs.document_id(&source).unwrap();
        fs.move_to(&source, &target, &CopyOptions::default()).unwrap();
        assert_eq!(backend.calls("move_document"), 1);
        assert_eq!(fs.document_id(&source).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(read(&fs, &target), b"payload bytes");
    }

    #[test]
    fn move_by_copy_keeps_destination_when_delete_fails() {
        let backend = FakeBackend::new();
        backend.fail_delete();
        let (_, fs) = setup(backend);
        let root = root("com.example.docs");
        let source = root.join("src/file").unwrap();
        let target = root.join("dst/file").unwrap();
        let err = fs.move_to(&source, &target, &CopyOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert!(err.to_string().contains("delete"));
        assert_eq!(read(&fs, &target), b"payload bytes");
        assert!(fs.exists(&source).unwrap());
    }

    #[test]
    fn move_by_copy_rejects_non_empty_directory() {
        let (_, fs) = setup(FakeBackend::new());
        let root = root("com.example.docs");
        let err = fs
            .move_to(
                &root.join("src").unwrap(),
                &root.join("dst/src").unwrap(),
                &CopyOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
    }

    #[test]
    fn atomic_move_without_acceleration_is_not_supported() {
        let (_, fs) = setup(FakeBackend::new());
        let root = root("com.example.docs");
        let err = fs
            .move_to(
                &root.join("src/file").unwrap(),
                &root.join("dst/file").unwrap(),
                &CopyOptions::default().with_atomic_move(true),
            )
            .unwrap_err();
        assert!(err.is_not_supported());
    }
}
