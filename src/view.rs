//! File view for an FTP front end.
//!
//! A [`FileView`] pairs a virtual, session-relative path such as
//! `/photos/a.jpg` with the provider path it maps to. Predicates answer
//! `false` instead of failing, the way an FTP server expects; failures are
//! logged.

use std::cmp::Ordering;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::{
    AccessMode, Channel, CopyOptions, ErrorKind, FsDir, FsError, FsExt, FsLink, FsPermissions,
    FsRead, FsWrite, OpenOptions, Path, Registry,
};

/// Default owner name when the provider has none.
pub const DEFAULT_OWNER: &str = "user";
/// Default group name when the provider has none.
pub const DEFAULT_GROUP: &str = "group";

/// State shared by every view of one FTP session.
#[derive(Debug)]
pub struct ViewSession {
    root: Path,
    write_authorized: AtomicBool,
}

impl ViewSession {
    /// A session rooted at `root` with writes authorized.
    pub fn new(root: Path) -> Self {
        Self {
            root,
            write_authorized: AtomicBool::new(true),
        }
    }

    /// The provider path the session's `/` maps to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Grant or revoke write access for the whole session.
    pub fn set_write_authorized(&self, authorized: bool) {
        self.write_authorized.store(authorized, AtomicOrdering::Release);
    }

    /// Whether writes are authorized.
    pub fn is_write_authorized(&self) -> bool {
        self.write_authorized.load(AtomicOrdering::Acquire)
    }
}

/// One path as seen by an FTP session.
#[derive(Clone)]
pub struct FileView {
    fs: Arc<Registry>,
    session: Arc<ViewSession>,
    virtual_path: Path,
    path: Path,
}

impl std::fmt::Debug for FileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileView")
            .field("virtual_path", &self.virtual_path.to_string())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FileView {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileView {}

impl PartialOrd for FileView {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileView {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

/// Log a failed probe and turn it into `None`.
fn logged<T>(operation: &'static str, path: &Path, result: Result<T, FsError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(%path, operation, "path not found");
            None
        }
        Err(e) => {
            tracing::warn!(%path, operation, error = %e, "file view operation failed");
            None
        }
    }
}

impl FileView {
    /// The view of `ftp_path`, interpreted from the session root.
    ///
    /// `..` never climbs above the session root.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] if the session root has no hierarchy
    pub fn new(fs: Arc<Registry>, session: Arc<ViewSession>, ftp_path: &str) -> Result<Self, FsError> {
        let mut virtual_bytes = Vec::with_capacity(ftp_path.len() + 1);
        virtual_bytes.push(b'/');
        virtual_bytes.extend_from_slice(ftp_path.as_bytes());
        let virtual_path = Path::parse(session.root().origin().clone(), virtual_bytes).normalize();
        let mut path = session.root().clone();
        for segment in virtual_path.segments() {
            path = path.resolve_name(segment.clone())?;
        }
        Ok(Self {
            fs,
            session,
            virtual_path,
            path,
        })
    }

    fn child(&self, name: &crate::ByteString) -> Result<Self, FsError> {
        Ok(Self {
            fs: Arc::clone(&self.fs),
            session: Arc::clone(&self.session),
            virtual_path: self.virtual_path.resolve_name(name.clone())?,
            path: self.path.resolve_name(name.clone())?,
        })
    }

    /// The provider path behind this view.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Session-relative absolute path, e.g. `/photos/a.jpg`.
    pub fn absolute_path(&self) -> String {
        self.virtual_path.to_string()
    }

    /// Last segment, or `/` for the session root.
    pub fn name(&self) -> String {
        self.virtual_path
            .file_name()
            .map_or_else(|| "/".to_owned(), |name| name.to_string_lossy())
    }

    /// Nothing is hidden.
    pub fn is_hidden(&self) -> bool {
        false
    }

    /// Returns `true` for directories.
    pub fn is_directory(&self) -> bool {
        logged("is directory", &self.path, self.fs.is_dir(&self.path)).unwrap_or(false)
    }

    /// Returns `true` for regular files.
    pub fn is_file(&self) -> bool {
        logged("is file", &self.path, self.fs.is_file(&self.path)).unwrap_or(false)
    }

    /// Returns `true` if the path exists.
    pub fn exists(&self) -> bool {
        logged("exists", &self.path, self.fs.exists(&self.path)).unwrap_or(false)
    }

    /// Returns `true` if the path can be read.
    pub fn is_readable(&self) -> bool {
        logged(
            "check read access",
            &self.path,
            self.fs.check_access(&self.path, AccessMode::READ),
        )
        .is_some()
    }

    /// Returns `true` if the session may write here and the path is missing
    /// or writable.
    pub fn is_writable(&self) -> bool {
        if !self.session.is_write_authorized() {
            return false;
        }
        !self.exists()
            || logged(
                "check write access",
                &self.path,
                self.fs.check_access(&self.path, AccessMode::WRITE),
            )
            .is_some()
    }

    /// Returns `true` if the session may delete this path. The session root
    /// is never removable.
    pub fn is_removable(&self) -> bool {
        if self.virtual_path.is_root() || !self.session.is_write_authorized() {
            return false;
        }
        let Some(parent) = self.path.parent() else {
            return false;
        };
        logged(
            "check parent write access",
            &parent,
            self.fs.check_access(&parent, AccessMode::WRITE),
        )
        .is_some()
    }

    /// Owner name, or [`DEFAULT_OWNER`].
    pub fn owner_name(&self) -> String {
        logged("read owner", &self.path, self.fs.symlink_metadata(&self.path))
            .and_then(|meta| meta.owner)
            .unwrap_or_else(|| DEFAULT_OWNER.to_owned())
    }

    /// Group name, or [`DEFAULT_GROUP`].
    pub fn group_name(&self) -> String {
        logged("read group", &self.path, self.fs.symlink_metadata(&self.path))
            .and_then(|meta| meta.group)
            .unwrap_or_else(|| DEFAULT_GROUP.to_owned())
    }

    /// 3 for directories, 1 for everything else.
    pub fn link_count(&self) -> u32 {
        if self.is_directory() { 3 } else { 1 }
    }

    /// Last modification time, the epoch if unknown.
    pub fn last_modified(&self) -> SystemTime {
        logged("read modification time", &self.path, self.fs.metadata(&self.path))
            .map_or(SystemTime::UNIX_EPOCH, |meta| meta.modified)
    }

    /// Set the modification time. Returns `false` if not writable or the
    /// provider refused.
    pub fn set_last_modified(&self, time: SystemTime) -> bool {
        self.is_writable()
            && logged(
                "set modification time",
                &self.path,
                self.fs.set_times(&self.path, Some(time), None),
            )
            .is_some()
    }

    /// Size in bytes, 0 if unknown.
    pub fn size(&self) -> u64 {
        logged("read size", &self.path, self.fs.file_size(&self.path)).unwrap_or(0)
    }

    /// Create this path as a directory.
    pub fn mkdir(&self) -> bool {
        self.is_writable() && logged("create directory", &self.path, self.fs.create_dir(&self.path)).is_some()
    }

    /// Delete this path.
    pub fn delete(&self) -> bool {
        self.is_removable() && logged("delete", &self.path, self.fs.remove(&self.path)).is_some()
    }

    /// Move this path onto `destination`.
    pub fn move_to(&self, destination: &FileView) -> bool {
        if !(self.is_removable() && destination.is_writable()) {
            return false;
        }
        logged(
            "move",
            &self.path,
            self.fs
                .move_to(&self.path, &destination.path, &CopyOptions::default()),
        )
        .is_some()
    }

    /// Children of this directory sorted by path, `None` if it cannot be
    /// listed.
    pub fn list_files(&self) -> Option<Vec<FileView>> {
        let entries = logged(
            "list directory",
            &self.path,
            self.fs.read_dir(&self.path).and_then(|it| it.collect_all()),
        )?;
        let mut views: Vec<FileView> = entries
            .iter()
            .filter_map(|entry| logged("list directory", &entry.path, self.child(&entry.name)))
            .collect();
        views.sort();
        Some(views)
    }

    /// A stream writing from `offset`.
    ///
    /// An offset inside the file truncates it there; an offset past the end
    /// extends the file with a zero byte at `offset - 1`.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the view is not writable
    pub fn create_output_stream(&self, offset: u64) -> Result<Box<dyn Write + Send>, FsError> {
        if !self.is_writable() {
            return Err(FsError::PermissionDenied {
                path: self.absolute_path(),
                operation: "write",
            });
        }
        if offset == 0 {
            return self.fs.open_write(&self.path, OpenOptions::WRITE);
        }
        let options = OpenOptions {
            write: true,
            ..OpenOptions::default()
        };
        let mut channel = self.fs.open_channel(&self.path, options)?;
        position_for_write(&mut *channel, offset).map_err(|e| FsError::io("position", &self.path, e))?;
        Ok(Box::new(ChannelStream(channel)))
    }

    /// A stream reading from `offset`.
    ///
    /// Providers without channels are read from the start and the first
    /// `offset` bytes are skipped.
    pub fn create_input_stream(&self, offset: u64) -> Result<Box<dyn Read + Send>, FsError> {
        if offset == 0 {
            return self.fs.open_read(&self.path);
        }
        match self.fs.open_channel(&self.path, OpenOptions::READ) {
            Ok(mut channel) => {
                channel
                    .seek(SeekFrom::Start(offset))
                    .map_err(|e| FsError::io("seek", &self.path, e))?;
                Ok(Box::new(ChannelStream(channel)))
            }
            Err(e) if e.is_not_supported() => {
                tracing::debug!(path = %self.path, offset, "no channel, skipping bytes");
                let mut reader = self.fs.open_read(&self.path)?;
                io::copy(&mut (&mut reader).take(offset), &mut io::sink())
                    .map_err(|e| FsError::io("skip", &self.path, e))?;
                Ok(reader)
            }
            Err(e) => Err(e),
        }
    }
}

fn position_for_write(channel: &mut dyn Channel, offset: u64) -> io::Result<()> {
    let size = channel.size()?;
    if offset <= size {
        if offset < size {
            channel.truncate(offset)?;
        }
        channel.seek(SeekFrom::Start(offset))?;
    } else {
        channel.seek(SeekFrom::Start(offset - 1))?;
        channel.write_all(&[0])?;
    }
    Ok(())
}

/// A channel used as a plain stream.
struct ChannelStream(Box<dyn Channel>);

impl Read for ChannelStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for ChannelStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(all(test, any(target_os = "linux", target_os = "android")))]
mod tests {
    use super::*;
    use crate::LocalProvider;

    fn setup() -> (tempfile::TempDir, Arc<ViewSession>, Arc<Registry>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/a.jpg"), b"0123456789").unwrap();
        std::fs::write(dir.path().join("photos/b.jpg"), b"b").unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Arc::new(LocalProvider::new()));
        let session = Arc::new(ViewSession::new(Path::from_std(dir.path())));
        (dir, session, registry)
    }

    fn view(fs: &Arc<Registry>, session: &Arc<ViewSession>, path: &str) -> FileView {
        FileView::new(Arc::clone(fs), Arc::clone(session), path).unwrap()
    }

    #[test]
    fn names_and_predicates() {
        let (_dir, session, fs) = setup();
        let root = view(&fs, &session, "/");
        assert_eq!(root.absolute_path(), "/");
        assert_eq!(root.name(), "/");
        assert!(root.is_directory());
        assert!(!root.is_removable());
        assert_eq!(root.link_count(), 3);

        let file = view(&fs, &session, "photos/../photos/a.jpg");
        assert_eq!(file.absolute_path(), "/photos/a.jpg");
        assert_eq!(file.name(), "a.jpg");
        assert!(file.is_file() && file.exists() && file.is_readable());
        assert!(file.is_writable() && file.is_removable());
        assert_eq!(file.size(), 10);
        assert_eq!(file.link_count(), 1);
    }

    #[test]
    fn dot_dot_stays_inside_the_session() {
        let (_dir, session, fs) = setup();
        let escaped = view(&fs, &session, "/../../etc");
        assert_eq!(escaped.absolute_path(), "/etc");
        assert!(escaped.path().starts_with(session.root()));
    }

    #[test]
    fn listing_is_sorted() {
        let (_dir, session, fs) = setup();
        let names: Vec<String> = view(&fs, &session, "/photos")
            .list_files()
            .unwrap()
            .iter()
            .map(FileView::absolute_path)
            .collect();
        assert_eq!(names, ["/photos/a.jpg", "/photos/b.jpg"]);
        assert!(view(&fs, &session, "/photos/a.jpg").list_files().is_none());
    }

    #[test]
    fn write_authorization_gates_mutation() {
        let (_dir, session, fs) = setup();
        session.set_write_authorized(false);
        let file = view(&fs, &session, "/photos/a.jpg");
        assert!(!file.is_writable());
        assert!(!file.delete());
        assert!(!view(&fs, &session, "/new").mkdir());
        assert_eq!(
            file.create_output_stream(0).err().unwrap().kind(),
            ErrorKind::AccessDenied
        );
        assert!(file.exists());
    }

    #[test]
    fn mkdir_delete_and_move() {
        let (dir, session, fs) = setup();
        let new_dir = view(&fs, &session, "/docs");
        assert!(new_dir.mkdir());
        assert!(dir.path().join("docs").is_dir());

        let source = view(&fs, &session, "/photos/b.jpg");
        let target = view(&fs, &session, "/docs/b.jpg");
        assert!(source.move_to(&target));
        assert!(dir.path().join("docs/b.jpg").is_file());
        assert!(!source.exists());

        assert!(target.delete());
        assert!(!target.exists());
    }

    #[test]
    fn output_stream_offsets() {
        let (dir, session, fs) = setup();
        let file = view(&fs, &session, "/photos/a.jpg");

        let mut out = file.create_output_stream(4).unwrap();
        out.write_all(b"xy").unwrap();
        drop(out);
        assert_eq!(std::fs::read(dir.path().join("photos/a.jpg")).unwrap(), b"0123xy");

        let mut out = file.create_output_stream(8).unwrap();
        out.write_all(b"z").unwrap();
        drop(out);
        assert_eq!(
            std::fs::read(dir.path().join("photos/a.jpg")).unwrap(),
            b"0123xy\0\0z"
        );
    }

    #[test]
    fn input_stream_offset() {
        let (_dir, session, fs) = setup();
        let mut text = String::new();
        view(&fs, &session, "/photos/a.jpg")
            .create_input_stream(7)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "789");
    }

    #[test]
    fn set_last_modified() {
        let (_dir, session, fs) = setup();
        let file = view(&fs, &session, "/photos/a.jpg");
        let time = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        assert!(file.set_last_modified(time));
        assert_eq!(file.last_modified(), time);
    }
}
