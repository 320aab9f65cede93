//! Directory operations.

use crate::{DirEntry, FsError, Path};

/// Directory operations for a provider.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// List directory contents.
    ///
    /// The outer `Result` says whether the directory could be opened; each
    /// item's `Result` says whether that entry could be read. Order is
    /// backend-defined; `.` and `..` are never returned.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError>;

    /// Create a directory (parent must exist).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn create_dir(&self, path: &Path) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// Wraps a boxed iterator so each provider can stream its own way.
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;

    fn entry(name: &str) -> DirEntry {
        let path = Path::local("/").resolve_name(name).unwrap();
        DirEntry {
            name: name.into(),
            path,
            file_type: Some(FileType::File),
        }
    }

    #[test]
    fn read_dir_iter_collect_all_success() {
        let iter = ReadDirIter::from_vec(vec![Ok(entry("a")), Ok(entry("b"))]);
        let entries = iter.collect_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a");
    }

    #[test]
    fn read_dir_iter_collect_all_error() {
        let entries = vec![
            Ok(entry("a")),
            Err(FsError::PermissionDenied {
                path: "/b".into(),
                operation: "read_dir",
            }),
        ];
        assert!(ReadDirIter::from_vec(entries).collect_all().is_err());
    }

    #[test]
    fn read_dir_iter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ReadDirIter>();
    }
}
