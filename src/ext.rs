//! # Extension Traits
//!
//! Convenience probes built on the component traits.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FsExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](FsExt::is_dir) | Check if path is a directory |
//! | [`file_size`](FsExt::file_size) | Size from metadata |
//! | [`read_all`](FsExt::read_all) | Read a whole file into memory |
//!
//! With the `serde` feature, `FsExtJson` adds `read_json` and `write_json`.

use std::io::Read;

use crate::{ErrorKind, FsError, FsRead, Path};

/// Extension methods for any provider.
///
/// Blanket-implemented for every [`FsRead`], including `dyn Provider`.
///
/// # Example
///
/// ```rust
/// use polyfs::{FsError, FsExt, FsRead, Path};
///
/// fn config_size<P: FsRead>(provider: &P) -> Result<Option<u64>, FsError> {
///     let path = Path::local("/etc/app.conf");
///     if provider.is_file(&path)? {
///         return provider.file_size(&path).map(Some);
///     }
///     Ok(None)
/// }
/// ```
pub trait FsExt: FsRead {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns `FsError::NotFound` if the path doesn't exist.
    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        Ok(self.metadata(path)?.size)
    }

    /// Read the whole file into memory.
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let mut data = Vec::new();
        self.open_read(path)?
            .read_to_end(&mut data)
            .map_err(|e| FsError::io("read", path, e))?;
        Ok(data)
    }
}

impl<B: FsRead + ?Sized> FsExt for B {}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use crate::{FsWrite, OpenOptions};
    use serde::{Serialize, de::DeserializeOwned};
    use std::io::Write;

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FsExtJson: FsRead + FsWrite {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::NotFound` if the file doesn't exist
        /// - `FsError::Backend` if JSON parsing failed
        fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, FsError> {
            let data = self.read_all(path)?;
            serde_json::from_slice(&data).map_err(|e| FsError::Backend(format!("{path}: {e}")))
        }

        /// Serialize a value and write it as pretty-printed JSON, replacing
        /// the file.
        fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value).map_err(|e| FsError::Backend(format!("{path}: {e}")))?;
            let mut out = self.open_write(path, OpenOptions::WRITE)?;
            out.write_all(&json).map_err(|e| FsError::io("write", path, e))?;
            out.flush().map_err(|e| FsError::io("flush", path, e))
        }
    }

    impl<B: FsRead + FsWrite + ?Sized> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessMode, FileType, Metadata};

    /// Mock provider for testing
    struct MockFs {
        file_type: Option<FileType>,
    }

    impl FsRead for MockFs {
        fn open_read(&self, _: &Path) -> Result<Box<dyn Read + Send>, FsError> {
            Ok(Box::new(&b"mock data"[..]))
        }

        fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
            match self.file_type {
                Some(file_type) => Ok(Metadata {
                    file_type,
                    size: 100,
                    ..Metadata::default()
                }),
                None => Err(FsError::NotFound {
                    path: path.to_string(),
                }),
            }
        }

        fn check_access(&self, path: &Path, _: AccessMode) -> Result<(), FsError> {
            self.metadata(path).map(drop)
        }
    }

    fn path() -> Path {
        Path::local("/test")
    }

    #[test]
    fn is_file_and_is_dir() {
        let file = MockFs {
            file_type: Some(FileType::File),
        };
        assert!(file.is_file(&path()).unwrap());
        assert!(!file.is_dir(&path()).unwrap());

        let dir = MockFs {
            file_type: Some(FileType::Directory),
        };
        assert!(dir.is_dir(&path()).unwrap());
        assert!(!dir.is_file(&path()).unwrap());
    }

    #[test]
    fn missing_paths_are_neither() {
        let fs = MockFs { file_type: None };
        assert!(!fs.is_file(&path()).unwrap());
        assert!(!fs.is_dir(&path()).unwrap());
        assert_eq!(fs.file_size(&path()).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn file_size_and_read_all() {
        let fs = MockFs {
            file_type: Some(FileType::File),
        };
        assert_eq!(fs.file_size(&path()).unwrap(), 100);
        assert_eq!(fs.read_all(&path()).unwrap(), b"mock data");
    }

    #[test]
    fn works_through_trait_objects() {
        let fs: &dyn FsRead = &MockFs {
            file_type: Some(FileType::File),
        };
        assert!(fs.is_file(&path()).unwrap());
    }
}
