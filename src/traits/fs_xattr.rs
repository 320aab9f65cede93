//! Extended attributes and security labels.
//!
//! Extended attribute names follow the usual namespace convention:
//! - `user.*` - user-defined attributes, copied along with file contents
//! - `security.*` - security labels (the SELinux context lives in `security.selinux`)
//! - `trusted.*`, `system.*` - privileged or kernel-managed attributes
//!
//! Only providers backed by a real filesystem expose this capability; see
//! [`Provider::xattrs`](super::Provider::xattrs).

use crate::{FsError, Path};

/// Name of the extended attribute that stores the SELinux security context.
pub const SECURITY_CONTEXT_XATTR: &str = "security.selinux";

/// Extended attribute operations.
///
/// # Example
///
/// ```rust
/// use polyfs::{FsError, FsXattr, Path};
///
/// fn get_user_tag<B: FsXattr>(backend: &B, path: &Path) -> Result<String, FsError> {
///     let value = backend.get_xattr(path, "user.tag")?;
///     Ok(String::from_utf8_lossy(&value).into_owned())
/// }
/// ```
pub trait FsXattr: Send + Sync {
    /// Get an extended attribute value.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path doesn't exist
    /// - [`FsError::PermissionDenied`] if access is denied
    fn get_xattr(&self, path: &Path, name: &str) -> Result<Vec<u8>, FsError>;

    /// Create or replace an extended attribute.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path doesn't exist
    /// - [`FsError::NotSupported`] if the filesystem has no xattrs
    fn set_xattr(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), FsError>;

    /// Remove an extended attribute.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path doesn't exist
    fn remove_xattr(&self, path: &Path, name: &str) -> Result<(), FsError>;

    /// List all extended attribute names for a path.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path doesn't exist
    fn list_xattr(&self, path: &Path) -> Result<Vec<String>, FsError>;

    /// Read the security label, without a trailing NUL.
    fn get_security_context(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let mut value = self.get_xattr(path, SECURITY_CONTEXT_XATTR)?;
        if value.last() == Some(&0) {
            value.pop();
        }
        Ok(value)
    }

    /// Write the security label.
    fn set_security_context(&self, path: &Path, context: &[u8]) -> Result<(), FsError> {
        self.set_xattr(path, SECURITY_CONTEXT_XATTR, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    struct MockXattrFs {
        xattrs: RwLock<HashMap<Path, HashMap<String, Vec<u8>>>>,
    }

    impl MockXattrFs {
        fn with_path(path: &Path) -> Self {
            let mut map = HashMap::new();
            map.insert(path.clone(), HashMap::new());
            Self {
                xattrs: RwLock::new(map),
            }
        }

        fn missing(path: &Path) -> FsError {
            FsError::NotFound {
                path: path.to_string(),
            }
        }
    }

    impl FsXattr for MockXattrFs {
        fn get_xattr(&self, path: &Path, name: &str) -> Result<Vec<u8>, FsError> {
            let xattrs = self.xattrs.read();
            let attrs = xattrs.get(path).ok_or_else(|| Self::missing(path))?;
            attrs.get(name).cloned().ok_or_else(|| Self::missing(path))
        }

        fn set_xattr(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), FsError> {
            let mut xattrs = self.xattrs.write();
            let attrs = xattrs.get_mut(path).ok_or_else(|| Self::missing(path))?;
            attrs.insert(name.to_string(), value.to_vec());
            Ok(())
        }

        fn remove_xattr(&self, path: &Path, name: &str) -> Result<(), FsError> {
            let mut xattrs = self.xattrs.write();
            let attrs = xattrs.get_mut(path).ok_or_else(|| Self::missing(path))?;
            attrs.remove(name).map(|_| ()).ok_or_else(|| Self::missing(path))
        }

        fn list_xattr(&self, path: &Path) -> Result<Vec<String>, FsError> {
            let xattrs = self.xattrs.read();
            let attrs = xattrs.get(path).ok_or_else(|| Self::missing(path))?;
            Ok(attrs.keys().cloned().collect())
        }
    }

    #[test]
    fn set_get_and_list() {
        let path = Path::local("/file.txt");
        let fs = MockXattrFs::with_path(&path);
        fs.set_xattr(&path, "user.tag", b"test").unwrap();
        fs.set_xattr(&path, "user.author", b"alice").unwrap();
        assert_eq!(fs.get_xattr(&path, "user.tag").unwrap(), b"test");
        let mut names = fs.list_xattr(&path).unwrap();
        names.sort();
        assert_eq!(names, vec!["user.author", "user.tag"]);
        fs.remove_xattr(&path, "user.tag").unwrap();
        assert!(fs.get_xattr(&path, "user.tag").is_err());
    }

    #[test]
    fn security_context_strips_trailing_nul() {
        let path = Path::local("/file.txt");
        let fs = MockXattrFs::with_path(&path);
        fs.set_security_context(&path, b"u:object_r:app_data_file:s0\0")
            .unwrap();
        assert_eq!(
            fs.get_security_context(&path).unwrap(),
            b"u:object_r:app_data_file:s0"
        );
    }

    #[test]
    fn missing_path_is_not_found() {
        let fs = MockXattrFs::with_path(&Path::local("/a"));
        let result = fs.list_xattr(&Path::local("/missing"));
        assert!(matches!(result, Err(FsError::NotFound { .. })));
    }
}
