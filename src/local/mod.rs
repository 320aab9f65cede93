//! Local POSIX provider over direct system calls.
//!
//! Every failure carries the failing call and its errno (see
//! [`SyscallError`](crate::SyscallError)); [`FsError::kind`] derives the
//! category from the errno.

mod copy_move;
mod dir_stream;
pub(crate) mod syscall;

use std::ffi::CString;
use std::fs::File;
use std::io::{Read, Write};
use std::time::SystemTime;

use crate::{
    AccessMode, ByteString, Channel, CopyOptions, FileType, FsDir, FsError, FsLink, FsPermissions,
    FsRead, FsWrite, FsXattr, Metadata, OpenOptions, Path, Permissions, Provider, ReadDirIter,
    Scheme,
};

use dir_stream::DirStream;

/// Mode for newly created files, before the umask.
const DEFAULT_FILE_MODE: libc::mode_t = 0o666;
/// Mode for newly created directories, before the umask.
const DEFAULT_DIR_MODE: libc::mode_t = 0o777;

/// Provider for `file` paths.
///
/// # Example
///
/// ```rust,no_run
/// use polyfs::{FsRead, LocalProvider, Path};
///
/// let fs = LocalProvider::new();
/// let meta = fs.metadata(&Path::local("/etc/hostname"))?;
/// println!("{} bytes", meta.size);
/// # Ok::<(), polyfs::FsError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProvider;

impl LocalProvider {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }
}

fn c_path(path: &Path) -> Result<CString, FsError> {
    path.check_scheme(Scheme::File)?;
    CString::new(path.to_bytes()).map_err(|_| FsError::InvalidPath {
        path: path.to_string(),
        reason: "contains NUL",
    })
}

fn c_name(name: &str) -> Result<CString, FsError> {
    CString::new(name).map_err(|_| FsError::InvalidPath {
        path: name.to_string(),
        reason: "contains NUL",
    })
}

fn open_flags(options: OpenOptions) -> libc::c_int {
    let mut flags = libc::O_CLOEXEC;
    flags |= match (options.read, options.is_write()) {
        (_, false) => libc::O_RDONLY,
        (false, true) => libc::O_WRONLY,
        (true, true) => libc::O_RDWR,
    };
    if options.create {
        flags |= libc::O_CREAT;
    }
    if options.create_new {
        flags |= libc::O_CREAT | libc::O_EXCL;
    }
    if options.truncate {
        flags |= libc::O_TRUNC;
    }
    if options.append {
        flags |= libc::O_APPEND;
    }
    flags
}

fn metadata_from_stat(st: &libc::stat) -> Metadata {
    let mode = st.st_mode as u32;
    let uid = st.st_uid as u32;
    let gid = st.st_gid as u32;
    Metadata {
        file_type: FileType::from_mode(mode),
        size: st.st_size as u64,
        permissions: Permissions::from_mode(mode),
        created: SystemTime::UNIX_EPOCH,
        modified: syscall::system_time(st.st_mtime as i64, st.st_mtime_nsec as i64),
        accessed: syscall::system_time(st.st_atime as i64, st.st_atime_nsec as i64),
        inode: st.st_ino as u64,
        nlink: st.st_nlink as u64,
        uid: Some(uid),
        gid: Some(gid),
        owner: syscall::user_name(uid),
        group: syscall::group_name(gid),
        mime_type: None,
    }
}

impl LocalProvider {
    fn open_file(&self, path: &Path, options: OpenOptions) -> Result<File, FsError> {
        let c = c_path(path)?;
        let fd = syscall::open(&c, open_flags(options), DEFAULT_FILE_MODE).map_err(|e| e.at(path))?;
        Ok(File::from(fd))
    }
}

impl FsRead for LocalProvider {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, FsError> {
        let c = c_path(path)?;
        let fd = syscall::open(&c, libc::O_RDONLY | libc::O_CLOEXEC, 0).map_err(|e| e.at(path))?;
        let st = syscall::fstat(&fd).map_err(|e| e.at(path))?;
        if syscall::is_dir(&st) {
            return Err(FsError::IsADirectory {
                path: path.to_string(),
            });
        }
        Ok(Box::new(File::from(fd)))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let c = c_path(path)?;
        let st = syscall::stat(&c).map_err(|e| e.at(path))?;
        Ok(metadata_from_stat(&st))
    }

    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        let c = c_path(path)?;
        let mut bits = 0;
        if mode.read {
            bits |= libc::R_OK;
        }
        if mode.write {
            bits |= libc::W_OK;
        }
        if mode.execute {
            bits |= libc::X_OK;
        }
        if bits == 0 {
            bits = libc::F_OK;
        }
        syscall::access(&c, bits).map_err(|e| e.at(path))
    }
}

impl FsWrite for LocalProvider {
    fn open_write(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Write + Send>, FsError> {
        let options = OpenOptions {
            write: true,
            ..options
        };
        Ok(Box::new(self.open_file(path, options)?))
    }

    fn open_channel(&self, path: &Path, options: OpenOptions) -> Result<Box<dyn Channel>, FsError> {
        Ok(Box::new(self.open_file(path, options)?))
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let c = c_path(path)?;
        syscall::remove(&c).map_err(|e| e.at(path))
    }

    fn rename(&self, path: &Path, new_name: &ByteString) -> Result<Path, FsError> {
        let target = path.resolve_sibling(new_name.clone())?;
        let (c_from, c_to) = (c_path(path)?, c_path(&target)?);
        syscall::rename(&c_from, &c_to).map_err(|e| e.between(path, &target))?;
        Ok(target)
    }

    fn copy(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
        let (c_source, c_target) = (c_path(source)?, c_path(target)?);
        copy_move::copy(source, &c_source, target, &c_target, options)
    }

    fn move_to(&self, source: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
        let (c_source, c_target) = (c_path(source)?, c_path(target)?);
        copy_move::move_to(source, &c_source, target, &c_target, options)
    }
}

impl FsDir for LocalProvider {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let c = c_path(path)?;
        Ok(ReadDirIter::new(DirStream::open(&c, path)?))
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        let c = c_path(path)?;
        syscall::mkdir(&c, DEFAULT_DIR_MODE).map_err(|e| e.at(path))
    }
}

impl FsLink for LocalProvider {
    fn symlink(&self, link: &Path, target: &ByteString) -> Result<(), FsError> {
        let c_link = c_path(link)?;
        let c_target = CString::new(target.as_bytes()).map_err(|_| FsError::InvalidPath {
            path: target.to_string(),
            reason: "contains NUL",
        })?;
        syscall::symlink(&c_target, &c_link).map_err(|e| e.at(link))
    }

    fn hard_link(&self, link: &Path, original: &Path) -> Result<(), FsError> {
        let (c_link, c_original) = (c_path(link)?, c_path(original)?);
        syscall::link(&c_original, &c_link).map_err(|e| e.between(original, link))
    }

    fn read_link(&self, path: &Path) -> Result<ByteString, FsError> {
        let c = c_path(path)?;
        syscall::readlink(&c).map(ByteString::from).map_err(|e| e.at(path))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let c = c_path(path)?;
        let st = syscall::lstat(&c).map_err(|e| e.at(path))?;
        Ok(metadata_from_stat(&st))
    }
}

impl FsPermissions for LocalProvider {
    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let c = c_path(path)?;
        let st = syscall::lstat(&c).map_err(|e| e.at(path))?;
        if FileType::from_mode(st.st_mode as u32) == FileType::Symlink {
            return Err(FsError::NotSupported {
                operation: "chmod symlink",
            });
        }
        syscall::chmod(&c, perm.mode() as libc::mode_t).map_err(|e| e.at(path))
    }

    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        let c = c_path(path)?;
        syscall::lchown(&c, uid, gid).map_err(|e| e.at(path))
    }

    fn set_times(
        &self,
        path: &Path,
        modified: Option<SystemTime>,
        accessed: Option<SystemTime>,
    ) -> Result<(), FsError> {
        let c = c_path(path)?;
        syscall::lutimens(&c, accessed.map(syscall::timespec), modified.map(syscall::timespec))
            .map_err(|e| e.at(path))
    }
}

impl FsXattr for LocalProvider {
    fn get_xattr(&self, path: &Path, name: &str) -> Result<Vec<u8>, FsError> {
        let c = c_path(path)?;
        syscall::lgetxattr(&c, &c_name(name)?).map_err(|e| e.at(path))
    }

    fn set_xattr(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), FsError> {
        let c = c_path(path)?;
        syscall::lsetxattr(&c, &c_name(name)?, value).map_err(|e| e.at(path))
    }

    fn remove_xattr(&self, path: &Path, name: &str) -> Result<(), FsError> {
        let c = c_path(path)?;
        syscall::lremovexattr(&c, &c_name(name)?).map_err(|e| e.at(path))
    }

    fn list_xattr(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let c = c_path(path)?;
        let names = syscall::llistxattr(&c).map_err(|e| e.at(path))?;
        Ok(names
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}

impl Provider for LocalProvider {
    fn scheme(&self) -> Scheme {
        Scheme::File
    }

    fn xattrs(&self) -> Option<&dyn FsXattr> {
        Some(self)
    }
}
