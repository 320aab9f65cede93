//! `opendir` / `readdir` / `closedir` as an iterator.

use std::ffi::{CStr, CString};
use std::ptr::NonNull;

use crate::{DirEntry, FileType, FsError, Path, SyscallError};

#[cfg(target_os = "linux")]
fn errno_location() -> *mut libc::c_int {
    unsafe { libc::__errno_location() }
}

#[cfg(target_os = "android")]
fn errno_location() -> *mut libc::c_int {
    unsafe { libc::__errno() }
}

fn set_errno(value: libc::c_int) {
    // SAFETY: the errno location is valid for the calling thread.
    unsafe { *errno_location() = value }
}

fn errno() -> libc::c_int {
    // SAFETY: as above.
    unsafe { *errno_location() }
}

/// Streaming directory listing. Skips `.` and `..`.
pub(crate) struct DirStream {
    dir: NonNull<libc::DIR>,
    path: Path,
}

// SAFETY: the DIR handle is owned exclusively by this value and only touched
// through `&mut self`.
unsafe impl Send for DirStream {}

impl DirStream {
    pub(crate) fn open(c_path: &CString, path: &Path) -> Result<Self, FsError> {
        let dir = unsafe { libc::opendir(c_path.as_ptr()) };
        match NonNull::new(dir) {
            Some(dir) => Ok(Self {
                dir,
                path: path.clone(),
            }),
            None => Err(SyscallError::last("opendir").at(path)),
        }
    }
}

impl Iterator for DirStream {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // readdir signals end of stream and failure the same way.
            set_errno(0);
            let entry = unsafe { libc::readdir(self.dir.as_ptr()) };
            if entry.is_null() {
                return match errno() {
                    0 => None,
                    errno => Some(Err(SyscallError::new("readdir", errno).at(&self.path))),
                };
            }
            // SAFETY: readdir returned a valid entry that lives until the next call.
            let (name, d_type) = unsafe {
                let entry = &*entry;
                (CStr::from_ptr(entry.d_name.as_ptr()).to_bytes().to_vec(), entry.d_type)
            };
            if name == b"." || name == b".." {
                continue;
            }
            let file_type = match d_type {
                libc::DT_REG => Some(FileType::File),
                libc::DT_DIR => Some(FileType::Directory),
                libc::DT_LNK => Some(FileType::Symlink),
                libc::DT_CHR => Some(FileType::CharDevice),
                libc::DT_BLK => Some(FileType::BlockDevice),
                libc::DT_FIFO => Some(FileType::Fifo),
                libc::DT_SOCK => Some(FileType::Socket),
                _ => None,
            };
            return Some(self.path.resolve_name(name.clone()).map(|path| DirEntry {
                name: name.into(),
                path,
                file_type,
            }));
        }
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        if unsafe { libc::closedir(self.dir.as_ptr()) } == -1 {
            tracing::warn!(path = %self.path, error = %SyscallError::last("closedir"), "closedir failed");
        }
    }
}
