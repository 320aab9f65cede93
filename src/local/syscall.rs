//! Thin wrappers over the native system calls.
//!
//! Every wrapper returns the call's value or a [`SyscallError`] carrying the
//! call name and errno. No policy lives here: mapping to paths and error kinds
//! happens in the provider.

use std::ffi::{CStr, CString};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use libc::{c_int, c_void};

use crate::SyscallError;

fn cvt(call: &'static str, ret: c_int) -> Result<c_int, SyscallError> {
    if ret == -1 {
        Err(SyscallError::last(call))
    } else {
        Ok(ret)
    }
}

fn cvt_size(call: &'static str, ret: isize) -> Result<usize, SyscallError> {
    if ret < 0 {
        Err(SyscallError::last(call))
    } else {
        Ok(ret as usize)
    }
}

/// Retry `f` while it fails with `EINTR`.
fn retry<T>(mut f: impl FnMut() -> Result<T, SyscallError>) -> Result<T, SyscallError> {
    loop {
        match f() {
            Err(e) if e.errno == libc::EINTR => continue,
            other => return other,
        }
    }
}

pub(crate) fn open(path: &CStr, flags: c_int, mode: libc::mode_t) -> Result<OwnedFd, SyscallError> {
    let fd = retry(|| cvt("open", unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) }))?;
    // SAFETY: `open` returned a fresh descriptor that nothing else owns.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn stat_with(
    call: &'static str,
    f: impl Fn(*mut libc::stat) -> c_int,
) -> Result<libc::stat, SyscallError> {
    let mut st = MaybeUninit::<libc::stat>::uninit();
    cvt(call, f(st.as_mut_ptr()))?;
    // SAFETY: the call succeeded and filled the buffer.
    Ok(unsafe { st.assume_init() })
}

pub(crate) fn stat(path: &CStr) -> Result<libc::stat, SyscallError> {
    stat_with("stat", |st| unsafe { libc::stat(path.as_ptr(), st) })
}

pub(crate) fn lstat(path: &CStr) -> Result<libc::stat, SyscallError> {
    stat_with("lstat", |st| unsafe { libc::lstat(path.as_ptr(), st) })
}

pub(crate) fn fstat(fd: &OwnedFd) -> Result<libc::stat, SyscallError> {
    stat_with("fstat", |st| unsafe { libc::fstat(fd.as_raw_fd(), st) })
}

pub(crate) fn access(path: &CStr, mode: c_int) -> Result<(), SyscallError> {
    cvt("access", unsafe { libc::access(path.as_ptr(), mode) }).map(drop)
}

pub(crate) fn mkdir(path: &CStr, mode: libc::mode_t) -> Result<(), SyscallError> {
    cvt("mkdir", unsafe { libc::mkdir(path.as_ptr(), mode) }).map(drop)
}

pub(crate) fn unlink(path: &CStr) -> Result<(), SyscallError> {
    cvt("unlink", unsafe { libc::unlink(path.as_ptr()) }).map(drop)
}

pub(crate) fn rmdir(path: &CStr) -> Result<(), SyscallError> {
    cvt("rmdir", unsafe { libc::rmdir(path.as_ptr()) }).map(drop)
}

/// `rmdir` for directories, `unlink` for everything else.
pub(crate) fn remove(path: &CStr) -> Result<(), SyscallError> {
    let st = lstat(path)?;
    if is_dir(&st) { rmdir(path) } else { unlink(path) }
}

pub(crate) fn rename(from: &CStr, to: &CStr) -> Result<(), SyscallError> {
    cvt("rename", unsafe { libc::rename(from.as_ptr(), to.as_ptr()) }).map(drop)
}

pub(crate) fn link(original: &CStr, link: &CStr) -> Result<(), SyscallError> {
    cvt("link", unsafe { libc::link(original.as_ptr(), link.as_ptr()) }).map(drop)
}

pub(crate) fn symlink(target: &CStr, link: &CStr) -> Result<(), SyscallError> {
    cvt("symlink", unsafe { libc::symlink(target.as_ptr(), link.as_ptr()) }).map(drop)
}

pub(crate) fn readlink(path: &CStr) -> Result<Vec<u8>, SyscallError> {
    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    loop {
        let len = cvt_size("readlink", unsafe {
            libc::readlink(path.as_ptr(), buf.as_mut_ptr().cast(), buf.len())
        })?;
        if len < buf.len() {
            buf.truncate(len);
            return Ok(buf);
        }
        buf.resize(buf.len() * 2, 0);
    }
}

pub(crate) fn chmod(path: &CStr, mode: libc::mode_t) -> Result<(), SyscallError> {
    cvt("chmod", unsafe { libc::chmod(path.as_ptr(), mode) }).map(drop)
}

/// `lchown`; `None` leaves the id unchanged.
pub(crate) fn lchown(path: &CStr, uid: Option<u32>, gid: Option<u32>) -> Result<(), SyscallError> {
    let uid = uid.map_or(u32::MAX, |u| u) as libc::uid_t;
    let gid = gid.map_or(u32::MAX, |g| g) as libc::gid_t;
    cvt("lchown", unsafe { libc::lchown(path.as_ptr(), uid, gid) }).map(drop)
}

/// `utimensat` without following symlinks; `None` leaves the time unchanged.
pub(crate) fn lutimens(
    path: &CStr,
    accessed: Option<libc::timespec>,
    modified: Option<libc::timespec>,
) -> Result<(), SyscallError> {
    let omit = libc::timespec {
        tv_sec: 0,
        tv_nsec: libc::UTIME_OMIT,
    };
    let times = [accessed.unwrap_or(omit), modified.unwrap_or(omit)];
    cvt("utimensat", unsafe {
        libc::utimensat(libc::AT_FDCWD, path.as_ptr(), times.as_ptr(), libc::AT_SYMLINK_NOFOLLOW)
    })
    .map(drop)
}

pub(crate) fn sendfile(out: &OwnedFd, input: &OwnedFd, count: usize) -> Result<usize, SyscallError> {
    retry(|| {
        cvt_size("sendfile", unsafe {
            libc::sendfile(out.as_raw_fd(), input.as_raw_fd(), ptr::null_mut(), count)
        })
    })
}

/// Call a size-probing xattr function twice: once for the size, once to fill.
fn sized_buffer(
    call: &'static str,
    f: impl Fn(*mut c_void, usize) -> isize,
) -> Result<Vec<u8>, SyscallError> {
    loop {
        let size = cvt_size(call, f(ptr::null_mut(), 0))?;
        if size == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; size];
        match cvt_size(call, f(buf.as_mut_ptr().cast(), buf.len())) {
            Ok(len) => {
                buf.truncate(len);
                return Ok(buf);
            }
            // Grew between the two calls.
            Err(e) if e.errno == libc::ERANGE => continue,
            Err(e) => return Err(e),
        }
    }
}

pub(crate) fn lgetxattr(path: &CStr, name: &CStr) -> Result<Vec<u8>, SyscallError> {
    sized_buffer("lgetxattr", |buf, len| unsafe {
        libc::lgetxattr(path.as_ptr(), name.as_ptr(), buf, len)
    })
}

pub(crate) fn lsetxattr(path: &CStr, name: &CStr, value: &[u8]) -> Result<(), SyscallError> {
    cvt("lsetxattr", unsafe {
        libc::lsetxattr(path.as_ptr(), name.as_ptr(), value.as_ptr().cast(), value.len(), 0)
    })
    .map(drop)
}

pub(crate) fn lremovexattr(path: &CStr, name: &CStr) -> Result<(), SyscallError> {
    cvt("lremovexattr", unsafe { libc::lremovexattr(path.as_ptr(), name.as_ptr()) }).map(drop)
}

pub(crate) fn llistxattr(path: &CStr) -> Result<Vec<CString>, SyscallError> {
    let raw = sized_buffer("llistxattr", |buf, len| unsafe {
        libc::llistxattr(path.as_ptr(), buf.cast(), len)
    })?;
    Ok(raw
        .split(|b| *b == 0)
        .filter(|name| !name.is_empty())
        .filter_map(|name| CString::new(name).ok())
        .collect())
}

fn lookup_name<T>(
    call: impl Fn(*mut T, *mut libc::c_char, usize, *mut *mut T) -> c_int,
    name_of: impl Fn(&T) -> *const libc::c_char,
) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 1024];
    loop {
        let mut entry = MaybeUninit::<T>::uninit();
        let mut result: *mut T = ptr::null_mut();
        let ret = call(entry.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &mut result);
        if ret == libc::ERANGE && buf.len() < 1 << 20 {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if ret != 0 || result.is_null() {
            return None;
        }
        // SAFETY: a non-null result points at `entry`, whose strings live in `buf`.
        let name = unsafe { CStr::from_ptr(name_of(&*result)) };
        return Some(name.to_string_lossy().into_owned());
    }
}

/// Name of the user with `uid`, if the passwd database knows it.
pub(crate) fn user_name(uid: u32) -> Option<String> {
    lookup_name::<libc::passwd>(
        |pwd, buf, len, result| unsafe { libc::getpwuid_r(uid as libc::uid_t, pwd, buf, len, result) },
        |pwd| pwd.pw_name,
    )
}

/// Name of the group with `gid`, if the group database knows it.
pub(crate) fn group_name(gid: u32) -> Option<String> {
    lookup_name::<libc::group>(
        |grp, buf, len, result| unsafe { libc::getgrgid_r(gid as libc::gid_t, grp, buf, len, result) },
        |grp| grp.gr_name,
    )
}

pub(crate) fn is_dir(st: &libc::stat) -> bool {
    (st.st_mode as u32) & (libc::S_IFMT as u32) == libc::S_IFDIR as u32
}

pub(crate) fn same_file(a: &libc::stat, b: &libc::stat) -> bool {
    a.st_dev == b.st_dev && a.st_ino == b.st_ino
}

pub(crate) fn system_time(secs: i64, nanos: i64) -> SystemTime {
    let nanos = nanos.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::new(secs.unsigned_abs(), 0) + Duration::new(0, nanos)
    }
}

pub(crate) fn timespec(time: SystemTime) -> libc::timespec {
    let (secs, nanos) = match time.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos() as i64),
        Err(e) => {
            let d = e.duration();
            (-(d.as_secs() as i64), 0)
        }
    };
    libc::timespec {
        tv_sec: secs as libc::time_t,
        tv_nsec: nanos as _,
    }
}
