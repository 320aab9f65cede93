//! Copy and move on the local filesystem.

use std::ffi::{CStr, CString};
use std::os::fd::OwnedFd;

use crate::copy::{BUFFER_SIZE, Progress};
use crate::{CopyOptions, ErrorKind, FileType, FsError, Path, SyscallError};

use super::syscall;

const USER_XATTR_PREFIX: &[u8] = b"user.";

pub(super) fn copy(
    source: &Path,
    c_source: &CStr,
    target: &Path,
    c_target: &CStr,
    options: &CopyOptions,
) -> Result<(), FsError> {
    if options.atomic_move {
        return Err(FsError::NotSupported {
            operation: "atomic copy",
        });
    }
    let source_stat = if options.no_follow_links {
        syscall::lstat(c_source)
    } else {
        syscall::stat(c_source)
    }
    .map_err(|e| e.at(source))?;
    let target_stat = lstat_if_exists(c_target).map_err(|e| e.at(target))?;
    if let Some(target_stat) = &target_stat {
        if syscall::same_file(&source_stat, target_stat) {
            options.notify(source_stat.st_size as u64);
            return Ok(());
        }
        if !options.replace_existing {
            return Err(FsError::AlreadyExists {
                path: target.to_string(),
                operation: "copy",
            });
        }
    }

    let mode = source_stat.st_mode as u32;
    match FileType::from_mode(mode) {
        FileType::File => {
            if target_stat.is_some() {
                remove_if_exists(c_target).map_err(|e| e.at(target))?;
            }
            copy_file(source, c_source, target, c_target, mode, options)?;
        }
        FileType::Directory => {
            if target_stat.is_some() {
                remove_if_exists(c_target).map_err(|e| e.at(target))?;
            }
            syscall::mkdir(c_target, (mode & 0o7777) as libc::mode_t).map_err(|e| e.at(target))?;
            options.notify(source_stat.st_size as u64);
        }
        FileType::Symlink => {
            let link_target = syscall::readlink(c_source).map_err(|e| e.at(source))?;
            let link_target = CString::new(link_target).map_err(|_| FsError::InvalidPath {
                path: source.to_string(),
                reason: "link target contains NUL",
            })?;
            create_symlink(&link_target, target, c_target, options)?;
            options.notify(source_stat.st_size as u64);
        }
        _ => {
            return Err(FsError::NotSupported {
                operation: "copy special file",
            });
        }
    }
    copy_attributes(&source_stat, c_source, target, c_target, options);
    Ok(())
}

pub(super) fn move_to(
    source: &Path,
    c_source: &CStr,
    target: &Path,
    c_target: &CStr,
    options: &CopyOptions,
) -> Result<(), FsError> {
    let source_stat = syscall::lstat(c_source).map_err(|e| e.at(source))?;
    if let Some(target_stat) = lstat_if_exists(c_target).map_err(|e| e.at(target))? {
        if syscall::same_file(&source_stat, &target_stat) {
            options.notify(source_stat.st_size as u64);
            return Ok(());
        }
        if !options.replace_existing {
            return Err(FsError::AlreadyExists {
                path: target.to_string(),
                operation: "move",
            });
        }
        syscall::remove(c_target).map_err(|e| e.at(target))?;
    }

    match syscall::rename(c_source, c_target) {
        Ok(()) => {
            options.notify(source_stat.st_size as u64);
            return Ok(());
        }
        Err(e) if options.atomic_move => return Err(e.between(source, target)),
        Err(e) => {
            tracing::debug!(%source, %target, error = %e, "rename failed, moving by copy");
        }
    }

    let fallback = CopyOptions {
        copy_attributes: true,
        no_follow_links: true,
        atomic_move: false,
        ..options.clone()
    };
    copy(source, c_source, target, c_target, &fallback)?;
    if let Err(e) = syscall::remove(c_source) {
        if e.errno != libc::ENOENT {
            return Err(discard_target(e.at(source), target, c_target));
        }
    }
    Ok(())
}

fn lstat_if_exists(path: &CStr) -> Result<Option<libc::stat>, SyscallError> {
    match syscall::lstat(path) {
        Ok(st) => Ok(Some(st)),
        Err(e) if e.errno == libc::ENOENT => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &CStr) -> Result<(), SyscallError> {
    match syscall::remove(path) {
        Err(e) if e.errno != libc::ENOENT => Err(e),
        _ => Ok(()),
    }
}

fn copy_file(
    source: &Path,
    c_source: &CStr,
    target: &Path,
    c_target: &CStr,
    mode: u32,
    options: &CopyOptions,
) -> Result<(), FsError> {
    let input = syscall::open(c_source, libc::O_RDONLY | libc::O_CLOEXEC, 0).map_err(|e| e.at(source))?;
    let mut flags = libc::O_WRONLY | libc::O_TRUNC | libc::O_CREAT | libc::O_CLOEXEC;
    if !options.replace_existing {
        flags |= libc::O_EXCL;
    }
    let output = syscall::open(c_target, flags, (mode & 0o7777) as libc::mode_t).map_err(|e| e.at(target))?;

    let mut progress = Progress::new(options);
    let result = send_all(&input, &output, source, target, options, &mut progress);
    drop(output);
    match result {
        Ok(()) => {
            progress.finish();
            Ok(())
        }
        // A cancelled copy keeps what it wrote.
        Err(e) if e.kind() == ErrorKind::Interrupted => Err(e),
        Err(e) => Err(discard_target(e, target, c_target)),
    }
}

/// Remove `target` after `error`, chaining a failed removal onto it.
fn discard_target(error: FsError, target: &Path, c_target: &CStr) -> FsError {
    match syscall::remove(c_target) {
        Err(cleanup) if cleanup.errno != libc::ENOENT => error.with_cleanup(cleanup.at(target)),
        _ => error,
    }
}

fn send_all(
    input: &OwnedFd,
    output: &OwnedFd,
    source: &Path,
    target: &Path,
    options: &CopyOptions,
    progress: &mut Progress<'_>,
) -> Result<(), FsError> {
    loop {
        options.interrupt.check(target)?;
        let sent = syscall::sendfile(output, input, BUFFER_SIZE).map_err(|e| e.between(source, target))?;
        if sent == 0 {
            return Ok(());
        }
        progress.advance(sent as u64);
    }
}

fn create_symlink(
    link_target: &CStr,
    target: &Path,
    c_target: &CStr,
    options: &CopyOptions,
) -> Result<(), FsError> {
    match syscall::symlink(link_target, c_target) {
        Ok(()) => Ok(()),
        Err(e) if e.errno == libc::EEXIST && options.replace_existing => {
            let first = e.at(target);
            if let Err(remove) = remove_if_exists(c_target) {
                return Err(remove.at(target).with_cleanup(first));
            }
            syscall::symlink(link_target, c_target).map_err(|e| e.at(target).with_cleanup(first))
        }
        Err(e) => Err(e.at(target)),
    }
}

/// Best-effort: failures are logged, never returned.
fn copy_attributes(
    source_stat: &libc::stat,
    c_source: &CStr,
    target: &Path,
    c_target: &CStr,
    options: &CopyOptions,
) {
    let mode = source_stat.st_mode as u32;
    let is_symlink = FileType::from_mode(mode) == FileType::Symlink;
    // Ownership before mode, so setuid/setgid bits survive.
    if options.copy_attributes {
        if let Err(e) = syscall::lchown(c_target, Some(source_stat.st_uid), Some(source_stat.st_gid)) {
            tracing::warn!(%target, error = %e, "failed to copy ownership");
        }
    }
    if !is_symlink {
        if let Err(e) = syscall::chmod(c_target, (mode & 0o7777) as libc::mode_t) {
            tracing::warn!(%target, error = %e, "failed to copy mode");
        }
    }
    let accessed = options.copy_attributes.then(|| libc::timespec {
        tv_sec: source_stat.st_atime,
        tv_nsec: source_stat.st_atime_nsec as _,
    });
    let modified = libc::timespec {
        tv_sec: source_stat.st_mtime,
        tv_nsec: source_stat.st_mtime_nsec as _,
    };
    if let Err(e) = syscall::lutimens(c_target, accessed, Some(modified)) {
        tracing::warn!(%target, error = %e, "failed to copy times");
    }
    match syscall::llistxattr(c_source) {
        Ok(names) => {
            for name in names {
                if !(options.copy_attributes || name.as_bytes().starts_with(USER_XATTR_PREFIX)) {
                    continue;
                }
                let copied = syscall::lgetxattr(c_source, &name)
                    .and_then(|value| syscall::lsetxattr(c_target, &name, &value));
                if let Err(e) = copied {
                    tracing::warn!(%target, xattr = ?name, error = %e, "failed to copy xattr");
                }
            }
        }
        Err(e) if e.errno == libc::ENOTSUP => {}
        Err(e) => tracing::warn!(%target, error = %e, "failed to list xattrs"),
    }
}
