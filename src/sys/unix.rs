//! POSIX backend for §4.5: `openat`/`fstatat`/`utimensat` and friends, via
//! `nix`. Every function takes a directory fd plus a relative path rather
//! than a full path, so [`crate::fs::DirFS`] only needs to resolve the
//! guest path once, against its own cached root directory handle.

use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::dir::Dir;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::{self, FchmodatFlags, FileStat, Mode, SFlag};
use nix::unistd::{self, Gid, Uid};

use crate::errno::unwrap_os_error;
use crate::oflag::Oflag;
use crate::stat::{FileMode, FileType, StatT};
use crate::timespec::TimeSpec;
use crate::Errno;

use super::RawHandle;

fn io_err(e: nix::Error) -> Errno {
    unwrap_os_error(&std::io::Error::from_raw_os_error(e as i32))
}

/// Translates portable [`Oflag`] bits to `nix`'s `OFlag`. Unknown/unsupported
/// combinations are not rejected here — that happens earlier, in
/// [`Oflag::check_directory_write_conflict`] and [`Oflag::access_mode`].
fn to_nix_oflag(flags: Oflag) -> OFlag {
    let mut out = match flags.access_mode() {
        Ok(crate::oflag::AccessMode::ReadOnly) => OFlag::O_RDONLY,
        Ok(crate::oflag::AccessMode::WriteOnly) => OFlag::O_WRONLY,
        Ok(crate::oflag::AccessMode::ReadWrite) => OFlag::O_RDWR,
        Err(_) => OFlag::O_RDONLY,
    };
    out.set(OFlag::O_APPEND, flags.contains(Oflag::APPEND));
    out.set(OFlag::O_CREAT, flags.contains(Oflag::CREAT));
    out.set(OFlag::O_EXCL, flags.contains(Oflag::EXCL));
    out.set(OFlag::O_TRUNC, flags.contains(Oflag::TRUNC));
    out.set(OFlag::O_SYNC, flags.contains(Oflag::SYNC));
    #[cfg(target_os = "linux")]
    out.set(OFlag::O_DSYNC, flags.contains(Oflag::DSYNC));
    out.set(OFlag::O_DIRECTORY, flags.contains(Oflag::DIRECTORY));
    out.set(OFlag::O_NOFOLLOW, flags.contains(Oflag::NOFOLLOW));
    out.set(OFlag::O_NONBLOCK, flags.contains(Oflag::NONBLOCK));
    out | OFlag::O_CLOEXEC
}

fn path_to_cstring(path: &Path) -> Result<CString, Errno> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)
}

/// Opens the directory at `path` for use as a `DirFS` root, to be passed as
/// `root` to the `*_at` functions below.
pub(crate) fn open_root_dir(path: &Path) -> Result<OwnedFd, Errno> {
    let c = path_to_cstring(path)?;
    fcntl::open(
        c.as_c_str(),
        OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .map_err(io_err)
}

/// `openat(root, rel, flags, mode)`.
pub(crate) fn open_at(
    root: BorrowedFd<'_>,
    rel: &Path,
    flags: Oflag,
    mode: u32,
) -> Result<RawHandle, Errno> {
    let c = path_to_cstring(rel)?;
    let nix_flags = to_nix_oflag(flags);
    let nix_mode = Mode::from_bits_truncate(mode);
    fcntl::openat(root, c.as_c_str(), nix_flags, nix_mode).map_err(io_err)
}

/// Opens a fresh directory-stream handle at `rel`, used both for the
/// windowed `readdir` fetch loop and for `seek(0, Start)` rewinds.
pub(crate) fn opendir_at(root: BorrowedFd<'_>, rel: &Path) -> Result<Dir, Errno> {
    let c = path_to_cstring(rel)?;
    Dir::openat(
        root,
        c.as_c_str(),
        OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .map_err(io_err)
}

fn convert_stat(st: FileStat) -> StatT {
    let file_type = match st.st_mode & libc::S_IFMT as u32 {
        x if x == libc::S_IFDIR as u32 => FileType::Directory,
        x if x == libc::S_IFLNK as u32 => FileType::Symlink,
        x if x == libc::S_IFIFO as u32 => FileType::NamedPipe,
        x if x == libc::S_IFSOCK as u32 => FileType::Socket,
        x if x == libc::S_IFREG as u32 => FileType::RegularFile,
        _ => FileType::Irregular,
    };
    StatT {
        dev: st.st_dev as u64,
        ino: st.st_ino,
        mode: FileMode {
            file_type,
            perm: st.st_mode & 0o7777,
        },
        nlink: st.st_nlink as u64,
        size: st.st_size,
        atim: st.st_atime * 1_000_000_000 + st.st_atime_nsec,
        mtim: st.st_mtime * 1_000_000_000 + st.st_mtime_nsec,
        ctim: st.st_ctime * 1_000_000_000 + st.st_ctime_nsec,
        uid: st.st_uid,
        gid: st.st_gid,
    }
}

/// `fstatat(root, rel, follow)`.
pub(crate) fn stat_at(root: BorrowedFd<'_>, rel: &Path, follow: bool) -> Result<StatT, Errno> {
    let c = path_to_cstring(rel)?;
    let flags = if follow {
        fcntl::AtFlags::empty()
    } else {
        fcntl::AtFlags::AT_SYMLINK_NOFOLLOW
    };
    stat::fstatat(root, c.as_c_str(), flags)
        .map(convert_stat)
        .map_err(io_err)
}

/// `fstat(fd)`.
pub(crate) fn fstat(fd: BorrowedFd<'_>) -> Result<StatT, Errno> {
    stat::fstat(fd).map(convert_stat).map_err(io_err)
}

pub(crate) fn mkdir_at(root: BorrowedFd<'_>, rel: &Path, mode: u32) -> Result<(), Errno> {
    let c = path_to_cstring(rel)?;
    stat::mkdirat(root, c.as_c_str(), Mode::from_bits_truncate(mode))
        .map_err(io_err)
}

pub(crate) fn rmdir_at(root: BorrowedFd<'_>, rel: &Path) -> Result<(), Errno> {
    let c = path_to_cstring(rel)?;
    unistd::unlinkat(
        root,
        c.as_c_str(),
        unistd::UnlinkatFlags::RemoveDir,
    )
    .map_err(io_err)
}

pub(crate) fn unlink_at(root: BorrowedFd<'_>, rel: &Path) -> Result<(), Errno> {
    let c = path_to_cstring(rel)?;
    unistd::unlinkat(
        root,
        c.as_c_str(),
        unistd::UnlinkatFlags::NoRemoveDir,
    )
    .map_err(io_err)
}

pub(crate) fn rename_at(
    old_root: BorrowedFd<'_>,
    old_rel: &Path,
    new_root: BorrowedFd<'_>,
    new_rel: &Path,
) -> Result<(), Errno> {
    if old_root.as_raw_fd() == new_root.as_raw_fd() && old_rel == new_rel {
        return Ok(());
    }
    let c_old = path_to_cstring(old_rel)?;
    let c_new = path_to_cstring(new_rel)?;
    fcntl::renameat(
        Some(old_root.as_raw_fd()),
        c_old.as_c_str(),
        Some(new_root.as_raw_fd()),
        c_new.as_c_str(),
    )
    .map_err(io_err)
}

pub(crate) fn symlink_at(root: BorrowedFd<'_>, target: &Path, link_rel: &Path) -> Result<(), Errno> {
    let c_target = path_to_cstring(target)?;
    let c_link = path_to_cstring(link_rel)?;
    unistd::symlinkat(c_target.as_c_str(), Some(root.as_raw_fd()), c_link.as_c_str())
        .map_err(io_err)
}

pub(crate) fn readlink_at(root: BorrowedFd<'_>, rel: &Path) -> Result<std::path::PathBuf, Errno> {
    let c = path_to_cstring(rel)?;
    fcntl::readlinkat(Some(root.as_raw_fd()), c.as_c_str()).map_err(io_err)
}

pub(crate) fn link_at(
    old_root: BorrowedFd<'_>,
    old_rel: &Path,
    new_root: BorrowedFd<'_>,
    new_rel: &Path,
) -> Result<(), Errno> {
    let c_old = path_to_cstring(old_rel)?;
    let c_new = path_to_cstring(new_rel)?;
    unistd::linkat(
        Some(old_root.as_raw_fd()),
        c_old.as_c_str(),
        Some(new_root.as_raw_fd()),
        c_new.as_c_str(),
        unistd::LinkatFlags::NoSymlinkFollow,
    )
    .map_err(io_err)
}

pub(crate) fn chmod_at(root: BorrowedFd<'_>, rel: &Path, mode: u32) -> Result<(), Errno> {
    let c = path_to_cstring(rel)?;
    stat::fchmodat(
        Some(root.as_raw_fd()),
        c.as_c_str(),
        Mode::from_bits_truncate(mode),
        FchmodatFlags::FollowSymlink,
    )
    .map_err(io_err)
}

pub(crate) fn fchmod(fd: BorrowedFd<'_>, mode: u32) -> Result<(), Errno> {
    stat::fchmod(fd, Mode::from_bits_truncate(mode)).map_err(io_err)
}

pub(crate) fn chown_at(
    root: BorrowedFd<'_>,
    rel: &Path,
    uid: i64,
    gid: i64,
    follow: bool,
) -> Result<(), Errno> {
    let c = path_to_cstring(rel)?;
    let flags = if follow {
        unistd::FchownatFlags::FollowSymlink
    } else {
        unistd::FchownatFlags::NoFollowSymlink
    };
    unistd::fchownat(
        Some(root.as_raw_fd()),
        c.as_c_str(),
        optional_id(uid).map(Uid::from_raw),
        optional_id(gid).map(Gid::from_raw),
        flags,
    )
    .map_err(io_err)
}

pub(crate) fn fchown(fd: BorrowedFd<'_>, uid: i64, gid: i64) -> Result<(), Errno> {
    unistd::fchown(
        fd,
        optional_id(uid).map(Uid::from_raw),
        optional_id(gid).map(Gid::from_raw),
    )
    .map_err(io_err)
}

fn optional_id(id: i64) -> Option<u32> {
    if id < 0 {
        None
    } else {
        Some(id as u32)
    }
}

/// `utimensat`, handling `UTIME_NOW`/`UTIME_OMIT` sentinels directly via
/// raw `libc` (nix does not expose the sentinel values, only concrete
/// timespecs), per spec §4.5.
pub(crate) fn utimens_at(
    root: BorrowedFd<'_>,
    rel: &Path,
    atim: TimeSpec,
    mtim: TimeSpec,
    follow: bool,
) -> Result<(), Errno> {
    if super::utimens_is_noop(atim, mtim) {
        return Ok(());
    }
    let c = path_to_cstring(rel)?;
    let specs = [to_libc_timespec(atim), to_libc_timespec(mtim)];
    let flags = if follow { 0 } else { libc::AT_SYMLINK_NOFOLLOW };
    let rc = unsafe {
        libc::utimensat(root.as_raw_fd(), c.as_ptr(), specs.as_ptr(), flags)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(unwrap_os_error(&std::io::Error::last_os_error()))
    }
}

pub(crate) fn futimens(fd: BorrowedFd<'_>, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
    if super::utimens_is_noop(atim, mtim) {
        return Ok(());
    }
    let specs = [to_libc_timespec(atim), to_libc_timespec(mtim)];
    let rc = unsafe { libc::futimens(fd.as_raw_fd(), specs.as_ptr()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(unwrap_os_error(&std::io::Error::last_os_error()))
    }
}

fn to_libc_timespec(t: TimeSpec) -> libc::timespec {
    match t {
        TimeSpec::Now => libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_NOW,
        },
        TimeSpec::Omit => libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_OMIT,
        },
        TimeSpec::Set(ns) => libc::timespec {
            tv_sec: ns.div_euclid(1_000_000_000),
            tv_nsec: ns.rem_euclid(1_000_000_000),
        },
    }
}

pub(crate) fn ftruncate(fd: BorrowedFd<'_>, size: i64) -> Result<(), Errno> {
    unistd::ftruncate(fd, size).map_err(io_err)
}

pub(crate) fn fsync(fd: BorrowedFd<'_>) -> Result<(), Errno> {
    unistd::fsync(fd.as_raw_fd()).map_err(io_err)
}

pub(crate) fn fdatasync(fd: BorrowedFd<'_>) -> Result<(), Errno> {
    #[cfg(target_os = "linux")]
    {
        unistd::fdatasync(fd.as_raw_fd()).map_err(io_err)
    }
    #[cfg(not(target_os = "linux"))]
    {
        unistd::fsync(fd.as_raw_fd()).map_err(io_err)
    }
}

pub(crate) fn set_nonblock(fd: BorrowedFd<'_>, on: bool) -> Result<(), Errno> {
    let raw = fd.as_raw_fd();
    let cur = fcntl::fcntl(unsafe { BorrowedFd::borrow_raw(raw) }, fcntl::FcntlArg::F_GETFL)
        .map_err(io_err)?;
    let mut flags = OFlag::from_bits_truncate(cur);
    flags.set(OFlag::O_NONBLOCK, on);
    fcntl::fcntl(unsafe { BorrowedFd::borrow_raw(raw) }, fcntl::FcntlArg::F_SETFL(flags))
        .map_err(io_err)?;
    Ok(())
}

pub(crate) fn dup(fd: BorrowedFd<'_>) -> Result<OwnedFd, Errno> {
    unistd::dup(fd.as_raw_fd()).map(|raw| unsafe { OwnedFd::from_raw_fd(raw) }).map_err(io_err)
}

/// True iff `old` (the target of a new symlink) escapes the filesystem, per
/// spec §4.5: reject `../`-prefixed relative targets and absolute targets.
pub(crate) fn symlink_target_escapes(old: &Path) -> bool {
    old.is_absolute() || old.starts_with("..")
}

pub(crate) fn dir_mode(perm: u32) -> SFlag {
    let _ = perm;
    SFlag::S_IFDIR
}
