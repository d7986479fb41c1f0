//! Win32 backend for §4.5. Unlike `unix.rs`, Windows has no `openat`-family
//! syscalls, so every function takes a root directory path plus a relative
//! path and joins them itself rather than resolving against a directory
//! handle. Symlink creation/resolution is delegated to `std::os::windows::fs`
//! and `std::fs::read_link`, which already wrap the reparse-point parsing
//! correctly; everything else goes through `windows-sys` directly, the way
//! `wasi-common`'s Windows backend does.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle, RawHandle as StdRawHandle};
use std::path::{Path, PathBuf};
use std::ptr;

use windows_sys::Win32::Foundation::{GetLastError, FILETIME, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateDirectoryW, CreateFileW, DeleteFileW, FindClose, FindFirstFileW, FindNextFileW,
    GetFileInformationByHandle, MoveFileExW, RemoveDirectoryW, SetFileTime,
    BY_HANDLE_FILE_INFORMATION, CREATE_ALWAYS, CREATE_NEW, FILE_ATTRIBUTE_DIRECTORY,
    FILE_ATTRIBUTE_REPARSE_POINT, FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT,
    FILE_GENERIC_READ, FILE_GENERIC_WRITE, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
    MOVEFILE_REPLACE_EXISTING, OPEN_ALWAYS, OPEN_EXISTING, TRUNCATE_EXISTING, WIN32_FIND_DATAW,
};

use crate::errno::unwrap_os_error;
use crate::oflag::Oflag;
use crate::stat::{FileMode, FileType, StatT};
use crate::timespec::TimeSpec;
use crate::Errno;

fn last_err() -> Errno {
    unwrap_os_error(&std::io::Error::from_raw_os_error(unsafe { GetLastError() } as i32))
}

fn wide(path: &Path) -> Vec<u16> {
    OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn join(root: &Path, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

fn handle_from_raw(h: HANDLE) -> Result<OwnedHandle, Errno> {
    if h == INVALID_HANDLE_VALUE || h.is_null() {
        Err(last_err())
    } else {
        Ok(unsafe { OwnedHandle::from_raw_handle(h as StdRawHandle) })
    }
}

/// Opens the directory at `path` for use as a `DirFS` root. Windows has no
/// "directory fd" concept as portable as Unix's, but a handle opened with
/// `FILE_FLAG_BACKUP_SEMANTICS` serves the same purpose: it stays valid
/// across renames and lets us re-derive the absolute path whenever a
/// `*_at`-style call below needs one.
pub(crate) fn open_root_dir(path: &Path) -> Result<OwnedHandle, Errno> {
    let w = wide(path);
    let h = unsafe {
        CreateFileW(
            w.as_ptr(),
            FILE_GENERIC_READ,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS,
            0,
        )
    };
    handle_from_raw(h)
}

fn access_and_disposition(flags: Oflag) -> Result<(u32, u32), Errno> {
    let mode = flags.access_mode()?;
    let access = match mode {
        crate::oflag::AccessMode::ReadOnly => FILE_GENERIC_READ,
        crate::oflag::AccessMode::WriteOnly => FILE_GENERIC_WRITE,
        crate::oflag::AccessMode::ReadWrite => FILE_GENERIC_READ | FILE_GENERIC_WRITE,
    };
    let disposition = if flags.contains(Oflag::CREAT) && flags.contains(Oflag::EXCL) {
        CREATE_NEW
    } else if flags.contains(Oflag::CREAT) && flags.contains(Oflag::TRUNC) {
        CREATE_ALWAYS
    } else if flags.contains(Oflag::CREAT) {
        OPEN_ALWAYS
    } else if flags.contains(Oflag::TRUNC) {
        TRUNCATE_EXISTING
    } else {
        OPEN_EXISTING
    };
    Ok((access, disposition))
}

/// `CreateFileW` against an absolute path built from `root`+`rel`. `mode` is
/// accepted for signature parity with the Unix backend but ignored: NTFS
/// permission bits have no POSIX-mode equivalent, so ACLs are left at
/// whatever the parent directory inherits.
pub(crate) fn open_at(
    root: &(OwnedHandle, PathBuf),
    rel: &Path,
    flags: Oflag,
    mode: u32,
) -> Result<OwnedHandle, Errno> {
    let _ = mode;
    let target = join(&root.1, rel);
    let w = wide(&target);
    let (access, disposition) = access_and_disposition(flags)?;
    let mut attrs = 0;
    if flags.contains(Oflag::DIRECTORY) {
        attrs |= FILE_FLAG_BACKUP_SEMANTICS;
    }
    if flags.contains(Oflag::NOFOLLOW) {
        attrs |= FILE_FLAG_OPEN_REPARSE_POINT;
    }
    let h = unsafe {
        CreateFileW(
            w.as_ptr(),
            access,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            ptr::null(),
            disposition,
            attrs,
            0,
        )
    };
    handle_from_raw(h)
}

fn filetime_to_ns(ft: FILETIME) -> i64 {
    const EPOCH_DIFF_100NS: i64 = 116_444_736_000_000_000;
    let ticks = ((ft.dwHighDateTime as i64) << 32) | ft.dwLowDateTime as i64;
    (ticks - EPOCH_DIFF_100NS) * 100
}

fn ns_to_filetime(ns: i64) -> FILETIME {
    const EPOCH_DIFF_100NS: i64 = 116_444_736_000_000_000;
    let ticks = ns / 100 + EPOCH_DIFF_100NS;
    FILETIME {
        dwLowDateTime: (ticks & 0xFFFF_FFFF) as u32,
        dwHighDateTime: ((ticks >> 32) & 0xFFFF_FFFF) as u32,
    }
}

fn convert_by_handle_info(info: BY_HANDLE_FILE_INFORMATION) -> StatT {
    let file_type = if info.dwFileAttributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
        FileType::Symlink
    } else if info.dwFileAttributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
        FileType::Directory
    } else {
        FileType::RegularFile
    };
    let ino = ((info.nFileIndexHigh as u64) << 32) | info.nFileIndexLow as u64;
    let size = ((info.nFileSizeHigh as u64) << 32) | info.nFileSizeLow as u64;
    StatT {
        dev: info.dwVolumeSerialNumber as u64,
        ino,
        mode: FileMode { file_type, perm: 0o644 },
        nlink: info.nNumberOfLinks as u64,
        size: size as i64,
        atim: filetime_to_ns(info.ftLastAccessTime),
        mtim: filetime_to_ns(info.ftLastWriteTime),
        ctim: filetime_to_ns(info.ftCreationTime),
        uid: 0,
        gid: 0,
    }
}

pub(crate) fn fstat<H: AsRawHandle>(fd: &H) -> Result<StatT, Errno> {
    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };
    let ok = unsafe { GetFileInformationByHandle(fd.as_raw_handle() as HANDLE, &mut info) };
    if ok == 0 {
        return Err(last_err());
    }
    Ok(convert_by_handle_info(info))
}

pub(crate) fn stat_at(
    root: &(OwnedHandle, PathBuf),
    rel: &Path,
    follow: bool,
) -> Result<StatT, Errno> {
    let mut flags = Oflag::RDONLY;
    if !follow {
        flags |= Oflag::NOFOLLOW;
    }
    let h = open_at(root, rel, flags | Oflag::DIRECTORY, 0).or_else(|_| open_at(root, rel, flags, 0))?;
    fstat(&h)
}

pub(crate) fn mkdir_at(root: &(OwnedHandle, PathBuf), rel: &Path, mode: u32) -> Result<(), Errno> {
    let _ = mode;
    let target = join(&root.1, rel);
    let w = wide(&target);
    let ok = unsafe { CreateDirectoryW(w.as_ptr(), ptr::null()) };
    if ok == 0 {
        Err(last_err())
    } else {
        Ok(())
    }
}

pub(crate) fn rmdir_at(root: &(OwnedHandle, PathBuf), rel: &Path) -> Result<(), Errno> {
    let target = join(&root.1, rel);
    let w = wide(&target);
    let ok = unsafe { RemoveDirectoryW(w.as_ptr()) };
    if ok == 0 {
        Err(last_err())
    } else {
        Ok(())
    }
}

pub(crate) fn unlink_at(root: &(OwnedHandle, PathBuf), rel: &Path) -> Result<(), Errno> {
    let target = join(&root.1, rel);
    let w = wide(&target);
    let ok = unsafe { DeleteFileW(w.as_ptr()) };
    if ok == 0 {
        Err(last_err())
    } else {
        Ok(())
    }
}

pub(crate) fn rename_at(
    old_root: &(OwnedHandle, PathBuf),
    old_rel: &Path,
    new_root: &(OwnedHandle, PathBuf),
    new_rel: &Path,
) -> Result<(), Errno> {
    let old = join(&old_root.1, old_rel);
    let new = join(&new_root.1, new_rel);
    let w_old = wide(&old);
    let w_new = wide(&new);
    let ok = unsafe { MoveFileExW(w_old.as_ptr(), w_new.as_ptr(), MOVEFILE_REPLACE_EXISTING) };
    if ok == 0 {
        Err(last_err())
    } else {
        Ok(())
    }
}

pub(crate) fn symlink_at(
    root: &(OwnedHandle, PathBuf),
    target: &Path,
    link_rel: &Path,
) -> Result<(), Errno> {
    let link = join(&root.1, link_rel);
    let is_dir = join(&root.1, link_rel)
        .parent()
        .map(|p| p.join(target))
        .map(|p| p.is_dir())
        .unwrap_or(false);
    let result = if is_dir {
        std::os::windows::fs::symlink_dir(target, &link)
    } else {
        std::os::windows::fs::symlink_file(target, &link)
    };
    result.map_err(|e| unwrap_os_error(&e))
}

pub(crate) fn readlink_at(root: &(OwnedHandle, PathBuf), rel: &Path) -> Result<PathBuf, Errno> {
    let target = join(&root.1, rel);
    std::fs::read_link(target).map_err(|e| unwrap_os_error(&e))
}

pub(crate) fn link_at(
    _old_root: &(OwnedHandle, PathBuf),
    _old_rel: &Path,
    _new_root: &(OwnedHandle, PathBuf),
    _new_rel: &Path,
) -> Result<(), Errno> {
    // Hard links across arbitrary NTFS volumes/ACL contexts are out of scope;
    // `CreateHardLinkW` exists but this backend doesn't expose it yet.
    Err(Errno::ENOSYS)
}

pub(crate) fn chmod_at(_root: &(OwnedHandle, PathBuf), _rel: &Path, _mode: u32) -> Result<(), Errno> {
    Err(Errno::ENOSYS)
}

pub(crate) fn fchmod<H: AsRawHandle>(_fd: &H, _mode: u32) -> Result<(), Errno> {
    Err(Errno::ENOSYS)
}

pub(crate) fn chown_at(
    _root: &(OwnedHandle, PathBuf),
    _rel: &Path,
    _uid: i64,
    _gid: i64,
    _follow: bool,
) -> Result<(), Errno> {
    Err(Errno::ENOSYS)
}

pub(crate) fn fchown<H: AsRawHandle>(_fd: &H, _uid: i64, _gid: i64) -> Result<(), Errno> {
    Err(Errno::ENOSYS)
}

pub(crate) fn utimens_at(
    root: &(OwnedHandle, PathBuf),
    rel: &Path,
    atim: TimeSpec,
    mtim: TimeSpec,
    follow: bool,
) -> Result<(), Errno> {
    let mut flags = Oflag::WRONLY;
    if !follow {
        flags |= Oflag::NOFOLLOW;
    }
    let h = open_at(root, rel, flags, 0)?;
    futimens(&h, atim, mtim)
}

pub(crate) fn futimens<H: AsRawHandle>(fd: &H, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
    if super::utimens_is_noop(atim, mtim) {
        return Ok(());
    }
    let resolve = |t: TimeSpec, current: FILETIME| -> FILETIME {
        match t {
            TimeSpec::Omit => current,
            TimeSpec::Now => ns_to_filetime(crate::timespec::now_ns()),
            TimeSpec::Set(ns) => ns_to_filetime(ns),
        }
    };
    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };
    if unsafe { GetFileInformationByHandle(fd.as_raw_handle() as HANDLE, &mut info) } == 0 {
        return Err(last_err());
    }
    let atime = resolve(atim, info.ftLastAccessTime);
    let mtime = resolve(mtim, info.ftLastWriteTime);
    let ok = unsafe { SetFileTime(fd.as_raw_handle() as HANDLE, ptr::null(), &atime, &mtime) };
    if ok == 0 {
        Err(last_err())
    } else {
        Ok(())
    }
}

pub(crate) fn ftruncate<H: AsRawHandle>(fd: &H, size: i64) -> Result<(), Errno> {
    let file = unsafe { std::fs::File::from_raw_handle(fd.as_raw_handle()) };
    let result = file.set_len(size as u64).map_err(|e| unwrap_os_error(&e));
    std::mem::forget(file);
    result
}

pub(crate) fn fsync<H: AsRawHandle>(fd: &H) -> Result<(), Errno> {
    use windows_sys::Win32::Storage::FileSystem::FlushFileBuffers;
    let ok = unsafe { FlushFileBuffers(fd.as_raw_handle() as HANDLE) };
    if ok == 0 {
        Err(last_err())
    } else {
        Ok(())
    }
}

pub(crate) fn fdatasync<H: AsRawHandle>(fd: &H) -> Result<(), Errno> {
    fsync(fd)
}

pub(crate) fn set_nonblock<H: AsRawHandle>(_fd: &H, _on: bool) -> Result<(), Errno> {
    // File handles on Windows are always "non-blocking enough" for this
    // crate's purposes: overlapped I/O isn't used, reads/writes on regular
    // files never block indefinitely. Only socket/pipe readiness (handled in
    // `crate::net` and `crate::select::windows`) needs real polling.
    Ok(())
}

/// Lazily-initialized `FindFirstFileW`/`FindNextFileW` cursor, the Windows
/// counterpart to a `nix::dir::Dir` stream.
pub(crate) struct WinDirStream {
    find_handle: HANDLE,
    dir: PathBuf,
    done: bool,
}

impl WinDirStream {
    pub(crate) fn open(root: &(OwnedHandle, PathBuf), rel: &Path) -> Result<WinDirStream, Errno> {
        let dir = join(&root.1, rel);
        Ok(WinDirStream {
            find_handle: INVALID_HANDLE_VALUE,
            dir,
            done: false,
        })
    }

    /// Returns the next entry, skipping `.`/`..`, or `None` at end of stream.
    pub(crate) fn next_entry(&mut self) -> Result<Option<crate::stat::Dirent>, Errno> {
        loop {
            let mut data: WIN32_FIND_DATAW = unsafe { std::mem::zeroed() };
            if self.find_handle == INVALID_HANDLE_VALUE {
                if self.done {
                    return Ok(None);
                }
                let pattern = wide(&self.dir.join("*"));
                let h = unsafe { FindFirstFileW(pattern.as_ptr(), &mut data) };
                if h == INVALID_HANDLE_VALUE {
                    self.done = true;
                    return Ok(None);
                }
                self.find_handle = h;
            } else if unsafe { FindNextFileW(self.find_handle, &mut data) } == 0 {
                self.close()?;
                self.done = true;
                return Ok(None);
            }
            let name = decode_wide_cstr(&data.cFileName);
            if name == "." || name == ".." {
                continue;
            }
            let file_type = if data.dwFileAttributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
                FileType::Symlink
            } else if data.dwFileAttributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            return Ok(Some(crate::stat::Dirent {
                ino: 0,
                name,
                file_type,
            }));
        }
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        if self.find_handle != INVALID_HANDLE_VALUE {
            unsafe { FindClose(self.find_handle) };
            self.find_handle = INVALID_HANDLE_VALUE;
        }
        Ok(())
    }
}

impl Drop for WinDirStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn decode_wide_cstr(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

pub(crate) fn dup(fd: &OwnedHandle) -> Result<OwnedHandle, Errno> {
    fd.try_clone().map_err(|e| unwrap_os_error(&e))
}

pub(crate) fn symlink_target_escapes(old: &Path) -> bool {
    old.is_absolute() || old.starts_with("..")
}
