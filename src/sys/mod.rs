//! Per-platform translation of paths and flags to host syscalls, per spec
//! §4.5. Everything OS-facing is isolated behind the functions in this
//! module and its `unix`/`windows` children, each returning [`Errno`]
//! rather than a raw host error — callers never see `io::Error` or a raw
//! `NTSTATUS`/`errno` value.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::*;
#[cfg(windows)]
pub(crate) use windows::*;

use crate::stat::StatT;
use crate::timespec::TimeSpec;
use crate::Errno;

/// Owned platform file handle. On Unix this is a `RawFd`-owning wrapper; on
/// Windows, a `HANDLE`-owning wrapper. Both close the handle on drop.
#[cfg(unix)]
pub(crate) type RawHandle = std::os::fd::OwnedFd;
#[cfg(windows)]
pub(crate) type RawHandle = std::os::windows::io::OwnedHandle;

/// Handle to a `DirFS` root, as stored on `DirFile`/`DirFS` and passed to
/// every `*_at` call in this module. Unix's `openat` family resolves
/// relative paths against a bare directory fd; Windows has no such syscall
/// family, so its `*_at` calls join a stored absolute path instead and the
/// handle is carried alongside it only to keep the root directory pinned
/// open (and to detect that it hasn't been moved out from under us).
#[cfg(unix)]
pub(crate) type RootHandle = std::os::fd::OwnedFd;
#[cfg(windows)]
pub(crate) type RootHandle = (std::os::windows::io::OwnedHandle, std::path::PathBuf);

use std::path::Path;

/// Opens `path` as a `DirFS` root, producing whatever [`RootHandle`] shape
/// this platform needs — just a directory fd on Unix, a pinned handle plus
/// the absolute path on Windows.
pub(crate) fn make_root(path: &Path) -> Result<RootHandle, Errno> {
    #[cfg(unix)]
    {
        unix::open_root_dir(path)
    }
    #[cfg(windows)]
    {
        windows::open_root_dir(path).map(|h| (h, path.to_path_buf()))
    }
}

/// Adapts a [`RootHandle`] to whatever shape the `*_at` functions in this
/// module expect: a borrowed fd on Unix, a plain reference to the
/// handle+path pair on Windows. Keeps call sites in `crate::file::dir_file`
/// and `crate::fs::dirfs` free of `#[cfg]`.
#[cfg(unix)]
pub(crate) fn root_ref(root: &RootHandle) -> std::os::fd::BorrowedFd<'_> {
    use std::os::fd::AsFd;
    root.as_fd()
}
#[cfg(windows)]
pub(crate) fn root_ref(root: &RootHandle) -> &RootHandle {
    root
}

/// Adapts an already-open `std::fs::File` to whatever the per-handle `*_at`-
/// less functions (`fsync`, `fchmod`, `futimens`, ...) expect: a borrowed fd
/// on Unix, the file reference itself on Windows (those functions are
/// generic over `AsRawHandle` there).
#[cfg(unix)]
pub(crate) fn handle_ref(file: &std::fs::File) -> std::os::fd::BorrowedFd<'_> {
    use std::os::fd::AsFd;
    file.as_fd()
}
#[cfg(windows)]
pub(crate) fn handle_ref(file: &std::fs::File) -> &std::fs::File {
    file
}

/// Sentinel mode applied to `utimens(UTIME_OMIT, UTIME_OMIT)`: leave both
/// times untouched. Shared by both platform backends so the no-op short
/// circuit lives in one place.
pub(crate) fn utimens_is_noop(atim: TimeSpec, mtim: TimeSpec) -> bool {
    matches!(
        (atim, mtim),
        (TimeSpec::Omit, TimeSpec::Omit)
    )
}

/// Fills in a [`StatT`]'s `ino`/`file_type` fields from a host stat result,
/// used by callers that only need to refresh the cached pair described in
/// spec §3 ("File (conceptual entity)" invariants).
pub(crate) fn type_and_ino(st: &StatT) -> (crate::stat::FileType, u64) {
    (st.mode.file_type, st.ino)
}

#[allow(unused)]
pub(crate) fn unsupported<T>() -> Result<T, Errno> {
    Err(Errno::ENOSYS)
}
