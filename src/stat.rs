//! File-metadata records: [`Stat_t`], [`FileMode`], [`FileType`], [`Dirent`].
//!
//! `FileType` enumerates "what kind of filesystem object is this" the same
//! way a POSIX `st_mode` type tag does; [`FileMode`] pairs it with a
//! permission-bits field, keeping the type tag and the bits as separate
//! fields rather than packing both into one raw mode integer.

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Kind of filesystem object, independent of permission bits.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum FileType {
    /// Regular file.
    RegularFile,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Named pipe (FIFO).
    NamedPipe,
    /// Socket.
    Socket,
    /// Anything else the host reports (device nodes, etc).
    Irregular,
}

impl FileType {
    /// Converts a `std::fs::FileType` into the portable enumeration,
    /// folding every non-regular/dir/symlink/fifo/socket kind into
    /// [`FileType::Irregular`] rather than failing, since callers only need
    /// to distinguish directories and symlinks from "everything else".
    pub fn from_std(ft: fs::FileType) -> FileType {
        if ft.is_dir() {
            FileType::Directory
        } else if ft.is_symlink() {
            FileType::Symlink
        } else if ft.is_file() {
            FileType::RegularFile
        } else if Self::is_fifo(&ft) {
            FileType::NamedPipe
        } else if Self::is_socket(&ft) {
            FileType::Socket
        } else {
            FileType::Irregular
        }
    }

    #[cfg(unix)]
    fn is_fifo(ft: &fs::FileType) -> bool {
        ft.is_fifo()
    }
    #[cfg(not(unix))]
    fn is_fifo(_ft: &fs::FileType) -> bool {
        false
    }

    #[cfg(unix)]
    fn is_socket(ft: &fs::FileType) -> bool {
        ft.is_socket()
    }
    #[cfg(not(unix))]
    fn is_socket(_ft: &fs::FileType) -> bool {
        false
    }
}

/// File type plus permission bits, as returned in [`Dirent::file_type`] and
/// embedded in [`Stat_t::mode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct FileMode {
    /// Kind of object.
    pub file_type: FileType,
    /// POSIX permission bits (ignored by backends that don't model them).
    pub perm: u32,
}

impl FileMode {
    /// A `FileMode` carrying only a type, with empty permission bits — used
    /// by backends (e.g. [`crate::fs::AdaptFS`]) that have no permission
    /// concept of their own.
    pub fn of_type(file_type: FileType) -> FileMode {
        FileMode { file_type, perm: 0 }
    }
}

/// Unified file-metadata record, per spec §3.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct StatT {
    /// Device id the inode lives on.
    pub dev: u64,
    /// Inode number, `0` if unknown.
    pub ino: u64,
    /// Type and permission bits.
    pub mode: FileMode,
    /// Hard-link count.
    pub nlink: u64,
    /// Size in bytes.
    pub size: i64,
    /// Last-access time, nanoseconds since the Unix epoch.
    pub atim: i64,
    /// Last-modification time, nanoseconds since the Unix epoch.
    pub mtim: i64,
    /// Last-status-change time, nanoseconds since the Unix epoch.
    pub ctim: i64,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

impl StatT {
    /// A zeroed-out stat record of the given type, used by stdio bridges and
    /// other backends with no real metadata to report (spec §4.2 "Stdio
    /// streams").
    pub fn constant(file_type: FileType) -> StatT {
        StatT {
            dev: 0,
            ino: 0,
            mode: FileMode::of_type(file_type),
            nlink: 1,
            size: 0,
            atim: 0,
            mtim: 0,
            ctim: 0,
            uid: 0,
            gid: 0,
        }
    }
}

/// One directory entry, as returned by [`crate::Readdir::next`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Dirent {
    /// Inode number, `0` if the backend can't supply one cheaply.
    pub ino: u64,
    /// Base name. Never "." or ".." — those are synthesized by callers
    /// (e.g. the WASI translation layer), not by `readdir`.
    pub name: String,
    /// Type portion of the entry's mode.
    pub file_type: FileType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_stat_has_nlink_one() {
        let st = StatT::constant(FileType::RegularFile);
        assert_eq!(st.nlink, 1);
        assert_eq!(st.atim, 0);
    }
}
