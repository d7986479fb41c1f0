//! The `FS` contract, per spec §4.4: a path-rooted filesystem with four
//! backends, composed rather than inherited (design note §9).

mod adapt;
mod composite;
mod dirfs;
mod readfs;

pub use adapt::AdaptFS;
pub use composite::CompositeFS;
pub use dirfs::{DirFS, DirFsOptions};
pub use readfs::ReadFS;

use std::path::{Path, PathBuf};

use crate::file::File;
use crate::timespec::TimeSpec;
use crate::stat::StatT;
use crate::Errno;

/// Every filesystem backend this crate can produce. A sealed tagged union,
/// like [`crate::File`] (design note §9): the set of backend kinds is fixed
/// here, and [`AdaptFS`] is where host-supplied trees (the one genuine
/// extension point, [`crate::readonly_tree::ReadOnlyTree`]) join the set.
pub enum FS {
    Dir(DirFS),
    Adapt(AdaptFS),
    Read(ReadFS),
    Composite(CompositeFS),
}

macro_rules! dispatch {
    ($self:ident, $variant_method:ident $(, $arg:expr)*) => {
        match $self {
            FS::Dir(f) => f.$variant_method($($arg),*),
            FS::Adapt(f) => f.$variant_method($($arg),*),
            FS::Read(f) => f.$variant_method($($arg),*),
            FS::Composite(f) => f.$variant_method($($arg),*),
        }
    };
}

impl FS {
    /// Human-readable description of this filesystem, e.g. `[a:/ b:/tmp]`
    /// for a composite.
    pub fn string(&self) -> String {
        dispatch!(self, string)
    }

    /// Opens `path`, per the open semantics in spec §4.2.
    pub fn open_file(&self, path: &str, flag: crate::oflag::Oflag, mode: u32) -> Result<File, Errno> {
        dispatch!(self, open_file, path, flag, mode)
    }

    pub fn mkdir(&self, path: &str, mode: u32) -> Result<(), Errno> {
        dispatch!(self, mkdir, path, mode)
    }

    pub fn chmod(&self, path: &str, mode: u32) -> Result<(), Errno> {
        dispatch!(self, chmod, path, mode)
    }

    pub fn chown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        dispatch!(self, chown, path, uid, gid)
    }

    pub fn lchown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        dispatch!(self, lchown, path, uid, gid)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<(), Errno> {
        dispatch!(self, rename, old, new)
    }

    pub fn rmdir(&self, path: &str) -> Result<(), Errno> {
        dispatch!(self, rmdir, path)
    }

    pub fn unlink(&self, path: &str) -> Result<(), Errno> {
        dispatch!(self, unlink, path)
    }

    pub fn link(&self, old: &str, new: &str) -> Result<(), Errno> {
        dispatch!(self, link, old, new)
    }

    pub fn symlink(&self, target: &str, path: &str) -> Result<(), Errno> {
        dispatch!(self, symlink, target, path)
    }

    pub fn readlink(&self, path: &str) -> Result<PathBuf, Errno> {
        dispatch!(self, readlink, path)
    }

    pub fn utimens(&self, path: &str, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        dispatch!(self, utimens, path, atim, mtim)
    }

    pub fn truncate(&self, path: &str, size: i64) -> Result<(), Errno> {
        dispatch!(self, truncate, path, size)
    }

    pub fn stat(&self, path: &str) -> Result<StatT, Errno> {
        dispatch!(self, stat, path)
    }

    pub fn lstat(&self, path: &str) -> Result<StatT, Errno> {
        dispatch!(self, lstat, path)
    }
}

/// Cleans a guest path to a `/`-free relative [`PathBuf`], per spec §4.4
/// step 1 ("strip leading `./`, `/`; trailing `/`") and §4.4's `AdaptFS`
/// note ("strip leading `/`, `path.clean`, forbid `..` escapes"). Returns
/// `EFAULT` if the cleaned path would escape its root via a leading `..`
/// component.
pub(crate) fn clean_guest_path(path: &str) -> Result<PathBuf, Errno> {
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        // `openat`/`fstatat` resolve "." against the directory fd itself, so
        // the root is reachable as a relative path rather than an empty one
        // (`openat(fd, "", ...)` is `ENOENT` without `AT_EMPTY_PATH`).
        return Ok(PathBuf::from("."));
    }
    let mut out = PathBuf::new();
    for component in Path::new(trimmed).components() {
        use std::path::Component;
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(Errno::EFAULT),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_leading_and_trailing_slashes() {
        assert_eq!(clean_guest_path("/a/b/").unwrap(), PathBuf::from("a/b"));
        assert_eq!(clean_guest_path("").unwrap(), PathBuf::from("."));
        assert_eq!(clean_guest_path("/").unwrap(), PathBuf::from("."));
        assert_eq!(clean_guest_path(".").unwrap(), PathBuf::from("."));
    }

    #[test]
    fn rejects_parent_dir_escapes() {
        assert_eq!(clean_guest_path("../x"), Err(Errno::EFAULT));
        assert_eq!(clean_guest_path("a/../../b"), Err(Errno::EFAULT));
    }
}
