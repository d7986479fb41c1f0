//! [`DirFS`]: a real host directory tree, per spec §4.4. Every operation
//! joins its argument against the cleaned root and dispatches to
//! [`crate::sys`]'s `*_at` helpers.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::file::{DirFile, File};
use crate::oflag::Oflag;
use crate::stat::StatT;
use crate::sys::{self, RootHandle};
use crate::timespec::TimeSpec;
use crate::Errno;

use super::clean_guest_path;

/// Construction-time knobs for [`DirFS`].
#[derive(Copy, Clone, Debug)]
pub struct DirFsOptions {
    /// Whether `..` components inside open paths are followed at all
    /// (`false` rejects them outright with `EFAULT`) rather than resolved
    /// against the real parent directory.
    pub follow_symlinks_by_default: bool,
}

impl Default for DirFsOptions {
    fn default() -> DirFsOptions {
        DirFsOptions {
            follow_symlinks_by_default: true,
        }
    }
}

pub struct DirFS {
    root: Arc<RootHandle>,
    host_path: PathBuf,
    options: DirFsOptions,
}

impl DirFS {
    /// Opens `host_path` as the root of a new `DirFS`.
    ///
    /// # Errors
    /// Returns whatever [`Errno`] the host reports opening `host_path`
    /// (typically `ENOENT` or `EPERM`).
    pub fn new(host_path: impl Into<PathBuf>) -> Result<DirFS, Errno> {
        Self::with_options(host_path, DirFsOptions::default())
    }

    pub fn with_options(host_path: impl Into<PathBuf>, options: DirFsOptions) -> Result<DirFS, Errno> {
        let host_path = host_path.into();
        let root = sys::make_root(&host_path)?;
        Ok(DirFS {
            root: Arc::new(root),
            host_path,
            options,
        })
    }

    fn rel(&self, path: &str) -> Result<PathBuf, Errno> {
        clean_guest_path(path)
    }

    pub(crate) fn string(&self) -> String {
        format!("dir:{}", self.host_path.display())
    }

    pub(crate) fn open_file(&self, path: &str, flag: Oflag, mode: u32) -> Result<File, Errno> {
        flag.check_directory_write_conflict()?;
        let rel = self.rel(path)?;
        let flag = if self.options.follow_symlinks_by_default {
            flag
        } else {
            flag | Oflag::NOFOLLOW
        };
        let handle = sys::open_at(sys::root_ref(&self.root), &rel, flag, mode)?;
        if flag.contains(Oflag::CREAT) {
            debug!("dirfs: created {}", path);
        }
        let append = flag.contains(Oflag::APPEND);
        let nonblock = flag.contains(Oflag::NONBLOCK);
        DirFile::new(self.root.clone(), rel, handle, append, nonblock).map(File::Dir)
    }

    pub(crate) fn mkdir(&self, path: &str, mode: u32) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::mkdir_at(sys::root_ref(&self.root), &rel, mode)?;
        debug!("dirfs: mkdir {}", path);
        Ok(())
    }

    pub(crate) fn chmod(&self, path: &str, mode: u32) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::chmod_at(sys::root_ref(&self.root), &rel, mode)
    }

    pub(crate) fn chown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::chown_at(sys::root_ref(&self.root), &rel, uid, gid, true)
    }

    pub(crate) fn lchown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::chown_at(sys::root_ref(&self.root), &rel, uid, gid, false)
    }

    pub(crate) fn rename(&self, old: &str, new: &str) -> Result<(), Errno> {
        let old_rel = self.rel(old)?;
        let new_rel = self.rel(new)?;
        sys::rename_at(
            sys::root_ref(&self.root),
            &old_rel,
            sys::root_ref(&self.root),
            &new_rel,
        )?;
        debug!("dirfs: rename {} -> {}", old, new);
        Ok(())
    }

    pub(crate) fn rmdir(&self, path: &str) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::rmdir_at(sys::root_ref(&self.root), &rel)?;
        debug!("dirfs: rmdir {}", path);
        Ok(())
    }

    pub(crate) fn unlink(&self, path: &str) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::unlink_at(sys::root_ref(&self.root), &rel)?;
        debug!("dirfs: unlink {}", path);
        Ok(())
    }

    pub(crate) fn link(&self, old: &str, new: &str) -> Result<(), Errno> {
        let old_rel = self.rel(old)?;
        let new_rel = self.rel(new)?;
        sys::link_at(
            sys::root_ref(&self.root),
            &old_rel,
            sys::root_ref(&self.root),
            &new_rel,
        )
    }

    pub(crate) fn symlink(&self, target: &str, path: &str) -> Result<(), Errno> {
        let target_path = std::path::Path::new(target);
        if sys::symlink_target_escapes(target_path) {
            return Err(Errno::EFAULT);
        }
        let rel = self.rel(path)?;
        sys::symlink_at(sys::root_ref(&self.root), target_path, &rel)?;
        debug!("dirfs: symlink {} -> {}", path, target);
        Ok(())
    }

    pub(crate) fn readlink(&self, path: &str) -> Result<PathBuf, Errno> {
        let rel = self.rel(path)?;
        sys::readlink_at(sys::root_ref(&self.root), &rel)
    }

    pub(crate) fn utimens(&self, path: &str, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        let rel = self.rel(path)?;
        sys::utimens_at(sys::root_ref(&self.root), &rel, atim, mtim, true)
    }

    pub(crate) fn truncate(&self, path: &str, size: i64) -> Result<(), Errno> {
        if size < 0 {
            return Err(Errno::EINVAL);
        }
        let mut file = self.open_file(path, Oflag::WRONLY, 0)?;
        let result = file.truncate(size);
        let _ = file.close();
        result
    }

    pub(crate) fn stat(&self, path: &str) -> Result<StatT, Errno> {
        let rel = self.rel(path)?;
        sys::stat_at(sys::root_ref(&self.root), &rel, true)
    }

    pub(crate) fn lstat(&self, path: &str) -> Result<StatT, Errno> {
        let rel = self.rel(path)?;
        sys::stat_at(sys::root_ref(&self.root), &rel, false)
    }
}
