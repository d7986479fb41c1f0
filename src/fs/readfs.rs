//! [`ReadFS`]: a read-only decorator over another [`super::FS`], per spec
//! §4.4. Reads and lookups pass through; every mutating operation fails
//! with `EROFS` without reaching the wrapped backend.

use std::path::PathBuf;

use crate::file::File;
use crate::oflag::Oflag;
use crate::readdir::Readdir;
use crate::stat::StatT;
use crate::timespec::TimeSpec;
use crate::Errno;

use super::FS;

pub struct ReadFS {
    inner: Box<FS>,
}

impl ReadFS {
    pub fn new(inner: FS) -> ReadFS {
        ReadFS {
            inner: Box::new(inner),
        }
    }

    pub(crate) fn string(&self) -> String {
        format!("ro:{}", self.inner.string())
    }

    pub(crate) fn open_file(&self, path: &str, flag: Oflag, mode: u32) -> Result<File, Errno> {
        if flag.access_mode()?.writable() || flag.contains(Oflag::CREAT) {
            return Err(Errno::EROFS);
        }
        self.inner.open_file(path, flag, mode)
    }

    pub(crate) fn mkdir(&self, _path: &str, _mode: u32) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn chmod(&self, _path: &str, _mode: u32) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn chown(&self, _path: &str, _uid: i64, _gid: i64) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn lchown(&self, _path: &str, _uid: i64, _gid: i64) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn rename(&self, _old: &str, _new: &str) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn rmdir(&self, _path: &str) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn unlink(&self, _path: &str) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn link(&self, _old: &str, _new: &str) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn symlink(&self, _target: &str, _path: &str) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn readlink(&self, path: &str) -> Result<PathBuf, Errno> {
        self.inner.readlink(path)
    }

    pub(crate) fn utimens(&self, _path: &str, _atim: TimeSpec, _mtim: TimeSpec) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn truncate(&self, _path: &str, _size: i64) -> Result<(), Errno> {
        Err(Errno::EROFS)
    }

    pub(crate) fn stat(&self, path: &str) -> Result<StatT, Errno> {
        self.inner.stat(path)
    }

    pub(crate) fn lstat(&self, path: &str) -> Result<StatT, Errno> {
        self.inner.lstat(path)
    }

    pub(crate) fn readdir(&self, path: &str) -> Result<Readdir, Errno> {
        let mut file = self.open_file(path, Oflag::RDONLY | Oflag::DIRECTORY, 0)?;
        file.readdir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DirFS;

    #[test]
    fn mutating_ops_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DirFS::new(dir.path()).unwrap();
        let ro = ReadFS::new(FS::Dir(backend));
        assert_eq!(ro.mkdir("a", 0o755), Err(Errno::EROFS));
        assert_eq!(ro.unlink("a"), Err(Errno::EROFS));
        assert_eq!(
            ro.open_file("a", Oflag::WRONLY | Oflag::CREAT, 0o644)
                .unwrap_err(),
            Errno::EROFS
        );
    }
}
