//! [`AdaptFS`]: adapts a host-supplied [`crate::readonly_tree::ReadOnlyTree`]
//! into the `FS` contract, per spec §4.4.

use std::any::Any;
use std::path::PathBuf;

use crate::file::{File, ReadOnlyFileHandle};
use crate::oflag::Oflag;
use crate::readdir::Readdir;
use crate::readonly_tree::{ReadOnlyFile, ReadOnlyTree};
use crate::seek::SeekWhence;
use crate::stat::StatT;
use crate::timespec::TimeSpec;
use crate::Errno;

use super::clean_guest_path;
use super::dirfs::DirFS;

pub struct AdaptFS {
    inner: Box<dyn ReadOnlyTree>,
}

impl AdaptFS {
    pub fn new(inner: Box<dyn ReadOnlyTree>) -> AdaptFS {
        AdaptFS { inner }
    }

    fn name(&self, path: &str) -> Result<String, Errno> {
        let cleaned = clean_guest_path(path)?;
        Ok(cleaned.to_string_lossy().into_owned())
    }

    /// Downcasts the wrapped tree to a real writable directory, per spec
    /// §4.4's "hacked writes" passthrough.
    fn hacked(&self) -> Option<&DirFS> {
        self.inner
            .as_any()
            .downcast_ref::<DirBackedReadOnlyTree>()
            .map(|t| &t.0)
    }

    pub(crate) fn string(&self) -> String {
        "adapt:ro".to_string()
    }

    pub(crate) fn open_file(&self, path: &str, flag: Oflag, mode: u32) -> Result<File, Errno> {
        if flag.access_mode()?.writable() {
            if let Some(dir) = self.hacked() {
                return dir.open_file(path, flag, mode);
            }
            return Err(Errno::EINVAL);
        }
        let name = self.name(path)?;
        let inner = self.inner.open(&name)?;
        Ok(File::ReadOnly(ReadOnlyFileHandle::new(
            inner,
            flag.contains(Oflag::NONBLOCK),
        )))
    }

    pub(crate) fn mkdir(&self, path: &str, mode: u32) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.mkdir(path, mode),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn chmod(&self, path: &str, mode: u32) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.chmod(path, mode),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn chown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.chown(path, uid, gid),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn lchown(&self, path: &str, uid: i64, gid: i64) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.lchown(path, uid, gid),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn rename(&self, old: &str, new: &str) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.rename(old, new),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn rmdir(&self, path: &str) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.rmdir(path),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn unlink(&self, path: &str) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.unlink(path),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn link(&self, old: &str, new: &str) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.link(old, new),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn symlink(&self, target: &str, path: &str) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.symlink(target, path),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn readlink(&self, path: &str) -> Result<PathBuf, Errno> {
        match self.hacked() {
            Some(dir) => dir.readlink(path),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn utimens(&self, path: &str, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.utimens(path, atim, mtim),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn truncate(&self, path: &str, size: i64) -> Result<(), Errno> {
        match self.hacked() {
            Some(dir) => dir.truncate(path, size),
            None => Err(Errno::ENOSYS),
        }
    }

    pub(crate) fn stat(&self, path: &str) -> Result<StatT, Errno> {
        let name = self.name(path)?;
        self.inner.stat(&name)
    }

    pub(crate) fn lstat(&self, path: &str) -> Result<StatT, Errno> {
        // The tree is assumed symlink-free, per spec §4.4.
        self.stat(path)
    }

    pub(crate) fn readdir(&self, path: &str) -> Result<Readdir, Errno> {
        let name = self.name(path)?;
        self.inner.readdir(&name)
    }
}

/// A [`ReadOnlyTree`] that is secretly a real, writable [`DirFS`]. Wrapping
/// a `DirFS` this way and handing it to [`AdaptFS::new`] lets a caller that
/// only has a `ReadOnlyTree`-shaped API still get real mutating behavior
/// through the "hacked writes" downcast above.
pub struct DirBackedReadOnlyTree(DirFS);

impl DirBackedReadOnlyTree {
    pub fn new(dir: DirFS) -> DirBackedReadOnlyTree {
        DirBackedReadOnlyTree(dir)
    }
}

impl ReadOnlyTree for DirBackedReadOnlyTree {
    fn open(&self, name: &str) -> Result<Box<dyn ReadOnlyFile>, Errno> {
        let file = self.0.open_file(name, Oflag::RDONLY, 0)?;
        Ok(Box::new(DirBackedReadOnlyFile(std::cell::RefCell::new(file))))
    }

    fn stat(&self, name: &str) -> Result<StatT, Errno> {
        self.0.stat(name)
    }

    fn readdir(&self, name: &str) -> Result<Readdir, Errno> {
        let mut file = self.0.open_file(name, Oflag::RDONLY | Oflag::DIRECTORY, 0)?;
        file.readdir()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct DirBackedReadOnlyFile(std::cell::RefCell<File>);

impl ReadOnlyFile for DirBackedReadOnlyFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        self.0.get_mut().read(buf)
    }

    fn pread(&self, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        self.0.borrow_mut().pread(buf, offset)
    }

    fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<i64, Errno> {
        self.0.get_mut().seek(offset, whence)
    }

    fn stat(&self) -> Result<StatT, Errno> {
        self.0.borrow_mut().stat()
    }
}
