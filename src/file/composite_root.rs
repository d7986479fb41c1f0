//! [`CompositeRootFile`]: wraps the root-mount's own open file to splice in
//! synthesized directory entries for sub-mount names, per spec §4.4 step 4.

use crate::pflag::Pflag;
use crate::readdir::Readdir;
use crate::seek::SeekWhence;
use crate::stat::{Dirent, FileType, StatT};
use crate::timespec::TimeSpec;
use crate::Errno;

use super::File;

pub struct CompositeRootFile {
    inner: File,
    mount_names: Vec<String>,
}

impl CompositeRootFile {
    pub(crate) fn new(inner: File, mount_names: Vec<String>) -> CompositeRootFile {
        CompositeRootFile { inner, mount_names }
    }

    pub(crate) fn ino(&self) -> u64 {
        self.inner.ino()
    }

    pub(crate) fn is_dir(&self) -> bool {
        self.inner.is_dir()
    }

    pub(crate) fn stat(&mut self) -> Result<StatT, Errno> {
        self.inner.stat()
    }

    pub(crate) fn is_append(&self) -> bool {
        self.inner.is_append()
    }

    pub(crate) fn set_append(&mut self, on: bool) -> Result<(), Errno> {
        self.inner.set_append(on)
    }

    pub(crate) fn is_nonblock(&self) -> bool {
        self.inner.is_nonblock()
    }

    pub(crate) fn set_nonblock(&mut self, on: bool) -> Result<(), Errno> {
        self.inner.set_nonblock(on)
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        self.inner.read(buf)
    }

    pub(crate) fn pread(&mut self, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        self.inner.pread(buf, offset)
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<usize, Errno> {
        self.inner.write(buf)
    }

    pub(crate) fn pwrite(&mut self, buf: &[u8], offset: i64) -> Result<usize, Errno> {
        self.inner.pwrite(buf, offset)
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<i64, Errno> {
        self.inner.seek(offset, whence)
    }

    /// Presents synthesized sub-mount entries before the root backend's own
    /// listing, per spec §4.4 step 4.
    pub(crate) fn readdir(&mut self) -> Result<Readdir, Errno> {
        let backend_listing = self.inner.readdir()?;
        let synthetic: Vec<Dirent> = self
            .mount_names
            .iter()
            .map(|name| Dirent {
                ino: 0,
                name: name.clone(),
                file_type: FileType::Directory,
            })
            .collect();
        Ok(Readdir::concat(
            Readdir::from_slice(synthetic),
            backend_listing,
        ))
    }

    pub(crate) fn truncate(&mut self, size: i64) -> Result<(), Errno> {
        self.inner.truncate(size)
    }

    pub(crate) fn sync(&mut self) -> Result<(), Errno> {
        self.inner.sync()
    }

    pub(crate) fn datasync(&mut self) -> Result<(), Errno> {
        self.inner.datasync()
    }

    pub(crate) fn chmod(&mut self, mode: u32) -> Result<(), Errno> {
        self.inner.chmod(mode)
    }

    pub(crate) fn chown(&mut self, uid: i64, gid: i64) -> Result<(), Errno> {
        self.inner.chown(uid, gid)
    }

    pub(crate) fn utimens(&mut self, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        self.inner.utimens(atim, mtim)
    }

    pub(crate) fn poll(&mut self, flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
        self.inner.poll(flag, timeout_ms)
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        self.inner.close()
    }
}
