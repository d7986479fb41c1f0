//! [`ReadOnlyFileHandle`]: the `File` variant wrapping a host-supplied
//! [`crate::readonly_tree::ReadOnlyFile`], backing [`crate::fs::AdaptFS`].

use crate::pflag::Pflag;
use crate::readdir::Readdir;
use crate::readonly_tree::ReadOnlyFile;
use crate::seek::SeekWhence;
use crate::stat::StatT;
use crate::timespec::TimeSpec;
use crate::Errno;

use super::OpenState;

pub struct ReadOnlyFileHandle {
    inner: Box<dyn ReadOnlyFile>,
    state: OpenState,
}

impl ReadOnlyFileHandle {
    pub(crate) fn new(inner: Box<dyn ReadOnlyFile>, nonblock: bool) -> ReadOnlyFileHandle {
        ReadOnlyFileHandle {
            inner,
            state: OpenState::new(false, nonblock),
        }
    }

    pub(crate) fn ino(&self) -> u64 {
        0
    }

    pub(crate) fn is_dir(&self) -> bool {
        false
    }

    pub(crate) fn stat(&mut self) -> Result<StatT, Errno> {
        self.state.check_open()?;
        self.inner.stat()
    }

    pub(crate) fn is_append(&self) -> bool {
        false
    }

    pub(crate) fn set_append(&mut self, _on: bool) -> Result<(), Errno> {
        // Appending to a read-only tree makes no sense; the tree itself
        // rejects the write with ENOSYS, so silently accepting the flag
        // toggle here is harmless.
        Ok(())
    }

    pub(crate) fn is_nonblock(&self) -> bool {
        self.state.is_nonblock()
    }

    pub(crate) fn set_nonblock(&mut self, on: bool) -> Result<(), Errno> {
        self.state.check_open()?;
        self.state.set_nonblock(on);
        Ok(())
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        self.inner.read(buf)
    }

    pub(crate) fn pread(&mut self, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        self.state.check_open()?;
        self.inner.pread(buf, offset)
    }

    pub(crate) fn write(&mut self, _buf: &[u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn pwrite(&mut self, _buf: &[u8], _offset: i64) -> Result<usize, Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<i64, Errno> {
        self.state.check_open()?;
        self.inner.seek(offset, whence)
    }

    pub(crate) fn readdir(&mut self) -> Result<Readdir, Errno> {
        self.state.check_open()?;
        Err(Errno::ENOTDIR)
    }

    pub(crate) fn truncate(&mut self, _size: i64) -> Result<(), Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn sync(&mut self) -> Result<(), Errno> {
        self.state.check_open()?;
        Ok(())
    }

    pub(crate) fn datasync(&mut self) -> Result<(), Errno> {
        self.state.check_open()?;
        Ok(())
    }

    pub(crate) fn chmod(&mut self, _mode: u32) -> Result<(), Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn chown(&mut self, _uid: i64, _gid: i64) -> Result<(), Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn utimens(&mut self, _atim: TimeSpec, _mtim: TimeSpec) -> Result<(), Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn poll(&mut self, _flag: Pflag, _timeout_ms: i64) -> Result<bool, Errno> {
        self.state.check_open()?;
        // An in-memory tree is always immediately readable.
        Ok(true)
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        self.state.close();
        Ok(())
    }
}
