//! [`StdioFile`]: the `File` variant bridging the host's own stdin/stdout/
//! stderr, per spec §4.2 "Stdio streams" — constant metadata, writes that
//! always append, reads that never seek.

use std::io::{Read, Write};

use crate::pflag::Pflag;
use crate::readdir::Readdir;
use crate::seek::SeekWhence;
use crate::stat::{FileType, StatT};
use crate::timespec::TimeSpec;
use crate::Errno;

use super::OpenState;

/// Which standard stream this handle bridges.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StdioKind {
    Stdin,
    Stdout,
    Stderr,
}

enum StdioHandle {
    In(std::io::Stdin),
    Out(std::io::Stdout),
    Err(std::io::Stderr),
}

pub struct StdioFile {
    kind: StdioKind,
    handle: StdioHandle,
    state: OpenState,
}

impl StdioFile {
    pub(crate) fn new(kind: StdioKind) -> StdioFile {
        let handle = match kind {
            StdioKind::Stdin => StdioHandle::In(std::io::stdin()),
            StdioKind::Stdout => StdioHandle::Out(std::io::stdout()),
            StdioKind::Stderr => StdioHandle::Err(std::io::stderr()),
        };
        StdioFile {
            kind,
            handle,
            state: OpenState::new(true, false),
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
        Ok(StatT::constant(FileType::NamedPipe))
    }

    pub(crate) fn is_append(&self) -> bool {
        true
    }

    pub(crate) fn set_append(&mut self, _on: bool) -> Result<(), Errno> {
        // Every stdio write appends by construction; the flag can't be
        // turned off.
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
        match &mut self.handle {
            StdioHandle::In(s) => s.read(buf).map_err(|e| crate::errno::unwrap_os_error(&e)),
            StdioHandle::Out(_) | StdioHandle::Err(_) => Err(Errno::EINVAL),
        }
    }

    pub(crate) fn pread(&mut self, _buf: &mut [u8], _offset: i64) -> Result<usize, Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        match &mut self.handle {
            StdioHandle::Out(s) => s.write(buf).map_err(|e| crate::errno::unwrap_os_error(&e)),
            StdioHandle::Err(s) => s.write(buf).map_err(|e| crate::errno::unwrap_os_error(&e)),
            StdioHandle::In(_) => Err(Errno::EINVAL),
        }
    }

    pub(crate) fn pwrite(&mut self, _buf: &[u8], _offset: i64) -> Result<usize, Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
    }

    pub(crate) fn seek(&mut self, _offset: i64, _whence: SeekWhence) -> Result<i64, Errno> {
        self.state.check_open()?;
        Err(Errno::ENOSYS)
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
        match &mut self.handle {
            StdioHandle::Out(s) => s.flush().map_err(|e| crate::errno::unwrap_os_error(&e)),
            StdioHandle::Err(s) => s.flush().map_err(|e| crate::errno::unwrap_os_error(&e)),
            StdioHandle::In(_) => Ok(()),
        }
    }

    pub(crate) fn datasync(&mut self) -> Result<(), Errno> {
        self.sync()
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

    pub(crate) fn poll(&mut self, _flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
        self.state.check_open()?;
        match self.kind {
            StdioKind::Stdin => crate::poll::poll_stdin(timeout_ms),
            StdioKind::Stdout | StdioKind::Stderr => Ok(true),
        }
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        self.state.close();
        Ok(())
    }

    /// Borrowed fd for stdin, used by [`crate::select`] to multiplex it
    /// alongside socket handles. `None` for stdout/stderr, which are always
    /// ready and never need to be waited on.
    #[cfg(unix)]
    pub(crate) fn stdin_fd(&self) -> Option<std::os::fd::BorrowedFd<'_>> {
        use std::os::fd::AsFd;
        match (&self.kind, &self.handle) {
            (StdioKind::Stdin, StdioHandle::In(s)) => Some(s.as_fd()),
            _ => None,
        }
    }

    /// The stdin handle, used by [`crate::select::windows`] to tick
    /// `PeekNamedPipe` readiness alongside socket handles. `None` for
    /// stdout/stderr.
    #[cfg(windows)]
    pub(crate) fn stdin_handle(&self) -> Option<&std::io::Stdin> {
        match (&self.kind, &self.handle) {
            (StdioKind::Stdin, StdioHandle::In(s)) => Some(s),
            _ => None,
        }
    }
}
