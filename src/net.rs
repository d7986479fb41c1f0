//! TCP sockets exposed through the [`crate::File`] contract, per spec §7:
//! a listening socket and a connected socket are each just another `File`
//! variant, with `accept`/`shutdown`/`recvfrom(MSG_PEEK)` layered on top of
//! the same read/write/poll operations every other handle supports.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};

use crate::errno::unwrap_os_error;
use crate::pflag::Pflag;
use crate::readdir::Readdir;
use crate::seek::SeekWhence;
use crate::stat::{FileType, StatT};
use crate::timespec::TimeSpec;
use crate::Errno;

use crate::file::OpenState;

/// Which half(s) of a connection to shut down, mirroring `SHUT_RD`/
/// `SHUT_WR`/`SHUT_RDWR`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShutdownHow {
    Read,
    Write,
    Both,
}

impl From<ShutdownHow> for Shutdown {
    fn from(h: ShutdownHow) -> Shutdown {
        match h {
            ShutdownHow::Read => Shutdown::Read,
            ShutdownHow::Write => Shutdown::Write,
            ShutdownHow::Both => Shutdown::Both,
        }
    }
}

pub struct TcpListenerFile {
    listener: TcpListener,
    state: OpenState,
}

impl TcpListenerFile {
    pub(crate) fn bind(addr: std::net::SocketAddr) -> Result<TcpListenerFile, Errno> {
        let listener = TcpListener::bind(addr).map_err(|e| unwrap_os_error(&e))?;
        Ok(TcpListenerFile {
            listener,
            state: OpenState::new(false, false),
        })
    }

    pub(crate) fn local_addr(&self) -> Result<std::net::SocketAddr, Errno> {
        self.listener.local_addr().map_err(|e| unwrap_os_error(&e))
    }

    /// Per spec §4.7: a non-blocking listener does a single-fd
    /// `poll(POLLIN, 0)` precheck and returns `EAGAIN` without calling the
    /// (possibly blocking) host `accept` when nothing is pending. A
    /// blocking listener just calls the host `accept` and waits.
    pub(crate) fn accept(&mut self) -> Result<TcpConnFile, Errno> {
        self.state.check_open()?;
        if self.state.is_nonblock() && !poll_listener_readable(&self.listener, 0)? {
            return Err(Errno::EAGAIN);
        }
        let (stream, _) = self.listener.accept().map_err(|e| unwrap_os_error(&e))?;
        TcpConnFile::new(stream, self.state.is_nonblock())
    }

    pub(crate) fn ino(&self) -> u64 {
        0
    }

    pub(crate) fn is_dir(&self) -> bool {
        false
    }

    pub(crate) fn stat(&mut self) -> Result<StatT, Errno> {
        self.state.check_open()?;
        Ok(StatT::constant(FileType::Socket))
    }

    pub(crate) fn is_append(&self) -> bool {
        false
    }

    pub(crate) fn set_append(&mut self, _on: bool) -> Result<(), Errno> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn is_nonblock(&self) -> bool {
        self.state.is_nonblock()
    }

    pub(crate) fn set_nonblock(&mut self, on: bool) -> Result<(), Errno> {
        self.state.check_open()?;
        self.listener
            .set_nonblocking(on)
            .map_err(|e| unwrap_os_error(&e))?;
        self.state.set_nonblock(on);
        Ok(())
    }

    pub(crate) fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Errno> {
        Err(Errno::EINVAL)
    }

    pub(crate) fn pread(&mut self, _buf: &mut [u8], _offset: i64) -> Result<usize, Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn write(&mut self, _buf: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EINVAL)
    }

    pub(crate) fn pwrite(&mut self, _buf: &[u8], _offset: i64) -> Result<usize, Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn seek(&mut self, _offset: i64, _whence: SeekWhence) -> Result<i64, Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn readdir(&mut self) -> Result<Readdir, Errno> {
        Err(Errno::ENOTDIR)
    }

    pub(crate) fn truncate(&mut self, _size: i64) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn sync(&mut self) -> Result<(), Errno> {
        Ok(())
    }

    pub(crate) fn datasync(&mut self) -> Result<(), Errno> {
        Ok(())
    }

    pub(crate) fn chmod(&mut self, _mode: u32) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn chown(&mut self, _uid: i64, _gid: i64) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn utimens(&mut self, _atim: TimeSpec, _mtim: TimeSpec) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn poll(&mut self, _flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
        self.state.check_open()?;
        poll_listener_readable(&self.listener, timeout_ms)
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        self.state.close();
        Ok(())
    }

    /// Exposes the underlying listener for [`crate::select`]'s multiplexed
    /// waits.
    pub(crate) fn listener_ref(&self) -> &TcpListener {
        &self.listener
    }
}

pub struct TcpConnFile {
    stream: TcpStream,
    state: OpenState,
}

impl TcpConnFile {
    pub(crate) fn connect(addr: std::net::SocketAddr) -> Result<TcpConnFile, Errno> {
        let stream = TcpStream::connect(addr).map_err(|e| unwrap_os_error(&e))?;
        TcpConnFile::new(stream, false)
    }

    fn new(stream: TcpStream, nonblock: bool) -> Result<TcpConnFile, Errno> {
        stream
            .set_nonblocking(nonblock)
            .map_err(|e| unwrap_os_error(&e))?;
        Ok(TcpConnFile {
            stream,
            state: OpenState::new(false, nonblock),
        })
    }

    pub(crate) fn shutdown(&mut self, how: ShutdownHow) -> Result<(), Errno> {
        self.state.check_open()?;
        self.stream
            .shutdown(how.into())
            .map_err(|e| unwrap_os_error(&e))
    }

    pub(crate) fn recv_peek(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        recv_peek_impl(&self.stream, buf)
    }

    pub(crate) fn ino(&self) -> u64 {
        0
    }

    pub(crate) fn is_dir(&self) -> bool {
        false
    }

    pub(crate) fn stat(&mut self) -> Result<StatT, Errno> {
        self.state.check_open()?;
        Ok(StatT::constant(FileType::Socket))
    }

    pub(crate) fn is_append(&self) -> bool {
        false
    }

    pub(crate) fn set_append(&mut self, _on: bool) -> Result<(), Errno> {
        Err(Errno::ENOTSUP)
    }

    pub(crate) fn is_nonblock(&self) -> bool {
        self.state.is_nonblock()
    }

    pub(crate) fn set_nonblock(&mut self, on: bool) -> Result<(), Errno> {
        self.state.check_open()?;
        self.stream
            .set_nonblocking(on)
            .map_err(|e| unwrap_os_error(&e))?;
        self.state.set_nonblock(on);
        Ok(())
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        self.stream.read(buf).map_err(|e| unwrap_os_error(&e))
    }

    pub(crate) fn pread(&mut self, _buf: &mut [u8], _offset: i64) -> Result<usize, Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        self.stream.write(buf).map_err(|e| unwrap_os_error(&e))
    }

    pub(crate) fn pwrite(&mut self, _buf: &[u8], _offset: i64) -> Result<usize, Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn seek(&mut self, _offset: i64, _whence: SeekWhence) -> Result<i64, Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn readdir(&mut self) -> Result<Readdir, Errno> {
        Err(Errno::ENOTDIR)
    }

    pub(crate) fn truncate(&mut self, _size: i64) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn sync(&mut self) -> Result<(), Errno> {
        Ok(())
    }

    pub(crate) fn datasync(&mut self) -> Result<(), Errno> {
        Ok(())
    }

    pub(crate) fn chmod(&mut self, _mode: u32) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn chown(&mut self, _uid: i64, _gid: i64) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn utimens(&mut self, _atim: TimeSpec, _mtim: TimeSpec) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }

    pub(crate) fn poll(&mut self, flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
        self.state.check_open()?;
        poll_stream_readable(&self.stream, flag, timeout_ms)
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        self.state.close();
        Ok(())
    }

    /// Exposes the underlying stream for [`crate::select`]'s multiplexed
    /// waits.
    pub(crate) fn stream_ref(&self) -> &TcpStream {
        &self.stream
    }
}

#[cfg(unix)]
fn recv_peek_impl(stream: &TcpStream, buf: &mut [u8]) -> Result<usize, Errno> {
    use nix::sys::socket::{recv, MsgFlags};
    use std::os::fd::AsRawFd;
    recv(stream.as_raw_fd(), buf, MsgFlags::MSG_PEEK).map_err(|e| {
        unwrap_os_error(&std::io::Error::from_raw_os_error(e as i32))
    })
}

#[cfg(windows)]
fn recv_peek_impl(stream: &TcpStream, buf: &mut [u8]) -> Result<usize, Errno> {
    use std::os::windows::io::AsRawSocket;
    use windows_sys::Win32::Networking::WinSock::{recv, MSG_PEEK, SOCKET};

    let sock = stream.as_raw_socket() as SOCKET;
    let n = unsafe { recv(sock, buf.as_mut_ptr(), buf.len() as i32, MSG_PEEK) };
    if n < 0 {
        Err(unwrap_os_error(&std::io::Error::last_os_error()))
    } else {
        Ok(n as usize)
    }
}

#[cfg(unix)]
fn poll_listener_readable(listener: &TcpListener, timeout_ms: i64) -> Result<bool, Errno> {
    use std::os::fd::AsFd;
    crate::poll::unix::poll_readable_fd(listener.as_fd(), timeout_ms)
}

#[cfg(unix)]
fn poll_stream_readable(stream: &TcpStream, _flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
    use std::os::fd::AsFd;
    crate::poll::unix::poll_readable_fd(stream.as_fd(), timeout_ms)
}

#[cfg(windows)]
fn poll_listener_readable(listener: &TcpListener, timeout_ms: i64) -> Result<bool, Errno> {
    crate::select::windows::wsa_poll_readable(listener, timeout_ms)
}

#[cfg(windows)]
fn poll_stream_readable(stream: &TcpStream, _flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
    crate::select::windows::wsa_poll_readable(stream, timeout_ms)
}
