//! The `File` contract, per spec §4.2: a sealed tagged union over every
//! kind of open handle the crate can hand back from `FS::open_file`,
//! `FS::tcp_listener`, or the stdio bridge.

mod composite_root;
mod dir_file;
mod readonly_file;
mod stdio;

pub use composite_root::CompositeRootFile;
pub use dir_file::DirFile;
pub use readonly_file::ReadOnlyFileHandle;
pub use stdio::{StdioFile, StdioKind};

use crate::net::{TcpConnFile, TcpListenerFile};
use crate::pflag::Pflag;
use crate::readdir::Readdir;
use crate::seek::SeekWhence;
use crate::stat::StatT;
use crate::timespec::TimeSpec;
use crate::Errno;

/// Every open handle this crate can produce. Per design note §9, this is a
/// sealed tagged union rather than a trait object: the set of handle kinds
/// is fixed by this crate, unlike [`crate::readonly_tree::ReadOnlyTree`]
/// which is the genuine host extension point.
pub enum File {
    /// A real host filesystem handle, opened by [`crate::fs::DirFS`].
    Dir(DirFile),
    /// A handle into a host-supplied [`crate::readonly_tree::ReadOnlyTree`].
    ReadOnly(ReadOnlyFileHandle),
    /// A standard stream (stdin/stdout/stderr).
    Stdio(StdioFile),
    /// A listening TCP socket.
    TcpListener(TcpListenerFile),
    /// A connected TCP socket.
    TcpConn(TcpConnFile),
    /// The root directory of a [`crate::fs::CompositeFS`], with sub-mount
    /// names spliced into its directory listing.
    CompositeRoot(Box<CompositeRootFile>),
}

/// Shared append/nonblock/cached-stat bookkeeping, composed into each
/// backend rather than inherited (design note §9: "decorator adapts
/// contract" — plain composition, no base class).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OpenState {
    append: bool,
    nonblock: bool,
    closed: bool,
    cached_type: Option<(crate::stat::FileType, u64)>,
}

impl OpenState {
    pub(crate) fn new(append: bool, nonblock: bool) -> OpenState {
        OpenState {
            append,
            nonblock,
            closed: false,
            cached_type: None,
        }
    }

    pub(crate) fn check_open(&self) -> Result<(), Errno> {
        if self.closed {
            Err(Errno::EBADF)
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_append(&self) -> bool {
        self.append
    }

    pub(crate) fn set_append(&mut self, on: bool) {
        self.append = on;
    }

    pub(crate) fn is_nonblock(&self) -> bool {
        self.nonblock
    }

    pub(crate) fn set_nonblock(&mut self, on: bool) {
        self.nonblock = on;
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn cache(&mut self, file_type: crate::stat::FileType, ino: u64) {
        self.cached_type = Some((file_type, ino));
    }

    pub(crate) fn invalidate_cache(&mut self) {
        self.cached_type = None;
    }

    pub(crate) fn cached(&self) -> Option<(crate::stat::FileType, u64)> {
        self.cached_type
    }
}

macro_rules! dispatch {
    ($self:ident, $variant_method:ident $(, $arg:expr)*) => {
        match $self {
            File::Dir(f) => f.$variant_method($($arg),*),
            File::ReadOnly(f) => f.$variant_method($($arg),*),
            File::Stdio(f) => f.$variant_method($($arg),*),
            File::TcpListener(f) => f.$variant_method($($arg),*),
            File::TcpConn(f) => f.$variant_method($($arg),*),
            File::CompositeRoot(f) => f.$variant_method($($arg),*),
        }
    };
}

impl File {
    /// Bridges the host's stdin, per spec §4.2 "Stdio streams".
    pub fn stdin() -> File {
        File::Stdio(StdioFile::new(StdioKind::Stdin))
    }

    /// Bridges the host's stdout.
    pub fn stdout() -> File {
        File::Stdio(StdioFile::new(StdioKind::Stdout))
    }

    /// Bridges the host's stderr.
    pub fn stderr() -> File {
        File::Stdio(StdioFile::new(StdioKind::Stderr))
    }

    /// Binds and listens on `addr`, per spec §4.7 `TCPListener`.
    pub fn tcp_listener(addr: std::net::SocketAddr) -> Result<File, Errno> {
        TcpListenerFile::bind(addr).map(File::TcpListener)
    }

    /// Connects to `addr`, per spec §4.7 `TCPConn`.
    pub fn tcp_connect(addr: std::net::SocketAddr) -> Result<File, Errno> {
        TcpConnFile::connect(addr).map(File::TcpConn)
    }

    /// Inode of the open file, `0` if unknown.
    pub fn ino(&self) -> u64 {
        dispatch!(self, ino)
    }

    /// True iff this handle refers to a directory.
    pub fn is_dir(&self) -> bool {
        dispatch!(self, is_dir)
    }

    /// Full metadata for this handle.
    pub fn stat(&mut self) -> Result<StatT, Errno> {
        dispatch!(self, stat)
    }

    /// Whether writes append to the end of the file.
    pub fn is_append(&self) -> bool {
        dispatch!(self, is_append)
    }

    /// Toggles append mode.
    pub fn set_append(&mut self, on: bool) -> Result<(), Errno> {
        dispatch!(self, set_append, on)
    }

    /// Whether this handle is in non-blocking mode.
    pub fn is_nonblock(&self) -> bool {
        dispatch!(self, is_nonblock)
    }

    /// Toggles non-blocking mode.
    pub fn set_nonblock(&mut self, on: bool) -> Result<(), Errno> {
        dispatch!(self, set_nonblock, on)
    }

    /// Reads into `buf`, returning the number of bytes read (`0` at EOF).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        if buf.is_empty() {
            return Ok(0);
        }
        dispatch!(self, read, buf)
    }

    /// Offset-positioned read; does not move the file position.
    pub fn pread(&mut self, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        if buf.is_empty() {
            return Ok(0);
        }
        if offset < 0 {
            return Err(Errno::EINVAL);
        }
        dispatch!(self, pread, buf, offset)
    }

    /// Writes `buf`, returning the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Errno> {
        if buf.is_empty() {
            return Ok(0);
        }
        dispatch!(self, write, buf)
    }

    /// Offset-positioned write; does not move the file position.
    pub fn pwrite(&mut self, buf: &[u8], offset: i64) -> Result<usize, Errno> {
        if buf.is_empty() {
            return Ok(0);
        }
        if offset < 0 {
            return Err(Errno::EINVAL);
        }
        dispatch!(self, pwrite, buf, offset)
    }

    /// Repositions the file offset.
    pub fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<i64, Errno> {
        dispatch!(self, seek, offset, whence)
    }

    /// Returns a directory-entry cursor. `ENOTDIR` on non-directories.
    pub fn readdir(&mut self) -> Result<Readdir, Errno> {
        dispatch!(self, readdir)
    }

    /// Truncates a regular file to `size` bytes.
    pub fn truncate(&mut self, size: i64) -> Result<(), Errno> {
        if size < 0 {
            return Err(Errno::EINVAL);
        }
        dispatch!(self, truncate, size)
    }

    /// Best-effort full durability sync.
    pub fn sync(&mut self) -> Result<(), Errno> {
        dispatch!(self, sync)
    }

    /// Best-effort data-only durability sync.
    pub fn datasync(&mut self) -> Result<(), Errno> {
        dispatch!(self, datasync)
    }

    /// Changes permission bits.
    pub fn chmod(&mut self, mode: u32) -> Result<(), Errno> {
        dispatch!(self, chmod, mode)
    }

    /// Changes owner/group; `-1` for either leaves it unchanged.
    pub fn chown(&mut self, uid: i64, gid: i64) -> Result<(), Errno> {
        dispatch!(self, chown, uid, gid)
    }

    /// Sets access/modification times, honoring `UTIME_NOW`/`UTIME_OMIT`.
    pub fn utimens(&mut self, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        dispatch!(self, utimens, atim, mtim)
    }

    /// Polls for readiness. Only `Pflag::POLLIN` is required to be
    /// supported; anything else is `ENOTSUP`.
    pub fn poll(&mut self, flag: Pflag, timeout_ms: i64) -> Result<bool, Errno> {
        if flag != Pflag::POLLIN {
            return Err(Errno::ENOTSUP);
        }
        dispatch!(self, poll, flag, timeout_ms)
    }

    /// Closes the handle. Idempotent: later calls return `Ok(())`.
    pub fn close(&mut self) -> Result<(), Errno> {
        dispatch!(self, close)
    }

    /// Returns the bound local address of a listening TCP socket. `ENOTSUP`
    /// on every other variant.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, Errno> {
        match self {
            File::TcpListener(l) => l.local_addr(),
            _ => Err(Errno::ENOTSUP),
        }
    }

    /// Accepts a pending connection on a listening TCP socket. `ENOTSUP` on
    /// every other variant.
    pub fn accept(&mut self) -> Result<File, Errno> {
        match self {
            File::TcpListener(l) => l.accept().map(File::TcpConn),
            _ => Err(Errno::ENOTSUP),
        }
    }

    /// Shuts down one or both halves of a connected TCP socket. `ENOTSUP` on
    /// every other variant.
    pub fn shutdown(&mut self, how: crate::net::ShutdownHow) -> Result<(), Errno> {
        match self {
            File::TcpConn(c) => c.shutdown(how),
            _ => Err(Errno::ENOTSUP),
        }
    }

    /// Peeks at the next `buf.len()` bytes of a connected TCP socket without
    /// consuming them (`recvfrom(..., MSG_PEEK)`). `ENOTSUP` on every other
    /// variant.
    pub fn recv_peek(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        match self {
            File::TcpConn(c) => c.recv_peek(buf),
            _ => Err(Errno::ENOTSUP),
        }
    }
}
