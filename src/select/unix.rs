//! Unix multi-handle wait. Builds directly on `nix::poll::poll` (the same
//! primitive [`crate::poll::unix`] uses for a single fd) rather than
//! `select(2)`'s fixed-size fd-set, since the crate already requires a
//! poll-capable platform.

use std::os::fd::{AsFd, BorrowedFd};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::errno::unwrap_os_error;
use crate::file::File;
use crate::net::{TcpConnFile, TcpListenerFile};
use crate::Errno;

pub(crate) fn select_readable(files: &mut [&mut File], timeout_ms: i64) -> Result<Vec<usize>, Errno> {
    // Handles with no underlying fd (an in-memory read-only tree, a regular
    // file or directory, stdout/stderr) are always ready; report them
    // immediately without waiting on the fd-backed handles at all.
    let mut always_ready = Vec::new();
    let mut waitable: Vec<(usize, BorrowedFd<'_>)> = Vec::new();
    for (i, f) in files.iter().enumerate() {
        match fd_of(f) {
            Some(fd) => waitable.push((i, fd)),
            None => always_ready.push(i),
        }
    }
    if !always_ready.is_empty() {
        return Ok(always_ready);
    }
    if waitable.is_empty() {
        return Ok(Vec::new());
    }

    let mut pollfds: Vec<PollFd> = waitable
        .iter()
        .map(|(_, fd)| PollFd::new(*fd, PollFlags::POLLIN))
        .collect();
    let timeout = to_poll_timeout(timeout_ms);
    let n = poll(&mut pollfds, timeout)
        .map_err(|e| unwrap_os_error(&std::io::Error::from_raw_os_error(e as i32)))?;
    if n == 0 {
        return Ok(Vec::new());
    }
    let ready = pollfds
        .iter()
        .zip(waitable.iter())
        .filter(|(pfd, _)| {
            pfd.revents()
                .map(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
                .unwrap_or(false)
        })
        .map(|(_, (i, _))| *i)
        .collect();
    Ok(ready)
}

fn fd_of<'a>(file: &'a File) -> Option<BorrowedFd<'a>> {
    match file {
        File::Dir(_) | File::ReadOnly(_) | File::CompositeRoot(_) => None,
        File::Stdio(s) => stdio_fd(s),
        File::TcpListener(l) => Some(listener_fd(l)),
        File::TcpConn(c) => Some(conn_fd(c)),
    }
}

fn stdio_fd(s: &crate::file::StdioFile) -> Option<BorrowedFd<'_>> {
    s.stdin_fd()
}

fn listener_fd(l: &TcpListenerFile) -> BorrowedFd<'_> {
    l.listener_ref().as_fd()
}

fn conn_fd(c: &TcpConnFile) -> BorrowedFd<'_> {
    c.stream_ref().as_fd()
}

fn to_poll_timeout(timeout_ms: i64) -> PollTimeout {
    if timeout_ms < 0 {
        PollTimeout::NONE
    } else {
        PollTimeout::try_from(timeout_ms.min(i32::MAX as i64) as u32).unwrap_or(PollTimeout::MAX)
    }
}
