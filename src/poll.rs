//! Single-handle `poll`, per spec §4.6. This is the primitive that
//! [`crate::File::poll`] and the stdin bridge both reduce to; multi-handle
//! `select` (spec §5) is built on top of it in [`crate::select`].

use crate::Errno;

/// Blocks up to `timeout_ms` (negative means "forever") waiting for stdin to
/// become readable, returning whether it is.
pub(crate) fn poll_stdin(timeout_ms: i64) -> Result<bool, Errno> {
    #[cfg(unix)]
    {
        unix::poll_readable(0, timeout_ms)
    }
    #[cfg(windows)]
    {
        windows::poll_stdin_readable(timeout_ms)
    }
}

#[cfg(unix)]
pub(crate) mod unix {
    use std::os::fd::{AsRawFd, BorrowedFd, RawFd};

    use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

    use crate::errno::unwrap_os_error;
    use crate::Errno;

    /// Polls a raw fd for readability. Used both by the stdin bridge (via
    /// fd `0`) and by [`crate::file::dir_file::DirFile::poll`]-adjacent
    /// socket backends in [`crate::net`].
    pub(crate) fn poll_readable(fd: RawFd, timeout_ms: i64) -> Result<bool, Errno> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        poll_readable_fd(borrowed, timeout_ms)
    }

    pub(crate) fn poll_readable_fd(fd: BorrowedFd<'_>, timeout_ms: i64) -> Result<bool, Errno> {
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let timeout = to_poll_timeout(timeout_ms);
        let n = poll(&mut fds, timeout).map_err(|e| {
            unwrap_os_error(&std::io::Error::from_raw_os_error(e as i32))
        })?;
        Ok(n > 0)
    }

    fn to_poll_timeout(timeout_ms: i64) -> PollTimeout {
        if timeout_ms < 0 {
            PollTimeout::NONE
        } else {
            PollTimeout::try_from(timeout_ms.min(i32::MAX as i64) as u32)
                .unwrap_or(PollTimeout::MAX)
        }
    }

    #[allow(unused)]
    pub(crate) fn raw_fd_of(fd: BorrowedFd<'_>) -> RawFd {
        fd.as_raw_fd()
    }
}

#[cfg(windows)]
pub(crate) mod windows {
    use std::os::windows::io::AsRawHandle;
    use std::time::{Duration, Instant};

    use windows_sys::Win32::Storage::FileSystem::PeekNamedPipe;
    use windows_sys::Win32::System::Console::GetStdHandle;
    use windows_sys::Win32::System::Console::STD_INPUT_HANDLE;

    use crate::Errno;

    /// Polls stdin for readability by peeking its pipe/console buffer in a
    /// short sleep loop. Windows has no single syscall that waits on both
    /// console input and a redirected-pipe stdin the way `poll(2)` does, so
    /// this ticks rather than blocking in one host call — the same
    /// trade-off `crate::select::windows` makes for multi-handle waits.
    pub(crate) fn poll_stdin_readable(timeout_ms: i64) -> Result<bool, Errno> {
        let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
        let deadline = if timeout_ms < 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_millis(timeout_ms as u64))
        };
        loop {
            let mut available: u32 = 0;
            let ok = unsafe {
                PeekNamedPipe(
                    handle,
                    std::ptr::null_mut(),
                    0,
                    std::ptr::null_mut(),
                    &mut available,
                    std::ptr::null_mut(),
                )
            };
            if ok != 0 && available > 0 {
                return Ok(true);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(false);
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[allow(unused)]
    fn _handle_shape_check(h: &std::fs::File) {
        let _ = h.as_raw_handle();
    }
}
