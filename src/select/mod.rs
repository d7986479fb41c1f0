//! Multi-handle readiness waits, per spec §5. `FS`-level `select` takes a
//! batch of `File` borrows and waits for the first one to become readable,
//! rather than the caller looping over single-handle [`crate::File::poll`]
//! calls itself.

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(windows)]
pub(crate) mod windows;

use crate::file::File;
use crate::Errno;

/// Waits for at least one of `files` to become readable, or `timeout_ms` to
/// elapse (negative blocks forever). Returns a bitmask-free vector of the
/// indices (into `files`) that were ready when the wait returned. An empty
/// result means the timeout elapsed with nothing ready.
pub fn select_readable(files: &mut [&mut File], timeout_ms: i64) -> Result<Vec<usize>, Errno> {
    if files.is_empty() {
        return Err(Errno::EINVAL);
    }
    #[cfg(unix)]
    {
        unix::select_readable(files, timeout_ms)
    }
    #[cfg(windows)]
    {
        windows::select_readable(files, timeout_ms)
    }
}
