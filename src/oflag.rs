//! Flags accepted by [`crate::FS::open_file`], per spec §3.

use std::fmt::Display;
use std::fmt::Formatter;

use bitflags::bitflags;

use crate::Errno;

bitflags! {
    /// Portable `open(2)`-style flags. Access mode (`RDONLY`/`WRONLY`/`RDWR`)
    /// is encoded as two low bits rather than libc's non-orthogonal
    /// `O_ACCMODE` scheme, so [`Oflag::access_mode`] can reject ambiguous
    /// combinations instead of silently picking one.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
    pub struct Oflag: u32 {
        /// Open for reading only.
        const RDONLY = 1 << 0;
        /// Open for writing only.
        const WRONLY = 1 << 1;
        /// Open for reading and writing.
        const RDWR = 1 << 2;
        /// Each write appends to the end of the file.
        const APPEND = 1 << 3;
        /// Create the file if it does not exist.
        const CREAT = 1 << 4;
        /// Fail with `EEXIST` if `CREAT` and the file already exists.
        const EXCL = 1 << 5;
        /// Truncate an existing regular file to zero length.
        const TRUNC = 1 << 6;
        /// Request synchronized I/O file integrity completion.
        const SYNC = 1 << 7;
        /// Request synchronized I/O data integrity completion.
        const DSYNC = 1 << 8;
        /// Request synchronized read integrity completion.
        const RSYNC = 1 << 9;
        /// Fail unless the target is a directory.
        const DIRECTORY = 1 << 10;
        /// Fail with `ELOOP` if the target is a symlink.
        const NOFOLLOW = 1 << 11;
        /// Open in non-blocking mode.
        const NONBLOCK = 1 << 12;
    }
}

/// File access mode requested by an [`Oflag`] value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AccessMode {
    /// Read-only.
    ReadOnly,
    /// Write-only.
    WriteOnly,
    /// Read and write.
    ReadWrite,
}

impl AccessMode {
    /// True if this access mode permits writing.
    pub fn writable(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }

    /// True if this access mode permits reading.
    pub fn readable(self) -> bool {
        !matches!(self, AccessMode::WriteOnly)
    }
}

impl Oflag {
    /// Resolves the access-mode bits, rejecting a set containing more than
    /// one of `RDONLY`/`WRONLY`/`RDWR` (they are mutually exclusive per
    /// spec §3). Absence of all three is treated as `RDONLY`, matching the
    /// "unknown bits map to O_RDONLY" rule in spec §4.2 step 2.
    pub fn access_mode(self) -> Result<AccessMode, Errno> {
        let bits = self & (Oflag::RDONLY | Oflag::WRONLY | Oflag::RDWR);
        match bits.bits().count_ones() {
            0 => Ok(AccessMode::ReadOnly),
            1 if bits.contains(Oflag::RDONLY) => Ok(AccessMode::ReadOnly),
            1 if bits.contains(Oflag::WRONLY) => Ok(AccessMode::WriteOnly),
            1 if bits.contains(Oflag::RDWR) => Ok(AccessMode::ReadWrite),
            _ => Err(Errno::EINVAL),
        }
    }

    /// Rejects `O_DIRECTORY` combined with a writable access mode, per spec
    /// §4.2 step 1: this check happens before any syscall is issued.
    pub fn check_directory_write_conflict(self) -> Result<(), Errno> {
        if self.contains(Oflag::DIRECTORY) {
            let mode = self.access_mode()?;
            if mode.writable() {
                return Err(Errno::EISDIR);
            }
        }
        Ok(())
    }
}

impl Display for Oflag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.bits(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ambiguous_access_mode() {
        let flags = Oflag::RDONLY | Oflag::WRONLY;
        assert_eq!(flags.access_mode(), Err(Errno::EINVAL));
    }

    #[test]
    fn defaults_to_read_only() {
        assert_eq!(Oflag::CREAT.access_mode(), Ok(AccessMode::ReadOnly));
    }

    #[test]
    fn directory_with_write_is_rejected_up_front() {
        let flags = Oflag::DIRECTORY | Oflag::RDWR;
        assert_eq!(
            flags.check_directory_write_conflict(),
            Err(Errno::EISDIR)
        );
    }

    #[test]
    fn directory_read_only_is_fine() {
        let flags = Oflag::DIRECTORY | Oflag::RDONLY;
        assert_eq!(flags.check_directory_write_conflict(), Ok(()));
    }
}
