//! The open extension point for component (b) in spec §1: "an in-memory /
//! read-only file tree exposed through a generic read-only interface".
//!
//! Everything else this crate ships (`DirFS`, `ReadFS`, `CompositeFS`, the
//! `File` enum) is a closed set implemented entirely inside this crate, in
//! the spirit of design note §9 ("no inheritance: implement `File` and `FS`
//! as sealed tagged unions"). `ReadOnlyTree`/`ReadOnlyFile` are the one
//! deliberate exception: the embedding host supplies its own tree (an
//! in-memory asset bundle, a read-only archive, ...), so this boundary has
//! to be a real object-safe trait.

use std::any::Any;

use crate::readdir::Readdir;
use crate::seek::SeekWhence;
use crate::stat::StatT;
use crate::Errno;

/// A read-only file tree keyed by cleaned, `/`-relative names, as consumed
/// by [`crate::fs::AdaptFS`].
pub trait ReadOnlyTree: Send + Sync {
    /// Opens `name` (already cleaned: no leading `/`, no `..` escapes).
    fn open(&self, name: &str) -> Result<Box<dyn ReadOnlyFile>, Errno>;

    /// Metadata for `name`, without opening it.
    fn stat(&self, name: &str) -> Result<StatT, Errno>;

    /// Directory listing for `name`.
    fn readdir(&self, name: &str) -> Result<Readdir, Errno>;

    /// Hook for "hacked writes" (spec §4.4): a tree that is secretly backed
    /// by a real writable directory can expose itself here so
    /// [`crate::fs::AdaptFS`] can downcast and pass mutating operations
    /// through instead of returning `ENOSYS`. Trees with no such backing
    /// return `self` cast to `&dyn Any`, which downcasts to nothing useful.
    fn as_any(&self) -> &dyn Any;
}

/// A single open file handle from a [`ReadOnlyTree`].
pub trait ReadOnlyFile: Send {
    /// Reads at the current position, advancing it.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno>;

    /// Reads at `offset` without touching the current position.
    fn pread(&self, buf: &mut [u8], offset: i64) -> Result<usize, Errno>;

    /// Repositions the current offset.
    fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<i64, Errno>;

    /// Metadata for this open handle.
    fn stat(&self) -> Result<StatT, Errno>;
}
