//! Sandboxed POSIX-like filesystem and I/O core for a WebAssembly host.
//!
//! This crate presents a uniform file/directory/socket abstraction to a
//! WASI-style syscall translator: a closed [`Errno`] enumeration, a
//! sealed [`File`] handle type, and a sealed [`fs::FS`] backend type with
//! four implementations — a real host directory ([`fs::DirFS`]), an
//! adapter over a host-supplied read-only tree ([`fs::AdaptFS`]), a
//! read-only decorator ([`fs::ReadFS`]), and an overlay
//! ([`fs::CompositeFS`]). TCP sockets, pipes, and standard streams are
//! exposed through the same `File` contract as regular files.
//!
//! Everything OS-specific — `openat`/`fstatat` on Unix, `CreateFileW` and
//! friends on Windows — lives behind [`sys`] and is never visible above
//! the `fs`/`file` module boundary.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod errno;
mod file;
mod fs;
mod net;
mod oflag;
mod pflag;
mod poll;
mod readdir;
mod readonly_tree;
mod seek;
mod select;
mod stat;
mod sys;
mod timespec;

pub use crate::errno::Errno;
pub use crate::file::{File, StdioKind};
pub use crate::fs::{AdaptFS, CompositeFS, DirFS, DirFsOptions, ReadFS, FS};
pub use crate::net::ShutdownHow;
pub use crate::oflag::{AccessMode, Oflag};
pub use crate::pflag::Pflag;
pub use crate::readdir::{Readdir, DIRENT_BUF_SIZE};
pub use crate::readonly_tree::{ReadOnlyFile, ReadOnlyTree};
pub use crate::seek::SeekWhence;
pub use crate::select::select_readable;
pub use crate::stat::{Dirent, FileMode, FileType, StatT};
pub use crate::timespec::{TimeSpec, UTIME_NOW, UTIME_OMIT};
