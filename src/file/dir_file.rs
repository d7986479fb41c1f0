//! [`DirFile`]: an open handle into a real host directory tree, backing
//! [`crate::fs::DirFS`]. This is the File variant every other backend is
//! judged against, since it is the one with real OS semantics to get right.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use parking_lot::Mutex;

use crate::errno::unwrap_os_error;
use crate::pflag::Pflag;
use crate::readdir::Readdir;
use crate::seek::SeekWhence;
use crate::stat::{Dirent, FileType, StatT};
use crate::sys::{self, RootHandle};
use crate::timespec::TimeSpec;
use crate::Errno;

use super::OpenState;

pub struct DirFile {
    root: Arc<RootHandle>,
    rel: PathBuf,
    file: std::fs::File,
    state: OpenState,
}

impl DirFile {
    pub(crate) fn new(
        root: Arc<RootHandle>,
        rel: PathBuf,
        handle: sys::RawHandle,
        append: bool,
        nonblock: bool,
    ) -> Result<DirFile, Errno> {
        let file = into_std_file(handle);
        let mut state = OpenState::new(append, nonblock);
        let st = sys::fstat(sys::handle_ref(&file))?;
        let (file_type, ino) = sys::type_and_ino(&st);
        state.cache(file_type, ino);
        Ok(DirFile {
            root,
            rel,
            file,
            state,
        })
    }

    fn is_dir_cached(&self) -> bool {
        matches!(
            self.state.cached(),
            Some((FileType::Directory, _))
        )
    }

    pub(crate) fn ino(&self) -> u64 {
        self.state.cached().map(|(_, ino)| ino).unwrap_or(0)
    }

    pub(crate) fn is_dir(&self) -> bool {
        self.is_dir_cached()
    }

    pub(crate) fn stat(&mut self) -> Result<StatT, Errno> {
        self.state.check_open()?;
        let st = sys::fstat(sys::handle_ref(&self.file))?;
        let (file_type, ino) = sys::type_and_ino(&st);
        self.state.cache(file_type, ino);
        Ok(st)
    }

    pub(crate) fn is_append(&self) -> bool {
        self.state.is_append()
    }

    pub(crate) fn set_append(&mut self, on: bool) -> Result<(), Errno> {
        self.state.check_open()?;
        self.state.set_append(on);
        Ok(())
    }

    pub(crate) fn is_nonblock(&self) -> bool {
        self.state.is_nonblock()
    }

    pub(crate) fn set_nonblock(&mut self, on: bool) -> Result<(), Errno> {
        self.state.check_open()?;
        sys::set_nonblock(sys::handle_ref(&self.file), on)?;
        self.state.set_nonblock(on);
        Ok(())
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        if self.is_dir_cached() {
            return Err(Errno::EISDIR);
        }
        self.file.read(buf).map_err(|e| unwrap_os_error(&e))
    }

    pub(crate) fn pread(&mut self, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
        self.state.check_open()?;
        if self.is_dir_cached() {
            return Err(Errno::EISDIR);
        }
        pread_impl(&self.file, buf, offset)
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<usize, Errno> {
        self.state.check_open()?;
        if self.is_dir_cached() {
            return Err(Errno::EISDIR);
        }
        if self.state.is_append() {
            self.file
                .seek(SeekFrom::End(0))
                .map_err(|e| unwrap_os_error(&e))?;
        }
        self.file.write(buf).map_err(|e| unwrap_os_error(&e))
    }

    pub(crate) fn pwrite(&mut self, buf: &[u8], offset: i64) -> Result<usize, Errno> {
        self.state.check_open()?;
        if self.is_dir_cached() {
            return Err(Errno::EISDIR);
        }
        if self.state.is_append() {
            self.file
                .seek(SeekFrom::End(0))
                .map_err(|e| unwrap_os_error(&e))?;
            self.file.write(buf).map_err(|e| unwrap_os_error(&e))
        } else {
            pwrite_impl(&self.file, buf, offset)
        }
    }

    pub(crate) fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<i64, Errno> {
        self.state.check_open()?;
        if whence == SeekWhence::Start && offset < 0 {
            return Err(Errno::EINVAL);
        }
        let from = match whence {
            SeekWhence::Start => SeekFrom::Start(offset as u64),
            SeekWhence::Current => SeekFrom::Current(offset),
            SeekWhence::End => SeekFrom::End(offset),
        };
        self.file
            .seek(from)
            .map(|pos| pos as i64)
            .map_err(|e| unwrap_os_error(&e))
    }

    pub(crate) fn readdir(&mut self) -> Result<Readdir, Errno> {
        self.state.check_open()?;
        if !self.is_dir_cached() {
            return Err(Errno::ENOTDIR);
        }
        let root = Arc::clone(&self.root);
        let rel = self.rel.clone();

        #[cfg(unix)]
        {
            let shared: Arc<Mutex<Option<nix::dir::Dir>>> = Arc::new(Mutex::new(None));

            let init: crate::readdir::InitFn = {
                let root = Arc::clone(&root);
                let rel = rel.clone();
                let shared = Arc::clone(&shared);
                Box::new(move || {
                    let dir = sys::opendir_at(sys::root_ref(&root), &rel)?;
                    *shared.lock() = Some(dir);
                    Ok(())
                })
            };
            let fetch: crate::readdir::FetchFn = {
                let shared = Arc::clone(&shared);
                Box::new(move |n: usize| {
                    let mut guard = shared.lock();
                    let dir = guard.as_mut().ok_or(Errno::EBADF)?;
                    let mut batch = Vec::new();
                    for entry in dir.iter() {
                        let entry = entry.map_err(|e| {
                            unwrap_os_error(&std::io::Error::from_raw_os_error(e as i32))
                        })?;
                        let name = entry.file_name().to_string_lossy().into_owned();
                        if name == "." || name == ".." {
                            continue;
                        }
                        let file_type = entry
                            .file_type()
                            .map(dirent_type_from_nix)
                            .unwrap_or(FileType::Irregular);
                        batch.push(Dirent {
                            ino: entry.ino(),
                            name,
                            file_type,
                        });
                        if batch.len() >= n {
                            break;
                        }
                    }
                    Ok(batch)
                })
            };
            let close: crate::readdir::CloseFn = {
                let shared = Arc::clone(&shared);
                Box::new(move || {
                    *shared.lock() = None;
                    Ok(())
                })
            };
            Readdir::windowed(init, fetch, close)
        }

        #[cfg(windows)]
        {
            let shared: Arc<Mutex<Option<sys::WinDirStream>>> = Arc::new(Mutex::new(None));

            let init: crate::readdir::InitFn = {
                let root = Arc::clone(&root);
                let rel = rel.clone();
                let shared = Arc::clone(&shared);
                Box::new(move || {
                    let stream = sys::WinDirStream::open(&root, &rel)?;
                    *shared.lock() = Some(stream);
                    Ok(())
                })
            };
            let fetch: crate::readdir::FetchFn = {
                let shared = Arc::clone(&shared);
                Box::new(move |n: usize| {
                    let mut guard = shared.lock();
                    let stream = guard.as_mut().ok_or(Errno::EBADF)?;
                    let mut batch = Vec::new();
                    while batch.len() < n {
                        match stream.next_entry()? {
                            Some(d) => batch.push(d),
                            None => break,
                        }
                    }
                    Ok(batch)
                })
            };
            let close: crate::readdir::CloseFn = {
                let shared = Arc::clone(&shared);
                Box::new(move || {
                    *shared.lock() = None;
                    Ok(())
                })
            };
            Readdir::windowed(init, fetch, close)
        }
    }

    pub(crate) fn truncate(&mut self, size: i64) -> Result<(), Errno> {
        self.state.check_open()?;
        if self.is_dir_cached() {
            return Err(Errno::EISDIR);
        }
        sys::ftruncate(sys::handle_ref(&self.file), size)
    }

    pub(crate) fn sync(&mut self) -> Result<(), Errno> {
        self.state.check_open()?;
        sys::fsync(sys::handle_ref(&self.file))
    }

    pub(crate) fn datasync(&mut self) -> Result<(), Errno> {
        self.state.check_open()?;
        sys::fdatasync(sys::handle_ref(&self.file))
    }

    pub(crate) fn chmod(&mut self, mode: u32) -> Result<(), Errno> {
        self.state.check_open()?;
        sys::fchmod(sys::handle_ref(&self.file), mode)
    }

    pub(crate) fn chown(&mut self, uid: i64, gid: i64) -> Result<(), Errno> {
        self.state.check_open()?;
        sys::fchown(sys::handle_ref(&self.file), uid, gid)
    }

    pub(crate) fn utimens(&mut self, atim: TimeSpec, mtim: TimeSpec) -> Result<(), Errno> {
        self.state.check_open()?;
        sys::futimens(sys::handle_ref(&self.file), atim, mtim)
    }

    pub(crate) fn poll(&mut self, _flag: Pflag, _timeout_ms: i64) -> Result<bool, Errno> {
        self.state.check_open()?;
        // Regular files and directories are always "ready": POSIX `poll`
        // treats them as immediately readable, and this crate never blocks
        // on disk I/O the way it can on a pipe or socket.
        Ok(true)
    }

    pub(crate) fn close(&mut self) -> Result<(), Errno> {
        self.state.close();
        Ok(())
    }
}

fn into_std_file(handle: sys::RawHandle) -> std::fs::File {
    std::fs::File::from(handle)
}

#[cfg(unix)]
fn pread_impl(file: &std::fs::File, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset as u64)
        .map_err(|e| unwrap_os_error(&e))
}

#[cfg(windows)]
fn pread_impl(file: &std::fs::File, buf: &mut [u8], offset: i64) -> Result<usize, Errno> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset as u64)
        .map_err(|e| unwrap_os_error(&e))
}

#[cfg(unix)]
fn pwrite_impl(file: &std::fs::File, buf: &[u8], offset: i64) -> Result<usize, Errno> {
    use std::os::unix::fs::FileExt;
    file.write_at(buf, offset as u64)
        .map_err(|e| unwrap_os_error(&e))
}

#[cfg(windows)]
fn pwrite_impl(file: &std::fs::File, buf: &[u8], offset: i64) -> Result<usize, Errno> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buf, offset as u64)
        .map_err(|e| unwrap_os_error(&e))
}

#[cfg(unix)]
fn dirent_type_from_nix(t: nix::dir::Type) -> FileType {
    match t {
        nix::dir::Type::Directory => FileType::Directory,
        nix::dir::Type::Symlink => FileType::Symlink,
        nix::dir::Type::Fifo => FileType::NamedPipe,
        nix::dir::Type::Socket => FileType::Socket,
        nix::dir::Type::File => FileType::RegularFile,
        _ => FileType::Irregular,
    }
}
