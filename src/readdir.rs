//! The directory-entry cursor, per spec §4.3.
//!
//! `Readdir` is a sealed tagged union (design note §9: "no inheritance"),
//! not a trait object — the four variants share identical behavior but
//! differ enough in storage (none, an owned slice, two nested cursors, a
//! lazily-refilled window) that a `match` reads more plainly than a vtable.

use smallvec::SmallVec;

use crate::stat::Dirent;
use crate::Errno;

/// Size of the lazily-fetched window held by the windowed cursor variant.
pub const DIRENT_BUF_SIZE: usize = 16;

/// A closure that (re)opens the backing directory from scratch, used by the
/// windowed cursor to implement `rewind(0)` without a back-pointer to its
/// owning [`crate::File`] (design note §9, "cyclic references").
pub type InitFn = Box<dyn FnMut() -> Result<(), Errno> + Send>;
/// A closure that fetches up to `n` more entries from the current position,
/// returning fewer than `n` (possibly zero) at end of stream.
pub type FetchFn = Box<dyn FnMut(usize) -> Result<Vec<Dirent>, Errno> + Send>;
/// A closure that releases any resources the windowed cursor holds open.
pub type CloseFn = Box<dyn FnMut() -> Result<(), Errno> + Send>;

/// Rewindable, lazily-fetched directory-entry cursor. See spec §3 and §4.3
/// for the exact contract of each operation.
pub enum Readdir {
    /// Always-empty cursor (e.g. a freshly-created directory).
    Empty,
    /// Eagerly materialized list of entries (used for synthesized listings,
    /// e.g. composite-FS sub-mount names).
    Slice(SliceCursor),
    /// `a` presented first, then `b` (used to splice synthesized entries
    /// ahead of a backend's own listing).
    Concat(Box<Readdir>, Box<Readdir>, ConcatPhase),
    /// Lazily fetched, windowed cursor over a real directory handle.
    Windowed(WindowedCursor),
}

/// Which side of a [`Readdir::Concat`] is currently being drained.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConcatPhase {
    /// Still presenting `a`.
    A,
    /// `a` is exhausted; presenting `b`.
    B,
}

impl Readdir {
    /// Builds an eagerly materialized cursor over `dirents`.
    pub fn from_slice(dirents: Vec<Dirent>) -> Readdir {
        Readdir::Slice(SliceCursor { dirents, cursor: 0 })
    }

    /// Builds a cursor presenting `a`'s entries before `b`'s.
    pub fn concat(a: Readdir, b: Readdir) -> Readdir {
        Readdir::Concat(Box::new(a), Box::new(b), ConcatPhase::A)
    }

    /// Builds a lazily-fetched, windowed cursor. `init` is called on
    /// construction and on every `rewind(0)`.
    pub fn windowed(mut init: InitFn, fetch: FetchFn, close: CloseFn) -> Result<Readdir, Errno> {
        init()?;
        Ok(Readdir::Windowed(WindowedCursor {
            cursor: 0,
            window_start: 0,
            window: SmallVec::new(),
            window_pos: 0,
            exhausted: false,
            init,
            fetch,
            close,
        }))
    }

    /// Current logical position: the number of entries returned so far that
    /// haven't been un-wound by a `rewind` call.
    pub fn offset(&self) -> u64 {
        match self {
            Readdir::Empty => 0,
            Readdir::Slice(s) => s.cursor as u64,
            Readdir::Concat(a, b, _) => a.offset() + b.offset(),
            Readdir::Windowed(w) => w.cursor,
        }
    }

    /// Total number of entries, if known without draining the cursor.
    /// [`Readdir::Windowed`] never knows this up front.
    fn total_hint(&self) -> Option<u64> {
        match self {
            Readdir::Empty => Some(0),
            Readdir::Slice(s) => Some(s.dirents.len() as u64),
            Readdir::Concat(a, b, _) => Some(a.total_hint()? + b.total_hint()?),
            Readdir::Windowed(_) => None,
        }
    }

    /// Returns the next entry, or `Err(Errno::ENOENT)` as the end-of-stream
    /// sentinel (not a real error — see spec §3).
    pub fn next(&mut self) -> Result<Dirent, Errno> {
        match self {
            Readdir::Empty => Err(Errno::ENOENT),
            Readdir::Slice(s) => s.next(),
            Readdir::Concat(a, b, phase) => match phase {
                ConcatPhase::A => match a.next() {
                    Ok(d) => Ok(d),
                    Err(Errno::ENOENT) => {
                        *phase = ConcatPhase::B;
                        b.next()
                    }
                    Err(e) => Err(e),
                },
                ConcatPhase::B => b.next(),
            },
            Readdir::Windowed(w) => w.next(),
        }
    }

    /// Rewinds to logical position `offset`. See spec §3/§4.3 for the exact
    /// success/failure rules per variant.
    pub fn rewind(&mut self, offset: u64) -> Result<(), Errno> {
        match self {
            Readdir::Empty => {
                if offset == 0 {
                    Ok(())
                } else {
                    Err(Errno::EINVAL)
                }
            }
            Readdir::Slice(s) => s.rewind(offset),
            Readdir::Concat(a, b, phase) => {
                let a_total = a.total_hint();
                match a_total {
                    Some(total) if offset > total => {
                        *phase = ConcatPhase::B;
                        b.rewind(offset - total)
                    }
                    Some(_) => {
                        *phase = ConcatPhase::A;
                        b.rewind(0)?;
                        a.rewind(offset)
                    }
                    None => {
                        if offset == 0 {
                            *phase = ConcatPhase::A;
                            b.rewind(0)?;
                            a.rewind(0)
                        } else if *phase == ConcatPhase::A && offset <= a.offset() {
                            a.rewind(offset)
                        } else {
                            Err(Errno::ENOSYS)
                        }
                    }
                }
            }
            Readdir::Windowed(w) => w.rewind(offset),
        }
    }

    /// Releases resources held by the cursor. Idempotent the same way
    /// `File::close` is: repeated calls return `Ok(())`.
    pub fn close(&mut self) -> Result<(), Errno> {
        match self {
            Readdir::Empty | Readdir::Slice(_) => Ok(()),
            Readdir::Concat(a, b, _) => {
                let ra = a.close();
                let rb = b.close();
                ra.and(rb)
            }
            Readdir::Windowed(w) => (w.close)(),
        }
    }
}

/// Eagerly materialized cursor backing [`Readdir::Slice`].
pub struct SliceCursor {
    dirents: Vec<Dirent>,
    cursor: usize,
}

impl SliceCursor {
    fn next(&mut self) -> Result<Dirent, Errno> {
        match self.dirents.get(self.cursor) {
            Some(d) => {
                let d = d.clone();
                self.cursor += 1;
                Ok(d)
            }
            None => Err(Errno::ENOENT),
        }
    }

    fn rewind(&mut self, offset: u64) -> Result<(), Errno> {
        if offset as usize <= self.cursor {
            self.cursor = offset as usize;
            Ok(())
        } else {
            Err(Errno::EINVAL)
        }
    }
}

/// Lazily-fetched cursor backing [`Readdir::Windowed`].
pub struct WindowedCursor {
    cursor: u64,
    window_start: u64,
    window: SmallVec<[Dirent; DIRENT_BUF_SIZE]>,
    window_pos: usize,
    exhausted: bool,
    init: InitFn,
    fetch: FetchFn,
    close: CloseFn,
}

impl WindowedCursor {
    fn next(&mut self) -> Result<Dirent, Errno> {
        if self.window_pos < self.window.len() {
            let d = self.window[self.window_pos].clone();
            self.window_pos += 1;
            self.cursor += 1;
            return Ok(d);
        }
        if self.exhausted {
            return Err(Errno::ENOENT);
        }
        let fetched = (self.fetch)(DIRENT_BUF_SIZE)?;
        if fetched.is_empty() {
            self.exhausted = true;
            return Err(Errno::ENOENT);
        }
        self.window_start = self.cursor;
        self.window = fetched.into_iter().collect();
        self.window_pos = 0;
        self.next()
    }

    fn rewind(&mut self, offset: u64) -> Result<(), Errno> {
        if offset > self.cursor {
            return Err(Errno::EINVAL);
        }
        if offset == 0 {
            (self.init)()?;
            self.cursor = 0;
            self.window_start = 0;
            self.window.clear();
            self.window_pos = 0;
            self.exhausted = false;
            return Ok(());
        }
        if offset >= self.window_start && offset < self.window_start + self.window.len() as u64 {
            self.window_pos = (offset - self.window_start) as usize;
            self.cursor = offset;
            return Ok(());
        }
        // Special case: stepping back exactly one entry across a batch
        // boundary is allowed, by reconstructing the cursor from scratch.
        if self.window_start > 0 && offset == self.window_start - 1 {
            return self.replay_to(offset);
        }
        Err(Errno::ENOSYS)
    }

    /// Reopens the backing directory and replays `next()` up to `target`,
    /// used only for the one-batch-back special case in `rewind`.
    fn replay_to(&mut self, target: u64) -> Result<(), Errno> {
        (self.init)()?;
        self.cursor = 0;
        self.window_start = 0;
        self.window.clear();
        self.window_pos = 0;
        self.exhausted = false;
        while self.cursor < target {
            match self.next() {
                Ok(_) => {}
                Err(Errno::ENOENT) => return Err(Errno::ENOSYS),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirent(name: &str) -> Dirent {
        Dirent {
            ino: 0,
            name: name.to_string(),
            file_type: crate::stat::FileType::RegularFile,
        }
    }

    #[test]
    fn empty_cursor_is_exhausted_immediately() {
        let mut r = Readdir::Empty;
        assert_eq!(r.offset(), 0);
        assert_eq!(r.next(), Err(Errno::ENOENT));
        assert_eq!(r.rewind(0), Ok(()));
    }

    #[test]
    fn slice_cursor_advances_and_exhausts() {
        let mut r = Readdir::from_slice(vec![dirent("a"), dirent("b")]);
        assert_eq!(r.next().unwrap().name, "a");
        assert_eq!(r.offset(), 1);
        assert_eq!(r.next().unwrap().name, "b");
        assert_eq!(r.next(), Err(Errno::ENOENT));
        // Exhaustion is sticky until rewind(0).
        assert_eq!(r.next(), Err(Errno::ENOENT));
    }

    #[test]
    fn slice_rewind_forward_is_rejected() {
        let mut r = Readdir::from_slice(vec![dirent("a"), dirent("b")]);
        assert_eq!(r.rewind(1), Err(Errno::EINVAL));
        r.next().unwrap();
        assert_eq!(r.rewind(1), Ok(()));
        assert_eq!(r.next().unwrap().name, "b");
    }

    #[test]
    fn rewind_to_current_offset_then_next_is_end() {
        let mut r = Readdir::from_slice(vec![dirent("a")]);
        r.next().unwrap();
        assert_eq!(r.rewind(r.offset()), Ok(()));
        assert_eq!(r.next(), Err(Errno::ENOENT));
    }

    #[test]
    fn concat_presents_a_then_b() {
        let a = Readdir::from_slice(vec![dirent("a1"), dirent("a2")]);
        let b = Readdir::from_slice(vec![dirent("b1")]);
        let mut c = Readdir::concat(a, b);
        assert_eq!(c.next().unwrap().name, "a1");
        assert_eq!(c.next().unwrap().name, "a2");
        assert_eq!(c.offset(), 2);
        assert_eq!(c.next().unwrap().name, "b1");
        assert_eq!(c.offset(), 3);
        assert_eq!(c.next(), Err(Errno::ENOENT));
    }

    #[test]
    fn concat_rewind_crosses_boundary() {
        let a = Readdir::from_slice(vec![dirent("a1"), dirent("a2")]);
        let b = Readdir::from_slice(vec![dirent("b1"), dirent("b2")]);
        let mut c = Readdir::concat(a, b);
        for _ in 0..3 {
            c.next().unwrap();
        }
        assert_eq!(c.offset(), 3);
        c.rewind(1).unwrap();
        assert_eq!(c.next().unwrap().name, "a2");
        c.rewind(3).unwrap();
        assert_eq!(c.next().unwrap().name, "b2");
    }

    fn windowed_over(entries: Vec<Dirent>) -> Readdir {
        use std::sync::Arc;
        use parking_lot::Mutex;
        let entries = Arc::new(entries);
        let pos = Arc::new(Mutex::new(0usize));
        let init_entries = entries.clone();
        let init_pos = pos.clone();
        let init: InitFn = Box::new(move || {
            let _ = &init_entries;
            *init_pos.lock() = 0;
            Ok(())
        });
        let fetch_entries = entries.clone();
        let fetch_pos = pos.clone();
        let fetch: FetchFn = Box::new(move |n| {
            let mut pos = fetch_pos.lock();
            let start = *pos;
            let end = (start + n).min(fetch_entries.len());
            let batch = fetch_entries[start..end].to_vec();
            *pos = end;
            Ok(batch)
        });
        let close: CloseFn = Box::new(|| Ok(()));
        Readdir::windowed(init, fetch, close).unwrap()
    }

    #[test]
    fn windowed_cursor_refills_and_exhausts() {
        let entries: Vec<_> = (0..20).map(|i| dirent(&format!("f{i}"))).collect();
        let mut r = windowed_over(entries.clone());
        for i in 0..20 {
            assert_eq!(r.next().unwrap().name, format!("f{i}"));
        }
        assert_eq!(r.next(), Err(Errno::ENOENT));
        assert_eq!(r.offset(), 20);
    }

    #[test]
    fn windowed_rewind_within_window_is_ok() {
        let entries: Vec<_> = (0..20).map(|i| dirent(&format!("f{i}"))).collect();
        let mut r = windowed_over(entries);
        for _ in 0..5 {
            r.next().unwrap();
        }
        assert_eq!(r.rewind(2), Ok(()));
        assert_eq!(r.next().unwrap().name, "f2");
    }

    #[test]
    fn windowed_rewind_to_prior_batch_is_enosys() {
        let entries: Vec<_> = (0..40).map(|i| dirent(&format!("f{i}"))).collect();
        let mut r = windowed_over(entries);
        for _ in 0..20 {
            r.next().unwrap();
        }
        // Position 2 is two windows back (window size 16): not reachable.
        assert_eq!(r.rewind(2), Err(Errno::ENOSYS));
    }

    #[test]
    fn windowed_rewind_zero_resets() {
        let entries: Vec<_> = (0..5).map(|i| dirent(&format!("f{i}"))).collect();
        let mut r = windowed_over(entries);
        r.next().unwrap();
        r.next().unwrap();
        assert_eq!(r.rewind(0), Ok(()));
        assert_eq!(r.offset(), 0);
        assert_eq!(r.next().unwrap().name, "f0");
    }

    #[test]
    fn windowed_rewind_forward_of_offset_is_invalid() {
        let entries: Vec<_> = (0..5).map(|i| dirent(&format!("f{i}"))).collect();
        let mut r = windowed_over(entries);
        r.next().unwrap();
        assert_eq!(r.rewind(3), Err(Errno::EINVAL));
    }
}
