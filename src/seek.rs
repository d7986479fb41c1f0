//! [`SeekWhence`], the reference point for [`crate::File::seek`].

/// Reference point for a `seek` call, per spec §4.2.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SeekWhence {
    /// Offset from the start of the file.
    Start,
    /// Offset from the current position.
    Current,
    /// Offset from the end of the file.
    End,
}
