//! Poll event mask used by [`crate::File::poll`], per spec §3.

use std::fmt::Display;
use std::fmt::Formatter;

use bitflags::bitflags;

bitflags! {
    /// Poll readiness events. Only [`Pflag::POLLIN`] is required by the
    /// contract in spec §4.6; the remaining bits mirror the standard
    /// `poll(2)` event set so a host can still report them if it wants to.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct Pflag: u32 {
        /// There is data to read.
        const POLLIN = 1 << 0;
        /// Writing is now possible.
        const POLLOUT = 1 << 1;
        /// Error condition.
        const POLLERR = 1 << 2;
        /// Hang up.
        const POLLHUP = 1 << 3;
    }
}

impl Display for Pflag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.bits(), f)
    }
}
