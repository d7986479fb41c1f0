//! `utimens` sentinel handling, per spec §3 and §4.5.
//!
//! Timestamps are nanoseconds-since-epoch `i64` values end to end, since
//! that's the currency `Stat_t` and `utimens` both use. The sentinel
//! constants and the "what does the host clock read right now, as an i64"
//! helper are what's left to share.

/// Sentinel meaning "set this timestamp to the current time".
pub const UTIME_NOW: i64 = -1;
/// Sentinel meaning "leave this timestamp unchanged".
pub const UTIME_OMIT: i64 = -2;

/// One side (atime or mtime) of a `utimens` request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimeSpec {
    /// Set to the given nanoseconds-since-epoch value.
    Set(i64),
    /// Set to the current wall-clock time ([`UTIME_NOW`]).
    Now,
    /// Leave unchanged ([`UTIME_OMIT`]).
    Omit,
}

impl TimeSpec {
    /// Decodes a raw spec-level nanosecond value into a [`TimeSpec`].
    pub fn from_raw(value: i64) -> TimeSpec {
        match value {
            UTIME_NOW => TimeSpec::Now,
            UTIME_OMIT => TimeSpec::Omit,
            other => TimeSpec::Set(other),
        }
    }
}

/// Current wall-clock time as nanoseconds since the Unix epoch, saturating
/// rather than panicking on out-of-range values.
pub fn now_ns() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_sentinels() {
        assert_eq!(TimeSpec::from_raw(UTIME_NOW), TimeSpec::Now);
        assert_eq!(TimeSpec::from_raw(UTIME_OMIT), TimeSpec::Omit);
        assert_eq!(TimeSpec::from_raw(42), TimeSpec::Set(42));
    }

    #[test]
    fn now_is_positive_and_recent() {
        let now = now_ns();
        assert!(now > 0);
    }
}
