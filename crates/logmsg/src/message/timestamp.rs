//! Wall-clock stamps carried on every message.

/// A `(seconds, microseconds, gmt_offset_seconds)` triple.
///
/// `seconds` of `-1` means "unset" — used for the recv-time stamp on
/// messages built directly by tests or internal sources that never touch
/// the wire. `gmt_offset_seconds` is the source's local offset from UTC at
/// the time the stamp was taken, not the current offset, since the two can
/// differ across a DST transition between parse and flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: i64,
    pub microseconds: u32,
    pub gmt_offset_seconds: i32,
}

impl Timestamp {
    pub const UNSET: Self = Self {
        seconds: -1,
        microseconds: 0,
        gmt_offset_seconds: 0,
    };

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.seconds >= 0
    }

    #[must_use]
    pub const fn new(seconds: i64, microseconds: u32, gmt_offset_seconds: i32) -> Self {
        Self {
            seconds,
            microseconds,
            gmt_offset_seconds,
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::UNSET
    }
}
