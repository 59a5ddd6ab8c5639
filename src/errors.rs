//! Sticky decode error bits.
//!
//! The decoder ORs bits into an [`ErrorRegister`] from tick context; the
//! consumer reads and clears the whole set in one step. A set bit means "at
//! least one occurrence since the last clear".
//!
//! The same physical defect in the first byte after a break is reported as
//! [`ErrorFlags::SYNC_BYTE`] ("error during sync byte") rather than
//! [`ErrorFlags::START_BIT`] or [`ErrorFlags::STOP_BIT`] ("error during a
//! payload byte").

use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// Decode error kinds.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorFlags: u8 {
        /// Frame ended with fewer stored bytes than the configured minimum.
        const FRAME_TOO_SHORT = 1 << 0;
        /// Another byte started while the frame was already full.
        const FRAME_TOO_LONG = 1 << 1;
        /// Start bit of a payload byte was recessive.
        const START_BIT = 1 << 2;
        /// Stop bit of a payload byte was dominant.
        const STOP_BIT = 1 << 3;
        /// Sync byte malformed, missing or not 0x55.
        const SYNC_BYTE = 1 << 4;
        /// A committed frame overwrote the oldest unread one.
        const BUFFER_OVERRUN = 1 << 5;
        /// Tick delivered in a state the dispatcher does not handle.
        const OTHER = 1 << 6;
    }
}

const NAMES: [(ErrorFlags, &str); 7] = [
    (ErrorFlags::FRAME_TOO_SHORT, "SHRT"),
    (ErrorFlags::FRAME_TOO_LONG, "LONG"),
    (ErrorFlags::START_BIT, "STRT"),
    (ErrorFlags::STOP_BIT, "STOP"),
    (ErrorFlags::SYNC_BYTE, "SYNC"),
    (ErrorFlags::BUFFER_OVERRUN, "OVRN"),
    (ErrorFlags::OTHER, "OTHR"),
];

impl ErrorFlags {
    /// Short names of the set bits, in a fixed order.
    pub fn short_names(self) -> impl Iterator<Item = (ErrorFlags, &'static str)> {
        NAMES.iter().copied().filter(move |(flag, _)| self.contains(*flag))
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (_, name)) in self.short_names().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Producer-sets, consumer-clears holder for [`ErrorFlags`].
#[derive(Debug, Default)]
pub struct ErrorRegister {
    flags: ErrorFlags,
}

impl ErrorRegister {
    pub const fn new() -> Self {
        Self {
            flags: ErrorFlags::empty(),
        }
    }

    pub fn raise(&mut self, flags: ErrorFlags) {
        self.flags |= flags;
    }

    /// Returns everything raised since the previous call and clears the set.
    pub fn take_and_clear(&mut self) -> ErrorFlags {
        core::mem::take(&mut self.flags)
    }

    pub fn peek(&self) -> ErrorFlags {
        self.flags
    }
}
