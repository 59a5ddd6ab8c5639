//! Baud-derived timing for one decoding session.
//!
//! All thresholds used by the decoder are computed once from the requested
//! baud rate by [`Config::new`] and are read-only afterwards. Tick counts use
//! integer truncation, so up to one tick of rounding error per bit is accepted.

use core::convert::TryInto;
use core::fmt;
use core::ops::{Deref, RangeInclusive};

use snafu::{ensure, OptionExt, Snafu};

use crate::frame::MAX_FRAME_LEN;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The requested baud rate is outside the supported range.
    #[snafu(display("Baud rate {} out of range", baud))]
    BaudOutOfRange {
        /// The rejected baud rate, saturated to `u32`.
        baud: u32,
    },
    /// The frame length limits are inconsistent.
    #[snafu(display("Invalid frame limits {}..={}", min, max))]
    InvalidFrameLimits {
        /// Requested minimum stored bytes.
        min: usize,
        /// Requested maximum stored bytes.
        max: usize,
    },
}

const BAUD_RANGE: RangeInclusive<u16> = 1000..=20000;

/// Baud rate used when the requested one is out of range.
pub const DEFAULT_BAUD: Baud = Baud(9600);

/// Wait at most this many bit times, from the middle of a stop bit, for the
/// start bit of the next byte.
pub const MAX_SPACE_BITS: u16 = 6;

/// Wait at most this many bit times for the end of a detected break.
pub const MAX_BREAK_BITS: u16 = 24;

/// Timer counts added to the half-bit preload to offset dispatch latency.
pub const HALF_BIT_COMPENSATION: u16 = 2;

/// `Baud` is a range-checked \[1000, 20000\] bit rate.
///
/// ## Example
/// ```
/// use lin_decoder::config::Baud;
/// let b = Baud::new(19200).unwrap();
/// assert_eq!(*b, 19200);
/// assert!(Baud::new(300).is_err());
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Baud(u16);

/// Create a new [`Baud`], panics if it is out of range.
pub const fn baud(b: u16) -> Baud {
    if b >= *BAUD_RANGE.start() && b <= *BAUD_RANGE.end() {
        Baud(b)
    } else {
        panic!("Invalid baud rate.")
    }
}

impl Baud {
    /// Create a new baud rate, checking that it is in \[1000, 20000\].
    /// # Errors
    /// Returns [`Error::BaudOutOfRange`] if `baud` is out of range.
    pub fn new(baud: impl TryInto<u32> + Copy) -> Result<Self, Error> {
        let wide: u32 = baud.try_into().ok().unwrap_or(u32::MAX);
        let narrow: u16 = wide
            .try_into()
            .ok()
            .context(BaudOutOfRangeSnafu { baud: wide })?;
        ensure!(
            BAUD_RANGE.contains(&narrow),
            BaudOutOfRangeSnafu { baud: wide }
        );
        Ok(Self(narrow))
    }
}

impl Deref for Baud {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for Baud {
    fn default() -> Self {
        DEFAULT_BAUD
    }
}

/// Count rates of the two hardware time sources.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClockRates {
    /// Rate at which the periodic tick timer counts.
    pub timer_hz: u32,
    /// Rate of the free-running clock used by bounded waits.
    pub clock_hz: u32,
}

impl Default for ClockRates {
    /// 16 MHz CPU, timer prescaled by 8 and free clock prescaled by 64.
    fn default() -> Self {
        Self {
            timer_hz: 2_000_000,
            clock_hz: 250_000,
        }
    }
}

/// Minimum and maximum number of stored bytes (ID, data and checksum) in a
/// published frame. The sync byte is never counted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameLimits {
    min_len: usize,
    max_len: usize,
}

impl FrameLimits {
    /// # Errors
    /// Returns [`Error::InvalidFrameLimits`] unless `1 <= min <= max <= 10`.
    pub fn new(min_len: usize, max_len: usize) -> Result<Self, Error> {
        ensure!(
            min_len >= 1 && min_len <= max_len && max_len <= MAX_FRAME_LEN,
            InvalidFrameLimitsSnafu {
                min: min_len,
                max: max_len
            }
        );
        Ok(Self { min_len, max_len })
    }

    pub const fn min_len(&self) -> usize {
        self.min_len
    }

    pub const fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for FrameLimits {
    /// A header with no response (ID only) up to ID + 8 data + checksum.
    fn default() -> Self {
        Self {
            min_len: 1,
            max_len: MAX_FRAME_LEN,
        }
    }
}

/// Timing thresholds for one session, derived from the baud rate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    baud: Baud,
    warning: Option<Error>,
    limits: FrameLimits,
    ticks_per_bit: u16,
    ticks_per_half_bit: u16,
    clock_ticks_per_bit: u16,
    clock_ticks_per_half_bit: u16,
    ticks_until_start_bit: u16,
    ticks_until_break_end: u16,
}

impl Config {
    /// Derive the timing for `requested` baud with the default clock rates.
    ///
    /// An out of range request is replaced by [`DEFAULT_BAUD`]; the condition
    /// is logged once and kept in [`warning()`](Self::warning).
    pub fn new(requested: impl TryInto<u32> + Copy) -> Self {
        Self::with_clocks(requested, ClockRates::default())
    }

    /// Like [`new`](Self::new) with explicit clock rates.
    pub fn with_clocks(requested: impl TryInto<u32> + Copy, clocks: ClockRates) -> Self {
        match Baud::new(requested) {
            Ok(baud) => Self::derive(baud, clocks, None),
            Err(err) => {
                log::warn!("{}, using {} baud", err, *DEFAULT_BAUD);
                Self::derive(DEFAULT_BAUD, clocks, Some(err))
            }
        }
    }

    /// Strict variant of [`new`](Self::new).
    /// # Errors
    /// Returns [`Error::BaudOutOfRange`] instead of substituting the default.
    pub fn try_new(requested: impl TryInto<u32> + Copy) -> Result<Self, Error> {
        Ok(Self::derive(
            Baud::new(requested)?,
            ClockRates::default(),
            None,
        ))
    }

    /// Replace the frame length limits.
    #[must_use]
    pub const fn with_frame_limits(mut self, limits: FrameLimits) -> Self {
        self.limits = limits;
        self
    }

    fn derive(baud: Baud, clocks: ClockRates, warning: Option<Error>) -> Self {
        let bit = |hz: u32| -> u16 { (hz / u32::from(*baud)).min(u32::from(u16::MAX)) as u16 };
        let ticks_per_bit = bit(clocks.timer_hz);
        let clock_ticks_per_bit = bit(clocks.clock_hz);
        Self {
            baud,
            warning,
            limits: FrameLimits::default(),
            ticks_per_bit,
            ticks_per_half_bit: ticks_per_bit / 2 + HALF_BIT_COMPENSATION,
            clock_ticks_per_bit,
            clock_ticks_per_half_bit: clock_ticks_per_bit / 2,
            ticks_until_start_bit: clock_ticks_per_bit.saturating_mul(MAX_SPACE_BITS),
            ticks_until_break_end: clock_ticks_per_bit.saturating_mul(MAX_BREAK_BITS),
        }
    }

    /// The baud rate in effect, after any substitution.
    pub const fn baud(&self) -> Baud {
        self.baud
    }

    /// The configuration problem that caused a substitution, if any.
    pub const fn warning(&self) -> Option<Error> {
        self.warning
    }

    pub const fn frame_limits(&self) -> FrameLimits {
        self.limits
    }

    /// Timer counts per bit; the period of the tick timer.
    pub const fn ticks_per_bit(&self) -> u16 {
        self.ticks_per_bit
    }

    /// Timer preload placing the next tick in the middle of the current bit.
    pub const fn ticks_per_half_bit(&self) -> u16 {
        self.ticks_per_half_bit
    }

    pub const fn clock_ticks_per_bit(&self) -> u16 {
        self.clock_ticks_per_bit
    }

    pub const fn clock_ticks_per_half_bit(&self) -> u16 {
        self.clock_ticks_per_half_bit
    }

    /// Free-clock budget from the middle of a stop bit to the next start bit.
    pub const fn ticks_until_start_bit(&self) -> u16 {
        self.ticks_until_start_bit
    }

    /// Free-clock budget for a confirmed break to end.
    pub const fn ticks_until_break_end(&self) -> u16 {
        self.ticks_until_break_end
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::derive(DEFAULT_BAUD, ClockRates::default(), None)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LIN: {}, {}, {}, {}, {}, {}, {}",
            *self.baud,
            self.ticks_per_bit,
            self.ticks_per_half_bit,
            self.clock_ticks_per_bit,
            self.clock_ticks_per_half_bit,
            self.ticks_until_start_bit,
            self.ticks_until_break_end
        )
    }
}
