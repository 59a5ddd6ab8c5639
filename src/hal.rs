//! Hardware seams of the decoder.
//!
//! The decoder never touches registers. It reads and drives the two LIN
//! channels through [`LinIo`], steers the periodic tick through
//! [`TickTimer`] and measures bounded waits with [`FreeClock`]. Anything
//! implementing all three is a [`Hal`].

/// One of the two bridged LIN line pairs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Master-side line: master-in, repeated slave bits out.
    Master,
    /// Slave-side line: slave-in, repeated master bits out.
    Slave,
}

impl Channel {
    /// The opposite line, where bits sampled on `self` are repeated.
    pub const fn other(self) -> Self {
        match self {
            Self::Master => Self::Slave,
            Self::Slave => Self::Master,
        }
    }
}

/// Logical LIN line state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    /// Low. Wins over recessive on the wired-AND bus.
    Dominant,
    /// High, the idle level.
    Recessive,
}

impl Level {
    pub const fn is_recessive(self) -> bool {
        matches!(self, Self::Recessive)
    }

    /// The data bit value this level carries.
    pub const fn bit(self) -> bool {
        self.is_recessive()
    }

    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::Recessive
        } else {
            Self::Dominant
        }
    }
}

/// Digital access to the two channels.
pub trait LinIo {
    /// Current level of the input side of `channel`.
    fn read_level(&mut self, channel: Channel) -> Level;
    /// Drive the output onto `channel`'s line.
    fn drive_level(&mut self, channel: Channel, level: Level);
}

/// The periodic tick source. Counts up at a fixed rate and delivers a tick
/// each time the count reaches the armed period, restarting from zero.
pub trait TickTimer {
    /// Start ticking every `period` counts.
    fn arm(&mut self, period: u16);
    /// Stop ticking.
    fn disarm(&mut self);
    /// Restart the current period from zero.
    fn reset(&mut self);
    /// Preload the count, shortening the current period.
    fn set_count(&mut self, count: u16);
    /// Hold back tick delivery.
    fn mask(&mut self);
    /// Resume tick delivery, including a tick that came due while masked.
    fn unmask(&mut self);
}

/// Free-running clock, only compared through wrapping differences.
pub trait FreeClock {
    fn ticks(&mut self) -> u16;
}

/// Everything the decoder needs from the hardware.
pub trait Hal: LinIo + TickTimer + FreeClock {}

impl<T: LinIo + TickTimer + FreeClock> Hal for T {}

/// Keeps ticks masked while alive; unmasks on drop.
pub struct CriticalSection<'a, T: TickTimer + ?Sized> {
    timer: &'a mut T,
}

impl<'a, T: TickTimer + ?Sized> CriticalSection<'a, T> {
    pub fn enter(timer: &'a mut T) -> Self {
        timer.mask();
        Self { timer }
    }
}

impl<T: TickTimer + ?Sized> Drop for CriticalSection<'_, T> {
    fn drop(&mut self) {
        self.timer.unmask();
    }
}
