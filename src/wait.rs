//! Bounded busy-waits run from tick context.
//!
//! Every wait polls a probe and the free clock in a tight loop, holding the
//! tick timer at zero so no tick fires mid-wait. Timing out is a normal
//! outcome and comes back as `None`.

use crate::hal::{Channel, Hal, Level};

/// Poll `probe` until it yields a value or `budget` free-clock ticks pass.
#[inline]
pub(crate) fn poll_until<H, T>(
    hal: &mut H,
    budget: u16,
    mut probe: impl FnMut(&mut H) -> Option<T>,
) -> Option<T>
where
    H: Hal + ?Sized,
{
    let start = hal.ticks();
    loop {
        hal.reset();
        if let Some(found) = probe(hal) {
            return Some(found);
        }
        if hal.ticks().wrapping_sub(start) >= budget {
            return None;
        }
    }
}

/// Spin for `ticks` free-clock ticks.
#[inline]
pub(crate) fn delay<H: Hal + ?Sized>(hal: &mut H, ticks: u16) {
    poll_until(hal, ticks, |_| None::<()>);
}

/// Wait for `channel` to read `level`.
#[inline]
pub(crate) fn wait_for_level<H: Hal + ?Sized>(
    hal: &mut H,
    channel: Channel,
    level: Level,
    budget: u16,
) -> Option<()> {
    poll_until(hal, budget, |hal| {
        (hal.read_level(channel) == level).then_some(())
    })
}

/// Wait for a recessive to dominant transition on either channel and
/// report which one moved first. The master wins a tie.
#[inline]
pub(crate) fn wait_for_either_edge<H: Hal + ?Sized>(hal: &mut H, budget: u16) -> Option<Channel> {
    let mut master = hal.read_level(Channel::Master);
    let mut slave = hal.read_level(Channel::Slave);
    poll_until(hal, budget, |hal| {
        let now = hal.read_level(Channel::Master);
        if master.is_recessive() && now == Level::Dominant {
            return Some(Channel::Master);
        }
        master = now;

        let now = hal.read_level(Channel::Slave);
        if slave.is_recessive() && now == Level::Dominant {
            return Some(Channel::Slave);
        }
        slave = now;
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{FreeClock, LinIo, TickTimer};

    /// Clock advances one tick per read; each channel goes dominant at a
    /// fixed clock value.
    struct Scripted {
        clock: u16,
        master_low_at: u16,
        slave_low_at: u16,
        resets: usize,
    }

    impl Scripted {
        fn new(start: u16, master_low_at: u16, slave_low_at: u16) -> Self {
            Self {
                clock: start,
                master_low_at,
                slave_low_at,
                resets: 0,
            }
        }

        fn level(&self, at: u16) -> Level {
            // Distance from the start, so wrapping clocks behave.
            if self.clock.wrapping_sub(at) < 0x8000 {
                Level::Dominant
            } else {
                Level::Recessive
            }
        }
    }

    impl LinIo for Scripted {
        fn read_level(&mut self, channel: Channel) -> Level {
            match channel {
                Channel::Master => self.level(self.master_low_at),
                Channel::Slave => self.level(self.slave_low_at),
            }
        }
        fn drive_level(&mut self, _channel: Channel, _level: Level) {}
    }

    impl TickTimer for Scripted {
        fn arm(&mut self, _period: u16) {}
        fn disarm(&mut self) {}
        fn reset(&mut self) {
            self.resets += 1;
        }
        fn set_count(&mut self, _count: u16) {}
        fn mask(&mut self) {}
        fn unmask(&mut self) {}
    }

    impl FreeClock for Scripted {
        fn ticks(&mut self) -> u16 {
            self.clock = self.clock.wrapping_add(1);
            self.clock
        }
    }

    #[test]
    fn test_level_found_and_timeout() {
        let mut hal = Scripted::new(0, 10, 1000);
        assert_eq!(
            wait_for_level(&mut hal, Channel::Master, Level::Dominant, 50),
            Some(())
        );
        assert!(hal.resets > 0);

        let mut hal = Scripted::new(0, 1000, 1000);
        assert_eq!(
            wait_for_level(&mut hal, Channel::Slave, Level::Dominant, 20),
            None
        );
        assert!(hal.clock >= 20);
    }

    #[test]
    fn test_delay_survives_clock_wrap() {
        let mut hal = Scripted::new(u16::MAX - 3, 0, 0);
        delay(&mut hal, 10);
        let elapsed = hal.clock.wrapping_sub(u16::MAX - 3);
        assert!((10..=12).contains(&elapsed));
    }

    #[test]
    fn test_either_edge_reports_first_channel() {
        let mut hal = Scripted::new(0, 500, 30);
        assert_eq!(wait_for_either_edge(&mut hal, 100), Some(Channel::Slave));
        let mut hal = Scripted::new(0, 30, 500);
        assert_eq!(wait_for_either_edge(&mut hal, 100), Some(Channel::Master));
        let mut hal = Scripted::new(0, 500, 500);
        assert_eq!(wait_for_either_edge(&mut hal, 100), None);
    }

    #[test]
    fn test_either_edge_ignores_already_dominant_line() {
        // Slave already low when the wait starts: no edge, master moves later.
        let mut hal = Scripted::new(100, 140, 50);
        assert_eq!(wait_for_either_edge(&mut hal, 100), Some(Channel::Master));
    }
}
