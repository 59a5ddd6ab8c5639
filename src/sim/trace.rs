use crate::config::{Baud, ClockRates};
use crate::frame::SYNC_BYTE;
use crate::hal::{Channel, Level};

/// Default break length in bit times, per LIN 2.x.
pub const DEFAULT_BREAK_BITS: u64 = 13;

/// Level of one line over time, as a list of transitions. Recessive before
/// the first transition.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Waveform {
    edges: Vec<(u64, Level)>,
}

impl Waveform {
    pub fn level_at(&self, time: u64) -> Level {
        let idx = self.edges.partition_point(|(at, _)| *at <= time);
        if idx == 0 {
            Level::Recessive
        } else {
            self.edges[idx - 1].1
        }
    }

    /// Append a transition. Times must not decrease.
    pub fn set(&mut self, time: u64, level: Level) {
        debug_assert!(self.edges.last().map_or(true, |(at, _)| *at <= time));
        let current = self.edges.last().map_or(Level::Recessive, |(_, l)| *l);
        if current != level {
            self.edges.push((time, level));
        }
    }

    pub fn edges(&self) -> &[(u64, Level)] {
        &self.edges
    }
}

/// Where a byte was placed in a [`Trace`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ByteMark {
    pub channel: Channel,
    pub value: u8,
    /// Bit slot of the start bit.
    pub bit: u64,
}

/// Builder for the waveforms the master and slave nodes put on their lines,
/// laid out on a grid of bit slots at the trace's baud rate. Time is in tick
/// timer counts.
#[derive(Debug, Clone)]
pub struct Trace {
    baud: Baud,
    clocks: ClockRates,
    cursor: u64,
    master: Waveform,
    slave: Waveform,
    bytes: Vec<ByteMark>,
}

impl Trace {
    pub fn new(baud: Baud) -> Self {
        Self::with_clocks(baud, ClockRates::default())
    }

    pub fn with_clocks(baud: Baud, clocks: ClockRates) -> Self {
        Self {
            baud,
            clocks,
            cursor: 0,
            master: Waveform::default(),
            slave: Waveform::default(),
            bytes: Vec::new(),
        }
    }

    pub fn baud(&self) -> Baud {
        self.baud
    }

    pub fn clocks(&self) -> ClockRates {
        self.clocks
    }

    /// Start time of bit slot `bit`. Exact, not accumulated.
    pub fn bit_time(&self, bit: u64) -> u64 {
        bit * u64::from(self.clocks.timer_hz) / u64::from(*self.baud)
    }

    /// End of the last slot written.
    pub fn end(&self) -> u64 {
        self.bit_time(self.cursor)
    }

    pub fn waveform(&self, channel: Channel) -> &Waveform {
        match channel {
            Channel::Master => &self.master,
            Channel::Slave => &self.slave,
        }
    }

    /// Every byte placed so far, in order.
    pub fn byte_marks(&self) -> &[ByteMark] {
        &self.bytes
    }

    /// Both lines recessive for `bits` slots.
    pub fn idle(&mut self, bits: u64) -> &mut Self {
        self.cursor += bits;
        self
    }

    /// Master break of `bits` slots followed by a one slot delimiter.
    pub fn brk(&mut self, bits: u64) -> &mut Self {
        self.level(Channel::Master, Level::Dominant, bits);
        self.level(Channel::Master, Level::Recessive, 1);
        self
    }

    /// Break, sync and ID, as sent by the master.
    pub fn header(&mut self, id: u8) -> &mut Self {
        self.brk(DEFAULT_BREAK_BITS)
            .byte(Channel::Master, SYNC_BYTE)
            .byte(Channel::Master, id)
    }

    /// One byte: start bit, data LSB first, stop bit.
    pub fn byte(&mut self, channel: Channel, value: u8) -> &mut Self {
        self.framed(channel, value, Level::Recessive)
    }

    /// Back to back bytes.
    pub fn bytes(&mut self, channel: Channel, values: &[u8]) -> &mut Self {
        for value in values {
            self.byte(channel, *value);
        }
        self
    }

    /// A byte whose stop bit is dominant.
    pub fn bad_stop(&mut self, channel: Channel, value: u8) -> &mut Self {
        self.framed(channel, value, Level::Dominant)
    }

    /// A dominant spike a quarter slot long, at the start of one slot.
    pub fn glitch(&mut self, channel: Channel) -> &mut Self {
        let start = self.end();
        let quarter = (self.bit_time(self.cursor + 1) - start) / 4;
        let wave = self.wave_mut(channel);
        wave.set(start, Level::Dominant);
        wave.set(start + quarter.max(1), Level::Recessive);
        self.cursor += 1;
        self
    }

    fn framed(&mut self, channel: Channel, value: u8, stop: Level) -> &mut Self {
        self.bytes.push(ByteMark {
            channel,
            value,
            bit: self.cursor,
        });
        self.level(channel, Level::Dominant, 1);
        for i in 0..8 {
            self.level(channel, Level::from_bit(value & (1 << i) != 0), 1);
        }
        self.level(channel, stop, 1);
        if stop == Level::Dominant {
            let at = self.end();
            self.wave_mut(channel).set(at, Level::Recessive);
        }
        self
    }

    fn level(&mut self, channel: Channel, level: Level, bits: u64) {
        let at = self.end();
        self.wave_mut(channel).set(at, level);
        self.cursor += bits;
    }

    fn wave_mut(&mut self, channel: Channel) -> &mut Waveform {
        match channel {
            Channel::Master => &mut self.master,
            Channel::Slave => &mut self.slave,
        }
    }
}
