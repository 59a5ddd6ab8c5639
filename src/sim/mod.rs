//! Simulated LIN bus for running the decoder without hardware.
//!
//! [`SimBus`] implements the [`hal`](crate::hal) traits on virtual time
//! measured in tick timer counts. Each line reads as the wired-AND of what
//! its node sends (from a [`Trace`]) and what the decoder drives onto it.
//! Reading the free clock costs one count, so bounded waits make progress.
//! [`Simulation`] delivers timer ticks to a [`LinDecoder`] until a horizon.

pub mod script;
mod trace;

pub use trace::{ByteMark, Trace, Waveform, DEFAULT_BREAK_BITS};

use crate::config::Config;
use crate::decoder::LinDecoder;
use crate::frame::Frame;
use crate::hal::{Channel, FreeClock, LinIo, Level, TickTimer};

/// Bit slots simulated past the end of a trace so the last frame can close.
const TAIL_BITS: u64 = 16;

#[derive(Debug, Default)]
struct SimTimer {
    period: Option<u16>,
    base_time: u64,
    base_count: u16,
    masked: bool,
}

impl SimTimer {
    fn next_tick_at(&self) -> Option<u64> {
        let period = self.period?;
        let remaining = period.saturating_sub(self.base_count).max(1);
        Some(self.base_time + u64::from(remaining))
    }

    fn restart(&mut self, now: u64, count: u16) {
        self.base_time = now;
        self.base_count = count;
    }
}

/// Two LIN lines, a tick timer and a free clock on virtual time.
#[derive(Debug)]
pub struct SimBus {
    now: u64,
    clock_divider: u64,
    master: Waveform,
    slave: Waveform,
    outputs: [Level; 2],
    driven: [Waveform; 2],
    timer: SimTimer,
}

const fn index(channel: Channel) -> usize {
    match channel {
        Channel::Master => 0,
        Channel::Slave => 1,
    }
}

impl SimBus {
    pub fn new(trace: &Trace) -> Self {
        let clocks = trace.clocks();
        Self {
            now: 0,
            clock_divider: u64::from((clocks.timer_hz / clocks.clock_hz.max(1)).max(1)),
            master: trace.waveform(Channel::Master).clone(),
            slave: trace.waveform(Channel::Slave).clone(),
            outputs: [Level::Recessive; 2],
            driven: [Waveform::default(), Waveform::default()],
            timer: SimTimer::default(),
        }
    }

    /// Current virtual time in timer counts.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// What the decoder drove onto `channel` at `time`.
    pub fn driven_level_at(&self, channel: Channel, time: u64) -> Level {
        self.driven[index(channel)].level_at(time)
    }

    /// Every change the decoder made to its output onto `channel`.
    pub fn driven(&self, channel: Channel) -> &Waveform {
        &self.driven[index(channel)]
    }

    /// Next due tick, unless disarmed or masked.
    pub fn next_tick_at(&self) -> Option<u64> {
        if self.timer.masked {
            return None;
        }
        self.timer.next_tick_at()
    }

    pub fn is_masked(&self) -> bool {
        self.timer.masked
    }

    fn node(&self, channel: Channel) -> &Waveform {
        match channel {
            Channel::Master => &self.master,
            Channel::Slave => &self.slave,
        }
    }

    fn fire(&mut self, at: u64) {
        self.now = self.now.max(at);
        self.timer.restart(self.now, 0);
    }
}

impl LinIo for SimBus {
    fn read_level(&mut self, channel: Channel) -> Level {
        let node = self.node(channel).level_at(self.now);
        if node.is_recessive() && self.outputs[index(channel)].is_recessive() {
            Level::Recessive
        } else {
            Level::Dominant
        }
    }

    fn drive_level(&mut self, channel: Channel, level: Level) {
        let i = index(channel);
        self.outputs[i] = level;
        self.driven[i].set(self.now, level);
    }
}

impl TickTimer for SimBus {
    fn arm(&mut self, period: u16) {
        self.timer.period = Some(period);
        self.timer.restart(self.now, 0);
    }

    fn disarm(&mut self) {
        self.timer.period = None;
    }

    fn reset(&mut self) {
        self.timer.restart(self.now, 0);
    }

    fn set_count(&mut self, count: u16) {
        self.timer.restart(self.now, count);
    }

    fn mask(&mut self) {
        self.timer.masked = true;
    }

    fn unmask(&mut self) {
        self.timer.masked = false;
    }
}

impl FreeClock for SimBus {
    fn ticks(&mut self) -> u16 {
        self.now += 1;
        (self.now / self.clock_divider) as u16
    }
}

/// A decoder attached to a [`SimBus`] playing a [`Trace`].
#[derive(Debug)]
pub struct Simulation {
    decoder: LinDecoder<SimBus>,
    end: u64,
    ticks: u64,
}

impl Simulation {
    /// Decode `trace` at its own baud rate.
    pub fn new(trace: &Trace) -> Self {
        let config = Config::with_clocks(*trace.baud(), trace.clocks());
        Self::with_config(trace, config)
    }

    /// Decode `trace` with an explicit configuration, which should use the
    /// trace's clock rates.
    pub fn with_config(trace: &Trace, config: Config) -> Self {
        Self {
            decoder: LinDecoder::new(SimBus::new(trace), config),
            end: trace.end() + trace.bit_time(TAIL_BITS),
            ticks: 0,
        }
    }

    /// Deliver every tick due up to `time`, then move the clock there.
    pub fn run_until(&mut self, time: u64) {
        while let Some(at) = self.decoder.hal().next_tick_at() {
            if at > time {
                break;
            }
            self.decoder.hal_mut().fire(at);
            self.decoder.on_tick();
            self.ticks += 1;
        }
        let bus = self.decoder.hal_mut();
        bus.now = bus.now.max(time);
    }

    /// Run past the end of the trace with enough slack for the last frame
    /// to close.
    pub fn run_to_end(&mut self) {
        self.run_until(self.end);
    }

    /// Remove every decoded frame.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        std::iter::from_fn(|| self.decoder.try_pop()).collect()
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn now(&self) -> u64 {
        self.decoder.hal().now()
    }

    /// Ticks delivered so far.
    pub fn ticks_delivered(&self) -> u64 {
        self.ticks
    }

    pub fn bus(&self) -> &SimBus {
        self.decoder.hal()
    }

    pub fn decoder(&self) -> &LinDecoder<SimBus> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut LinDecoder<SimBus> {
        &mut self.decoder
    }
}
