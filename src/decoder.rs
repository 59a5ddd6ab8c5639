//! The tick-driven protocol engine.
//!
//! [`LinDecoder`] owns the hardware, the session [`Config`], the frame queue
//! and the error register. The timer interrupt calls
//! [`on_tick()`](LinDecoder::on_tick) once per tick; the main loop drains
//! results with [`try_pop()`](LinDecoder::try_pop) and
//! [`take_errors()`](LinDecoder::take_errors).
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "std")] {
//! use lin_decoder::sim::{Simulation, Trace};
//! use lin_decoder::{baud, Channel};
//!
//! let mut trace = Trace::new(baud(19200));
//! trace.idle(4).header(0x3c).idle(2).bytes(Channel::Slave, &[0x01, 0x02, 0xfc]);
//!
//! let mut sim = Simulation::new(&trace);
//! sim.run_to_end();
//! let frame = sim.decoder_mut().try_pop().unwrap();
//! assert_eq!(frame.as_bytes(), &[0x3c, 0x01, 0x02, 0xfc]);
//! assert!(sim.decoder_mut().take_errors().is_empty());
//! # }
//! ```

use crate::config::Config;
use crate::errors::{ErrorFlags, ErrorRegister};
use crate::frame::{Frame, SYNC_BYTE};
use crate::hal::{Channel, CriticalSection, Hal, Level};
use crate::queue::{Commit, FrameQueue};
use crate::wait::{delay, wait_for_either_edge, wait_for_level};

/// Consecutive dominant ticks on the master line that make a break.
pub const BREAK_BITS: u8 = 10;

/// Externally visible phase of the state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    DetectBreak,
    ReadData,
    /// Torn down; no ticks expected.
    Halted,
}

#[derive(Debug)]
enum State {
    DetectBreak(DetectBreak),
    ReadData(ReadData),
    Halted,
}

/// Everything the state handlers work on besides their own state.
#[derive(Debug)]
struct Session<H> {
    hal: H,
    config: Config,
    queue: FrameQueue,
    errors: ErrorRegister,
}

impl<H: Hal> Session<H> {
    fn raise(&mut self, flags: ErrorFlags) {
        log::trace!("decode error {}", flags);
        self.errors.raise(flags);
    }

    fn release_lines(&mut self) {
        self.hal.drive_level(Channel::Slave, Level::Recessive);
        self.hal.drive_level(Channel::Master, Level::Recessive);
    }
}

/// Bus node between a LIN master and its slaves: decodes frames and repeats
/// every sampled bit onto the opposite channel.
#[derive(Debug)]
pub struct LinDecoder<H: Hal> {
    session: Session<H>,
    state: State,
    ticks_completed: u8,
}

impl<H: Hal> LinDecoder<H> {
    /// Take over `hal` and start decoding with `config`.
    pub fn new(hal: H, config: Config) -> Self {
        let mut decoder = Self {
            session: Session {
                hal,
                config,
                queue: FrameQueue::new(),
                errors: ErrorRegister::new(),
            },
            state: State::Halted,
            ticks_completed: 0,
        };
        decoder.setup(config);
        decoder
    }

    /// Reset all decoding state and restart with `config`. This is the only
    /// way to change the baud rate.
    pub fn setup(&mut self, config: Config) {
        let session = &mut self.session;
        session.hal.disarm();
        session.config = config;
        session.queue.clear();
        session.errors = ErrorRegister::new();
        self.state = DetectBreak::enter(session);
        session.hal.arm(config.ticks_per_bit());
        log::debug!("{}", config);
    }

    /// Stop ticking and release both lines.
    pub fn teardown(&mut self) {
        self.session.hal.disarm();
        self.session.release_lines();
        self.state = State::Halted;
        log::debug!("LIN decoder halted");
    }

    /// Tear down and hand back the hardware.
    pub fn into_inner(mut self) -> H {
        self.teardown();
        self.session.hal
    }

    /// Tick entry point. Call from the timer interrupt.
    pub fn on_tick(&mut self) {
        let session = &mut self.session;
        let next = match &mut self.state {
            State::DetectBreak(state) => state.on_tick(session),
            State::ReadData(state) => state.on_tick(session),
            State::Halted => {
                session.raise(ErrorFlags::OTHER);
                Some(DetectBreak::enter(session))
            }
        };
        if let Some(next) = next {
            self.state = next;
        }
        self.ticks_completed = self.ticks_completed.wrapping_add(1);
    }

    /// Oldest decoded frame, if any.
    pub fn try_pop(&mut self) -> Option<Frame> {
        let session = &mut self.session;
        let _cs = CriticalSection::enter(&mut session.hal);
        session.queue.try_pop()
    }

    /// Everything raised since the previous call.
    pub fn take_errors(&mut self) -> ErrorFlags {
        let session = &mut self.session;
        let _cs = CriticalSection::enter(&mut session.hal);
        session.errors.take_and_clear()
    }

    /// Wrapping count of completed ticks. A change since the last look means
    /// a tick just returned, so the next one is a full period away.
    pub fn ticks_completed(&self) -> u8 {
        self.ticks_completed
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::DetectBreak(_) => Phase::DetectBreak,
            State::ReadData(_) => Phase::ReadData,
            State::Halted => Phase::Halted,
        }
    }

    pub fn config(&self) -> &Config {
        &self.session.config
    }

    pub fn hal(&self) -> &H {
        &self.session.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.session.hal
    }
}

/// Looking for a break on the master line while following it on the slave
/// line.
#[derive(Debug)]
struct DetectBreak {
    low_bits: u8,
}

impl DetectBreak {
    fn enter<H: Hal>(session: &mut Session<H>) -> State {
        session.release_lines();
        State::DetectBreak(Self { low_bits: 0 })
    }

    fn on_tick<H: Hal>(&mut self, session: &mut Session<H>) -> Option<State> {
        let hal = &mut session.hal;
        if hal.read_level(Channel::Master).is_recessive() {
            hal.drive_level(Channel::Slave, Level::Recessive);
            self.low_bits = 0;
            return None;
        }

        hal.drive_level(Channel::Slave, Level::Dominant);
        self.low_bits += 1;
        if self.low_bits < BREAK_BITS {
            return None;
        }

        let config = session.config;
        if wait_for_level(
            &mut session.hal,
            Channel::Master,
            Level::Recessive,
            config.ticks_until_break_end(),
        )
        .is_none()
        {
            // Master held dominant for too long: no usable sync can follow.
            session.raise(ErrorFlags::SYNC_BYTE);
            self.low_bits = 0;
            return None;
        }

        // Delay the slave's end of break by half a bit, like every other
        // repeated edge.
        let hal = &mut session.hal;
        delay(hal, config.clock_ticks_per_half_bit());
        hal.drive_level(Channel::Slave, Level::Recessive);

        Some(ReadData::enter(session))
    }
}

/// Sampling one frame, byte by byte, at bit centers.
#[derive(Debug)]
struct ReadData {
    channel: Channel,
    /// Complete bytes so far, sync included.
    bytes_read: u8,
    /// 0 start bit, 1..=8 data bits, 9 stop bit.
    bit_index: u8,
    byte: u8,
    mask: u8,
}

impl ReadData {
    /// Called half a bit after the end of the break.
    fn enter<H: Hal>(session: &mut Session<H>) -> State {
        session.queue.current_write_frame().reset();

        let config = session.config;
        if wait_for_level(
            &mut session.hal,
            Channel::Master,
            Level::Dominant,
            config.ticks_until_start_bit(),
        )
        .is_none()
        {
            session.raise(ErrorFlags::SYNC_BYTE);
            return DetectBreak::enter(session);
        }
        session.hal.set_count(config.ticks_per_half_bit());

        State::ReadData(Self {
            channel: Channel::Master,
            bytes_read: 0,
            bit_index: 0,
            byte: 0,
            mask: 1,
        })
    }

    fn on_tick<H: Hal>(&mut self, session: &mut Session<H>) -> Option<State> {
        // Sample and repeat before anything else to keep the repeated edge
        // at a constant delay.
        let level = session.hal.read_level(self.channel);
        session.hal.drive_level(self.channel.other(), level);

        match self.bit_index {
            0 => {
                if level.is_recessive() {
                    return Some(self.abort(session, ErrorFlags::START_BIT));
                }
                self.bit_index = 1;
                self.byte = 0;
                self.mask = 1;
                None
            }
            1..=8 => {
                if level.bit() {
                    self.byte |= self.mask;
                }
                self.mask <<= 1;
                self.bit_index += 1;
                None
            }
            _ => self.stop_bit(session, level),
        }
    }

    fn stop_bit<H: Hal>(&mut self, session: &mut Session<H>, level: Level) -> Option<State> {
        self.bit_index = 0;
        if !level.is_recessive() {
            return Some(self.abort(session, ErrorFlags::STOP_BIT));
        }

        let is_sync = self.bytes_read == 0;
        self.bytes_read = self.bytes_read.saturating_add(1);
        if is_sync {
            if self.byte != SYNC_BYTE {
                return Some(self.abort(session, ErrorFlags::SYNC_BYTE));
            }
        } else {
            // Bounded by the max length check below on the previous byte.
            session.queue.current_write_frame().push_byte(self.byte);
        }

        let config = session.config;
        let budget = config.ticks_until_start_bit();
        let more = if self.bytes_read == 2 {
            // Header done; the response may come from either side.
            wait_for_either_edge(&mut session.hal, budget).map(|channel| self.channel = channel)
        } else {
            wait_for_level(&mut session.hal, self.channel, Level::Dominant, budget)
        };

        if more.is_none() {
            return Some(Self::finish(session));
        }

        if session.queue.current_write_frame().len() >= config.frame_limits().max_len() {
            session.raise(ErrorFlags::FRAME_TOO_LONG);
            return Some(DetectBreak::enter(session));
        }

        session.hal.set_count(config.ticks_per_half_bit());
        None
    }

    /// No further byte: publish the frame if it is long enough.
    fn finish<H: Hal>(session: &mut Session<H>) -> State {
        let len = session.queue.current_write_frame().len();
        if len < session.config.frame_limits().min_len() {
            session.raise(ErrorFlags::FRAME_TOO_SHORT);
            return DetectBreak::enter(session);
        }

        if session.queue.advance_head() == Commit::Overrun {
            session.raise(ErrorFlags::BUFFER_OVERRUN);
        }
        log::trace!("frame committed, {} bytes", len);
        DetectBreak::enter(session)
    }

    /// Framing errors in the first byte are reported as sync errors.
    fn abort<H: Hal>(&self, session: &mut Session<H>, payload_error: ErrorFlags) -> State {
        let flags = if self.bytes_read == 0 {
            ErrorFlags::SYNC_BYTE
        } else {
            payload_error
        };
        session.raise(flags);
        DetectBreak::enter(session)
    }
}
