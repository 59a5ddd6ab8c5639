#![allow(dead_code)]

use lin_decoder::sim::{Simulation, Trace};
use lin_decoder::{baud, Baud, Config, ErrorFlags};

pub const BAUD: Baud = baud(19200);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A trace at the test baud rate with the bus idle for a while first.
pub fn trace() -> Trace {
    let mut trace = Trace::new(BAUD);
    trace.idle(8);
    trace
}

pub struct Decoded {
    pub frames: Vec<Vec<u8>>,
    pub errors: ErrorFlags,
    pub sim: Simulation,
}

pub fn decode(trace: &Trace) -> Decoded {
    run(Simulation::new(trace))
}

pub fn decode_with(trace: &Trace, config: Config) -> Decoded {
    run(Simulation::with_config(trace, config))
}

fn run(mut sim: Simulation) -> Decoded {
    init_logger();
    sim.run_to_end();
    let frames = sim
        .drain_frames()
        .iter()
        .map(|frame| frame.as_bytes().to_vec())
        .collect();
    let errors = sim.decoder_mut().take_errors();
    Decoded {
        frames,
        errors,
        sim,
    }
}
