//! Main loop of a LIN bridge: poll the tick marker, drain frames and
//! errors, and leave the bus alone while a tick is close.
//!
//! Run with `RUST_LOG=debug` to see the decoder's own messages.

use anyhow::{Context, Result};
use lin_decoder::sim::script::Script;
use lin_decoder::sim::Simulation;

const TRAFFIC: &str = "
baud 19200
idle 8
break
master 55 3c
slave 01 02 03 04 05 06 07 08 b7
idle 20
break
master 55 7d
idle 20
break
master 00 12   # corrupted sync
idle 20
break
master 55 c1 aa 55
";

fn main() -> Result<()> {
    env_logger::init();

    let script = Script::parse(TRAFFIC).context("bad traffic script")?;
    let trace = script.trace();
    let mut sim = Simulation::new(&trace);
    let slice = trace.bit_time(1);

    let mut marker = sim.decoder().ticks_completed();
    let mut frames = 0;
    while sim.now() < sim.end() {
        sim.run_until(sim.now() + slice);

        // Only touch shared state right after a tick returned.
        let now_marker = sim.decoder().ticks_completed();
        if now_marker == marker {
            continue;
        }
        marker = now_marker;

        let decoder = sim.decoder_mut();
        while let Some(frame) = decoder.try_pop() {
            frames += 1;
            log::info!("frame {}: {:02x?}", frames, frame.as_bytes());
        }
        let errors = decoder.take_errors();
        if !errors.is_empty() {
            log::warn!("decode errors: {}", errors);
        }
    }

    println!("{} frames in {} ticks", frames, sim.ticks_delivered());
    Ok(())
}
