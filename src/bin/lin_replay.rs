use std::error::Error;
use std::io::{self, Read};
use std::{env, fs};

use lin_decoder::sim::script::Script;
use lin_decoder::sim::Simulation;

fn read_script() -> io::Result<String> {
    match env::args().nth(1) {
        Some(path) if path != "-" => fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<(), Box<dyn Error>> {
    let script = Script::parse(&read_script()?)?;
    let trace = script.trace();

    let mut sim = Simulation::new(&trace);
    println!("{}", sim.decoder().config());
    sim.run_to_end();

    for frame in sim.drain_frames() {
        println!("frame: {}", hex(&frame));
    }
    let errors = sim.decoder_mut().take_errors();
    if !errors.is_empty() {
        println!("errors: {}", errors);
    }
    println!("ticks: {}", sim.ticks_delivered());
    Ok(())
}
