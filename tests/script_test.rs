mod common;

use lin_decoder::sim::script::{Error, Script};
use lin_decoder::sim::Simulation;
use lin_decoder::ErrorFlags;

const SESSION: &str = "
# diagnostic request and response
baud 19200
idle 10
break
master 55 3c
master 01 06 b2 00 00 00 00 00 46
idle 20
break
master 55 7d
idle 2
slave 01 06 f2 00 00 00 00 00 06
idle 20
break
master 55 11
glitch slave
";

#[test]
fn replay_session() {
    common::init_logger();
    let script: Script = SESSION.parse().unwrap();
    let trace = script.trace();
    let mut sim = Simulation::new(&trace);
    assert_eq!(sim.decoder().config().ticks_per_bit(), 104);
    sim.run_to_end();

    let frames: Vec<Vec<u8>> = sim
        .drain_frames()
        .iter()
        .map(|f| f.as_bytes().to_vec())
        .collect();
    assert_eq!(
        frames,
        vec![
            vec![0x3c, 0x01, 0x06, 0xb2, 0, 0, 0, 0, 0, 0x46],
            vec![0x7d, 0x01, 0x06, 0xf2, 0, 0, 0, 0, 0, 0x06],
        ]
    );
    assert_eq!(sim.decoder_mut().take_errors(), ErrorFlags::START_BIT);
}

#[test]
fn script_errors_name_the_line() {
    let err = Script::parse("idle 2\nmaster 55 zz\n").unwrap_err();
    assert_eq!(err.to_string(), "line 2: cannot parse \"master 55 zz\"");
    assert!(matches!(
        Script::parse("baud 50000"),
        Err(Error::InvalidBaud { line: 1, .. })
    ));
}
