//! Fuzz target: `dht22::decode_frame`
//!
//! Arbitrary 40-bit frames must never panic; anything accepted carries a
//! valid checksum and in-range values.
//!
//! cargo fuzz run fuzz_dht_frame

#![no_main]

use aquamon::sensors::dht22::decode_frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = <[u8; 5]>::try_from(data) else {
        return;
    };
    if let Ok(r) = decode_frame(&frame) {
        let sum = frame[..4].iter().fold(0u8, |a, b| a.wrapping_add(*b));
        assert_eq!(sum, frame[4], "bad checksum accepted");
        assert!((0.0..=100.0).contains(&r.humidity_pct));
        assert!((-40.0..=80.0).contains(&r.temperature_c));
    }
});
