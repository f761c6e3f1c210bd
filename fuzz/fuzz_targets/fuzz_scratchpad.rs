//! Fuzz target: `decode_scratchpad`
//!
//! Any nine bytes must either decode to a temperature inside the DS18B20
//! range or be rejected; a CRC mismatch must never yield a value.
//!
//! cargo fuzz run fuzz_scratchpad

#![no_main]

use aquamon::bus::crc::crc8;
use aquamon::sensors::ds18b20::decode_scratchpad;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(pad) = <[u8; 9]>::try_from(data) else {
        return;
    };
    if let Ok(celsius) = decode_scratchpad(&pad) {
        assert_eq!(crc8(&pad[..8]), pad[8], "bad CRC accepted");
        assert!((-55.0..=125.0).contains(&celsius), "{celsius} out of range");
    }
});
