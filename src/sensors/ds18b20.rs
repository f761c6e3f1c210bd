//! DS18B20 water temperature engine (single device, parasite-free).
//!
//! Transaction: reset → Skip ROM → Convert T → fixed conversion wait →
//! reset → Skip ROM → Read Scratchpad (9 bytes, LSB first).  Byte 8 is
//! the Dallas CRC-8 of bytes 0..8; bytes 0..2 hold the signed temperature
//! in 1/16 °C, little-endian.

use crate::bus::OneWireBus;
use crate::bus::crc::crc8;
use crate::error::SensorFault;

use super::{SensorKind, SensorReading};

const SKIP_ROM: u8 = 0xCC;
const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;
/// Worst-case 12-bit conversion time; the bus is not polled.
const CONVERSION_MS: u32 = 750;

/// Validate the CRC and convert a scratchpad to °C.
pub fn decode_scratchpad(scratchpad: &[u8; 9]) -> Result<f32, SensorFault> {
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return Err(SensorFault::ChecksumMismatch);
    }
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    let celsius = f32::from(raw) / 16.0;
    if !SensorKind::WaterTemperature.contains(celsius) {
        return Err(SensorFault::OutOfPhysicalRange);
    }
    Ok(celsius)
}

pub struct Ds18b20<B> {
    bus: B,
}

impl<B: OneWireBus> Ds18b20<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn read_celsius(&mut self) -> Result<f32, SensorFault> {
        self.select()?;
        self.bus.write_byte(CONVERT_T)?;
        self.bus.sleep_ms(CONVERSION_MS);

        self.select()?;
        self.bus.write_byte(READ_SCRATCHPAD)?;
        let mut scratchpad = [0u8; 9];
        for byte in &mut scratchpad {
            *byte = self.bus.read_byte()?;
        }
        decode_scratchpad(&scratchpad)
    }

    pub fn reading(&mut self) -> SensorReading {
        SensorReading::from_result(SensorKind::WaterTemperature, self.read_celsius())
    }

    fn select(&mut self) -> Result<(), SensorFault> {
        if !self.bus.reset()? {
            return Err(SensorFault::DeviceAbsent);
        }
        self.bus.write_byte(SKIP_ROM)
    }
}
