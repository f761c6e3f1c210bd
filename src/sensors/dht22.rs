//! DHT22 (AM2302) air temperature / humidity engine.
//!
//! Frame sequence on the single data line:
//!
//! ```text
//! host   ▔▔▔╲____ ≥18 ms ____╱▔▔
//! device                       ╲_80µs_╱▔80µs▔╲  40 × ( ╲_50µs_╱▔ 26|70 µs ▔╲ )
//! ```
//!
//! A bit is `1` when the line is still high 40 µs after its rising edge.
//! The fifth byte is the low byte of the sum of the first four.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::Timebase;
use crate::bus::{BitBanger, Level};
use crate::error::SensorFault;

use super::{SensorKind, SensorReading};

const START_LOW_MS: u32 = 20;
const ACK_WINDOW_US: u32 = 200;
const BIT_WINDOW_US: u32 = 200;
const BIT_SAMPLE_US: u32 = 40;
const NEGATIVE_FLAG: u16 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dht22Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Validate the checksum and convert a raw 5-byte frame.
pub fn decode_frame(frame: &[u8; 5]) -> Result<Dht22Reading, SensorFault> {
    let sum = frame[..4].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != frame[4] {
        return Err(SensorFault::ChecksumMismatch);
    }

    let humidity_pct = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
    let raw_t = u16::from_be_bytes([frame[2], frame[3]]);
    let magnitude = f32::from(raw_t & !NEGATIVE_FLAG) / 10.0;
    let temperature_c = if raw_t & NEGATIVE_FLAG != 0 {
        -magnitude
    } else {
        magnitude
    };

    if !SensorKind::AirTemperature.contains(temperature_c)
        || !SensorKind::Humidity.contains(humidity_pct)
    {
        return Err(SensorFault::OutOfPhysicalRange);
    }
    Ok(Dht22Reading {
        temperature_c,
        humidity_pct,
    })
}

pub struct Dht22<P, T> {
    bus: BitBanger<P, T>,
}

impl<P, T> Dht22<P, T>
where
    P: InputPin + OutputPin,
    T: Timebase,
{
    pub fn new(bus: BitBanger<P, T>) -> Self {
        Self { bus }
    }

    pub fn read(&mut self) -> Result<Dht22Reading, SensorFault> {
        let frame = self.read_frame()?;
        decode_frame(&frame)
    }

    /// Both readings of one transaction; a failure marks both.
    pub fn readings(&mut self) -> [SensorReading; 2] {
        match self.read() {
            Ok(r) => [
                SensorReading::checked(SensorKind::AirTemperature, r.temperature_c),
                SensorReading::checked(SensorKind::Humidity, r.humidity_pct),
            ],
            Err(fault) => [
                SensorReading::failed(SensorKind::AirTemperature, fault),
                SensorReading::failed(SensorKind::Humidity, fault),
            ],
        }
    }

    /// Start signal, acknowledgement and 40 data bits, MSB first.
    pub fn read_frame(&mut self) -> Result<[u8; 5], SensorFault> {
        self.bus.drive_low()?;
        self.bus.delay_ms(START_LOW_MS);

        self.bus.frame(|bus| {
            bus.release()?;

            bus.expect_edge(Level::Low, ACK_WINDOW_US)?;
            bus.expect_edge(Level::High, ACK_WINDOW_US)?;
            bus.expect_edge(Level::Low, ACK_WINDOW_US)?;

            let mut frame = [0u8; 5];
            for bit in 0..40 {
                bus.expect_edge(Level::High, BIT_WINDOW_US)?;
                let one = bus.read_bit(BIT_SAMPLE_US)?;
                if one {
                    bus.expect_edge(Level::Low, BIT_WINDOW_US)?;
                }
                let byte = &mut frame[bit / 8];
                *byte = (*byte << 1) | u8::from(one);
            }
            Ok(frame)
        })
    }
}
