//! 1-Wire byte layer on top of the bit-timing primitive.
//!
//! Standard-speed slot timings.  Every reset and every byte runs inside one
//! interrupt-free frame; waits between transactions (temperature
//! conversion) do not.

use embedded_hal::digital::{InputPin, OutputPin};

use super::{BitBanger, Level};
use crate::app::ports::Timebase;
use crate::error::SensorFault;

const RESET_LOW_US: u32 = 480;
/// Presence pulse must start within this window after release.
const PRESENCE_START_US: u32 = 60;
/// Longest presence pulse a healthy device produces.
const PRESENCE_MAX_US: u32 = 240;
/// Total recovery slot after the reset pulse.
const RESET_RECOVERY_US: u64 = 480;

const WRITE_ONE_LOW_US: u32 = 6;
const WRITE_ONE_RELEASE_US: u32 = 64;
const WRITE_ZERO_LOW_US: u32 = 60;
const WRITE_ZERO_RELEASE_US: u32 = 10;

const READ_INIT_LOW_US: u32 = 3;
const READ_SAMPLE_US: u32 = 10;
const READ_RECOVERY_US: u32 = 53;

/// Byte-level access to a 1-Wire bus.
pub trait OneWireBus {
    /// Issue a reset pulse; `Ok(true)` if a device answered with presence.
    fn reset(&mut self) -> Result<bool, SensorFault>;

    /// Write one byte, least significant bit first.
    fn write_byte(&mut self, byte: u8) -> Result<(), SensorFault>;

    /// Read one byte, least significant bit first.
    fn read_byte(&mut self) -> Result<u8, SensorFault>;

    /// Yielding wait between transactions.
    fn sleep_ms(&mut self, ms: u32);
}

impl<P, T> OneWireBus for BitBanger<P, T>
where
    P: InputPin + OutputPin,
    T: Timebase,
{
    fn reset(&mut self) -> Result<bool, SensorFault> {
        self.frame(|bus| {
            bus.drive_low()?;
            bus.delay_us(RESET_LOW_US);
            bus.release()?;
            let released = bus.now_us();

            if !bus.wait_for_edge(Level::Low, PRESENCE_START_US)? {
                return Ok(false);
            }
            // A line held low past the presence window is a shorted bus.
            bus.expect_edge(Level::High, PRESENCE_MAX_US)?;

            let spent = bus.now_us().saturating_sub(released);
            let rest = RESET_RECOVERY_US.saturating_sub(spent) as u32;
            bus.delay_us(rest);
            Ok(true)
        })
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorFault> {
        self.frame(|bus| {
            for i in 0..8 {
                if byte & (1 << i) != 0 {
                    bus.write_bit(WRITE_ONE_LOW_US, WRITE_ONE_RELEASE_US)?;
                } else {
                    bus.write_bit(WRITE_ZERO_LOW_US, WRITE_ZERO_RELEASE_US)?;
                }
            }
            Ok(())
        })
    }

    fn read_byte(&mut self) -> Result<u8, SensorFault> {
        self.frame(|bus| {
            let mut byte = 0u8;
            for i in 0..8 {
                bus.write_bit(READ_INIT_LOW_US, 0)?;
                if bus.read_bit(READ_SAMPLE_US)? {
                    byte |= 1 << i;
                }
                bus.delay_us(READ_RECOVERY_US);
            }
            Ok(byte)
        })
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.delay_ms(ms);
    }
}
