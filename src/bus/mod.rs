//! Bit-timing primitive for single-wire open-drain sensor buses.
//!
//! Both sensor protocols on the node (DHT22 pulse-width framing and
//! DS18B20 1-Wire) are built from three operations on one pin:
//!
//! | Operation        | Meaning                                             |
//! |------------------|-----------------------------------------------------|
//! | `write_bit`      | drive low for `low_us`, release, wait `high_us`     |
//! | `read_bit`       | wait `sample_after_us`, sample the line             |
//! | `wait_for_edge`  | poll until the line reads `level`, bounded          |
//!
//! `wait_for_edge` is the only waiting primitive; it reports a missed
//! transition as `false` and never blocks longer than its window.  Callers
//! that need interrupt-free timing wrap a whole frame in [`BitBanger::frame`].
//!
//! The pin is any `embedded-hal` 1.0 pin that is both input and output,
//! e.g. an ESP-IDF `PinDriver` in open-drain mode with the pull-up enabled.

pub mod crc;
pub mod onewire;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::Timebase;
use crate::error::SensorFault;

pub use onewire::OneWireBus;

/// Electrical level of the bus line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Owns one bus pin and the clock used to time it.
pub struct BitBanger<P, T> {
    pin: P,
    time: T,
}

impl<P, T> BitBanger<P, T>
where
    P: InputPin + OutputPin,
    T: Timebase,
{
    pub fn new(pin: P, time: T) -> Self {
        Self { pin, time }
    }

    /// Pull the line low.
    pub fn drive_low(&mut self) -> Result<(), SensorFault> {
        self.pin.set_low().map_err(|_| SensorFault::PinIo)
    }

    /// Stop driving; the pull-up (or the device) owns the level.
    pub fn release(&mut self) -> Result<(), SensorFault> {
        self.pin.set_high().map_err(|_| SensorFault::PinIo)
    }

    pub fn level(&mut self) -> Result<Level, SensorFault> {
        match self.pin.is_high() {
            Ok(true) => Ok(Level::High),
            Ok(false) => Ok(Level::Low),
            Err(_) => Err(SensorFault::PinIo),
        }
    }

    /// Drive low for `low_us`, release, then hold off for `high_us`.
    pub fn write_bit(&mut self, low_us: u32, high_us: u32) -> Result<(), SensorFault> {
        self.drive_low()?;
        self.time.delay_us(low_us);
        self.release()?;
        if high_us > 0 {
            self.time.delay_us(high_us);
        }
        Ok(())
    }

    /// Wait `sample_after_us` and sample the line; `true` means high.
    pub fn read_bit(&mut self, sample_after_us: u32) -> Result<bool, SensorFault> {
        if sample_after_us > 0 {
            self.time.delay_us(sample_after_us);
        }
        Ok(self.level()? == Level::High)
    }

    /// Busy-poll until the line reads `level`.
    ///
    /// Returns `Ok(false)` once `timeout_us` has elapsed without the
    /// transition.  Hitting the target level on the final poll still counts.
    pub fn wait_for_edge(&mut self, level: Level, timeout_us: u32) -> Result<bool, SensorFault> {
        let start = self.time.now_us();
        loop {
            if self.level()? == level {
                return Ok(true);
            }
            if self.time.now_us().saturating_sub(start) >= u64::from(timeout_us) {
                return Ok(false);
            }
        }
    }

    /// [`wait_for_edge`](Self::wait_for_edge) with a missed transition
    /// mapped to [`SensorFault::ProtocolTimeout`].
    pub fn expect_edge(&mut self, level: Level, timeout_us: u32) -> Result<(), SensorFault> {
        if self.wait_for_edge(level, timeout_us)? {
            Ok(())
        } else {
            Err(SensorFault::ProtocolTimeout)
        }
    }

    /// Run `f` with interrupts masked so no scheduler or ISR activity can
    /// stretch a timing window.  Keep frames short (a few milliseconds).
    pub fn frame<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        critical_section::with(|_| f(self))
    }

    pub fn delay_us(&mut self, us: u32) {
        self.time.delay_us(us);
    }

    /// Yielding delay; never call from inside [`frame`](Self::frame).
    pub fn delay_ms(&mut self, ms: u32) {
        self.time.delay_ms(ms);
    }

    pub fn now_us(&self) -> u64 {
        self.time.now_us()
    }

    pub fn into_parts(self) -> (P, T) {
        (self.pin, self.time)
    }
}
