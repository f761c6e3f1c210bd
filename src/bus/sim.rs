//! Host-side simulation of an open-drain bus line and its clock.
//!
//! Time is virtual: delays advance it exactly and every line poll costs
//! one microsecond, so timeouts terminate deterministically.  Device
//! behaviour is scripted as a queue of [`Waveform`]s; each time the host
//! releases the line after driving it low, the next waveform starts playing
//! from that instant.  With no waveform playing the pull-up holds the line
//! high.

use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use super::Level;
use crate::app::ports::Timebase;

const POLL_COST_US: u64 = 1;

/// Device-driven level segments, relative to the host's release.
#[derive(Debug, Clone, Default)]
pub struct Waveform {
    segments: Vec<(u32, Level)>,
}

impl Waveform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high(mut self, us: u32) -> Self {
        self.segments.push((us, Level::High));
        self
    }

    pub fn low(mut self, us: u32) -> Self {
        self.segments.push((us, Level::Low));
        self
    }

    fn level_at(&self, elapsed_us: u64) -> Level {
        let mut end = 0u64;
        for &(len, level) in &self.segments {
            end += u64::from(len);
            if elapsed_us < end {
                return level;
            }
        }
        Level::High
    }

    /// DHT22 answer to a start signal: acknowledgement then 40 data bits.
    pub fn dht22_response(frame: [u8; 5]) -> Self {
        let mut w = Self::new().high(30).low(80).high(80);
        for byte in frame {
            for i in (0..8).rev() {
                let one = byte & (1 << i) != 0;
                w = w.low(50).high(if one { 70 } else { 26 });
            }
        }
        w.low(50)
    }

    /// 1-Wire presence pulse following a reset.
    pub fn presence() -> Self {
        Self::new().high(30).low(120)
    }

    /// 1-Wire read slot answer.
    pub fn read_slot(bit: bool) -> Self {
        if bit { Self::new() } else { Self::new().low(30) }
    }
}

#[derive(Default)]
struct SimState {
    now_us: u64,
    host_low: bool,
    low_since: u64,
    released_at: u64,
    active: Option<Waveform>,
    script: VecDeque<Waveform>,
    pulses: Vec<u32>,
}

/// Shared handle to one simulated line and its virtual clock.
#[derive(Clone, Default)]
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> SimLine {
        SimLine {
            state: Rc::clone(&self.state),
        }
    }

    pub fn clock(&self) -> SimClock {
        SimClock {
            state: Rc::clone(&self.state),
        }
    }

    /// Queue the device's reaction to the next host release.
    pub fn push_response(&self, waveform: Waveform) {
        self.state.borrow_mut().script.push_back(waveform);
    }

    /// Script a complete DS18B20 conversion: two resets with presence,
    /// four command bytes and a nine-byte scratchpad read.
    pub fn script_ds18b20(&self, scratchpad: [u8; 9]) {
        self.push_response(Waveform::presence());
        for _ in 0..16 {
            self.push_response(Waveform::new());
        }
        self.push_response(Waveform::presence());
        for _ in 0..16 {
            self.push_response(Waveform::new());
        }
        for byte in scratchpad {
            for i in 0..8 {
                self.push_response(Waveform::read_slot(byte & (1 << i) != 0));
            }
        }
    }

    /// Durations of every low pulse the host has driven, in order.
    pub fn host_pulses(&self) -> Vec<u32> {
        self.state.borrow().pulses.clone()
    }

    pub fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }
}

/// The simulated pin handed to a [`BitBanger`](super::BitBanger).
pub struct SimLine {
    state: Rc<RefCell<SimState>>,
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        if !s.host_low {
            s.host_low = true;
            s.low_since = s.now_us;
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        if s.host_low {
            s.host_low = false;
            let pulse = (s.now_us - s.low_since) as u32;
            s.pulses.push(pulse);
            s.released_at = s.now_us;
            s.active = s.script.pop_front();
        }
        Ok(())
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut s = self.state.borrow_mut();
        s.now_us += POLL_COST_US;
        if s.host_low {
            return Ok(false);
        }
        let elapsed = s.now_us - s.released_at;
        let level = s
            .active
            .as_ref()
            .map_or(Level::High, |w| w.level_at(elapsed));
        Ok(level == Level::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Virtual clock sharing time with its [`SimLine`].
#[derive(Clone)]
pub struct SimClock {
    state: Rc<RefCell<SimState>>,
}

impl Timebase for SimClock {
    fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }

    fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().now_us += u64::from(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().now_us += u64::from(ms) * 1000;
    }
}
