//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! [`BoardAdc`] and [`RelayOutputs`] expose the ADC1 sensor channels and the
//! relay GPIOs through [`AdcPort`] and [`OutputPort`]; [`board_sensor_hub`]
//! wires both single-wire buses and the analog sampler into one
//! [`SensorHub`].  On non-espidf targets the underlying `hw_init` calls use
//! simulation stubs.

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{AdcPort, OutputPort, Timebase};
use crate::bus::BitBanger;
use crate::config::SystemConfig;
use crate::drivers::hw_init;
use crate::error::SensorFault;
use crate::sensors::analog::{AnalogSampler, board_channels};
use crate::sensors::dht22::Dht22;
use crate::sensors::ds18b20::Ds18b20;
use crate::sensors::SensorHub;

// ── ADC ───────────────────────────────────────────────────────

/// ADC1 in one-shot mode, returning calibrated millivolts.
#[derive(Debug, Default)]
pub struct BoardAdc;

impl AdcPort for BoardAdc {
    fn read_raw_adc(&mut self, channel: u8) -> Result<u32, SensorFault> {
        hw_init::adc1_read_mv(channel).map_err(|rc| {
            warn!("ADC1 CH{} read failed (rc={})", channel, rc);
            SensorFault::AdcReadFailed
        })
    }
}

// ── Relays ────────────────────────────────────────────────────

/// Relay outputs configured by [`hw_init::init_peripherals`].
#[derive(Debug, Default)]
pub struct RelayOutputs {
    /// Last level written per pin, for diagnostics.
    levels: heapless::Vec<(i32, bool), 4>,
}

impl RelayOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, pin: i32) -> Option<bool> {
        self.levels.iter().find(|(p, _)| *p == pin).map(|(_, l)| *l)
    }
}

impl OutputPort for RelayOutputs {
    fn set_pin_level(&mut self, pin: i32, high: bool) {
        hw_init::gpio_write(pin, high);
        if let Some(slot) = self.levels.iter_mut().find(|(p, _)| *p == pin) {
            slot.1 = high;
        } else if self.levels.push((pin, high)).is_err() {
            warn!("RelayOutputs: GPIO{} not tracked", pin);
        }
    }
}

// ── Sensor buses ──────────────────────────────────────────────

/// The DHT22 / DS18B20 data line as an open-drain pin with pull-up.
#[cfg(target_os = "espidf")]
pub type BusPin = esp_idf_hal::gpio::PinDriver<
    'static,
    esp_idf_hal::gpio::AnyIOPin,
    esp_idf_hal::gpio::InputOutput,
>;

/// Configure `pin` as an idle-high open-drain bus line.
#[cfg(target_os = "espidf")]
pub fn open_drain_bus(pin: esp_idf_hal::gpio::AnyIOPin) -> Result<BusPin, esp_idf_svc::sys::EspError> {
    let mut line = esp_idf_hal::gpio::PinDriver::input_output_od(pin)?;
    line.set_pull(esp_idf_hal::gpio::Pull::Up)?;
    line.set_high()?;
    Ok(line)
}

/// Assemble every sensor engine on the board.
pub fn board_sensor_hub<P, T, A>(
    air_bus: BitBanger<P, T>,
    water_bus: BitBanger<P, T>,
    adc: A,
    time: T,
    cfg: &SystemConfig,
) -> SensorHub<P, T, BitBanger<P, T>, A>
where
    P: InputPin + OutputPin,
    T: Timebase,
    A: AdcPort,
{
    SensorHub::new(
        Dht22::new(air_bus),
        Ds18b20::new(water_bus),
        AnalogSampler::new(adc, time, cfg.adc_samples, cfg.adc_sample_interval_ms),
        board_channels(&cfg.calibration),
    )
}
