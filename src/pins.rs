//! GPIO / peripheral pin assignments for the AquaMon node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Single-wire sensor buses (open-drain, 4.7 kΩ external pull-up)
// ---------------------------------------------------------------------------

/// DHT22 air temperature / humidity data line.
pub const DHT22_GPIO: i32 = 4;
/// DS18B20 water temperature 1-Wire line.
pub const DS18B20_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Analog sensors (ADC1, 12 dB attenuation, curve-fitting calibration)
// ---------------------------------------------------------------------------

/// GPIO6
pub const PH_ADC_CHANNEL: u8 = 5;
/// GPIO7
pub const DO_ADC_CHANNEL: u8 = 6;
/// GPIO8
pub const TURBIDITY_ADC_CHANNEL: u8 = 7;
/// GPIO9
pub const AMMONIA_ADC_CHANNEL: u8 = 8;

pub const ANALOG_CHANNELS: [u8; 4] = [
    PH_ADC_CHANNEL,
    DO_ADC_CHANNEL,
    TURBIDITY_ADC_CHANNEL,
    AMMONIA_ADC_CHANNEL,
];

// ---------------------------------------------------------------------------
// Relay outputs (active HIGH)
// ---------------------------------------------------------------------------

/// Water pump relay, switched on high ammonia.  GPIO6 is taken by the pH
/// sensor (ADC1 channel 5).
pub const PUMP_GPIO: i32 = 11;
/// pH dosing relay.
pub const PH_RELAY_GPIO: i32 = 10;
pub const AERATOR_GPIO: i32 = 12;
pub const FILTER_GPIO: i32 = 13;

pub const RELAY_OUTPUTS: [i32; 4] = [PUMP_GPIO, PH_RELAY_GPIO, AERATOR_GPIO, FILTER_GPIO];
