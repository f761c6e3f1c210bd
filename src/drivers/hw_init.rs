//! One-shot hardware peripheral initialization.
//!
//! Configures the ADC1 sensor channels (with curve-fitting calibration when
//! the chip has eFuse data) and the relay outputs using raw ESP-IDF sys
//! calls.  Called once from `main()` before the first cycle.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the first cycle; single-threaded.
    unsafe {
        init_adc()?;
        init_relay_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// One calibration handle per sensor channel; null when the chip has no
/// curve-fitting eFuse data.
#[cfg(target_os = "espidf")]
static mut ADC1_CALI: [adc_cali_handle_t; 4] = [core::ptr::null_mut(); 4];

/// Full-scale input at 12 dB attenuation, used when uncalibrated.
#[cfg(target_os = "espidf")]
const UNCALIBRATED_FULL_SCALE_MV: u32 = 3100;

#[cfg(target_os = "espidf")]
fn cali_slot(channel: u8) -> Option<usize> {
    pins::ANALOG_CHANNELS.iter().position(|&c| c == channel)
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for (slot, &channel) in pins::ANALOG_CHANNELS.iter().enumerate() {
        let ret = unsafe { adc_oneshot_config_channel(ADC1_HANDLE, channel as u32, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcInitFailed(ret));
        }

        let cali_cfg = adc_cali_curve_fitting_config_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            chan: channel as u32,
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: ADC1_CALI slots are only written here, once at boot.
        let ret = unsafe {
            adc_cali_create_scheme_curve_fitting(&cali_cfg, &raw mut ADC1_CALI[slot])
        };
        if ret != ESP_OK as i32 {
            warn!("hw_init: ADC1 CH{} uncalibrated (rc={})", channel, ret);
        }
    }

    info!("hw_init: ADC1 configured (CH5=pH, CH6=DO, CH7=turbidity, CH8=NH3)");
    Ok(())
}

/// One conversion on `channel`, in millivolts.  Errors carry the IDF code.
#[cfg(target_os = "espidf")]
pub fn adc1_read_mv(channel: u8) -> Result<u32, i32> {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE is written once during init_adc() before this
    // function is called; single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel as u32, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(ret);
    }

    // SAFETY: same single-writer contract as ADC1_HANDLE.
    let cali = cali_slot(channel).map_or(core::ptr::null_mut(), |s| unsafe { ADC1_CALI[s] });
    if cali.is_null() {
        return Ok(raw.max(0) as u32 * UNCALIBRATED_FULL_SCALE_MV / 4095);
    }
    let mut mv: i32 = 0;
    let ret = unsafe { adc_cali_raw_to_voltage(cali, raw, &mut mv) };
    if ret != ESP_OK as i32 {
        return Err(ret);
    }
    Ok(mv.max(0) as u32)
}

/// Simulation: each sensor sits at a healthy mid-range value.
#[cfg(not(target_os = "espidf"))]
pub fn adc1_read_mv(channel: u8) -> Result<u32, i32> {
    match channel {
        pins::PH_ADC_CHANNEL => Ok(2500),
        pins::DO_ADC_CHANNEL => Ok(35),
        pins::TURBIDITY_ADC_CHANNEL => Ok(10),
        pins::AMMONIA_ADC_CHANNEL => Ok(2),
        _ => Err(-1),
    }
}

// ── Relay outputs ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_relay_outputs() -> Result<(), HwInitError> {
    for &pin in &pins::RELAY_OUTPUTS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: relay outputs configured, all off");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_relay_outputs(). Main-loop only.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}
