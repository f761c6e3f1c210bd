//! ESP32 time adapter.
//!
//! Implements [`Timebase`] for the bit-timing primitive, the analog sampler,
//! retry back-off and the idle loop.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (microsecond,
//!   monotonic), ROM busy-wait for sub-millisecond delays and a FreeRTOS
//!   yielding sleep for everything else.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `thread::sleep` for host-side simulation.
//!
//! Each engine owns its own clone of the adapter.

use crate::app::ports::Timebase;

/// Time adapter for the ESP32-S3 platform.
#[derive(Debug, Clone)]
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot, for cycle bookkeeping.
    pub fn uptime_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

#[cfg(target_os = "espidf")]
impl Timebase for Esp32TimeAdapter {
    fn now_us(&self) -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    fn delay_us(&mut self, us: u32) {
        esp_idf_hal::delay::Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl Timebase for Esp32TimeAdapter {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
