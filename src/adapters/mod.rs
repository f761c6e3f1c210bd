//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements            | Connects to                  |
//! |------------|-----------------------|------------------------------|
//! | `hardware` | AdcPort, OutputPort   | ESP32 ADC1, relay GPIOs      |
//! |            | (sensor hub wiring)   | DHT22 / DS18B20 bus pins     |
//! | `http`     | HttpConnector         | ESP-IDF HTTP(S) client       |
//! | `log_sink` | EventSink             | Serial log output            |
//! | `nvs`      | ConfigPort            | NVS / in-memory store        |
//! |            | SecretStore           |                              |
//! | `time`     | Timebase              | ESP32 system timer           |
//! | `wifi`     | WifiPort              | ESP-IDF WiFi STA             |

pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
