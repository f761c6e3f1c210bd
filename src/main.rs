//! AquaMon Firmware: Main Entry Point
//!
//! Hexagonal architecture: one monitoring thread runs the
//! sample → control → upload → alert cycle; a second thread on the
//! protocol core keeps the Wi-Fi link up.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorHub + BoardAdc  RelayOutputs   NvsAdapter   Esp32Time   │
//! │  (SensorPort, AdcPort) (OutputPort)   (Config+Secrets)         │
//! │  WifiAdapter           EspHttpConnector  LogEventSink Watchdog │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │         MonitorService (pure logic, app core)          │    │
//! │  │  control · TelemetryUploader · AlertDeduplicator       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ReconnectWorker (core 0) ◀── LinkEvents ◀── Wi-Fi callbacks   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::IOPin;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use aquamon::adapters::hardware::{self, BoardAdc, RelayOutputs};
use aquamon::adapters::http::EspHttpConnector;
use aquamon::adapters::log_sink::LogEventSink;
use aquamon::adapters::nvs::NvsAdapter;
use aquamon::adapters::time::Esp32TimeAdapter;
use aquamon::adapters::wifi::WifiAdapter;
use aquamon::app::ports::ConfigPort;
use aquamon::app::service::MonitorService;
use aquamon::bus::BitBanger;
use aquamon::config::SystemConfig;
use aquamon::drivers::task_pin::{Core, spawn_on_core};
use aquamon::drivers::watchdog::Watchdog;
use aquamon::drivers::hw_init;
use aquamon::network::{ConnectivityFlag, LinkEvent, LinkEvents, NetworkSelector, ReconnectWorker};
use aquamon::telemetry::{ApiCredentials, TelemetryUploader};

/// Radio callbacks → reconnect worker.
static LINK_EVENTS: LinkEvents = LinkEvents::new();

const LINK_TASK_PRIORITY: u8 = 5;
const LINK_TASK_STACK_KB: usize = 8;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AquaMon v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config and secrets from NVS ───────────────────
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut nvs = NvsAdapter::new(&nvs_partition);
    let provisioned = nvs.provision_build_secrets();
    if provisioned > 0 {
        info!("Provisioned {} collector secret(s) from build", provisioned);
    }
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Peripherals and liveness ───────────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow!("peripheral init: {}", e))?;
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let time = Esp32TimeAdapter::new();
    let mut watchdog = Watchdog::new();

    // ── 4. Wi-Fi and background reconnect ─────────────────────
    let mut wifi = WifiAdapter::new(
        peripherals.modem,
        sysloop,
        nvs_partition.clone(),
        &LINK_EVENTS,
    )?;
    let selector = NetworkSelector::from_config(&config);
    let link = ConnectivityFlag::new(false);

    let mut boot_clock = time.clone();
    match selector.select_and_connect(&mut wifi, &mut boot_clock) {
        Ok(net) => {
            link.set_connected(true);
            info!("Wi-Fi: online via '{}' ({} dBm)", net.ssid, net.rssi);
        }
        Err(e) => {
            warn!("Wi-Fi: {} at boot, retrying in background", e);
            LINK_EVENTS.notify(LinkEvent::Disconnected);
        }
    }
    watchdog.feed();

    let worker = ReconnectWorker::new(wifi, time.clone(), selector, link.clone(), &LINK_EVENTS);
    let _link_task = spawn_on_core(
        Core::Pro,
        LINK_TASK_PRIORITY,
        LINK_TASK_STACK_KB,
        "link\0",
        move || worker.run(),
    )?;

    // ── 5. Uplink ─────────────────────────────────────────────
    let credentials = ApiCredentials::load(&nvs).unwrap_or_else(|e| {
        warn!("Collector credentials unavailable ({}), uploads unauthenticated", e);
        ApiCredentials::default()
    });
    let mut uplink = TelemetryUploader::new(
        EspHttpConnector::new(config.http_timeout_ms),
        time.clone(),
        link,
        credentials,
        &config,
    );

    // ── 6. Sensors and outputs ────────────────────────────────
    // GPIO4 = DHT22, GPIO5 = DS18B20 (see pins.rs)
    let air = hardware::open_drain_bus(peripherals.pins.gpio4.downgrade())?;
    let water = hardware::open_drain_bus(peripherals.pins.gpio5.downgrade())?;
    let mut sensors = hardware::board_sensor_hub(
        BitBanger::new(air, time.clone()),
        BitBanger::new(water, time.clone()),
        BoardAdc,
        time.clone(),
        &config,
    );
    let mut outputs = RelayOutputs::new();
    let mut sink = LogEventSink::new();

    // ── 7. Monitoring loop ────────────────────────────────────
    info!(
        "Monitoring every {} s, collector {}",
        config.sample_period_ms / 1000,
        config.collector_url
    );
    let mut service = MonitorService::new(config);
    let mut clock = time;

    loop {
        let started = clock.uptime_ms();
        service.run_cycle(
            &mut sensors,
            &mut outputs,
            &mut uplink,
            &mut watchdog,
            &mut sink,
        );
        let elapsed = clock.uptime_ms().saturating_sub(started) as u32;
        service.idle_until_next_cycle(elapsed, &mut clock, &mut watchdog);
    }
}
