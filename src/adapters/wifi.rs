//! WiFi station-mode adapter.
//!
//! Implements [`WifiPort`]: the hexagonal boundary the network selector
//! and the reconnect worker drive.  Link changes reported by the radio are
//! forwarded to a [`LinkEvents`] queue.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` plus system event
//!   loop subscriptions for station disconnects and DHCP leases.
//! - **all other targets**: a scripted radio with a fixed list of access
//!   points, for host-side tests.

#[cfg(target_os = "espidf")]
use core::time::Duration;

use log::{info, warn};

use crate::app::ports::{ScanResult, WifiError, WifiPort};
use crate::network::{LinkEvent, LinkEvents};

#[cfg(target_os = "espidf")]
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::netif::IpEvent;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{BlockingWifi, EspWifi, WifiEvent};

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WifiAdapter {
    wifi: BlockingWifi<EspWifi<'static>>,
    _sta_events: EspSubscription<'static, System>,
    _ip_events: EspSubscription<'static, System>,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    /// Start the radio in station mode without associating.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        events: &'static LinkEvents,
    ) -> Result<Self, EspError> {
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sysloop.clone(), Some(nvs))?,
            sysloop.clone(),
        )?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;

        let sta_events = sysloop.subscribe::<WifiEvent, _>(move |event| {
            if let WifiEvent::StaDisconnected(_) = event {
                events.notify(LinkEvent::Disconnected);
            }
        })?;
        let ip_events = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let IpEvent::DhcpIpAssigned(_) = event {
                events.notify(LinkEvent::Connected);
            }
        })?;

        info!("WiFi: station started");
        Ok(Self {
            wifi,
            _sta_events: sta_events,
            _ip_events: ip_events,
        })
    }
}

#[cfg(target_os = "espidf")]
impl WifiPort for WifiAdapter {
    fn scan(&mut self) -> Result<Vec<ScanResult>, WifiError> {
        let aps = self.wifi.scan().map_err(|e| {
            warn!("WiFi: scan failed ({})", e);
            WifiError::ScanFailed
        })?;
        Ok(aps
            .iter()
            .filter_map(|ap| {
                let mut ssid = heapless::String::new();
                ssid.push_str(ap.ssid.as_str()).ok()?;
                Some(ScanResult {
                    ssid,
                    rssi: ap.signal_strength,
                })
            })
            .collect())
    }

    fn connect(&mut self, ssid: &str, password: &str, timeout_ms: u32) -> Result<(), WifiError> {
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| WifiError::ConnectFailed)?,
            password: password.try_into().map_err(|_| WifiError::ConnectFailed)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        self.wifi
            .set_configuration(&cfg)
            .map_err(|_| WifiError::ConnectFailed)?;
        self.wifi
            .wifi_mut()
            .connect()
            .map_err(|_| WifiError::ConnectFailed)?;

        let timeout = Some(Duration::from_millis(u64::from(timeout_ms)));
        self.wifi
            .wifi_wait_while(|| self.wifi.is_connected().map(|c| !c), timeout)
            .map_err(|_| WifiError::Timeout)?;
        self.wifi
            .ip_wait_while(|| self.wifi.is_up().map(|up| !up), timeout)
            .map_err(|_| WifiError::Timeout)?;
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed ({})", e);
        }
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated station
// ───────────────────────────────────────────────────────────────

/// One access point the simulated radio can see.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimAccessPoint {
    pub ssid: &'static str,
    pub password: &'static str,
    pub rssi: i8,
}

#[cfg(not(target_os = "espidf"))]
pub struct WifiAdapter {
    aps: Vec<SimAccessPoint>,
    connected: Option<&'static str>,
    events: Option<&'static LinkEvents>,
    connect_attempts: u32,
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn simulated(aps: Vec<SimAccessPoint>) -> Self {
        Self {
            aps,
            connected: None,
            events: None,
            connect_attempts: 0,
        }
    }

    /// Post link changes to `events`, as the radio driver would.
    pub fn with_events(mut self, events: &'static LinkEvents) -> Self {
        self.events = Some(events);
        self
    }

    /// The access point vanishes while associated.
    pub fn drop_link(&mut self) {
        if let Some(ssid) = self.connected.take() {
            info!("WiFi(sim): '{}' went away", ssid);
            self.aps.retain(|ap| ap.ssid != ssid);
            self.notify(LinkEvent::Disconnected);
        }
    }

    /// An access point comes into range.
    pub fn add_access_point(&mut self, ap: SimAccessPoint) {
        self.aps.push(ap);
    }

    pub fn connected_ssid(&self) -> Option<&'static str> {
        self.connected
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    fn notify(&self, event: LinkEvent) {
        if let Some(events) = self.events {
            events.notify(event);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiPort for WifiAdapter {
    fn scan(&mut self) -> Result<Vec<ScanResult>, WifiError> {
        Ok(self
            .aps
            .iter()
            .filter_map(|ap| {
                let mut ssid = heapless::String::new();
                ssid.push_str(ap.ssid).ok()?;
                Some(ScanResult { ssid, rssi: ap.rssi })
            })
            .collect())
    }

    fn connect(&mut self, ssid: &str, password: &str, _timeout_ms: u32) -> Result<(), WifiError> {
        self.connect_attempts += 1;
        let ap = self
            .aps
            .iter()
            .find(|ap| ap.ssid == ssid)
            .ok_or(WifiError::Timeout)?;
        if ap.password != password {
            warn!("WiFi(sim): '{}' rejected credentials", ssid);
            return Err(WifiError::ConnectFailed);
        }
        self.connected = Some(ap.ssid);
        info!("WiFi(sim): associated with '{}'", ap.ssid);
        self.notify(LinkEvent::Connected);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected.take().is_some() {
            self.notify(LinkEvent::Disconnected);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.is_some()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
