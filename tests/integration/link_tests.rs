//! Background reconnection driven by radio events from the simulated
//! station.

use aquamon::adapters::wifi::{SimAccessPoint, WifiAdapter};
use aquamon::app::ports::WifiPort;
use aquamon::network::{
    ConnectivityFlag, LinkEvent, LinkEvents, NetworkSelector, ReconnectWorker, WifiCredential,
};
use aquamon::retry::RetryPolicy;

use crate::mock_hw::MockClock;

fn selector() -> NetworkSelector {
    let mut networks = heapless::Vec::new();
    networks
        .push(WifiCredential::new("PondNet", "lilypad42").unwrap())
        .unwrap();
    networks
        .push(WifiCredential::new("Barn", "hayloft99").unwrap())
        .unwrap();
    NetworkSelector::new(
        networks,
        heapless::String::new(),
        RetryPolicy::new(3, 500, 2),
        10_000,
    )
}

fn pond() -> SimAccessPoint {
    SimAccessPoint {
        ssid: "PondNet",
        password: "lilypad42",
        rssi: -55,
    }
}

fn barn() -> SimAccessPoint {
    SimAccessPoint {
        ssid: "Barn",
        password: "hayloft99",
        rssi: -72,
    }
}

/// Drain queued events through the worker until it asks to stop.
fn pump<W: WifiPort>(worker: &mut ReconnectWorker<'_, W, MockClock>, events: &LinkEvents) {
    while let Some(event) = events.try_next() {
        if !worker.handle(event) {
            break;
        }
    }
}

#[test]
fn dropped_link_fails_over_to_next_network() {
    static EVENTS: LinkEvents = LinkEvents::new();
    let mut clock = MockClock::new();
    let mut wifi = WifiAdapter::simulated(vec![pond()]).with_events(&EVENTS);

    let first = selector().select_and_connect(&mut wifi, &mut clock).unwrap();
    assert_eq!(first.ssid.as_str(), "PondNet");

    wifi.drop_link();
    wifi.add_access_point(barn());
    EVENTS.notify(LinkEvent::Shutdown);

    let link = ConnectivityFlag::new(false);
    let mut worker = ReconnectWorker::new(wifi, clock.clone(), selector(), link.clone(), &EVENTS);
    pump(&mut worker, &EVENTS);

    assert!(link.is_connected());
    let wifi = worker.into_wifi();
    assert_eq!(wifi.connected_ssid(), Some("Barn"));
    assert_eq!(wifi.connect_attempts(), 2);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn reconnect_backs_off_until_shutdown() {
    static EVENTS: LinkEvents = LinkEvents::new();
    let clock = MockClock::new();
    let wifi = WifiAdapter::simulated(Vec::new()).with_events(&EVENTS);

    EVENTS.notify(LinkEvent::Disconnected);
    EVENTS.notify(LinkEvent::Shutdown);

    let link = ConnectivityFlag::new(true);
    let mut worker = ReconnectWorker::new(wifi, clock.clone(), selector(), link.clone(), &EVENTS);
    pump(&mut worker, &EVENTS);

    assert!(!link.is_connected());
    // Two scan retries, then the first reconnect backoff.
    assert_eq!(clock.sleeps(), vec![500, 1000, 2000]);
    assert_eq!(worker.into_wifi().connect_attempts(), 0);
}

#[test]
fn stale_disconnect_is_ignored() {
    static EVENTS: LinkEvents = LinkEvents::new();
    let mut clock = MockClock::new();
    let mut wifi = WifiAdapter::simulated(vec![pond()]).with_events(&EVENTS);
    selector().select_and_connect(&mut wifi, &mut clock).unwrap();

    EVENTS.notify(LinkEvent::Disconnected);

    let link = ConnectivityFlag::new(false);
    let mut worker = ReconnectWorker::new(wifi, clock.clone(), selector(), link.clone(), &EVENTS);
    pump(&mut worker, &EVENTS);

    assert!(link.is_connected());
    assert_eq!(worker.into_wifi().connect_attempts(), 1);
}

#[test]
fn run_returns_on_shutdown() {
    static EVENTS: LinkEvents = LinkEvents::new();
    let wifi = WifiAdapter::simulated(vec![pond()]);
    EVENTS.notify(LinkEvent::Connected);
    EVENTS.notify(LinkEvent::Shutdown);

    let link = ConnectivityFlag::new(false);
    ReconnectWorker::new(wifi, MockClock::new(), selector(), link.clone(), &EVENTS).run();
    assert!(link.is_connected());
}
