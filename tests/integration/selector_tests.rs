//! Network selection: ranking, scan retry and candidate fall-through.

use aquamon::app::ports::WifiError;
use aquamon::error::NetworkError;
use aquamon::network::{NetworkSelector, WifiCredential};
use aquamon::retry::RetryPolicy;

use crate::mock_hw::{MockClock, ScriptedWifi, scan};

fn selector(preferred: &str) -> NetworkSelector {
    let mut networks = heapless::Vec::new();
    for ssid in ["A", "B", "Preferred"] {
        networks
            .push(WifiCredential::new(ssid, "password123").unwrap())
            .unwrap();
    }
    let mut pref = heapless::String::new();
    pref.push_str(preferred).unwrap();
    NetworkSelector::new(networks, pref, RetryPolicy::new(3, 500, 2), 10_000)
}

#[test]
fn tries_preferred_then_strongest() {
    let mut wifi = ScriptedWifi::seeing(&[
        ("A", -50),
        ("Stranger", -20),
        ("B", -40),
        ("Preferred", -85),
    ])
    .accepting(&["A"]);
    let mut clock = MockClock::new();

    let chosen = selector("Preferred")
        .select_and_connect(&mut wifi, &mut clock)
        .unwrap();
    assert_eq!(chosen.ssid.as_str(), "A");
    assert_eq!(wifi.attempts, vec!["Preferred", "B", "A"]);
    assert_eq!(wifi.disconnects, 2);
}

#[test]
fn first_acceptance_wins() {
    let mut wifi = ScriptedWifi::seeing(&[("A", -50), ("B", -40)]).accepting(&["A", "B"]);
    let mut clock = MockClock::new();

    let chosen = selector("").select_and_connect(&mut wifi, &mut clock).unwrap();
    assert_eq!(chosen.ssid.as_str(), "B");
    assert_eq!(wifi.attempts, vec!["B"]);
}

#[test]
fn failed_scans_are_retried_with_backoff() {
    let mut wifi = ScriptedWifi::default().accepting(&["B"]);
    wifi.scans.push_back(Err(WifiError::ScanFailed));
    wifi.scans.push_back(Ok(Vec::new()));
    wifi.scans.push_back(Ok(scan(&[("B", -60)])));
    let mut clock = MockClock::new();

    let chosen = selector("").select_and_connect(&mut wifi, &mut clock).unwrap();
    assert_eq!(chosen.ssid.as_str(), "B");
    assert_eq!(clock.sleeps(), vec![500, 1000]);
}

#[test]
fn only_unknown_networks_in_range() {
    let mut wifi = ScriptedWifi::seeing(&[("Cafe", -30), ("Neighbour", -70)]);
    let mut clock = MockClock::new();

    assert_eq!(
        selector("").select_and_connect(&mut wifi, &mut clock),
        Err(NetworkError::NoKnownNetworks)
    );
    assert!(wifi.attempts.is_empty());
}

#[test]
fn every_candidate_refusing() {
    let mut wifi = ScriptedWifi::seeing(&[("A", -50), ("B", -40)]);
    let mut clock = MockClock::new();

    assert_eq!(
        selector("").select_and_connect(&mut wifi, &mut clock),
        Err(NetworkError::AllCandidatesFailed)
    );
    assert_eq!(wifi.attempts, vec!["B", "A"]);
}

#[test]
fn radio_never_answers() {
    let mut wifi = ScriptedWifi::default();
    for _ in 0..3 {
        wifi.scans.push_back(Err(WifiError::ScanFailed));
    }
    let mut clock = MockClock::new();

    assert_eq!(
        selector("").select_and_connect(&mut wifi, &mut clock),
        Err(NetworkError::ScanFailed)
    );
}
