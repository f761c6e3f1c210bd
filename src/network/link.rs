//! Link state shared between the radio event handler, the background
//! reconnect worker and the monitoring cycle.
//!
//! ```text
//!   Wi-Fi driver ──LinkEvent──▶ LinkEvents ──▶ ReconnectWorker
//!                                                   │
//!                                     ConnectivityFlag (AtomicBool)
//!                                                   │
//!                                  TelemetryUploader ◀┘
//! ```
//!
//! The flag is a single boolean transition, so plain atomic loads and
//! stores are enough; no lock is shared with the sampling path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use super::selector::NetworkSelector;
use crate::app::ports::{Timebase, WifiPort};

/// First reconnect backoff.
const INITIAL_BACKOFF_SECS: u32 = 2;
/// Reconnect backoff ceiling.
const MAX_BACKOFF_SECS: u32 = 60;
/// Pending link events before new ones are dropped.
const EVENT_DEPTH: usize = 4;

// ───────────────────────────────────────────────────────────────
// Connectivity flag
// ───────────────────────────────────────────────────────────────

/// "Connected" flag shared by cheap clones.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityFlag(Arc<AtomicBool>);

impl ConnectivityFlag {
    pub fn new(connected: bool) -> Self {
        Self(Arc::new(AtomicBool::new(connected)))
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.store(connected, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Link events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    /// Stop the reconnect worker.
    Shutdown,
}

/// Bounded event queue from the radio callback to the reconnect worker.
///
/// `const`-constructible so it can live in a `static`.
pub struct LinkEvents {
    channel: Channel<CriticalSectionRawMutex, LinkEvent, EVENT_DEPTH>,
}

impl Default for LinkEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkEvents {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Non-blocking; safe to call from the driver's event callback.
    pub fn notify(&self, event: LinkEvent) {
        if self.channel.try_send(event).is_err() {
            warn!("Link: event queue full, dropped {:?}", event);
        }
    }

    pub async fn next(&self) -> LinkEvent {
        self.channel.receive().await
    }

    pub fn try_next(&self) -> Option<LinkEvent> {
        self.channel.try_receive().ok()
    }
}

// ───────────────────────────────────────────────────────────────
// Reconnect worker
// ───────────────────────────────────────────────────────────────

/// Background activity that re-runs network selection after a drop.
///
/// Runs on its own thread so the sampling cycle never waits on it; the
/// cycle only observes the [`ConnectivityFlag`].
pub struct ReconnectWorker<'a, W, T> {
    wifi: W,
    time: T,
    selector: NetworkSelector,
    link: ConnectivityFlag,
    events: &'a LinkEvents,
}

impl<'a, W: WifiPort, T: Timebase> ReconnectWorker<'a, W, T> {
    pub fn new(
        wifi: W,
        time: T,
        selector: NetworkSelector,
        link: ConnectivityFlag,
        events: &'a LinkEvents,
    ) -> Self {
        Self {
            wifi,
            time,
            selector,
            link,
            events,
        }
    }

    /// Process one event.  Returns `false` once the worker should stop.
    pub fn handle(&mut self, event: LinkEvent) -> bool {
        match event {
            LinkEvent::Connected => {
                self.link.set_connected(true);
                info!("Link: up");
                true
            }
            LinkEvent::Disconnected => {
                if self.wifi.is_connected() {
                    // Stale event from a superseded association.
                    return true;
                }
                self.link.set_connected(false);
                warn!("Link: down, reconnecting in background");
                self.reconnect()
            }
            LinkEvent::Shutdown => false,
        }
    }

    /// Retry selection with exponential backoff until a network accepts us
    /// or a shutdown is requested.
    fn reconnect(&mut self) -> bool {
        let mut backoff_secs = INITIAL_BACKOFF_SECS;
        loop {
            match self.selector.select_and_connect(&mut self.wifi, &mut self.time) {
                Ok(candidate) => {
                    self.link.set_connected(true);
                    info!("Link: restored via '{}'", candidate.ssid);
                    return true;
                }
                Err(e) => {
                    warn!("Link: reconnect failed ({}), next try in {}s", e, backoff_secs);
                }
            }

            self.time.delay_ms(backoff_secs * 1000);
            backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);

            match self.events.try_next() {
                Some(LinkEvent::Shutdown) => return false,
                Some(LinkEvent::Connected) => {
                    self.link.set_connected(true);
                    info!("Link: up while backing off");
                    return true;
                }
                Some(LinkEvent::Disconnected) | None => {}
            }
        }
    }

    /// Block the calling thread, handling events until [`LinkEvent::Shutdown`].
    pub fn run(mut self) {
        info!("Link: reconnect worker started");
        futures_lite::future::block_on(async {
            loop {
                let event = self.events.next().await;
                if !self.handle(event) {
                    break;
                }
            }
        });
        info!("Link: reconnect worker stopped");
    }

    pub fn into_wifi(self) -> W {
        self.wifi
    }
}
