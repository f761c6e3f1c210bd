//! HTTP client adapter for the collector.
//!
//! Implements [`HttpConnector`] / [`HttpSession`].  Every delivery attempt
//! opens a brand-new connection; a session that failed is dropped along
//! with its socket and TLS state.
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` behind the
//!   `embedded-svc` blocking client, with the IDF certificate bundle for
//!   HTTPS collectors.
//! - **other targets**: an in-memory collector that records requests and
//!   answers with scripted status codes.

#[cfg(target_os = "espidf")]
use core::time::Duration;

#[cfg(target_os = "espidf")]
use embedded_svc::http::client::Client;
#[cfg(target_os = "espidf")]
use embedded_svc::io::Write;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{HttpConnector, HttpSession, TransportError};

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct EspHttpConnector {
    timeout_ms: u32,
}

#[cfg(target_os = "espidf")]
impl EspHttpConnector {
    pub fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }
}

#[cfg(target_os = "espidf")]
pub struct EspHttpSession {
    client: Client<EspHttpConnection>,
}

#[cfg(target_os = "espidf")]
impl HttpConnector for EspHttpConnector {
    type Session = EspHttpSession;

    fn open(&mut self) -> Result<EspHttpSession, TransportError> {
        let conf = Configuration {
            timeout: Some(Duration::from_millis(u64::from(self.timeout_ms))),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let conn = EspHttpConnection::new(&conf).map_err(|e| {
            warn!("HTTP: connection setup failed ({})", e);
            TransportError
        })?;
        Ok(EspHttpSession {
            client: Client::wrap(conn),
        })
    }
}

#[cfg(target_os = "espidf")]
impl HttpSession for EspHttpSession {
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, TransportError> {
        let length = body.len().to_string();
        let mut all: heapless::Vec<(&str, &str), 8> = heapless::Vec::new();
        for &h in headers.iter().chain([("Content-Length", length.as_str())].iter()) {
            all.push(h).map_err(|_| TransportError)?;
        }

        let mut request = self.client.post(url, &all).map_err(|e| {
            warn!("HTTP: request to {} failed ({})", url, e);
            TransportError
        })?;
        request.write_all(body).map_err(|_| TransportError)?;
        request.flush().map_err(|_| TransportError)?;
        let response = request.submit().map_err(|e| {
            warn!("HTTP: no response from {} ({})", url, e);
            TransportError
        })?;
        Ok(response.status())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated collector
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::{HttpConnector, HttpSession, TransportError};

    /// One request as the collector received it.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    #[derive(Default)]
    struct Collector {
        replies: VecDeque<Result<u16, TransportError>>,
        requests: Vec<RecordedRequest>,
        sessions: u32,
    }

    /// In-memory collector.  Answers `201 Created` once the script runs out.
    #[derive(Clone, Default)]
    pub struct SimCollector {
        inner: Rc<RefCell<Collector>>,
    }

    impl SimCollector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the answer to the next request.
        pub fn reply(&self, reply: Result<u16, TransportError>) -> &Self {
            self.inner.borrow_mut().replies.push_back(reply);
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.inner.borrow().requests.clone()
        }

        /// Connections opened so far.
        pub fn sessions(&self) -> u32 {
            self.inner.borrow().sessions
        }
    }

    pub struct SimSession {
        inner: Rc<RefCell<Collector>>,
    }

    impl HttpConnector for SimCollector {
        type Session = SimSession;

        fn open(&mut self) -> Result<SimSession, TransportError> {
            self.inner.borrow_mut().sessions += 1;
            Ok(SimSession {
                inner: Rc::clone(&self.inner),
            })
        }
    }

    impl HttpSession for SimSession {
        fn post(
            &mut self,
            url: &str,
            headers: &[(&str, &str)],
            body: &[u8],
        ) -> Result<u16, TransportError> {
            let mut c = self.inner.borrow_mut();
            c.requests.push(RecordedRequest {
                url: url.to_owned(),
                headers: headers
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
                body: body.to_vec(),
            });
            c.replies.pop_front().unwrap_or(Ok(201))
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{RecordedRequest, SimCollector, SimSession};
