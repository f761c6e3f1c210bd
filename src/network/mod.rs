//! Wi-Fi network selection and link supervision.

pub mod link;
pub mod selector;

pub use link::{ConnectivityFlag, LinkEvent, LinkEvents, ReconnectWorker};
pub use selector::{NetworkCandidate, NetworkSelector, WifiCredential, rank_candidates};
