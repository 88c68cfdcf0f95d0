//! Scanner tunables

use std::net::Ipv4Addr;
use std::time::Duration;

/// Configuration for a [`ServerScanner`](crate::scanner::ServerScanner)
///
/// `version_number` is fixed for the scanner's lifetime; replies and master
/// server listings carrying any other version are ignored.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Game protocol version servers must advertise
    pub version_number: u32,
    /// Port game servers listen for discovery probes on
    pub server_port: u16,
    /// Destination for discovery probes
    pub broadcast_addr: Ipv4Addr,
    /// Seconds between discovery probes
    pub broadcast_interval: f32,
    /// Seconds an unrefreshed server stays listed
    pub server_timeout: f32,
    /// Pause between two master server polls
    pub master_poll_interval: Duration,
    /// Upper bound on a single master server request
    pub master_request_timeout: Duration,
}

impl ScannerConfig {
    pub fn new(version_number: u32, server_port: u16) -> Self {
        Self {
            version_number,
            server_port,
            ..Self::default()
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            version_number: 0,
            server_port: shared::DEFAULT_SERVER_PORT,
            broadcast_addr: Ipv4Addr::BROADCAST,
            broadcast_interval: shared::BROADCAST_INTERVAL,
            server_timeout: shared::SERVER_TIMEOUT,
            master_poll_interval: Duration::from_secs(10),
            master_request_timeout: Duration::from_secs(5),
        }
    }
}
