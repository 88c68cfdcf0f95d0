//! Error type shared by the scanner's setup operations and master server polls

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScannerError {
    /// No port in the candidate range could be bound for the LAN socket
    #[error("failed to bind discovery socket on ports {first}-{last}")]
    Bind {
        first: u16,
        last: u16,
        #[source]
        source: std::io::Error,
    },

    /// The socket was bound but could not be configured
    #[error("discovery socket setup failed: {0}")]
    Socket(std::io::Error),

    #[error("failed to build master server HTTP client: {0}")]
    HttpClient(reqwest::Error),

    #[error("master server request failed: {0}")]
    Request(reqwest::Error),

    #[error("master server returned status {0}")]
    Status(u16),

    #[error("failed to spawn master server worker: {0}")]
    SpawnWorker(std::io::Error),
}
