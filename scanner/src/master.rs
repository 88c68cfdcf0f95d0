//! Master server polling on a background thread
//!
//! A master server is a directory of publicly registered game servers. The
//! poller fetches its listing with a blocking HTTP GET on a dedicated worker
//! thread, immediately and then once per poll interval, and feeds every
//! compatible listing into the shared registry.
//!
//! The listing is plain text, one server per line:
//!
//! ```text
//! address:port:version:name
//! ```
//!
//! The name is everything after the third `:`. Lines that do not parse are
//! skipped; the rest of the response is still used.
//!
//! Failed polls are logged and retried on the next interval. Stopping the
//! poller wakes the worker immediately and joins it; a request already in
//! flight is bounded by the request timeout. A worker that has been signalled
//! drops whatever that last request returns instead of forwarding it.

use crate::error::ScannerError;
use crate::registry::ServerRegistry;
use log::{debug, error, info, warn};
use reqwest::blocking::Client as HttpClient;
use std::net::IpAddr;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One line of a master server listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterListing {
    pub address: IpAddr,
    pub port: u16,
    pub version: u32,
    pub name: String,
}

/// Parses a single `address:port:version:name` line
pub fn parse_listing_line(line: &str) -> Option<MasterListing> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.splitn(4, ':');
    let address = parts.next()?.trim().parse().ok()?;
    let port = parts.next()?.trim().parse().ok()?;
    let version = parts.next()?.trim().parse().ok()?;
    let name = parts.next()?.to_string();

    Some(MasterListing {
        address,
        port,
        version,
        name,
    })
}

/// Parses a whole response body, skipping lines that do not parse
pub fn parse_listing(body: &str) -> Vec<MasterListing> {
    body.lines()
        .filter_map(|line| {
            let listing = parse_listing_line(line);
            if listing.is_none() && !line.trim().is_empty() {
                debug!("Skipping malformed master server line: {:?}", line);
            }
            listing
        })
        .collect()
}

/// Settings the worker thread runs with
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub version: u32,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

/// Handle to a running master server worker
///
/// Dropping the handle stops and joins the worker.
pub struct MasterServerPoller {
    url: String,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MasterServerPoller {
    /// Spawns a worker polling `url`
    ///
    /// Returns once the worker's HTTP client is ready, or with the reason it
    /// could not be built.
    pub fn start(
        url: impl Into<String>,
        settings: PollerSettings,
        registry: Arc<ServerRegistry>,
    ) -> Result<Self, ScannerError> {
        let url = url.into();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), ScannerError>>();

        let worker_url = url.clone();
        let handle = thread::Builder::new()
            .name("master-server-scan".to_string())
            .spawn(move || {
                // The blocking client owns an internal runtime, so it is
                // created and dropped on this thread only.
                let client = match HttpClient::builder()
                    .timeout(settings.request_timeout)
                    .build()
                {
                    Ok(client) => client,
                    Err(e) => {
                        let _ = ready_tx.send(Err(ScannerError::HttpClient(e)));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                poll_loop(&client, &worker_url, &settings, &registry, &stop_rx);
            })
            .map_err(ScannerError::SpawnWorker)?;

        let mut poller = Self {
            url,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(poller),
            Ok(Err(e)) => {
                poller.stop();
                Err(e)
            }
            Err(_) => {
                // Worker died before reporting; joining surfaces nothing useful
                poller.stop();
                error!("Master server worker for {} exited during startup", poller.url);
                Err(ScannerError::SpawnWorker(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "master server worker exited during startup",
                )))
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Tells the worker to exit without waiting for it
    ///
    /// The worker forwards nothing to the registry after this returns. Call
    /// [`stop`](Self::stop) or drop the handle later to join it.
    pub fn signal_stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the worker
        self.stop_tx.take();
    }

    /// Signals the worker and waits for it to exit
    pub fn stop(&mut self) {
        self.signal_stop();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Master server worker for {} panicked", self.url);
            }
        }
    }
}

impl Drop for MasterServerPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    client: &HttpClient,
    url: &str,
    settings: &PollerSettings,
    registry: &ServerRegistry,
    stop_rx: &mpsc::Receiver<()>,
) {
    info!("Master server scan started: {}", url);

    loop {
        match fetch_listing(client, url) {
            Ok(listings) => {
                if stop_requested(stop_rx) {
                    break;
                }
                let count = forward_listings(listings, settings.version, registry);
                debug!("Master server {} listed {} compatible servers", url, count);
            }
            Err(e) => warn!("Failed to query master server {}: {}", url, e),
        }

        match stop_rx.recv_timeout(settings.poll_interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Master server scan stopped: {}", url);
}

fn stop_requested(stop_rx: &mpsc::Receiver<()>) -> bool {
    !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

/// Fetches and parses the listing once
fn fetch_listing(client: &HttpClient, url: &str) -> Result<Vec<MasterListing>, ScannerError> {
    let response = client.get(url).send().map_err(ScannerError::Request)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScannerError::Status(status.as_u16()));
    }

    let body = response.text().map_err(ScannerError::Request)?;
    Ok(parse_listing(&body))
}

/// Forwards listings matching `version` to the registry, returning how many
fn forward_listings(listings: Vec<MasterListing>, version: u32, registry: &ServerRegistry) -> usize {
    let mut forwarded = 0;
    for listing in listings {
        if listing.version != version {
            debug!(
                "Skipping master server listing '{}' with version {}",
                listing.name, listing.version
            );
            continue;
        }
        registry.update_entry(listing.address, listing.port, &listing.name);
        forwarded += 1;
    }
    forwarded
}
