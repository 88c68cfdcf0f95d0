//! The `ServerScanner` facade tying both discovery channels to one registry

use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::master::{MasterServerPoller, PollerSettings};
use crate::notifier::{CallbackListener, DiscoveryListener};
use crate::prober::LocalProber;
use crate::registry::{ServerInfo, ServerRegistry};
use log::info;
use std::net::IpAddr;
use std::sync::Arc;

/// Finds game servers on the LAN and through a master server
///
/// The host calls [`update`](Self::update) every frame with the elapsed time.
/// That single call drives the LAN prober and ages registry entries. The
/// master server poller, once started, runs on its own thread and only
/// touches the registry.
pub struct ServerScanner {
    // Stopped and joined before the remaining fields drop
    master: Option<MasterServerPoller>,
    /// Replaced workers, already signalled, waiting to be joined
    retired: Vec<MasterServerPoller>,
    prober: Option<LocalProber>,
    registry: Arc<ServerRegistry>,
    config: ScannerConfig,
}

impl ServerScanner {
    pub fn new(version_number: u32, server_port: u16) -> Self {
        Self::with_config(ScannerConfig::new(version_number, server_port))
    }

    pub fn with_config(config: ScannerConfig) -> Self {
        Self {
            master: None,
            retired: Vec::new(),
            prober: None,
            registry: Arc::new(ServerRegistry::new(config.server_timeout)),
            config,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Shared handle to the registry, for reading it from other threads
    pub fn registry(&self) -> Arc<ServerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Starts probing the local network
    ///
    /// Binds the discovery socket; failure to do so is returned and LAN
    /// scanning stays off. Calling this while already scanning does nothing.
    pub fn scan_local_network(&mut self) -> Result<(), ScannerError> {
        if self.prober.is_some() {
            return Ok(());
        }

        self.prober = Some(LocalProber::bind(&self.config)?);
        Ok(())
    }

    pub fn is_scanning_local_network(&self) -> bool {
        self.prober.is_some()
    }

    /// Port the LAN discovery socket is bound to, once scanning
    pub fn local_port(&self) -> Option<u16> {
        self.prober.as_ref().map(LocalProber::local_port)
    }

    /// Starts polling the master server at `url`
    ///
    /// A worker already running is replaced. It is told to stop before the
    /// new one starts and forwards nothing afterwards, so at most one worker
    /// feeds the registry; it is joined later without blocking this call.
    /// Entries it already reported stay until they time out.
    pub fn scan_master_server(&mut self, url: &str) -> Result<(), ScannerError> {
        if let Some(mut previous) = self.master.take() {
            info!(
                "Replacing master server scan of {} with {}",
                previous.url(),
                url
            );
            previous.signal_stop();
            // Dropping a finished worker joins it immediately
            self.retired.retain(MasterServerPoller::is_running);
            self.retired.push(previous);
        }

        let settings = PollerSettings {
            version: self.config.version_number,
            poll_interval: self.config.master_poll_interval,
            request_timeout: self.config.master_request_timeout,
        };

        self.master = Some(MasterServerPoller::start(
            url,
            settings,
            Arc::clone(&self.registry),
        )?);
        Ok(())
    }

    pub fn is_scanning_master_server(&self) -> bool {
        self.master
            .as_ref()
            .is_some_and(MasterServerPoller::is_running)
    }

    /// Stops every master server worker and waits for them to exit
    pub fn stop_master_server_scan(&mut self) {
        if let Some(mut poller) = self.master.take() {
            poller.signal_stop();
            self.retired.push(poller);
        }
        for mut poller in self.retired.drain(..) {
            poller.stop();
        }
    }

    /// Installs the add/remove callbacks, replacing any previous pair
    pub fn add_callbacks<A, R>(&self, on_new: A, on_removed: R)
    where
        A: Fn(IpAddr, &str) + Send + Sync + 'static,
        R: Fn(IpAddr) + Send + Sync + 'static,
    {
        self.set_listener(Arc::new(CallbackListener::new(on_new, on_removed)));
    }

    /// Installs a listener, replacing any previous one
    pub fn set_listener(&self, listener: Arc<dyn DiscoveryListener>) {
        self.registry.notifier().set_listener(listener);
    }

    /// Copy of every currently listed server
    pub fn server_list(&self) -> Vec<ServerInfo> {
        self.registry.snapshot()
    }

    /// Advances the scanner by `delta` seconds
    ///
    /// Ages and expires registry entries first, then lets the LAN prober
    /// broadcast (when due) and drain its replies, so a reply received this
    /// tick starts with a full liveness window.
    pub fn update(&mut self, delta: f32) {
        self.registry.age(delta);

        if let Some(prober) = self.prober.as_mut() {
            prober.update(delta, &self.registry);
        }
    }
}

impl Drop for ServerScanner {
    fn drop(&mut self) {
        self.stop_master_server_scan();
    }
}
