//! Shared registry of discovered game servers
//!
//! Both discovery channels feed the same [`ServerRegistry`]:
//! - The local broadcast prober, from the host's tick thread
//! - The master server poller, from its own worker thread
//!
//! Every entry carries a liveness countdown. A sighting resets it; ticks age
//! it by the host-supplied delta time, and an entry whose summed deltas reach
//! the liveness window is dropped. Time only moves when the host says so, which keeps expiry
//! deterministic under test.
//!
//! One mutex guards the entry list. It is held for a single scan, update or
//! copy and released before listeners are notified.

use crate::notifier::Notifier;
use log::info;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A discovered game server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    /// Address the server was seen at
    pub address: IpAddr,
    /// Game port the server advertised
    pub port: u16,
    /// Human-readable server name
    pub name: String,
    /// Seconds left before the entry expires
    pub timeout: f32,
}

impl ServerInfo {
    fn new(address: IpAddr, port: u16, name: &str, timeout: f32) -> Self {
        Self {
            address,
            port,
            name: name.to_string(),
            timeout,
        }
    }

    /// Address a client would connect to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    fn matches(&self, address: IpAddr, port: u16) -> bool {
        self.address == address && self.port == port
    }
}

/// Registry slot: the public view plus the exact time since the last sighting
struct Entry {
    info: ServerInfo,
    elapsed: f64,
}

/// Slack for rounding in the summed tick deltas
const EXPIRY_TOLERANCE: f64 = 1e-4;

pub struct ServerRegistry {
    servers: Mutex<Vec<Entry>>,
    notifier: Notifier,
    /// Liveness window granted on every sighting
    server_timeout: f32,
}

impl ServerRegistry {
    pub fn new(server_timeout: f32) -> Self {
        Self {
            servers: Mutex::new(Vec::new()),
            notifier: Notifier::new(),
            server_timeout,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Records a sighting of the server at `address:port`
    ///
    /// A known (address, port) pair gets its name updated and its countdown
    /// reset silently. An unknown pair becomes a new entry and the listener
    /// hears about it once the lock is released. Returns true if the entry
    /// was added.
    pub fn update_entry(&self, address: IpAddr, port: u16, name: &str) -> bool {
        let added = {
            let mut servers = self.lock();
            match servers.iter_mut().find(|e| e.info.matches(address, port)) {
                Some(entry) => {
                    if entry.info.name != name {
                        entry.info.name = name.to_string();
                    }
                    entry.info.timeout = self.server_timeout;
                    entry.elapsed = 0.0;
                    false
                }
                None => {
                    servers.push(Entry {
                        info: ServerInfo::new(address, port, name, self.server_timeout),
                        elapsed: 0.0,
                    });
                    true
                }
            }
        };

        if added {
            info!("Discovered server '{}' at {}:{}", name, address, port);
            self.notifier.server_added(address, name);
        }

        added
    }

    /// Ages every entry by `delta` seconds and drops the ones that ran out
    ///
    /// Elapsed time is summed in `f64` per entry, so an entry expires once
    /// the deltas since its last sighting add up to the window, whatever the
    /// tick rate. Negative or NaN deltas count as zero. Returns the expired
    /// entries, each of which has already been reported to the listener.
    pub fn age(&self, delta: f32) -> Vec<ServerInfo> {
        let delta = f64::from(delta.max(0.0));
        let window = f64::from(self.server_timeout);

        let expired: Vec<Entry> = {
            let mut servers = self.lock();
            for entry in servers.iter_mut() {
                entry.elapsed += delta;
                entry.info.timeout = (window - entry.elapsed).max(0.0) as f32;
            }

            let (expired, alive) = std::mem::take(&mut *servers)
                .into_iter()
                .partition(|entry| entry.elapsed + EXPIRY_TOLERANCE >= window);
            *servers = alive;
            expired
        };

        expired
            .into_iter()
            .map(|entry| {
                let server = entry.info;
                info!(
                    "Server '{}' at {}:{} timed out",
                    server.name, server.address, server.port
                );
                self.notifier.server_removed(server.address);
                server
            })
            .collect()
    }

    /// Point-in-time copy of all entries
    pub fn snapshot(&self) -> Vec<ServerInfo> {
        self.lock().iter().map(|entry| entry.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A listener panicking on another thread must not wedge the registry
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{CallbackListener, DiscoveryListener};
    use assert_approx_eq::assert_approx_eq;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn test_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))
    }

    fn test_ip2() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 11))
    }

    #[derive(Default)]
    struct CountingListener {
        added: AtomicUsize,
        removed: AtomicUsize,
    }

    impl DiscoveryListener for CountingListener {
        fn server_added(&self, _address: IpAddr, _name: &str) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn server_removed(&self, _address: IpAddr) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn registry_with_counter() -> (ServerRegistry, Arc<CountingListener>) {
        let registry = ServerRegistry::new(shared::SERVER_TIMEOUT);
        let listener = Arc::new(CountingListener::default());
        registry.notifier().set_listener(listener.clone());
        (registry, listener)
    }

    #[test]
    fn test_server_info_socket_addr() {
        let info = ServerInfo::new(test_ip(), 7777, "Alpha", 30.0);
        assert_eq!(info.socket_addr(), "192.168.1.10:7777".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_first_sighting_adds_entry() {
        let (registry, listener) = registry_with_counter();

        assert!(registry.update_entry(test_ip(), 7777, "Alpha"));

        let servers = registry.snapshot();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].address, test_ip());
        assert_eq!(servers[0].port, 7777);
        assert_eq!(servers[0].name, "Alpha");
        assert_approx_eq!(servers[0].timeout, shared::SERVER_TIMEOUT, 0.0001);
        assert_eq!(listener.added.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_sighting_is_idempotent() {
        let (registry, listener) = registry_with_counter();

        for _ in 0..10 {
            registry.update_entry(test_ip(), 7777, "Alpha");
            registry.age(1.0);
        }

        assert_eq!(registry.len(), 1);
        assert_eq!(listener.added.load(Ordering::SeqCst), 1);
        assert_eq!(listener.removed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_refresh_resets_timeout_and_renames() {
        let (registry, listener) = registry_with_counter();

        registry.update_entry(test_ip(), 7777, "Alpha");
        registry.age(20.0);
        assert_approx_eq!(registry.snapshot()[0].timeout, 10.0, 0.0001);

        assert!(!registry.update_entry(test_ip(), 7777, "Alpha Renamed"));

        let servers = registry.snapshot();
        assert_eq!(servers[0].name, "Alpha Renamed");
        assert_approx_eq!(servers[0].timeout, shared::SERVER_TIMEOUT, 0.0001);
        assert_eq!(listener.added.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_address_different_port_is_separate_entry() {
        let (registry, listener) = registry_with_counter();

        registry.update_entry(test_ip(), 7777, "Alpha");
        registry.update_entry(test_ip(), 7778, "Alpha Two");
        registry.update_entry(test_ip2(), 7777, "Beta");

        assert_eq!(registry.len(), 3);
        assert_eq!(listener.added.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_expiry_removes_entry_once() {
        let (registry, listener) = registry_with_counter();
        registry.update_entry(test_ip(), 7777, "Alpha");

        let mut expired_total = 0;
        for _ in 0..301 {
            expired_total += registry.age(0.1).len();
        }

        assert!(registry.is_empty());
        assert_eq!(expired_total, 1);
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);

        // Further ticks have nothing left to expire
        registry.age(100.0);
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_entry_survives_until_window_elapses() {
        let (registry, listener) = registry_with_counter();
        registry.update_entry(test_ip(), 7777, "Alpha");

        registry.age(29.9);
        assert_eq!(registry.len(), 1);
        assert_eq!(listener.removed.load(Ordering::SeqCst), 0);

        registry.age(0.2);
        assert!(registry.is_empty());
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expiry_at_60hz_ticks() {
        let (registry, listener) = registry_with_counter();
        registry.update_entry(test_ip(), 7777, "Alpha");

        for _ in 0..1799 {
            registry.age(1.0 / 60.0);
        }
        assert_eq!(registry.len(), 1);

        registry.age(1.0 / 60.0);
        assert!(registry.is_empty());
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expiry_at_20hz_ticks() {
        let (registry, listener) = registry_with_counter();
        registry.update_entry(test_ip(), 7777, "Alpha");

        for _ in 0..599 {
            registry.age(0.05);
        }
        assert_eq!(registry.len(), 1);
        assert_approx_eq!(registry.snapshot()[0].timeout, 0.05, 0.001);

        registry.age(0.05);
        assert!(registry.is_empty());
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_restarts_elapsed_time() {
        let registry = ServerRegistry::new(1.0);
        registry.update_entry(test_ip(), 7777, "Alpha");

        for _ in 0..59 {
            registry.age(1.0 / 60.0);
        }
        registry.update_entry(test_ip(), 7777, "Alpha");

        for _ in 0..59 {
            registry.age(1.0 / 60.0);
        }
        assert_eq!(registry.len(), 1);

        registry.age(1.0 / 60.0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_timeout_reaching_exactly_zero_expires() {
        let registry = ServerRegistry::new(2.0);
        registry.update_entry(test_ip(), 7777, "Alpha");

        let expired = registry.age(2.0);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].port, 7777);
    }

    #[test]
    fn test_expired_entry_reappears_as_new() {
        let (registry, listener) = registry_with_counter();

        registry.update_entry(test_ip(), 7777, "Alpha");
        registry.age(shared::SERVER_TIMEOUT + 1.0);
        assert!(registry.is_empty());

        assert!(registry.update_entry(test_ip(), 7777, "Alpha"));
        assert_eq!(listener.added.load(Ordering::SeqCst), 2);
        assert_eq!(listener.removed.load(Ordering::SeqCst), 1);
        assert_approx_eq!(
            registry.snapshot()[0].timeout,
            shared::SERVER_TIMEOUT,
            0.0001
        );
    }

    #[test]
    fn test_age_ignores_negative_and_nan_delta() {
        let registry = ServerRegistry::new(5.0);
        registry.update_entry(test_ip(), 7777, "Alpha");

        registry.age(-10.0);
        registry.age(f32::NAN);

        let servers = registry.snapshot();
        assert_eq!(servers.len(), 1);
        assert_approx_eq!(servers[0].timeout, 5.0, 0.0001);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let registry = ServerRegistry::new(shared::SERVER_TIMEOUT);
        registry.update_entry(test_ip(), 7777, "Alpha");

        let mut snapshot = registry.snapshot();
        snapshot[0].name = "Changed".to_string();
        snapshot.clear();

        registry.update_entry(test_ip2(), 7777, "Beta");

        let servers = registry.snapshot();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "Alpha");
    }

    #[test]
    fn test_listener_can_reenter_registry() {
        let registry = Arc::new(ServerRegistry::new(1.0));
        let seen_on_add = Arc::new(AtomicUsize::new(0));
        let seen_on_remove = Arc::new(AtomicUsize::new(usize::MAX));

        let add_view = Arc::clone(&registry);
        let add_count = Arc::clone(&seen_on_add);
        let remove_view = Arc::clone(&registry);
        let remove_count = Arc::clone(&seen_on_remove);

        registry
            .notifier()
            .set_listener(Arc::new(CallbackListener::new(
                move |address, name| {
                    // Refreshing from inside the callback must not deadlock
                    add_view.update_entry(address, 7777, name);
                    add_count.store(add_view.snapshot().len(), Ordering::SeqCst);
                },
                move |_| {
                    remove_count.store(remove_view.len(), Ordering::SeqCst);
                },
            )));

        registry.update_entry(test_ip(), 7777, "Alpha");
        assert_eq!(seen_on_add.load(Ordering::SeqCst), 1);

        registry.age(5.0);
        assert_eq!(seen_on_remove.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_updates_and_snapshots() {
        let registry = Arc::new(ServerRegistry::new(shared::SERVER_TIMEOUT));
        let listener = Arc::new(CountingListener::default());
        registry.notifier().set_listener(listener.clone());

        let writers: Vec<_> = (0..4u16)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for round in 0..50 {
                        for port in 0..10u16 {
                            registry.update_entry(test_ip(), 7000 + port, "Shared");
                        }
                        registry.update_entry(test_ip2(), 8000 + worker, &format!("w{}", round));
                    }
                })
            })
            .collect();

        let reader = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..200 {
                    for server in registry.snapshot() {
                        assert!(!server.name.is_empty());
                        assert!(server.timeout > 0.0);
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        // 10 shared ports plus one private port per writer
        assert_eq!(registry.len(), 14);
        assert_eq!(listener.added.load(Ordering::SeqCst), 14);
    }
}
