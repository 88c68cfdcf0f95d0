//! Add/remove notifications for discovered servers
//!
//! The registry reports every NEW→ACTIVE and ACTIVE→EXPIRED transition
//! through a [`Notifier`]. Exactly one [`DiscoveryListener`] is installed at a
//! time; installing another replaces it. Listeners are invoked from whichever
//! thread caused the transition (the tick thread or the master server worker)
//! and never while the registry lock is held, so a listener may call back into
//! the registry.

use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

/// Receives registry transitions
///
/// Implementations run inline with the mutation that triggered them and
/// should return quickly. Calls happen after the registry lock is released,
/// so an add raised on the master server worker and a removal raised on the
/// tick thread for the same server may arrive in either order.
pub trait DiscoveryListener: Send + Sync {
    /// A server was seen for the first time (or again after expiring)
    fn server_added(&self, address: IpAddr, name: &str);

    /// A server's liveness timeout ran out and it was dropped
    fn server_removed(&self, address: IpAddr);
}

/// Adapts a pair of closures to [`DiscoveryListener`]
pub struct CallbackListener<A, R> {
    on_added: A,
    on_removed: R,
}

impl<A, R> CallbackListener<A, R>
where
    A: Fn(IpAddr, &str) + Send + Sync,
    R: Fn(IpAddr) + Send + Sync,
{
    pub fn new(on_added: A, on_removed: R) -> Self {
        Self {
            on_added,
            on_removed,
        }
    }
}

impl<A, R> DiscoveryListener for CallbackListener<A, R>
where
    A: Fn(IpAddr, &str) + Send + Sync,
    R: Fn(IpAddr) + Send + Sync,
{
    fn server_added(&self, address: IpAddr, name: &str) {
        (self.on_added)(address, name);
    }

    fn server_removed(&self, address: IpAddr) {
        (self.on_removed)(address);
    }
}

/// Holds the currently installed listener
#[derive(Default)]
pub struct Notifier {
    listener: RwLock<Option<Arc<dyn DiscoveryListener>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the installed listener
    pub fn set_listener(&self, listener: Arc<dyn DiscoveryListener>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn server_added(&self, address: IpAddr, name: &str) {
        if let Some(listener) = self.current() {
            listener.server_added(address, name);
        }
    }

    pub fn server_removed(&self, address: IpAddr) {
        if let Some(listener) = self.current() {
            listener.server_removed(address);
        }
    }

    // The read guard is released before the listener runs, so a listener
    // may replace itself without deadlocking.
    fn current(&self) -> Option<Arc<dyn DiscoveryListener>> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
