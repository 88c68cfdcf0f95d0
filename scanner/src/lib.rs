//! # Game Server Scanner Library
//!
//! This library finds reachable multiplayer game servers before the player
//! connects to one. It never opens a game session; it only reports which
//! servers exist, where they are, and what they are called.
//!
//! ## Discovery Channels
//!
//! ### Local Network Broadcast
//! Every couple of seconds the scanner broadcasts a versioned probe on the
//! LAN. Game servers listening on the discovery port answer with their game
//! port and name. Replies built for another protocol version are dropped, so
//! players never see servers they could not join.
//!
//! ### Master Server
//! A master server aggregates publicly registered game servers. The scanner
//! polls it over HTTP on a background thread and merges its listing with the
//! LAN results.
//!
//! ## Architecture Design
//!
//! ### Tick-Driven Core
//! The host application calls `ServerScanner::update(delta)` once per frame.
//! That call sends probes when due, drains queued replies and ages every
//! known server. Time only advances through `delta`, so expiry is exactly as
//! precise as the host's tick rate and fully deterministic in tests.
//!
//! ### One Synchronized Registry
//! The tick thread and the master server worker share a single
//! `ServerRegistry`. It exposes three synchronized operations (upsert,
//! age-and-expire, snapshot) and never holds its lock across network I/O or
//! while notifying listeners.
//!
//! ### Liveness
//! Each sighting gives a server a 30 second window. A server that is not
//! seen again within that window is removed and reported as gone.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! - `ServerInfo` entries keyed by (address, port)
//! - Liveness countdown aging and expiry
//! - Snapshot copies for display
//!
//! ### Notifier Module (`notifier`)
//! - `DiscoveryListener` capability with added/removed events
//! - Closure adapter for the callback pair API
//!
//! ### Prober Module (`prober`)
//! - Non-blocking UDP discovery socket
//! - Broadcast timer and reply validation
//!
//! ### Master Module (`master`)
//! - Background worker with prompt, joined shutdown
//! - Tolerant parsing of the text listing
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use scanner::ServerScanner;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut scanner = ServerScanner::new(5, shared::DEFAULT_SERVER_PORT);
//!
//!     scanner.add_callbacks(
//!         |address, name| println!("found {} at {}", name, address),
//!         |address| println!("lost {}", address),
//!     );
//!     scanner.scan_local_network()?;
//!     scanner.scan_master_server("http://master.example.com/list")?;
//!
//!     loop {
//!         // Called by the host every frame
//!         scanner.update(1.0 / 60.0);
//!
//!         for server in scanner.server_list() {
//!             println!("{} {}", server.socket_addr(), server.name);
//!         }
//!         # break;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod master;
pub mod notifier;
pub mod prober;
pub mod registry;
pub mod scanner;

pub use config::ScannerConfig;
pub use error::ScannerError;
pub use notifier::{CallbackListener, DiscoveryListener};
pub use registry::{ServerInfo, ServerRegistry};
pub use scanner::ServerScanner;
