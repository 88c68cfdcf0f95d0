//! # Discovery Responder Library
//!
//! This library is the game-server half of LAN discovery. A game server runs
//! a `Responder` next to its game socket so that scanners on the same network
//! can find it without knowing its address in advance.
//!
//! ## Protocol
//!
//! Scanners broadcast a `Probe` carrying the protocol version they speak.
//! The responder answers only probes for its own version, sending a `Reply`
//! straight back to the probe's source address. The reply carries:
//! - The protocol version, so the scanner can double-check compatibility
//! - The game port players should connect to
//! - The server name shown in server browsers
//!
//! Probes for other versions, replies from other responders and anything
//! that does not decode are ignored. Nothing is ever sent unprompted.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Responder, ResponderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResponderConfig::new(5, 7777, "Alpha");
//!     let responder = Responder::bind("0.0.0.0:35666", config).await?;
//!
//!     // Answers probes until the task is dropped
//!     responder.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod network;
