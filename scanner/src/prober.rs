//! Local network discovery over UDP broadcast
//!
//! The prober owns a non-blocking UDP socket and a repeating broadcast timer.
//! Each host tick it:
//! 1. Counts the timer down and, when it runs out, broadcasts a versioned
//!    `Probe` to the game servers' discovery port
//! 2. Drains every datagram already queued on the socket without blocking
//! 3. Forwards each `Reply` with a matching version to the registry
//!
//! Anything else (foreign magic, undecodable bytes, other versions, probes)
//! is dropped. A read error ends the drain for this tick; the next tick
//! simply tries again.

use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::registry::ServerRegistry;
use log::{debug, info, warn};
use shared::{decode_packet, encode_packet, DiscoveryPacket, MAX_DATAGRAM_SIZE};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// How many ports above the server port are tried when binding
const BIND_ATTEMPTS: u16 = 16;

pub struct LocalProber {
    socket: UdpSocket,
    local_port: u16,
    version: u32,
    broadcast_target: SocketAddr,
    broadcast_interval: f32,
    /// Seconds until the next probe goes out
    broadcast_timer: f32,
    buffer: Vec<u8>,
}

impl LocalProber {
    /// Binds the discovery socket on the first free port above `server_port`
    ///
    /// The server port itself stays free for a game server running on the
    /// same machine. The first probe goes out on the next [`update`](Self::update).
    pub fn bind(config: &ScannerConfig) -> Result<Self, ScannerError> {
        let (socket, local_port) = bind_above(config.server_port)?;
        socket.set_broadcast(true).map_err(ScannerError::Socket)?;
        socket.set_nonblocking(true).map_err(ScannerError::Socket)?;

        info!("Scanning local network from UDP port {}", local_port);

        Ok(Self {
            socket,
            local_port,
            version: config.version_number,
            broadcast_target: SocketAddr::V4(SocketAddrV4::new(
                config.broadcast_addr,
                config.server_port,
            )),
            broadcast_interval: config.broadcast_interval,
            broadcast_timer: 0.0,
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Advances the broadcast timer and processes queued replies
    ///
    /// Returns the number of replies forwarded to the registry.
    pub fn update(&mut self, delta: f32, registry: &ServerRegistry) -> usize {
        self.broadcast_timer -= delta.max(0.0);
        if self.broadcast_timer <= 0.0 {
            self.send_probe();
            self.broadcast_timer = self.broadcast_interval;
        }

        self.drain(registry)
    }

    fn send_probe(&self) {
        let probe = DiscoveryPacket::Probe {
            version: self.version,
        };

        match encode_packet(&probe) {
            Ok(data) => {
                if let Err(e) = self.socket.send_to(&data, self.broadcast_target) {
                    warn!(
                        "Failed to send discovery probe to {}: {}",
                        self.broadcast_target, e
                    );
                }
            }
            Err(e) => warn!("Failed to encode discovery probe: {}", e),
        }
    }

    fn drain(&mut self, registry: &ServerRegistry) -> usize {
        let mut accepted = 0;

        loop {
            let (len, src) = match self.socket.recv_from(&mut self.buffer) {
                Ok(received) => received,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("Discovery socket read failed: {}", e);
                    break;
                }
            };

            if let Some((port, name)) = parse_reply(&self.buffer[..len], self.version) {
                registry.update_entry(src.ip(), port, &name);
                accepted += 1;
            } else {
                debug!("Ignored discovery datagram from {}", src);
            }
        }

        accepted
    }
}

/// Extracts (advertised port, name) from a reply carrying `expected_version`
pub fn parse_reply(data: &[u8], expected_version: u32) -> Option<(u16, String)> {
    match decode_packet(data) {
        Ok(DiscoveryPacket::Reply {
            version,
            port,
            name,
        }) => {
            if version == expected_version {
                Some((port, name))
            } else {
                debug!(
                    "Discarding reply from '{}' with version {} (expected {})",
                    name, version, expected_version
                );
                None
            }
        }
        Ok(DiscoveryPacket::Probe { .. }) => None,
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

fn bind_above(server_port: u16) -> Result<(UdpSocket, u16), ScannerError> {
    let first = server_port.saturating_add(1);
    let last = server_port.saturating_add(BIND_ATTEMPTS);
    let mut last_error =
        std::io::Error::new(ErrorKind::AddrNotAvailable, "no port above server port");

    for port in (1..=BIND_ATTEMPTS).filter_map(|offset| server_port.checked_add(offset)) {
        match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)) {
            Ok(socket) => return Ok((socket, port)),
            Err(e) => {
                debug!("Discovery port {} unavailable: {}", port, e);
                last_error = e;
            }
        }
    }

    Err(ScannerError::Bind {
        first,
        last,
        source: last_error,
    })
}
