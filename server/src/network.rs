//! Discovery responder: the game-server side of LAN discovery

use log::{debug, error, info};
use shared::{decode_packet, encode_packet, truncate_name, DiscoveryPacket, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// What a responder advertises
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Protocol version probes must ask for
    pub version: u32,
    /// Port players connect to for the actual game
    pub game_port: u16,
    /// Name shown in server browsers
    pub name: String,
}

impl ResponderConfig {
    pub fn new(version: u32, game_port: u16, name: &str) -> Self {
        Self {
            version,
            game_port,
            name: truncate_name(name),
        }
    }
}

/// Answers discovery probes on a UDP port
pub struct Responder {
    socket: UdpSocket,
    config: ResponderConfig,
}

impl Responder {
    pub async fn bind(addr: &str, config: ResponderConfig) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        socket.set_broadcast(true)?;
        info!(
            "Answering discovery probes on {} as '{}' (version {}, game port {})",
            socket.local_addr()?,
            config.name,
            config.version,
            config.game_port
        );

        Ok(Self { socket, config })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives probes forever, replying to the ones that match
    pub async fn run(&self) -> std::io::Result<()> {
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => {
                    if let Some(reply) = answer_probe(&buffer[..len], &self.config) {
                        if let Err(e) = self.socket.send_to(&reply, addr).await {
                            error!("Failed to answer probe from {}: {}", addr, e);
                        } else {
                            debug!("Answered probe from {}", addr);
                        }
                    }
                }
                Err(e) => {
                    error!("Error receiving probe: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Builds the encoded reply for a datagram, if it is a probe we should answer
pub fn answer_probe(datagram: &[u8], config: &ResponderConfig) -> Option<Vec<u8>> {
    match decode_packet(datagram) {
        Ok(DiscoveryPacket::Probe { version }) if version == config.version => {
            let reply = DiscoveryPacket::Reply {
                version: config.version,
                port: config.game_port,
                name: config.name.clone(),
            };
            match encode_packet(&reply) {
                Ok(data) => Some(data),
                Err(e) => {
                    error!("Failed to encode discovery reply: {}", e);
                    None
                }
            }
        }
        Ok(DiscoveryPacket::Probe { version }) => {
            debug!(
                "Ignoring probe for version {} (serving {})",
                version, config.version
            );
            None
        }
        Ok(DiscoveryPacket::Reply { .. }) => None,
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}
