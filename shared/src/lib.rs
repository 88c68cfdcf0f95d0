use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port a game server listens on when none is configured
pub const DEFAULT_SERVER_PORT: u16 = 35666;
/// Seconds between two discovery broadcasts
pub const BROADCAST_INTERVAL: f32 = 2.0;
/// Seconds a discovered server stays listed without being seen again
pub const SERVER_TIMEOUT: f32 = 30.0;
/// Verification number carried by every discovery datagram
pub const PROTOCOL_MAGIC: u32 = 0x2fab_3f0f;
/// Longest server name a responder will advertise, in bytes
pub const MAX_NAME_LEN: usize = 64;
/// Receive buffer size for discovery datagrams
pub const MAX_DATAGRAM_SIZE: usize = 2048;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum DiscoveryPacket {
    Probe {
        version: u32,
    },
    Reply {
        version: u32,
        port: u16,
        name: String,
    },
}

/// On-the-wire envelope for a [`DiscoveryPacket`]
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryFrame {
    pub magic: u32,
    pub packet: DiscoveryPacket,
}

/// Why a received datagram was not a discovery packet
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed discovery datagram")]
    Malformed(#[from] bincode::Error),

    #[error("unexpected protocol magic {0:#010x}")]
    BadMagic(u32),
}

pub fn encode_packet(packet: &DiscoveryPacket) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(&DiscoveryFrame {
        magic: PROTOCOL_MAGIC,
        packet: packet.clone(),
    })
}

pub fn decode_packet(data: &[u8]) -> Result<DiscoveryPacket, DecodeError> {
    let frame: DiscoveryFrame = bincode::deserialize(data)?;
    if frame.magic != PROTOCOL_MAGIC {
        return Err(DecodeError::BadMagic(frame.magic));
    }
    Ok(frame.packet)
}

/// Cuts `name` down to at most [`MAX_NAME_LEN`] bytes without splitting a char
pub fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
