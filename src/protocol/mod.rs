//! DSU (cemuhook) wire protocol
//!
//! The protocol is UDP-based, little-endian throughout, with a fixed
//! 16-byte header in front of every datagram:
//!
//! ```text
//! ┌───────────┬─────────────┬──────────────┬───────────┬──────────────┐
//! │ Magic (4) │ Version (2) │ PayloadLen(2)│ CRC32 (4) │ ServerID (4) │
//! └───────────┴─────────────┴──────────────┴───────────┴──────────────┘
//! ```
//!
//! - **Magic**: `DSUC` for client→server packets, `DSUS` for everything the
//!   server sends.
//! - **PayloadLen**: payload bytes only, header excluded. The first 4 payload
//!   bytes are always the message type.
//! - **CRC32**: computed over the entire packet (header + payload) with the
//!   4 checksum bytes zeroed.
//! - **ServerID**: instance identifier, constant for the life of a server.
//!
//! Message types share one value space for both directions.

pub mod codec;

pub use codec::{decode, DecodeError, OutPacket, Request};

/// Magic prefix of client→server packets
pub const MAGIC_CLIENT: [u8; 4] = *b"DSUC";

/// Magic prefix of server→client packets
pub const MAGIC_SERVER: [u8; 4] = *b"DSUS";

/// Protocol version implemented by this server
pub const PROTOCOL_VERSION: u16 = 1001;

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Size of the message-type field that starts every payload
pub const MESSAGE_TYPE_SIZE: usize = 4;

/// Minimum meaningful packet: header plus message type
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + MESSAGE_TYPE_SIZE;

/// Largest packet this server ever builds (PadData: 16 header + 84 payload)
pub const MAX_PACKET_SIZE: usize = 100;

/// DSU message types (u32, first 4 bytes of every payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    /// Protocol version handshake
    Version = 0x0010_0000,
    /// Per-slot controller state query
    ControllerInfo = 0x0010_0001,
    /// Telemetry subscription (inbound) / telemetry sample (outbound)
    PadData = 0x0010_0002,
}

impl MessageType {
    /// Map a raw wire value to a known message type
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0010_0000 => Some(Self::Version),
            0x0010_0001 => Some(Self::ControllerInfo),
            0x0010_0002 => Some(Self::PadData),
            _ => None,
        }
    }
}
