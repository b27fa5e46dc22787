//! Packet encode/decode for the DSU wire format
//!
//! This module provides:
//! - `OutPacket`: single fixed-size buffer for all outbound packets
//! - `decode`: checked view into a received datagram
//! - `checksum`: the canonical CRC32 used by both directions
//!
//! # Pattern
//!
//! ```ignore
//! let mut pkt = OutPacket::new(MessageType::Version, instance_id);
//! pkt.push_u16(PROTOCOL_VERSION);
//! pkt.push_u16(0);
//! pkt.finalize();                  // writes payload length + CRC
//! socket.send_to(pkt.as_bytes(), peer)?;
//! ```
//!
//! The largest packet the server builds is 100 bytes (PadData), so a single
//! stack buffer handles every message with no heap allocation.

use super::{
    MessageType, HEADER_SIZE, MAGIC_CLIENT, MAGIC_SERVER, MAX_PACKET_SIZE, MIN_PACKET_SIZE,
    PROTOCOL_VERSION,
};

/// Reasons a received datagram is rejected
///
/// Rejects are silent on the wire (the protocol has no error channel), but
/// are surfaced here so the receive loop can log them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Datagram shorter than header + message type
    #[error("datagram too short")]
    Truncated,
    /// First 4 bytes are not the client magic
    #[error("bad magic")]
    BadMagic,
    /// Client speaks a newer protocol than we implement
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u16),
    /// Declared payload length does not fit the received buffer
    #[error("payload length {declared} exceeds received {available} bytes")]
    LengthMismatch { declared: usize, available: usize },
    /// Stored CRC does not match the recomputed one
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// A validated inbound request: raw message type plus the payload bytes that
/// follow it. Borrows from the receive buffer; handled and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// Raw message type value (first 4 payload bytes)
    pub message_type: u32,
    /// Payload after the message type
    pub payload: &'a [u8],
}

/// CRC32 over `data` — reflected poly 0xEDB88320, init/xorout 0xFFFFFFFF
/// (the standard IEEE CRC32, which is what `crc32fast` computes).
#[inline]
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC32 of a full packet with the 4 checksum bytes treated as zero.
///
/// Hashes around the checksum field instead of copying the buffer.
fn checksum_zeroed(packet: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&packet[..8]);
    hasher.update(&[0u8; 4]);
    hasher.update(&packet[12..]);
    hasher.finalize()
}

/// Decode and validate a received datagram.
///
/// Returns a typed request view or the reason the datagram was rejected.
/// Never panics on malformed input. Trailing bytes beyond the declared
/// payload length are not part of the packet and are excluded from the CRC.
pub fn decode(buf: &[u8]) -> Result<Request<'_>, DecodeError> {
    if buf.len() < MIN_PACKET_SIZE {
        return Err(DecodeError::Truncated);
    }
    if buf[0..4] != MAGIC_CLIENT {
        return Err(DecodeError::BadMagic);
    }

    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version > PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let declared = u16::from_le_bytes([buf[6], buf[7]]) as usize;
    let available = buf.len() - HEADER_SIZE;
    if declared > available {
        return Err(DecodeError::LengthMismatch {
            declared,
            available,
        });
    }
    if declared < 4 {
        // No room for a message type
        return Err(DecodeError::Truncated);
    }

    let packet = &buf[..HEADER_SIZE + declared];
    let stored = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let computed = checksum_zeroed(packet);
    if stored != computed {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    let message_type = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
    Ok(Request {
        message_type,
        payload: &packet[MIN_PACKET_SIZE..],
    })
}

/// Reusable outbound packet buffer
///
/// Pre-fills the server header (magic, version, instance id) and the message
/// type, then appends payload fields in order. `finalize` writes the payload
/// length and CRC; the packet must not be mutated afterwards.
pub struct OutPacket {
    data: [u8; MAX_PACKET_SIZE],
    len: usize,
}

impl OutPacket {
    /// Start a server packet of the given message type
    pub fn new(message_type: MessageType, instance_id: u32) -> Self {
        let mut data = [0u8; MAX_PACKET_SIZE];
        data[0..4].copy_from_slice(&MAGIC_SERVER);
        data[4..6].copy_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        // data[6..8] payload length and data[8..12] CRC are written by finalize
        data[12..16].copy_from_slice(&instance_id.to_le_bytes());
        data[16..20].copy_from_slice(&(message_type as u32).to_le_bytes());
        Self {
            data,
            len: MIN_PACKET_SIZE,
        }
    }

    /// Append raw bytes
    #[inline]
    pub fn push(&mut self, bytes: &[u8]) {
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    #[inline]
    pub fn push_u8(&mut self, v: u8) {
        self.data[self.len] = v;
        self.len += 1;
    }

    #[inline]
    pub fn push_u16(&mut self, v: u16) {
        self.push(&v.to_le_bytes());
    }

    #[inline]
    pub fn push_u32(&mut self, v: u32) {
        self.push(&v.to_le_bytes());
    }

    #[inline]
    pub fn push_i64(&mut self, v: i64) {
        self.push(&v.to_le_bytes());
    }

    #[inline]
    pub fn push_f32(&mut self, v: f32) {
        self.push(&v.to_le_bytes());
    }

    /// Write the payload length and CRC32, sealing the packet.
    ///
    /// The checksum bytes are still zero from construction, so hashing the
    /// whole buffer is the "compute with checksum field zeroed" step.
    pub fn finalize(&mut self) {
        let payload_len = (self.len - HEADER_SIZE) as u16;
        self.data[6..8].copy_from_slice(&payload_len.to_le_bytes());
        self.data[8..12].fill(0);
        let crc = checksum(&self.data[..self.len]);
        self.data[8..12].copy_from_slice(&crc.to_le_bytes());
    }

    /// Get packet bytes for sending
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a well-formed client packet for decode tests
    fn client_packet(message_type: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + 4 + payload.len());
        buf.extend_from_slice(&MAGIC_CLIENT);
        buf.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        buf.extend_from_slice(&((4 + payload.len()) as u16).to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]); // CRC placeholder
        buf.extend_from_slice(&0xAABBCCDDu32.to_le_bytes()); // client id
        buf.extend_from_slice(&message_type.to_le_bytes());
        buf.extend_from_slice(payload);
        let crc = checksum(&buf);
        buf[8..12].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    #[test]
    fn test_out_packet_header_layout() {
        let mut pkt = OutPacket::new(MessageType::Version, 0x12345678);
        pkt.push_u16(PROTOCOL_VERSION);
        pkt.push_u16(0);
        pkt.finalize();

        let bytes = pkt.as_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[0..4], b"DSUS");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 1001);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 8); // payload only
        assert_eq!(
            u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            0x12345678
        );
        assert_eq!(
            u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            MessageType::Version as u32
        );
    }

    #[test]
    fn test_crc_round_trip() {
        let mut pkt = OutPacket::new(MessageType::PadData, 7);
        pkt.push(&[0xAB; 30]);
        pkt.finalize();

        let bytes = pkt.as_bytes();
        let stored = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        // Zero the checksum field and recompute over the full buffer
        let mut copy = bytes.to_vec();
        copy[8..12].fill(0);
        assert_eq!(checksum(&copy), stored);
    }

    #[test]
    fn test_decode_accepts_valid_packet() {
        let buf = client_packet(MessageType::PadData as u32, &[0x01, 0x00, 0, 0, 0, 0, 0, 0]);
        let req = decode(&buf).unwrap();
        assert_eq!(req.message_type, MessageType::PadData as u32);
        assert_eq!(req.payload.len(), 8);
        assert_eq!(req.payload[0], 0x01);
    }

    #[test]
    fn test_decode_rejects_truncated() {
        assert_eq!(decode(&[0u8; 10]), Err(DecodeError::Truncated));
        assert_eq!(decode(&[]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut buf = client_packet(MessageType::Version as u32, &[]);
        buf[0..4].copy_from_slice(b"DSUS"); // server magic on an inbound packet
        assert_eq!(decode(&buf), Err(DecodeError::BadMagic));
    }

    #[test]
    fn test_decode_rejects_newer_version() {
        let mut buf = client_packet(MessageType::Version as u32, &[]);
        buf[4..6].copy_from_slice(&1002u16.to_le_bytes());
        // CRC left stale on purpose: version gate fires first
        assert_eq!(decode(&buf), Err(DecodeError::UnsupportedVersion(1002)));
    }

    #[test]
    fn test_decode_rejects_length_overrun() {
        let mut buf = client_packet(MessageType::Version as u32, &[]);
        buf[6..8].copy_from_slice(&200u16.to_le_bytes());
        assert_eq!(
            decode(&buf),
            Err(DecodeError::LengthMismatch {
                declared: 200,
                available: 4
            })
        );
    }

    #[test]
    fn test_decode_rejects_flipped_crc_bit() {
        let mut buf = client_packet(MessageType::Version as u32, &[]);
        buf[8] ^= 0x01;
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_corrupted_payload() {
        let mut buf = client_packet(MessageType::PadData as u32, &[0x01, 0x02]);
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_garbage() {
        // Receive buffer longer than the declared packet: CRC still matches
        // because trailing bytes are not part of the packet.
        let mut buf = client_packet(MessageType::Version as u32, &[]);
        buf.extend_from_slice(&[0xFF; 16]);
        let req = decode(&buf).unwrap();
        assert_eq!(req.message_type, MessageType::Version as u32);
        assert!(req.payload.is_empty());
    }
}
