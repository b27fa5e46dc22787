//! Telemetry broadcast: motion sample in, PadData packets out
//!
//! Runs on the host's polling thread. When nobody is subscribed to the slot
//! the call returns after updating slot state, skipping the packet build and
//! checksum entirely. One packet is built per call and unicast unchanged to
//! every subscriber; per-destination send errors are not fatal — just log
//! and continue.

use super::{handlers::slot_mac, Shared};
use crate::protocol::{codec::OutPacket, MessageType};
use crate::registry::CLIENT_TIMEOUT;
use crate::types::{MotionSnapshot, MAX_SLOTS};
use std::time::Instant;

/// Neutral analog stick byte (centered)
const STICK_CENTER: u8 = 128;

pub(super) fn broadcast_motion(
    shared: &Shared,
    slot: usize,
    snapshot: &MotionSnapshot,
    connected: bool,
) {
    if slot >= MAX_SLOTS {
        log::warn!("Broadcast for invalid slot {} ignored", slot);
        return;
    }

    let counter = {
        let mut slots = shared.slots.lock();
        slots[slot].connected = connected;
        slots[slot].has_motion = snapshot.has_motion;
        slots[slot].packet_counter
    };

    let subscribers = shared
        .registry
        .subscribers(slot as u8, Instant::now(), CLIENT_TIMEOUT);
    if subscribers.is_empty() {
        return;
    }

    let pkt = build_pad_data(shared.instance_id, slot as u8, snapshot, connected, counter);

    {
        let socket = shared.socket.lock();
        let Some(socket) = socket.as_ref() else {
            return;
        };
        for peer in &subscribers {
            if let Err(e) = socket.send_to(pkt.as_bytes(), peer) {
                log::warn!("Failed to send pad data to {}: {}", peer, e);
            }
        }
    }

    // Counter advances once per built packet, regardless of send outcomes
    shared.slots.lock()[slot].packet_counter = counter.wrapping_add(1);
}

/// Build one PadData packet (84-byte payload, 100 bytes on the wire).
///
/// Digital buttons and touch fields are always zero and sticks are centered:
/// this server reports motion only.
fn build_pad_data(
    instance_id: u32,
    slot: u8,
    snapshot: &MotionSnapshot,
    connected: bool,
    counter: u32,
) -> OutPacket {
    let mut pkt = OutPacket::new(MessageType::PadData, instance_id);

    pkt.push_u8(slot);
    pkt.push_u8(if connected { 2 } else { 0 }); // state
    pkt.push_u8(if snapshot.has_motion { 2 } else { 0 }); // model: full gyro
    pkt.push_u8(0); // connection type
    pkt.push(&slot_mac(slot));
    pkt.push_u8(0x05); // battery: charged
    pkt.push_u8(connected as u8);
    pkt.push_u32(counter);

    pkt.push(&[0u8; 4]); // digital buttons, home, touch button
    pkt.push(&[STICK_CENTER; 4]); // left/right stick X/Y
    pkt.push(&[0u8; 12]); // analog D-pad + analog buttons
    pkt.push(&[0u8; 12]); // two touch point records

    pkt.push_i64(snapshot.timestamp_us);
    for v in snapshot.accel {
        pkt.push_f32(v);
    }
    for v in snapshot.gyro {
        pkt.push_f32(v);
    }

    pkt.finalize();
    pkt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_data_layout() {
        let snapshot = MotionSnapshot::new([1.0, -2.0, 9.8], [0.1, 0.2, 0.3], 123_456);
        let pkt = build_pad_data(0xDEADBEEF, 1, &snapshot, true, 42);
        let bytes = pkt.as_bytes();

        assert_eq!(bytes.len(), 100);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 84); // payload length

        // Offsets below are relative to the start of the payload body,
        // i.e. wire offset 20 (header 16 + message type 4).
        let body = &bytes[20..];
        assert_eq!(body[0], 1); // slot
        assert_eq!(body[1], 2); // state: connected
        assert_eq!(body[2], 2); // model: full gyro
        assert_eq!(body[3], 0); // connection type
        assert_eq!(&body[4..10], &[0, 0, 0, 0, 0, 1]); // MAC
        assert_eq!(body[10], 0x05); // battery
        assert_eq!(body[11], 1); // connected flag
        assert_eq!(u32::from_le_bytes(body[12..16].try_into().unwrap()), 42);
        assert_eq!(&body[16..20], &[0; 4]); // digital state
        assert_eq!(&body[20..24], &[128; 4]); // sticks centered
        assert_eq!(&body[24..48], &[0; 24]); // analog + touch
        assert_eq!(
            i64::from_le_bytes(body[48..56].try_into().unwrap()),
            123_456
        );
        assert_eq!(f32::from_le_bytes(body[56..60].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_le_bytes(body[60..64].try_into().unwrap()), -2.0);
        assert_eq!(f32::from_le_bytes(body[64..68].try_into().unwrap()), 9.8);
        assert_eq!(f32::from_le_bytes(body[68..72].try_into().unwrap()), 0.1);
        assert_eq!(f32::from_le_bytes(body[72..76].try_into().unwrap()), 0.2);
        assert_eq!(f32::from_le_bytes(body[76..80].try_into().unwrap()), 0.3);
    }

    #[test]
    fn test_disconnected_slot_fields() {
        let snapshot = MotionSnapshot::zero();
        let pkt = build_pad_data(0, 0, &snapshot, false, 0);
        let body = &pkt.as_bytes()[20..];

        assert_eq!(body[1], 0); // state: disconnected
        assert_eq!(body[2], 0); // model: no motion
        assert_eq!(body[11], 0); // connected flag
    }
}
