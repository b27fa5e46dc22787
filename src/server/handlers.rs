//! Request handlers for decoded client packets
//!
//! Each handler consumes one validated request and sends at most one
//! response per addressed slot. Malformed payloads are dropped without a
//! reply; the protocol has no error channel to the client.

use super::Shared;
use crate::protocol::{codec::OutPacket, MessageType, Request, PROTOCOL_VERSION};
use crate::types::MAX_SLOTS;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

/// Battery level reported for every slot: 0x05 = "charged"
const BATTERY_CHARGED: u8 = 0x05;

/// Dispatch a decoded request to its handler
pub(super) fn dispatch(shared: &Shared, socket: &UdpSocket, request: Request<'_>, peer: SocketAddr) {
    match MessageType::from_u32(request.message_type) {
        Some(MessageType::Version) => handle_version(shared, socket, peer),
        Some(MessageType::ControllerInfo) => {
            handle_controller_info(shared, socket, request.payload, peer)
        }
        Some(MessageType::PadData) => handle_subscribe(shared, request.payload, peer),
        None => {
            log::debug!(
                "Unknown message type {:#010x} from {}",
                request.message_type,
                peer
            );
        }
    }
}

/// Version handshake: reply with the implemented protocol version.
///
/// Requests declaring a newer version never get here; the codec rejects
/// them at decode time.
fn handle_version(shared: &Shared, socket: &UdpSocket, peer: SocketAddr) {
    let mut pkt = OutPacket::new(MessageType::Version, shared.instance_id);
    pkt.push_u16(PROTOCOL_VERSION);
    pkt.push_u16(0); // padding
    pkt.finalize();

    send(socket, &pkt, peer);
}

/// Controller info: one response per requested slot.
///
/// Payload is `numPorts: i32` followed by that many slot index bytes. The
/// whole request is dropped when the count is out of range, the buffer is
/// short, or any requested slot index is invalid.
fn handle_controller_info(shared: &Shared, socket: &UdpSocket, payload: &[u8], peer: SocketAddr) {
    if payload.len() < 4 {
        log::debug!("ControllerInfo from {} too short", peer);
        return;
    }
    let num_ports = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    if num_ports < 0 || num_ports as usize > MAX_SLOTS {
        log::debug!("ControllerInfo from {} with bad port count {}", peer, num_ports);
        return;
    }
    let requested = &payload[4..];
    if requested.len() < num_ports as usize {
        log::debug!("ControllerInfo from {} shorter than declared count", peer);
        return;
    }
    let requested = &requested[..num_ports as usize];
    if requested.iter().any(|&slot| slot as usize >= MAX_SLOTS) {
        log::debug!("ControllerInfo from {} names an invalid slot", peer);
        return;
    }

    for &slot in requested {
        let (connected, has_motion) = {
            let slots = shared.slots.lock();
            let state = &slots[slot as usize];
            (state.connected, state.has_motion)
        };

        let mut pkt = OutPacket::new(MessageType::ControllerInfo, shared.instance_id);
        pkt.push_u8(slot);
        pkt.push_u8(if connected { 2 } else { 0 }); // state
        pkt.push_u8(if has_motion { 2 } else { 0 }); // model: full gyro
        pkt.push_u8(0); // connection type
        pkt.push(&slot_mac(slot));
        pkt.push_u8(BATTERY_CHARGED);
        pkt.push_u8(0); // trailing pad
        pkt.finalize();

        send(socket, &pkt, peer);
    }
}

/// Pad-data subscribe: `flags(1) + slot(1) + MAC(6, ignored)`.
///
/// Delegates to the registry; no response is sent — confirmation is the
/// telemetry stream itself.
fn handle_subscribe(shared: &Shared, payload: &[u8], peer: SocketAddr) {
    if payload.len() < 2 {
        log::debug!("Subscribe from {} too short", peer);
        return;
    }
    let flags = payload[0];
    let slot = payload[1];
    log::debug!(
        "Subscribe from {} (flags {:#04x}, slot {})",
        peer,
        flags,
        slot
    );
    shared.registry.subscribe(peer, flags, slot, Instant::now());
}

/// Synthetic MAC for a slot: five zero bytes then the slot index
pub(super) fn slot_mac(slot: u8) -> [u8; 6] {
    [0, 0, 0, 0, 0, slot]
}

/// Best-effort unicast; send failures are logged and ignored
fn send(socket: &UdpSocket, pkt: &OutPacket, peer: SocketAddr) {
    if let Err(e) = socket.send_to(pkt.as_bytes(), peer) {
        log::warn!("Failed to send to {}: {}", peer, e);
    }
}
