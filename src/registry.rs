//! Client subscription registry
//!
//! Tracks which client endpoints should receive each slot's telemetry.
//! Two maps live under one mutex:
//!
//! - `(endpoint, slot) → last seen` for specific-slot subscriptions
//! - `endpoint → last seen` for all-slot subscriptions
//!
//! An endpoint may hold both kinds at once; `subscribers` deduplicates.
//! Expired entries are pruned lazily during lookup rather than by a
//! background sweep, inside the same critical section as the read, so a
//! broadcast never observes a half-pruned registry.
//!
//! Time is injected as `Instant` arguments. The registry never reads a
//! clock itself, which keeps timeout pruning deterministic in tests.

use crate::types::MAX_SLOTS;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Inactivity window after which a subscriber stops receiving telemetry
pub const CLIENT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Subscribe-request flag: register for the requested slot
const FLAG_SLOT: u8 = 0x01;

/// Subscribe-request flag: register by MAC.
///
/// MAC identity is not otherwise tracked, so this is treated as an all-slot
/// subscription (the original server's deliberate simplification).
const FLAG_MAC: u8 = 0x02;

#[derive(Default)]
struct Inner {
    slot_subs: HashMap<(SocketAddr, u8), Instant>,
    all_subs: HashMap<SocketAddr, Instant>,
}

/// Self-pruning subscriber bookkeeping shared between the receive thread
/// (subscribes) and the broadcast caller (lookups).
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh a subscription from a pad-data request.
    ///
    /// `flags == 0` subscribes the endpoint to all slots. Otherwise bit 0
    /// subscribes to `slot` (when valid) and bit 1 additionally registers an
    /// all-slot subscription. Re-subscribing refreshes the timestamp only.
    pub fn subscribe(&self, endpoint: SocketAddr, flags: u8, slot: u8, now: Instant) {
        let mut inner = self.inner.lock();

        if flags == 0 {
            inner.all_subs.insert(endpoint, now);
            return;
        }
        if flags & FLAG_SLOT != 0 && (slot as usize) < MAX_SLOTS {
            inner.slot_subs.insert((endpoint, slot), now);
        }
        if flags & FLAG_MAC != 0 {
            inner.all_subs.insert(endpoint, now);
        }
    }

    /// Endpoints that should receive `slot`'s next telemetry packet.
    ///
    /// Deduplicated union of the slot's specific subscribers and all-slot
    /// subscribers, excluding anything last seen longer than `timeout` ago.
    /// Expired entries are removed from both maps as a side effect.
    pub fn subscribers(&self, slot: u8, now: Instant, timeout: Duration) -> Vec<SocketAddr> {
        let mut inner = self.inner.lock();

        inner
            .slot_subs
            .retain(|_, seen| now.saturating_duration_since(*seen) <= timeout);
        inner
            .all_subs
            .retain(|_, seen| now.saturating_duration_since(*seen) <= timeout);

        let mut out: Vec<SocketAddr> = inner
            .slot_subs
            .keys()
            .filter(|(_, s)| *s == slot)
            .map(|(addr, _)| *addr)
            .collect();
        for addr in inner.all_subs.keys() {
            if !out.contains(addr) {
                out.push(*addr);
            }
        }
        out
    }

    /// Drop every subscription (server stop)
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.slot_subs.clear();
        inner.all_subs.clear();
    }
}
