//! DSU server: socket lifecycle, receive thread, status observer
//!
//! # Threads
//!
//! Exactly two threads touch this server:
//!
//! 1. The dedicated receive thread spawned by `start`, blocking on the UDP
//!    socket and dispatching requests synchronously.
//! 2. The host's polling thread calling `broadcast_motion` once per slot per
//!    tick (typically ~1000 Hz).
//!
//! The subscription registry is the only mutable state shared between them
//! and sits behind a single lock. Broadcasts are fire-and-forget UDP writes;
//! a slow or vanished client can never stall the producer.
//!
//! # Shutdown
//!
//! The receive socket carries a 500ms read timeout so the loop can poll the
//! running flag; `stop` flips the flag, joins the thread with a bounded wait
//! and proceeds regardless of the join outcome. Both `start` and `stop` are
//! idempotent.

mod handlers;
mod publisher;

use crate::protocol::{self, codec};
use crate::registry::SubscriptionRegistry;
use crate::types::{MotionSnapshot, SlotState, MAX_SLOTS};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default DSU server port expected by existing clients
pub const DEFAULT_PORT: u16 = 26760;

/// Receive timeout so the loop can notice the running flag
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on waiting for the receive thread during stop
const JOIN_WAIT: Duration = Duration::from_secs(2);

/// Status observer callback.
///
/// Invoked synchronously from whichever thread changes the status (either
/// the caller of `start`/`stop` or, in principle, the receive thread). Not
/// thread-affine; must not block.
pub type StatusCallback = Box<dyn Fn(&str) + Send + Sync>;

/// State shared between the server handle, the receive thread, and the
/// broadcast caller.
struct Shared {
    running: AtomicBool,
    /// Send-side socket handle; `None` while stopped
    socket: Mutex<Option<UdpSocket>>,
    registry: SubscriptionRegistry,
    slots: Mutex<[SlotState; MAX_SLOTS]>,
    /// Constant for the life of this server, echoed in every header
    instance_id: u32,
    callbacks: Mutex<Vec<StatusCallback>>,
}

impl Shared {
    fn emit_status(&self, status: &str) {
        log::info!("Server status: {}", status);
        for cb in self.callbacks.lock().iter() {
            cb(status);
        }
    }
}

/// Motion telemetry UDP server speaking the DSU (cemuhook) protocol
pub struct DsuServer {
    shared: Arc<Shared>,
    recv_thread: Option<JoinHandle<()>>,
}

impl Default for DsuServer {
    fn default() -> Self {
        Self::new()
    }
}

impl DsuServer {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                socket: Mutex::new(None),
                registry: SubscriptionRegistry::new(),
                slots: Mutex::new([SlotState::default(); MAX_SLOTS]),
                instance_id: rand::random(),
                callbacks: Mutex::new(Vec::new()),
            }),
            recv_thread: None,
        }
    }

    /// Register a status observer (see [`StatusCallback`])
    pub fn on_status<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.callbacks.lock().push(Box::new(callback));
    }

    /// Whether the receive thread is running
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Actual bound address while listening (useful with port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared
            .socket
            .lock()
            .as_ref()
            .and_then(|s| s.local_addr().ok())
    }

    /// Bind the loopback UDP socket and spawn the receive thread.
    ///
    /// Reports the outcome through the status observer and the return value;
    /// never raises. A failed start leaves the server stopped. Starting a
    /// running server is a no-op.
    pub fn start(&mut self, port: u16) -> bool {
        if self.is_running() {
            log::warn!("Start ignored: server already running");
            return true;
        }

        let socket = match UdpSocket::bind((Ipv4Addr::LOCALHOST, port)) {
            Ok(socket) => socket,
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                log::error!("Failed to bind UDP port {}: already in use", port);
                self.shared.emit_status(&format!("Port {} in use", port));
                return false;
            }
            Err(e) => {
                log::error!("Failed to bind UDP port {}: {}", port, e);
                self.shared.emit_status("Failed to start");
                return false;
            }
        };

        // Timeout lets the receive loop poll the running flag for shutdown
        if let Err(e) = socket.set_read_timeout(Some(RECV_POLL_INTERVAL)) {
            log::warn!("Failed to set read timeout: {}", e);
        }

        let bound_port = socket.local_addr().map(|a| a.port()).unwrap_or(port);

        let recv_socket = match socket.try_clone() {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to clone UDP socket: {}", e);
                self.shared.emit_status("Failed to start");
                return false;
            }
        };

        *self.shared.socket.lock() = Some(socket);
        self.shared.running.store(true, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("dsu-recv".to_string())
            .spawn(move || receive_loop(&shared, recv_socket));

        match handle {
            Ok(handle) => {
                self.recv_thread = Some(handle);
                self.shared
                    .emit_status(&format!("Listening on :{}", bound_port));
                true
            }
            Err(e) => {
                log::error!("Failed to spawn receive thread: {}", e);
                self.shared.running.store(false, Ordering::Relaxed);
                *self.shared.socket.lock() = None;
                self.shared.emit_status("Failed to start");
                false
            }
        }
    }

    /// Stop the server: unblock and join the receive thread, drop the
    /// socket, clear all subscriptions and reset every packet counter.
    ///
    /// Idempotent; safe to call with a receive in flight.
    pub fn stop(&mut self) {
        if !self.shared.running.swap(false, Ordering::Relaxed) {
            return;
        }

        *self.shared.socket.lock() = None;

        if let Some(handle) = self.recv_thread.take() {
            // Bounded wait: the loop notices the flag within one read
            // timeout. If it somehow overruns, detach rather than hang.
            let deadline = Instant::now() + JOIN_WAIT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    log::error!("Receive thread panicked");
                }
            } else {
                log::warn!("Receive thread did not exit within {:?}, detaching", JOIN_WAIT);
            }
        }

        self.shared.registry.clear();
        *self.shared.slots.lock() = [SlotState::default(); MAX_SLOTS];

        self.shared.emit_status("Stopped");
    }

    /// Publish one motion sample for `slot` to its current subscribers.
    ///
    /// Called from the host's polling thread; never blocks on the receive
    /// thread. Does nothing but update slot state when nobody is subscribed.
    pub fn broadcast_motion(&self, slot: usize, snapshot: &MotionSnapshot, connected: bool) {
        publisher::broadcast_motion(&self.shared, slot, snapshot, connected);
    }
}

impl Drop for DsuServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receive loop: read datagrams, decode, dispatch.
///
/// Every per-packet failure is swallowed: the protocol has no error channel
/// and a single bad packet or transient OS error must never take the server
/// down. The loop exits when the running flag clears.
fn receive_loop(shared: &Shared, socket: UdpSocket) {
    log::info!("Receive thread started");
    let mut buf = [0u8; 1024];

    while shared.running.load(Ordering::Relaxed) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                if shared.running.load(Ordering::Relaxed) {
                    log::warn!("Receive error: {}", e);
                }
                continue;
            }
        };

        if len < protocol::MIN_PACKET_SIZE {
            log::trace!("Ignoring {}-byte runt datagram from {}", len, peer);
            continue;
        }

        match codec::decode(&buf[..len]) {
            Ok(request) => handlers::dispatch(shared, &socket, request, peer),
            Err(e) => log::debug!("Dropping datagram from {}: {}", peer, e),
        }
    }

    log::info!("Receive thread stopped");
}
