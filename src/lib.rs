//! dsud - DSU (cemuhook) motion telemetry UDP server
//!
//! Streams per-slot accelerometer and gyroscope samples to subscribed
//! clients (emulators and similar consumers) over a local UDP socket, using
//! the versioned binary protocol those clients already speak.
//!
//! The host application supplies one [`MotionSnapshot`] per slot per tick
//! via [`DsuServer::broadcast_motion`]; everything else (subscriptions,
//! timeouts, the wire format) is handled here.

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use registry::CLIENT_TIMEOUT;
pub use server::{DsuServer, DEFAULT_PORT};
pub use types::{MotionSnapshot, MAX_SLOTS};
