//! Motion sample and slot bookkeeping types

/// Number of virtual controller slots the server reports
pub const MAX_SLOTS: usize = 4;

/// One instantaneous motion sample for a single slot
///
/// Produced by the host application's polling loop and serialized as-is;
/// the server never mutates a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSnapshot {
    /// Accelerometer data (g-force)
    pub accel: [f32; 3], // x, y, z
    /// Gyroscope data (degrees/second)
    pub gyro: [f32; 3], // pitch, yaw, roll
    /// Sample timestamp in microseconds
    pub timestamp_us: i64,
    /// Whether the source device has motion sensors at all
    pub has_motion: bool,
}

impl MotionSnapshot {
    /// Create new motion snapshot
    pub fn new(accel: [f32; 3], gyro: [f32; 3], timestamp_us: i64) -> Self {
        Self {
            accel,
            gyro,
            timestamp_us,
            has_motion: true,
        }
    }

    /// Create a zero snapshot from a source without motion sensors
    pub fn zero() -> Self {
        Self {
            accel: [0.0, 0.0, 0.0],
            gyro: [0.0, 0.0, 0.0],
            timestamp_us: 0,
            has_motion: false,
        }
    }
}

impl Default for MotionSnapshot {
    fn default() -> Self {
        Self::zero()
    }
}

/// Per-slot server-side state
///
/// `packet_counter` increments by exactly one per broadcast packet for the
/// slot, wraps per u32 arithmetic, and resets to zero only on server stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotState {
    /// Whether the slot's device is currently connected
    pub connected: bool,
    /// Whether the slot's device reports motion data
    pub has_motion: bool,
    /// Monotonic (wrapping) per-slot packet counter
    pub packet_counter: u32,
}
