//! Stack configuration: ring sizes, registry capacity, period bounds

use emstream_core::frame::MAX_PAYLOAD;

/// TX stream ring capacity in bytes (power of two, one byte reserved).
pub const TX_RING_CAP: usize = 8192;
/// RX ring capacity in bytes (power of two, one byte reserved).
pub const RX_RING_CAP: usize = 2048;

/// Bytes accepted by one transport write on the smallest supported link
/// (full-speed CDC bulk endpoint).
pub const TRANSPORT_MAX_WRITE: usize = 64;

/// Sensor registry slots per core instance.
pub const MAX_SENSORS: usize = 8;

/// Largest serialized sample; one payload byte is reserved for the
/// runtime-id prefix of STREAM frames.
pub const MAX_SAMPLE_LEN: usize = MAX_PAYLOAD - 1;

pub const DEFAULT_PERIOD_MS: u16 = 5;
pub const MIN_PERIOD_MS: u16 = 1;
pub const MAX_PERIOD_MS: u16 = 10_000;
