//! Compile-time integration checks
//!
//! Ties the configuration values to the protocol constants so inconsistent
//! combinations fail the build instead of corrupting the wire.

use emstream_core::frame::{CRC_LEN, FRAME_MAX_BYTES, HDR_LEN, MAX_PAYLOAD};

use crate::config::{
    DEFAULT_PERIOD_MS, MAX_PERIOD_MS, MAX_SAMPLE_LEN, MIN_PERIOD_MS, RX_RING_CAP,
    TRANSPORT_MAX_WRITE, TX_RING_CAP,
};

// Header layout: magic + type + ver + len + cmd_id + rsv + seq + ts_ms.
const _: () = assert!(HDR_LEN == 2 + 1 + 1 + 2 + 1 + 1 + 4 + 4);
const _: () = assert!(FRAME_MAX_BYTES == HDR_LEN + MAX_PAYLOAD + CRC_LEN);

// A sample plus its runtime-id prefix must fit a frame payload.
const _: () = assert!(MAX_SAMPLE_LEN + 1 <= MAX_PAYLOAD);

// A full max-size frame must fit entirely in either ring (usable = cap - 1).
const _: () = assert!(TX_RING_CAP.is_power_of_two());
const _: () = assert!(RX_RING_CAP.is_power_of_two());
const _: () = assert!(FRAME_MAX_BYTES <= TX_RING_CAP - 1);
const _: () = assert!(FRAME_MAX_BYTES <= RX_RING_CAP - 1);

// A full max-size frame must fit in a single transport write.
const _: () = assert!(FRAME_MAX_BYTES <= TRANSPORT_MAX_WRITE);

const _: () = assert!(MIN_PERIOD_MS > 0);
const _: () = assert!(MIN_PERIOD_MS <= DEFAULT_PERIOD_MS);
const _: () = assert!(DEFAULT_PERIOD_MS <= MAX_PERIOD_MS);
