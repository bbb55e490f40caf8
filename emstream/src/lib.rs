//! # Emstream
//!
//! This library provides a transport- and sensor-agnostic streaming core
//! for embedded telemetry devices. It parses length-delimited CRC-protected
//! frames out of a raw byte stream, executes host commands against
//! registered sensors, and emits periodic stream frames, using only
//! caller-provided buffers and no dynamic memory allocation.
//!
//! ## Architecture
//!
//! ```text
//!  ISR context          │ main loop (tick)
//!                       │
//!  ┌───────────┐        │            ┌────────────┐
//!  │ Transport │ bytes  │  ┌────────►│ Dispatcher │
//!  │ driver RX ├──┐     │  │ CMD     └─────┬──────┘
//!  └───────────┘  │     │  │               │ handlers
//!            ┌────▼───┐ │  │         ┌─────▼──────┐
//!            │ RxSink │ │  │         │  Sensor    │
//!            └────┬───┘ │  │         │  registry  │
//!                 │     │  │         └─────┬──────┘
//!            ┌────▼───┐ │ ┌┴─────────┐     │ STREAM frames
//!            │ RX ring├─┼─► Stream   │     │
//!            └────────┘ │ │ core     ├─────┘
//!                       │ └────┬─────┘
//!                       │      │  ACK/NACK        ┌───────────┐
//!                       │ ┌────▼─────────────┐    │ Transport │
//!                       │ │ TX engine        ├───►│ driver TX │
//!                       │ │ (slot + TX ring) │    └───────────┘
//!                       │ └──────────────────┘
//! ```
//!
//! Components:
//! * _RxSink_ wraps the producer half of the RX ring. The application hands
//!   it to the transport driver, which feeds received bytes into it, usually
//!   from interrupt context. A full ring drops the newest bytes.
//! * _StreamCore_ is the tick driver. Each tick it drains complete CMD
//!   frames from the RX ring (resynchronizing on the frame magic after
//!   corruption), routes them through the dispatcher, advances every
//!   streaming sensor's state machine by one step, and pumps the TX engine.
//! * _Dispatcher_ maps opcodes to (parser, handler) pairs. Every accepted
//!   command produces exactly one ACK or NACK echoing the host's
//!   correlation id.
//! * _TX engine_ arbitrates the transmit direction: a single-entry response
//!   slot drained strictly before the best-effort stream ring, whole-frame
//!   drop-oldest under backpressure, and at most one frame written to the
//!   transport per pump.
//!
//! ## Concurrency model
//!
//! A core instance is single-threaded and cooperatively scheduled: one tick
//! executor, plus one interrupt-context byte producer that only ever
//! touches the RX ring through its SPSC producer half. Ring indices are
//! published with release/acquire ordering and no locks, so the sink is
//! safe to call while a tick is running.
//!
//! Sensors plug in through the cooperative [`driver::SensorAdapter`]
//! contract; transports through [`driver::Transport`]. Both are registered
//! by the application wiring, which owns all storage.
#![no_std]

#[cfg(test)]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod buffer;
pub mod cmd;
pub mod config;
pub mod ring;
mod sanity;
pub mod sensor;
pub mod stream;
pub mod tx;

pub use emstream_core as proto;
pub use emstream_driver as driver;

pub use buffer::ByteQueue;
pub use emstream_driver::{ByteSink, SensorAdapter, SensorStatus, Transport, TxStatus};
pub use ring::RingBuffer;
pub use stream::{RxSink, StreamCore};
