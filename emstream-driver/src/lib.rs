//! Emstream driver interface
//!
//! The crate provides the contracts between peripheral drivers and the
//! Emstream stack. Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. Emstream stack users should
//! depend on the `emstream` crate instead.
//!
//! Two families of drivers plug into the stack:
//! * A transport driver owns the physical byte pipe (UART, USB-CDC). It
//!   implements [`Transport`] for the transmit direction and delivers
//!   received bytes, possibly from interrupt context, into a [`ByteSink`]
//!   handed over by the application wiring.
//! * A sensor driver implements [`SensorAdapter`], a cooperative
//!   start/poll/fill contract that keeps individual hardware transactions
//!   short so the main loop stays responsive.
//!
//! Time is not abstracted here. The stack is tick-polled and takes the
//! current monotonic millisecond count as a plain wrapping `u32` argument;
//! drivers never need a clock of their own.

#![no_std]

pub mod sensor;
pub mod transport;

pub use sensor::{SensorAdapter, SensorStatus};
pub use transport::{ByteSink, Transport, TxStatus};
