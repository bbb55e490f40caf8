//! Sensor adapter contract

use emstream_core::SensorTypeId;

/// Outcome of a cooperative acquisition step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorStatus {
    /// A sample is available for [`SensorAdapter::fill`].
    Ready,
    /// Acquisition is in flight; poll again next tick.
    Busy,
    /// Acquisition failed. Terminal for the current sample.
    Error,
}

/// Cooperative sampling interface the streaming stack drives.
///
/// A sampling cycle is `start`, zero or more `poll`s, then `fill`:
/// * `start` may complete synchronously ([`SensorStatus::Ready`]) or defer
///   the work ([`SensorStatus::Busy`]), in which case the stack keeps
///   calling `poll` on subsequent ticks.
/// * Individual calls may block on short bus transactions (a few
///   milliseconds at most) but must not wait for a sample to come due.
/// * `fill` serializes the acquired sample and returns the byte count, or
///   0 when no sample is available.
pub trait SensorAdapter {
    fn start(&mut self) -> SensorStatus;

    fn poll(&mut self) -> SensorStatus;

    fn fill(&mut self, dst: &mut [u8]) -> usize;

    /// Serialized sample size in bytes, constant per adapter.
    fn sample_size(&self) -> usize;

    /// Sensor kind identifier, constant per adapter.
    fn type_id(&self) -> SensorTypeId;
}
