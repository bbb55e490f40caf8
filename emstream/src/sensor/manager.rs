//! Cooperative sampling manager
//!
//! Adapts a blocking one-shot sample reader to the cooperative
//! [`SensorAdapter`] contract: `start` only marks the request, the actual
//! bus transaction runs inside `poll`, and `fill` hands the cached sample
//! out exactly once. The backing reader is expected to complete within a
//! few milliseconds (one short I²C transaction, say); anything longer
//! belongs in a fully asynchronous adapter.

use emstream_core::SensorTypeId;
use emstream_driver::{SensorAdapter, SensorStatus};

/// The sample read failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleFault;

/// Blocking sample reader wrapped by [`SensorManager`].
pub trait SampleSource {
    /// Reads one sample into `dst`, which holds
    /// [`SampleSource::sample_size`] bytes. May block briefly.
    fn read_sample(&mut self, dst: &mut [u8]) -> Result<(), SampleFault>;

    fn sample_size(&self) -> usize;

    fn type_id(&self) -> SensorTypeId;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ManagerState {
    Idle,
    Requested,
    Ready,
    Error,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CacheTooSmall;

/// Cooperative, cached sampling front-end for a [`SampleSource`].
pub struct SensorManager<'a> {
    source: &'a mut dyn SampleSource,
    cache: &'a mut [u8],
    state: ManagerState,
    last_error: Option<SampleFault>,
    samples_taken: u32,
}

impl<'a> SensorManager<'a> {
    /// `cache` must hold at least one serialized sample.
    pub fn new(
        source: &'a mut dyn SampleSource,
        cache: &'a mut [u8],
    ) -> Result<Self, CacheTooSmall> {
        if cache.len() < source.sample_size() {
            return Err(CacheTooSmall);
        }

        Ok(Self {
            source,
            cache,
            state: ManagerState::Idle,
            last_error: None,
            samples_taken: 0,
        })
    }

    pub fn last_error(&self) -> Option<SampleFault> {
        self.last_error
    }

    pub fn samples_taken(&self) -> u32 {
        self.samples_taken
    }

    fn acquire(&mut self) -> SensorStatus {
        let n = self.source.sample_size();
        match self.source.read_sample(&mut self.cache[..n]) {
            Ok(()) => {
                self.state = ManagerState::Ready;
                self.last_error = None;
                self.samples_taken = self.samples_taken.wrapping_add(1);
                SensorStatus::Ready
            }
            Err(fault) => {
                self.state = ManagerState::Error;
                self.last_error = Some(fault);
                SensorStatus::Error
            }
        }
    }
}

impl SensorAdapter for SensorManager<'_> {
    fn start(&mut self) -> SensorStatus {
        match self.state {
            ManagerState::Ready => SensorStatus::Ready,
            ManagerState::Requested => SensorStatus::Busy,
            // Idle or Error: a new request recovers a faulted source.
            _ => {
                self.state = ManagerState::Requested;
                SensorStatus::Busy
            }
        }
    }

    fn poll(&mut self) -> SensorStatus {
        match self.state {
            ManagerState::Requested => self.acquire(),
            ManagerState::Ready | ManagerState::Idle => SensorStatus::Ready,
            ManagerState::Error => SensorStatus::Error,
        }
    }

    fn fill(&mut self, dst: &mut [u8]) -> usize {
        if self.state != ManagerState::Ready {
            return 0;
        }
        let n = self.source.sample_size();
        if dst.len() < n {
            return 0;
        }

        dst[..n].copy_from_slice(&self.cache[..n]);
        // The sample is spent; the next cycle re-reads the source.
        self.state = ManagerState::Idle;
        n
    }

    fn sample_size(&self) -> usize {
        self.source.sample_size()
    }

    fn type_id(&self) -> SensorTypeId {
        self.source.type_id()
    }
}
