//! Sensor registry and per-sensor streaming state machines
//!
//! Each registered sensor gets a slot holding its adapter, streaming flags,
//! sequence counter, and period bookkeeping. The state machine advances at
//! most one transition per tick, so a slow sensor never stalls the loop:
//! a sample cycle is at least three ticks (request, complete, emit), plus
//! one tick per additional poll while the adapter reports busy.

use emstream_core::frame::MAX_PAYLOAD;
use emstream_core::{RuntimeId, SensorTypeId};
use emstream_driver::{SensorAdapter, SensorStatus};

use crate::config::{DEFAULT_PERIOD_MS, MAX_SAMPLE_LEN, MAX_SENSORS};
use crate::tx::TxEngine;

pub mod manager;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// Waiting for the period to elapse.
    Idle,
    /// A sample acquisition is due.
    Starting,
    /// Acquisition in flight, polling the adapter.
    Polling,
    /// A sample is available to serialize and emit.
    Ready,
    /// The adapter failed; streaming will be disabled on the next step.
    Faulted,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// All sensor slots are taken.
    Full,
    /// The adapter's serialized sample cannot fit a stream payload.
    SampleTooLarge,
}

/// Streaming state of one registered sensor.
pub struct SensorSlot<'a> {
    runtime_id: RuntimeId,
    adapter: &'a mut dyn SensorAdapter,
    ready: bool,
    streaming: bool,
    seq: u32,
    state: StreamState,
    period_ms: u16,
    default_period_ms: u16,
    max_payload: u16,
    last_emit_ms: u32,
}

impl<'a> SensorSlot<'a> {
    fn new(runtime_id: RuntimeId, adapter: &'a mut dyn SensorAdapter) -> Self {
        Self {
            runtime_id,
            adapter,
            ready: true,
            streaming: false,
            seq: 0,
            state: StreamState::Idle,
            period_ms: DEFAULT_PERIOD_MS,
            default_period_ms: DEFAULT_PERIOD_MS,
            max_payload: MAX_PAYLOAD as u16,
            last_emit_ms: 0,
        }
    }

    pub fn runtime_id(&self) -> RuntimeId {
        self.runtime_id
    }

    pub fn type_id(&self) -> SensorTypeId {
        self.adapter.type_id()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn period_ms(&self) -> u16 {
        self.period_ms
    }

    pub fn default_period_ms(&self) -> u16 {
        self.default_period_ms
    }

    pub(crate) fn begin_streaming(&mut self) {
        self.streaming = true;
        self.state = StreamState::Idle;
        self.seq = 0;
    }

    pub(crate) fn halt_streaming(&mut self) {
        self.streaming = false;
        self.state = StreamState::Idle;
    }

    pub(crate) fn set_period(&mut self, period_ms: u16) {
        self.period_ms = period_ms;
    }

    /// One-shot read of the adapter's current sample, for on-demand reads.
    pub(crate) fn read_once(&mut self, dst: &mut [u8]) -> usize {
        self.adapter.fill(dst)
    }

    /// Advances the state machine by exactly one transition.
    pub(crate) fn step(&mut self, now_ms: u32, tx: &mut TxEngine<'_>) {
        match self.state {
            StreamState::Idle => {
                if now_ms.wrapping_sub(self.last_emit_ms) >= u32::from(self.period_ms) {
                    self.state = StreamState::Starting;
                }
            }
            StreamState::Starting => {
                self.state = match self.adapter.start() {
                    SensorStatus::Ready => StreamState::Ready,
                    SensorStatus::Busy => StreamState::Polling,
                    SensorStatus::Error => StreamState::Faulted,
                };
            }
            StreamState::Polling => {
                self.state = match self.adapter.poll() {
                    SensorStatus::Ready => StreamState::Ready,
                    SensorStatus::Busy => StreamState::Polling,
                    SensorStatus::Error => StreamState::Faulted,
                };
            }
            StreamState::Ready => self.emit(now_ms, tx),
            StreamState::Faulted => {
                warn!("sensor {} failed, streaming halted", self.runtime_id.into_u8());
                self.streaming = false;
                self.state = StreamState::Idle;
            }
        }
    }

    /// Serializes the sample behind the runtime-id prefix and hands the
    /// frame to the TX engine. An empty fill skips this period.
    fn emit(&mut self, now_ms: u32, tx: &mut TxEngine<'_>) {
        let mut payload = [0u8; MAX_PAYLOAD];
        let want = usize::from(self.max_payload)
            .saturating_sub(1)
            .min(MAX_PAYLOAD - 1);

        let filled = self.adapter.fill(&mut payload[1..1 + want]);
        if filled > 0 {
            let filled = filled.min(want);
            payload[0] = self.runtime_id.into_u8();
            tx.send_stream(&payload[..filled + 1], now_ms, self.seq);
            self.seq = self.seq.wrapping_add(1);
        }

        self.last_emit_ms = now_ms;
        self.state = StreamState::Idle;
    }
}

/// Fixed-capacity table of registered sensors, in registration order.
pub struct Registry<'a> {
    slots: heapless::Vec<SensorSlot<'a>, MAX_SENSORS>,
}

impl<'a> Registry<'a> {
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
        }
    }

    /// Adds a sensor and assigns it the next runtime id (1-based).
    pub fn register(
        &mut self,
        adapter: &'a mut dyn SensorAdapter,
    ) -> Result<RuntimeId, RegistryError> {
        if adapter.sample_size() > MAX_SAMPLE_LEN {
            return Err(RegistryError::SampleTooLarge);
        }

        let runtime_id = RuntimeId::new(self.slots.len() as u8 + 1);
        self.slots
            .push(SensorSlot::new(runtime_id, adapter))
            .map_err(|_| RegistryError::Full)?;
        Ok(runtime_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, runtime_id: RuntimeId) -> Option<&SensorSlot<'a>> {
        self.slots.iter().find(|s| s.runtime_id == runtime_id)
    }

    pub fn find_mut(&mut self, runtime_id: RuntimeId) -> Option<&mut SensorSlot<'a>> {
        self.slots.iter_mut().find(|s| s.runtime_id == runtime_id)
    }

    /// `(runtime_id, type_id)` pairs in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (RuntimeId, SensorTypeId)> + '_ {
        self.slots.iter().map(|s| (s.runtime_id, s.type_id()))
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [SensorSlot<'a>] {
        &mut self.slots
    }
}

impl Default for Registry<'_> {
    fn default() -> Self {
        Self::new()
    }
}
