//! Streaming core: RX parsing, command routing, tick driver
//!
//! [`StreamCore`] owns the consumer half of the RX ring, the TX engine, the
//! sensor registry, and the command dispatcher. [`RxSink`] is the matching
//! producer-side handle the application gives to its transport driver.
//!
//! One [`StreamCore::tick`] drains every complete command frame from the RX
//! ring, advances each streaming sensor by one state-machine step, and
//! pumps at most one frame to the transport. The tick rate bounds both the
//! command latency and the fastest usable stream period.

use emstream_core::frame::{
    FRAME_MAX_BYTES, FrameError, HDR_LEN, Header, MAGIC, MAX_PAYLOAD, MIN_FRAME_BYTES, parse_frame,
};
use emstream_core::{ErrorCode, FrameType, RuntimeId};
use emstream_driver::{ByteSink, SensorAdapter, Transport};

use crate::buffer::ByteQueue;
use crate::cmd::{Dispatcher, Response};
use crate::ring::{Consumer, Producer};
use crate::sensor::{Registry, RegistryError, SensorSlot};
use crate::tx::TxEngine;

/// RX byte entry point, handed to the transport driver.
///
/// Wraps the producer half of the RX ring; safe to call from interrupt
/// context while a tick runs on the main loop. When the ring cannot take a
/// chunk the newest bytes are dropped and accounted in the ring's
/// `rejected` counter.
pub struct RxSink<'a> {
    producer: Producer<'a>,
}

impl<'a> RxSink<'a> {
    pub fn new(producer: Producer<'a>) -> Self {
        Self { producer }
    }
}

impl ByteSink for RxSink<'_> {
    fn receive(&mut self, bytes: &[u8]) {
        // Clamp a pathological burst to what the index width can express.
        let n = bytes.len().min(usize::from(u16::MAX));
        let _ = self.producer.write_try(&bytes[..n]);
    }
}

/// The transport- and sensor-agnostic streaming engine.
pub struct StreamCore<'a> {
    rx: Consumer<'a>,
    tx: TxEngine<'a>,
    sensors: Registry<'a>,
    dispatcher: Dispatcher,
}

impl<'a> StreamCore<'a> {
    /// Binds the core to its caller-owned queues. The RX ring's matching
    /// producer half goes into an [`RxSink`] for the transport driver.
    pub fn new(tx_queue: &'a mut dyn ByteQueue, rx: Consumer<'a>) -> Self {
        Self {
            rx,
            tx: TxEngine::new(tx_queue, MAX_PAYLOAD),
            sensors: Registry::new(),
            dispatcher: Dispatcher::with_defaults(),
        }
    }

    /// Adds a sensor to the registry and returns its host-visible id.
    pub fn register_sensor(
        &mut self,
        adapter: &'a mut dyn SensorAdapter,
    ) -> Result<RuntimeId, RegistryError> {
        self.sensors.register(adapter)
    }

    pub fn sensors(&self) -> &Registry<'a> {
        &self.sensors
    }

    pub fn sensor(&self, runtime_id: RuntimeId) -> Option<&SensorSlot<'a>> {
        self.sensors.get(runtime_id)
    }

    pub fn tx(&self) -> &TxEngine<'a> {
        &self.tx
    }

    pub fn rx(&self) -> &Consumer<'a> {
        &self.rx
    }

    /// Command-table access for application-defined opcodes.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// One scheduler pass: RX commands, sensor state machines, TX pump.
    ///
    /// `now_ms` is the caller's monotonic millisecond clock; it may wrap.
    pub fn tick(&mut self, now_ms: u32, transport: &mut impl Transport) {
        self.process_rx(now_ms);

        for slot in self.sensors.slots_mut() {
            if slot.is_ready() && slot.is_streaming() {
                slot.step(now_ms, &mut self.tx);
            }
        }

        self.tx.pump(transport);
    }

    /// Drains complete frames from the RX ring, dispatching CMDs and
    /// resynchronizing on the magic after corruption.
    fn process_rx(&mut self, now_ms: u32) {
        loop {
            let used = self.rx.len();
            if used < MIN_FRAME_BYTES {
                break;
            }

            // Fetch the frame candidate at the read index. The copy (at
            // most one frame) keeps the logic independent of where the
            // ring storage wraps.
            let mut scratch = [0u8; FRAME_MAX_BYTES];
            let take = used.min(FRAME_MAX_BYTES);
            let got = self.rx.copy_to(&mut scratch[..take]);
            let view = &scratch[..got];

            match parse_frame(view) {
                Ok(frame) => {
                    if frame.header.frame_type() == Some(FrameType::Cmd) {
                        self.handle_cmd(&frame.header, frame.payload, now_ms);
                    }
                    // Anything else coming from the host is discarded.
                    self.rx.pop(frame.total_len);
                }
                Err(FrameError::Truncated) => break,
                Err(FrameError::BadMagic) => {
                    // Skip to the next magic candidate. Keep the final byte
                    // when none is found: it may be the first half of a
                    // magic still in flight.
                    match find_magic(&view[1..]) {
                        Some(offset) => self.rx.pop(1 + offset),
                        None => self.rx.pop(view.len() - 1),
                    }
                }
                Err(_) => {
                    // Magic-shaped garbage (bad version, length, or CRC):
                    // shift one byte and rescan.
                    self.rx.pop(1);
                }
            }
        }
    }

    /// Runs one command and queues exactly one ACK or NACK echoing the
    /// host's `cmd_id` and `seq`.
    fn handle_cmd(&mut self, header: &Header, payload: &[u8], now_ms: u32) {
        if payload.len() > MAX_PAYLOAD {
            self.tx.send_response(
                FrameType::Nack,
                header.cmd_id,
                header.seq,
                now_ms,
                &[ErrorCode::InvalidLen.into_u8()],
            );
            return;
        }

        let mut resp = Response::new();
        match self
            .dispatcher
            .dispatch(&mut self.sensors, header.cmd_id, payload, &mut resp)
        {
            Ok(()) => {
                debug!("cmd {} ok", header.cmd_id);
                self.tx.send_response(
                    FrameType::Ack,
                    header.cmd_id,
                    header.seq,
                    now_ms,
                    resp.as_slice(),
                );
            }
            Err(code) => {
                debug!("cmd {} rejected: {}", header.cmd_id, code.into_u8());
                self.tx.send_response(
                    FrameType::Nack,
                    header.cmd_id,
                    header.seq,
                    now_ms,
                    &[code.into_u8()],
                );
            }
        }
    }
}

const MAGIC_BYTES: [u8; 2] = MAGIC.to_le_bytes();

fn find_magic(window: &[u8]) -> Option<usize> {
    window
        .windows(2)
        .position(|pair| pair[0] == MAGIC_BYTES[0] && pair[1] == MAGIC_BYTES[1])
}

// The scratch buffer must hold a header even for the smallest fetch.
const _: () = assert!(FRAME_MAX_BYTES >= MIN_FRAME_BYTES && MIN_FRAME_BYTES >= HDR_LEN);
