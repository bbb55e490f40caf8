#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use emstream::proto::frame::{FRAME_MAX_BYTES, Header, parse_frame, write_frame};
use emstream::proto::{FrameType, SensorTypeId};
use emstream::{SensorAdapter, SensorStatus, Transport, TxStatus};

/// In-memory transport capturing every completed write.
pub struct MockLink {
    pub sent: Vec<Vec<u8>>,
    pub ready: bool,
    pub busy: bool,
    pub chunk: usize,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            ready: true,
            busy: false,
            chunk: FRAME_MAX_BYTES,
        }
    }

    /// Every captured frame, parsed and CRC-checked.
    pub fn frames(&self) -> Vec<(Header, Vec<u8>)> {
        self.sent
            .iter()
            .map(|bytes| {
                let view = parse_frame(bytes).expect("captured write is not a valid frame");
                assert_eq!(view.total_len, bytes.len());
                (view.header, view.payload.to_vec())
            })
            .collect()
    }

    pub fn frames_of_type(&self, frame_type: FrameType) -> Vec<(Header, Vec<u8>)> {
        self.frames()
            .into_iter()
            .filter(|(h, _)| h.frame_type() == Some(frame_type))
            .collect()
    }
}

impl Transport for MockLink {
    fn try_write(&mut self, buf: &[u8]) -> TxStatus {
        if self.busy {
            return TxStatus::Busy;
        }
        self.sent.push(buf.to_vec());
        TxStatus::Done
    }

    fn link_ready(&self) -> bool {
        self.ready
    }

    fn best_chunk(&self) -> usize {
        self.chunk
    }
}

/// Scripted sensor; the test keeps a [`ScriptedSensor::clone`] to steer and
/// inspect it while the core holds the registered handle.
pub struct SensorScript {
    pub sample: Vec<u8>,
    pub type_id: u8,
    pub start_results: VecDeque<SensorStatus>,
    pub poll_results: VecDeque<SensorStatus>,
    pub fill_empty: bool,
    pub fills: usize,
}

#[derive(Clone)]
pub struct ScriptedSensor(Rc<RefCell<SensorScript>>);

impl ScriptedSensor {
    pub fn with_sample(sample: &[u8]) -> Self {
        Self(Rc::new(RefCell::new(SensorScript {
            sample: sample.to_vec(),
            type_id: 0x01,
            start_results: VecDeque::new(),
            poll_results: VecDeque::new(),
            fill_empty: false,
            fills: 0,
        })))
    }

    pub fn script(&self) -> std::cell::RefMut<'_, SensorScript> {
        self.0.borrow_mut()
    }
}

impl SensorAdapter for ScriptedSensor {
    fn start(&mut self) -> SensorStatus {
        self.0
            .borrow_mut()
            .start_results
            .pop_front()
            .unwrap_or(SensorStatus::Ready)
    }

    fn poll(&mut self) -> SensorStatus {
        self.0
            .borrow_mut()
            .poll_results
            .pop_front()
            .unwrap_or(SensorStatus::Ready)
    }

    fn fill(&mut self, dst: &mut [u8]) -> usize {
        let mut script = self.0.borrow_mut();
        if script.fill_empty {
            return 0;
        }
        let n = script.sample.len().min(dst.len());
        dst[..n].copy_from_slice(&script.sample[..n]);
        script.fills += 1;
        n
    }

    fn sample_size(&self) -> usize {
        self.0.borrow().sample.len()
    }

    fn type_id(&self) -> SensorTypeId {
        SensorTypeId::new(self.0.borrow().type_id)
    }
}

/// A host-side CMD frame with the device-bound fields the tests care about.
pub fn cmd_frame(cmd_id: u8, payload: &[u8], seq: u32) -> Vec<u8> {
    let mut buf = [0u8; FRAME_MAX_BYTES];
    let n = write_frame(&mut buf, FrameType::Cmd, cmd_id, payload, seq, 0)
        .expect("test frame must fit");
    buf[..n].to_vec()
}
