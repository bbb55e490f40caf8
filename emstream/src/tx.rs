//! Transmit engine: frame enqueue, response priority slot, transport pump
//!
//! Two transmit classes share one transport:
//! * Command responses go through a single-entry priority slot. A response
//!   is never dropped once formed, but a newer one overwrites a pending
//!   one, since a newer response obsoletes an older one.
//! * Stream frames go through the best-effort TX ring with a frame-aware
//!   drop-oldest policy: under backpressure, whole frames are removed from
//!   the read end until the new frame fits.
//!
//! The pump writes at most one frame per call and drains the response slot
//! strictly before the stream ring.

use emstream_core::FrameType;
use emstream_core::frame::{FRAME_MAX_BYTES, HDR_LEN, Header, MIN_FRAME_BYTES, write_frame};
use emstream_driver::{Transport, TxStatus};

use crate::buffer::ByteQueue;

struct ResponseSlot {
    frame: [u8; FRAME_MAX_BYTES],
    len: u16,
    pending: bool,
}

pub struct TxEngine<'a> {
    queue: &'a mut dyn ByteQueue,
    response: ResponseSlot,
    /// Largest accepted stream payload; 0 disables the check.
    max_payload: usize,
    dropped_frames: u32,
}

impl<'a> TxEngine<'a> {
    pub fn new(queue: &'a mut dyn ByteQueue, max_payload: usize) -> Self {
        Self {
            queue,
            response: ResponseSlot {
                frame: [0; FRAME_MAX_BYTES],
                len: 0,
                pending: false,
            },
            max_payload,
            dropped_frames: 0,
        }
    }

    /// Whole frames discarded to make room, since construction.
    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames
    }

    /// Read-only view of the stream queue, for metrics and tests.
    pub fn stream_queue(&self) -> &dyn ByteQueue {
        &*self.queue
    }

    pub fn response_pending(&self) -> bool {
        self.response.pending
    }

    /// Appends a ready-made frame to the stream ring, evicting whole frames
    /// from the old end when space is short.
    pub fn enqueue_frame(&mut self, frame: &[u8]) {
        let len = frame.len();
        let cap = self.queue.capacity();
        if len == 0 || cap == 0 || len > cap - 1 {
            return;
        }

        if self.queue.space() < len {
            warn!("tx ring full, evicting oldest frames");
        }
        while self.queue.space() < len {
            if drop_one_frame(&mut *self.queue) {
                self.dropped_frames = self.dropped_frames.wrapping_add(1);
            } else {
                // The head is an incomplete frame; nothing frame-aware left
                // to do but start over.
                self.queue.clear();
                break;
            }
        }

        let _ = self.queue.append(frame);
    }

    /// Formats an ACK/NACK into the priority slot, overwriting any pending
    /// response.
    pub fn send_response(
        &mut self,
        frame_type: FrameType,
        cmd_id: u8,
        req_seq: u32,
        ts_ms: u32,
        payload: &[u8],
    ) {
        if let Some(n) = write_frame(
            &mut self.response.frame,
            frame_type,
            cmd_id,
            payload,
            req_seq,
            ts_ms,
        ) {
            self.response.len = n as u16;
            self.response.pending = true;
        }
    }

    /// Builds a STREAM frame and routes it through
    /// [`TxEngine::enqueue_frame`]. Oversized payloads are dropped silently.
    pub fn send_stream(&mut self, payload: &[u8], ts_ms: u32, seq: u32) {
        if self.max_payload != 0 && payload.len() > self.max_payload {
            return;
        }

        let mut staged = [0u8; FRAME_MAX_BYTES];
        if let Some(n) = write_frame(&mut staged, FrameType::Stream, 0, payload, seq, ts_ms) {
            self.enqueue_frame(&staged[..n]);
        }
    }

    /// Writes at most one frame to the transport: a pending response first,
    /// otherwise the frame at the head of the stream ring.
    ///
    /// Busy transports keep the frame where it is; it is retried on the
    /// next pump.
    pub fn pump(&mut self, transport: &mut dyn Transport) {
        if !transport.link_ready() {
            return;
        }

        if self.response.pending && usize::from(self.response.len) <= transport.best_chunk() {
            let len = usize::from(self.response.len);
            if let TxStatus::Done = transport.try_write(&self.response.frame[..len]) {
                self.response.pending = false;
            }
            return;
        }

        if self.queue.len() < MIN_FRAME_BYTES {
            return;
        }

        let mut hdr_buf = [0u8; HDR_LEN];
        self.queue.copy_to(&mut hdr_buf);
        let Ok(header) = Header::parse(&hdr_buf) else {
            // Garbage at the head of the ring; resynchronize byte-wise.
            self.queue.pop(1);
            return;
        };

        let frame_len = header.frame_len();
        if self.queue.len() < frame_len || frame_len > transport.best_chunk() {
            return;
        }

        let chunk = self.queue.peek_contiguous();
        let status = if chunk.len() >= frame_len {
            transport.try_write(&chunk[..frame_len])
        } else {
            let mut staged = [0u8; FRAME_MAX_BYTES];
            self.queue.copy_to(&mut staged[..frame_len]);
            transport.try_write(&staged[..frame_len])
        };

        if let TxStatus::Done = status {
            self.queue.pop(frame_len);
        }
    }
}

/// Removes the frame at the read end of `queue`.
///
/// Returns `false` when the head holds less than a complete frame, in which
/// case nothing is removed and only a full clear can reclaim the space. A
/// head that does not look like a frame at all costs one byte instead.
pub fn drop_one_frame(queue: &mut dyn ByteQueue) -> bool {
    if queue.len() < MIN_FRAME_BYTES {
        return false;
    }

    let mut hdr_buf = [0u8; HDR_LEN];
    queue.copy_to(&mut hdr_buf);
    let Ok(header) = Header::parse(&hdr_buf) else {
        queue.pop(1);
        return true;
    };

    let frame_len = header.frame_len();
    if queue.len() < frame_len {
        return false;
    }
    queue.pop(frame_len);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingBuffer;
    use emstream_core::frame::{MAX_PAYLOAD, parse_frame};
    use std::vec::Vec;

    struct TestLink {
        sent: Vec<Vec<u8>>,
        ready: bool,
        busy: bool,
        chunk: usize,
    }

    impl TestLink {
        fn new() -> Self {
            Self {
                sent: Vec::new(),
                ready: true,
                busy: false,
                chunk: FRAME_MAX_BYTES,
            }
        }
    }

    impl Transport for TestLink {
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

    fn stream_frame(fill: u8, len: usize, seq: u32) -> Vec<u8> {
        let payload = std::vec![fill; len];
        let mut buf = [0u8; FRAME_MAX_BYTES];
        let n = write_frame(&mut buf, FrameType::Stream, 0, &payload, seq, 0).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn test_pump_sends_one_frame_per_call() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();

        tx.send_stream(&[1, 2, 3], 0, 0);
        tx.send_stream(&[4, 5, 6], 0, 1);

        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 1);
        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 2);
        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 2);

        let first = parse_frame(&link.sent[0]).unwrap();
        assert_eq!(first.header.seq, 0);
        assert_eq!(first.payload, &[1, 2, 3]);
    }

    #[test]
    fn test_response_precedes_stream() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();

        tx.send_stream(&[1], 0, 0);
        tx.send_response(FrameType::Ack, 0x05, 7, 10, &[]);

        tx.pump(&mut link);
        let first = parse_frame(&link.sent[0]).unwrap();
        assert_eq!(first.header.frame_type(), Some(FrameType::Ack));
        assert_eq!(first.header.seq, 7);

        tx.pump(&mut link);
        let second = parse_frame(&link.sent[1]).unwrap();
        assert_eq!(second.header.frame_type(), Some(FrameType::Stream));
    }

    #[test]
    fn test_response_slot_overwrites() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();

        tx.send_response(FrameType::Ack, 0x05, 1, 0, &[]);
        tx.send_response(FrameType::Nack, 0x03, 2, 0, &[3]);

        tx.pump(&mut link);
        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 1);

        let sent = parse_frame(&link.sent[0]).unwrap();
        assert_eq!(sent.header.frame_type(), Some(FrameType::Nack));
        assert_eq!(sent.header.cmd_id, 0x03);
        assert_eq!(sent.header.seq, 2);
    }

    #[test]
    fn test_busy_link_retries_response() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();
        link.busy = true;

        tx.send_response(FrameType::Ack, 0x05, 1, 0, &[]);
        tx.pump(&mut link);
        assert!(tx.response_pending());
        assert!(link.sent.is_empty());

        link.busy = false;
        tx.pump(&mut link);
        assert!(!tx.response_pending());
        assert_eq!(link.sent.len(), 1);
    }

    #[test]
    fn test_link_down_holds_everything() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();
        link.ready = false;

        tx.send_stream(&[1], 0, 0);
        tx.pump(&mut link);
        tx.pump(&mut link);
        assert!(link.sent.is_empty());
    }

    #[test]
    fn test_busy_link_keeps_stream_frame() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();
        link.busy = true;

        tx.send_stream(&[1, 2], 0, 0);
        tx.pump(&mut link);
        assert!(link.sent.is_empty());

        link.busy = false;
        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 1);
        assert_eq!(parse_frame(&link.sent[0]).unwrap().payload, &[1, 2]);
    }

    #[test]
    fn test_enqueue_drops_oldest_whole_frames() {
        // 128-byte ring: three 48-byte frames exceed the 127 usable bytes.
        let mut mem = [0u8; 128];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();

        for seq in 0..3u32 {
            tx.send_stream(&std::vec![seq as u8; 30], 0, seq);
        }
        assert_eq!(tx.dropped_frames(), 1);

        tx.pump(&mut link);
        tx.pump(&mut link);
        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 2);

        // The oldest frame is gone; 1 and 2 survived intact.
        let seqs: Vec<u32> = link
            .sent
            .iter()
            .map(|f| parse_frame(f).unwrap().header.seq)
            .collect();
        assert_eq!(seqs, &[1, 2]);
    }

    #[test]
    fn test_enqueue_rejects_oversized_frame() {
        let mut mem = [0u8; 32];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);

        // A max-size frame cannot fit a 32-byte ring; nothing is enqueued.
        tx.send_stream(&[0u8; MAX_PAYLOAD], 0, 0);
        assert_eq!(tx.queue.len(), 0);
        assert_eq!(tx.dropped_frames(), 0);
    }

    #[test]
    fn test_send_stream_honors_max_payload() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, 4);

        tx.send_stream(&[0u8; 5], 0, 0);
        assert_eq!(tx.queue.len(), 0);

        tx.send_stream(&[0u8; 4], 0, 0);
        assert!(tx.queue.len() > 0);
    }

    #[test]
    fn test_drop_one_frame_resyncs_on_garbage() {
        let mut mem = [0u8; 128];
        let mut ring = RingBuffer::new(&mut mem).unwrap();

        assert!(ring.append(&[0u8; MIN_FRAME_BYTES]));
        let before = ring.len();
        assert!(drop_one_frame(&mut ring));
        assert_eq!(ring.len(), before - 1);
    }

    #[test]
    fn test_drop_one_frame_refuses_partial_head() {
        let mut mem = [0u8; 128];
        let mut ring = RingBuffer::new(&mut mem).unwrap();

        let frame = stream_frame(9, 10, 0);
        assert!(ring.append(&frame[..MIN_FRAME_BYTES]));
        assert!(!drop_one_frame(&mut ring));
        assert_eq!(ring.len(), MIN_FRAME_BYTES);
    }

    #[test]
    fn test_enqueue_clears_when_head_is_partial() {
        let mut mem = [0u8; 64];
        let mut ring = RingBuffer::new(&mut mem).unwrap();

        // A valid header promising more bytes than present blocks
        // frame-aware dropping.
        let frame = stream_frame(7, 20, 0);
        assert!(ring.append(&frame[..MIN_FRAME_BYTES]));

        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let fresh = stream_frame(1, 30, 1);
        tx.enqueue_frame(&fresh);

        assert_eq!(tx.queue.len(), fresh.len());
        let mut out = [0u8; FRAME_MAX_BYTES];
        let n = tx.queue.copy_to(&mut out);
        assert_eq!(&out[..n], &fresh[..]);
    }

    #[test]
    fn test_pump_resyncs_on_corrupt_head() {
        let mut mem = [0u8; 128];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        assert!(ring.append(&[0xeeu8; 4]));
        let frame = stream_frame(3, 6, 5);
        assert!(ring.append(&frame));

        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();

        // One byte per pump while resynchronizing, then the frame goes out.
        for _ in 0..5 {
            tx.pump(&mut link);
        }
        assert_eq!(link.sent.len(), 1);
        assert_eq!(parse_frame(&link.sent[0]).unwrap().header.seq, 5);
    }

    #[test]
    fn test_pump_respects_best_chunk() {
        let mut mem = [0u8; 256];
        let mut ring = RingBuffer::new(&mut mem).unwrap();
        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();
        link.chunk = MIN_FRAME_BYTES + 4;

        tx.send_stream(&[0u8; 10], 0, 0);
        tx.pump(&mut link);
        assert!(link.sent.is_empty());

        link.chunk = FRAME_MAX_BYTES;
        tx.pump(&mut link);
        assert_eq!(link.sent.len(), 1);
    }

    #[test]
    fn test_pump_writes_wrapped_frame_from_staging() {
        let mut mem = [0u8; 64];
        let mut ring = RingBuffer::new(&mut mem).unwrap();

        // Advance the indices so the next frame wraps around the end.
        assert!(ring.append(&[0u8; 40]));
        ring.pop(40);

        let mut tx = TxEngine::new(&mut ring, MAX_PAYLOAD);
        let mut link = TestLink::new();

        tx.send_stream(&[0xab; 16], 0, 9);
        tx.pump(&mut link);

        assert_eq!(link.sent.len(), 1);
        let sent = parse_frame(&link.sent[0]).unwrap();
        assert_eq!(sent.header.seq, 9);
        assert_eq!(sent.payload, &[0xab; 16]);
    }
}
