//! Frame codec: header layout, writer, and validating parser
//!
//! Every frame is a 16-byte little-endian header, up to [`MAX_PAYLOAD`]
//! payload bytes, and a 2-byte CRC trailer over header and payload. The
//! leading magic makes a frame boundary recognizable inside an unreliable
//! byte stream, so receivers can resynchronize after corruption.

use crate::FrameType;
use crate::crc::{Crc16, crc16};

/// Leading sentinel, `a5 5a` on the wire.
pub const MAGIC: u16 = 0x5aa5;
/// Protocol version carried in every header.
pub const VERSION: u8 = 0;

pub const HDR_LEN: usize = 16;
pub const CRC_LEN: usize = 2;
pub const MAX_PAYLOAD: usize = 46;
/// Largest possible frame. Must fit in a single transport write.
pub const FRAME_MAX_BYTES: usize = HDR_LEN + MAX_PAYLOAD + CRC_LEN;
/// Smallest possible frame: an empty-payload header plus the CRC trailer.
pub const MIN_FRAME_BYTES: usize = HDR_LEN + CRC_LEN;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Not enough bytes yet; more input may complete the frame.
    Truncated,
    BadMagic,
    BadVersion,
    BadLength,
    BadCrc,
}

/// Parsed header fields.
///
/// The type code is kept raw: unknown codes parse fine and are the
/// receiver's business to discard.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub type_code: u8,
    /// Payload length in bytes, at most [`MAX_PAYLOAD`].
    pub len: u16,
    /// Command opcode for CMD and its echo in ACK/NACK; 0 otherwise.
    pub cmd_id: u8,
    /// Per-sensor sequence for STREAM, host correlation id for CMD,
    /// echoed in ACK/NACK.
    pub seq: u32,
    /// Device monotonic milliseconds, wrapping.
    pub ts_ms: u32,
}

impl Header {
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::try_from_u8(self.type_code)
    }

    /// Total frame length: header, payload, CRC trailer.
    pub const fn frame_len(&self) -> usize {
        HDR_LEN + self.len as usize + CRC_LEN
    }

    /// Validates and decodes the first [`HDR_LEN`] bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Header, FrameError> {
        if buf.len() < HDR_LEN {
            return Err(FrameError::Truncated);
        }
        if u16::from_le_bytes([buf[0], buf[1]]) != MAGIC {
            return Err(FrameError::BadMagic);
        }
        if buf[3] != VERSION {
            return Err(FrameError::BadVersion);
        }
        let len = u16::from_le_bytes([buf[4], buf[5]]);
        if len as usize > MAX_PAYLOAD {
            return Err(FrameError::BadLength);
        }

        Ok(Header {
            type_code: buf[2],
            len,
            cmd_id: buf[6],
            seq: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            ts_ms: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    fn write_to(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&MAGIC.to_le_bytes());
        out[2] = self.type_code;
        out[3] = VERSION;
        out[4..6].copy_from_slice(&self.len.to_le_bytes());
        out[6] = self.cmd_id;
        out[7] = 0; // reserved
        out[8..12].copy_from_slice(&self.seq.to_le_bytes());
        out[12..16].copy_from_slice(&self.ts_ms.to_le_bytes());
    }
}

/// A validated frame borrowed from the input buffer.
#[derive(Debug, Copy, Clone)]
pub struct FrameView<'a> {
    pub header: Header,
    pub payload: &'a [u8],
    /// Bytes the frame occupies in the input, i.e. how much to consume.
    pub total_len: usize,
}

/// Serializes a frame into `out` and returns the total length written.
///
/// The payload is clamped to [`MAX_PAYLOAD`] bytes. Returns `None` when
/// `out` cannot hold the resulting frame.
pub fn write_frame(
    out: &mut [u8],
    frame_type: FrameType,
    cmd_id: u8,
    payload: &[u8],
    seq: u32,
    ts_ms: u32,
) -> Option<usize> {
    let payload = &payload[..payload.len().min(MAX_PAYLOAD)];
    let span = HDR_LEN + payload.len();
    let total = span + CRC_LEN;
    if out.len() < total {
        return None;
    }

    let header = Header {
        type_code: frame_type.into_u8(),
        len: payload.len() as u16,
        cmd_id,
        seq,
        ts_ms,
    };
    header.write_to(&mut out[..HDR_LEN]);
    out[HDR_LEN..span].copy_from_slice(payload);

    let crc = crc16(&out[..span], Crc16::INIT);
    out[span..total].copy_from_slice(&crc.to_le_bytes());
    Some(total)
}

/// Validates a complete frame at the start of `buf`.
///
/// [`FrameError::Truncated`] means the bytes so far are a plausible frame
/// prefix; anything else means the head is not a frame and the caller
/// should skip ahead. The payload borrows from `buf`.
pub fn parse_frame(buf: &[u8]) -> Result<FrameView<'_>, FrameError> {
    let header = Header::parse(buf)?;
    let total = header.frame_len();
    if buf.len() < total {
        return Err(FrameError::Truncated);
    }

    let span = HDR_LEN + header.len as usize;
    let got = u16::from_le_bytes([buf[span], buf[span + 1]]);
    if got != crc16(&buf[..span], Crc16::INIT) {
        return Err(FrameError::BadCrc);
    }

    Ok(FrameView {
        header,
        payload: &buf[HDR_LEN..span],
        total_len: total,
    })
}
