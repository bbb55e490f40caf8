//! Emstream protocol data types
//!
//! This crate provides the wire-level definitions shared by the Emstream
//! stack, driver crates, and host tooling: frame constants, the CRC
//! primitive, the frame codec, and the small identifier types carried in
//! frames. Emstream users should not depend on this crate directly. Use the
//! `emstream::proto` reexport instead.
#![no_std]

pub mod crc;
pub mod frame;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Frame type code, byte 2 of the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    /// Device to host sensor data, best effort.
    Stream = 0,
    /// Host to device command carrying an opcode in `cmd_id`.
    Cmd = 1,
    /// Command accepted; payload is the command response, possibly empty.
    Ack = 2,
    /// Command rejected; payload is a single [`ErrorCode`] byte.
    Nack = 3,
}

impl FrameType {
    pub const fn try_from_u8(code: u8) -> Option<FrameType> {
        match code {
            0 => Some(FrameType::Stream),
            1 => Some(FrameType::Cmd),
            2 => Some(FrameType::Ack),
            3 => Some(FrameType::Nack),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<FrameType> for u8 {
    fn from(value: FrameType) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for FrameType {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// NACK payload byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    /// Unknown opcode, or the payload did not decode for a known one.
    InvalidCmd = 1,
    /// Command payload longer than the protocol allows.
    InvalidLen = 2,
    /// A decoded argument is out of range, e.g. an unknown sensor id.
    InvalidValue = 3,
    /// The addressed sensor cannot serve the request right now.
    SensorBusy = 4,
    /// The response would not fit the response buffer.
    Overflow = 5,
    /// Unexpected handler-level failure.
    Internal = 6,
}

impl ErrorCode {
    pub const fn try_from_u8(code: u8) -> Option<ErrorCode> {
        match code {
            1 => Some(ErrorCode::InvalidCmd),
            2 => Some(ErrorCode::InvalidLen),
            3 => Some(ErrorCode::InvalidValue),
            4 => Some(ErrorCode::SensorBusy),
            5 => Some(ErrorCode::Overflow),
            6 => Some(ErrorCode::Internal),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<ErrorCode> for u8 {
    fn from(value: ErrorCode) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// Device-assigned identifier of a configured sensor instance.
///
/// Stable for the lifetime of the session. Selects sensors in commands and
/// prefixes every STREAM payload so the host can demultiplex.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeId(u8);

impl RuntimeId {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<RuntimeId> for u8 {
    fn from(value: RuntimeId) -> Self {
        value.into_u8()
    }
}

/// Identifier of a sensor kind, independent of the instance.
///
/// The host uses it to pick the right stream payload decoder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorTypeId(u8);

impl SensorTypeId {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<SensorTypeId> for u8 {
    fn from(value: SensorTypeId) -> Self {
        value.into_u8()
    }
}
