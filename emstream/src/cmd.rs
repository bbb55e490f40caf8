//! Command dispatch: opcode table, payload parsers, reference handlers
//!
//! A command travels `opcode -> parser -> handler`. The parser is a pure
//! function from the payload bytes to a decoded [`CmdArgs`] value and must
//! validate the length precisely; the handler runs against the sensor
//! registry and may write an ACK payload into the response buffer. The
//! table is plain data, so applications extend the command set by
//! registering new entries without touching the protocol engine.

use emstream_core::frame::MAX_PAYLOAD;
use emstream_core::{ErrorCode, RuntimeId};

use crate::config::{MAX_PERIOD_MS, MAX_SAMPLE_LEN, MIN_PERIOD_MS};
use crate::sensor::Registry;

/// Reference command set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    StartStream = 0x01,
    StopStream = 0x02,
    SetPeriod = 0x03,
    GetPeriod = 0x04,
    Ping = 0x05,
    GetSensors = 0x06,
    ReadSensor = 0x07,
}

impl Opcode {
    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value.into_u8()
    }
}

/// Decoded command arguments.
///
/// The reference parsers produce the structured variants; `Raw` carries the
/// untouched payload for application-defined commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CmdArgs<'a> {
    None,
    Sensor { sensor_id: u8 },
    SetPeriod { sensor_id: u8, period_ms: u16 },
    Raw(&'a [u8]),
}

/// ACK payload buffer handed to handlers.
pub type Response = heapless::Vec<u8, MAX_PAYLOAD>;

pub type ParserFn = for<'a> fn(&'a [u8]) -> Option<CmdArgs<'a>>;
pub type HandlerFn = fn(&mut Registry, &CmdArgs, &mut Response) -> Result<(), ErrorCode>;

#[derive(Copy, Clone)]
pub struct CommandSpec {
    pub parser: ParserFn,
    pub handler: HandlerFn,
}

/// Opcode-indexed table of command specs.
pub struct Dispatcher {
    table: [Option<CommandSpec>; 256],
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self { table: [None; 256] }
    }

    /// A dispatcher with the reference command set registered.
    pub fn with_defaults() -> Self {
        let mut d = Self::new();
        d.register(
            Opcode::Ping.into_u8(),
            CommandSpec {
                parser: parse_noarg,
                handler: ping,
            },
        );
        d.register(
            Opcode::GetSensors.into_u8(),
            CommandSpec {
                parser: parse_noarg,
                handler: get_sensors,
            },
        );
        d.register(
            Opcode::StartStream.into_u8(),
            CommandSpec {
                parser: parse_sensor_id,
                handler: start_stream,
            },
        );
        d.register(
            Opcode::StopStream.into_u8(),
            CommandSpec {
                parser: parse_sensor_id,
                handler: stop_stream,
            },
        );
        d.register(
            Opcode::SetPeriod.into_u8(),
            CommandSpec {
                parser: parse_set_period,
                handler: set_period,
            },
        );
        d.register(
            Opcode::GetPeriod.into_u8(),
            CommandSpec {
                parser: parse_sensor_id,
                handler: get_period,
            },
        );
        d.register(
            Opcode::ReadSensor.into_u8(),
            CommandSpec {
                parser: parse_sensor_id,
                handler: read_sensor,
            },
        );
        d
    }

    /// Installs `spec` for `opcode`, replacing any previous entry.
    pub fn register(&mut self, opcode: u8, spec: CommandSpec) {
        self.table[usize::from(opcode)] = Some(spec);
    }

    /// Decodes and executes one command.
    ///
    /// `Ok` means ACK with whatever the handler wrote into `resp`; `Err`
    /// carries the NACK error byte. Parsers reject without touching any
    /// state.
    pub fn dispatch(
        &self,
        sensors: &mut Registry,
        opcode: u8,
        payload: &[u8],
        resp: &mut Response,
    ) -> Result<(), ErrorCode> {
        let spec = self.table[usize::from(opcode)].ok_or(ErrorCode::InvalidCmd)?;
        let args = (spec.parser)(payload).ok_or(ErrorCode::InvalidCmd)?;
        (spec.handler)(sensors, &args, resp)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/* --- parsers --- */

pub fn parse_noarg(payload: &[u8]) -> Option<CmdArgs<'_>> {
    payload.is_empty().then_some(CmdArgs::None)
}

pub fn parse_sensor_id(payload: &[u8]) -> Option<CmdArgs<'_>> {
    let [sensor_id] = *payload else {
        return None;
    };
    Some(CmdArgs::Sensor { sensor_id })
}

pub fn parse_set_period(payload: &[u8]) -> Option<CmdArgs<'_>> {
    let [sensor_id, lo, hi] = *payload else {
        return None;
    };
    Some(CmdArgs::SetPeriod {
        sensor_id,
        period_ms: u16::from_le_bytes([lo, hi]),
    })
}

pub fn parse_raw(payload: &[u8]) -> Option<CmdArgs<'_>> {
    Some(CmdArgs::Raw(payload))
}

/* --- reference handlers --- */

fn ping(_sensors: &mut Registry, _args: &CmdArgs, _resp: &mut Response) -> Result<(), ErrorCode> {
    Ok(())
}

fn get_sensors(
    sensors: &mut Registry,
    _args: &CmdArgs,
    resp: &mut Response,
) -> Result<(), ErrorCode> {
    for (runtime_id, type_id) in sensors.entries() {
        resp.push(runtime_id.into_u8())
            .map_err(|_| ErrorCode::Overflow)?;
        resp.push(type_id.into_u8()).map_err(|_| ErrorCode::Overflow)?;
    }
    Ok(())
}

fn start_stream(
    sensors: &mut Registry,
    args: &CmdArgs,
    _resp: &mut Response,
) -> Result<(), ErrorCode> {
    let CmdArgs::Sensor { sensor_id } = *args else {
        return Err(ErrorCode::Internal);
    };
    let slot = sensors
        .find_mut(RuntimeId::new(sensor_id))
        .ok_or(ErrorCode::InvalidValue)?;
    slot.begin_streaming();
    Ok(())
}

fn stop_stream(
    sensors: &mut Registry,
    args: &CmdArgs,
    _resp: &mut Response,
) -> Result<(), ErrorCode> {
    let CmdArgs::Sensor { sensor_id } = *args else {
        return Err(ErrorCode::Internal);
    };
    let slot = sensors
        .find_mut(RuntimeId::new(sensor_id))
        .ok_or(ErrorCode::InvalidValue)?;
    slot.halt_streaming();
    Ok(())
}

fn set_period(
    sensors: &mut Registry,
    args: &CmdArgs,
    _resp: &mut Response,
) -> Result<(), ErrorCode> {
    let CmdArgs::SetPeriod {
        sensor_id,
        period_ms,
    } = *args
    else {
        return Err(ErrorCode::Internal);
    };
    let slot = sensors
        .find_mut(RuntimeId::new(sensor_id))
        .ok_or(ErrorCode::InvalidValue)?;
    if !(MIN_PERIOD_MS..=MAX_PERIOD_MS).contains(&period_ms) {
        return Err(ErrorCode::InvalidValue);
    }
    slot.set_period(period_ms);
    Ok(())
}

fn get_period(sensors: &mut Registry, args: &CmdArgs, resp: &mut Response) -> Result<(), ErrorCode> {
    let CmdArgs::Sensor { sensor_id } = *args else {
        return Err(ErrorCode::Internal);
    };
    let slot = sensors
        .find_mut(RuntimeId::new(sensor_id))
        .ok_or(ErrorCode::InvalidValue)?;
    resp.extend_from_slice(&u32::from(slot.period_ms()).to_le_bytes())
        .map_err(|_| ErrorCode::Overflow)?;
    Ok(())
}

fn read_sensor(
    sensors: &mut Registry,
    args: &CmdArgs,
    resp: &mut Response,
) -> Result<(), ErrorCode> {
    let CmdArgs::Sensor { sensor_id } = *args else {
        return Err(ErrorCode::Internal);
    };
    let slot = sensors
        .find_mut(RuntimeId::new(sensor_id))
        .ok_or(ErrorCode::InvalidValue)?;
    if slot.is_streaming() {
        return Err(ErrorCode::SensorBusy);
    }

    let mut sample = [0u8; MAX_SAMPLE_LEN];
    let filled = slot.read_once(&mut sample);
    if filled == 0 {
        return Err(ErrorCode::Internal);
    }
    resp.extend_from_slice(&sample[..filled])
        .map_err(|_| ErrorCode::Overflow)?;
    Ok(())
}
