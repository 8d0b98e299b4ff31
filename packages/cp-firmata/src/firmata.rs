//! Standard Firmata framing.
//!
//! Only the parts of Firmata needed to carry Circuit Playground traffic and
//! the board's generic pin reporting are implemented here.
//!
//! # Message formats
//!
//! | Message            | Bytes |
//! |--------------------|-------|
//! | sysex              | `0xF0`, command, data..., `0xF7` |
//! | analog I/O         | `0xE0 \| channel`, lsb, msb |
//! | digital I/O        | `0x90 \| port`, lsb, msb |
//! | report analog      | `0xC0 \| channel`, enable |
//! | report digital     | `0xD0 \| port`, enable |
//! | set pin mode       | `0xF4`, pin, mode |
//! | protocol version   | `0xF9`, major, minor |
//!
//! Every byte other than the status byte has its high bit clear.

use alloc::{string::String, vec::Vec};
use thiserror::Error;

use crate::{
    codec::WIRE_MASK,
    command::InvalidArgument,
    decode::{Decode, DecodeError},
    encode::{Encode, MessageEncoder},
    version::Version,
};

/// Firmata status bytes.
pub mod cmds {
    pub const DIGITAL_MESSAGE: u8 = 0x90;
    pub const REPORT_ANALOG: u8 = 0xC0;
    pub const REPORT_DIGITAL: u8 = 0xD0;
    pub const ANALOG_MESSAGE: u8 = 0xE0;
    pub const START_SYSEX: u8 = 0xF0;
    pub const SET_PIN_MODE: u8 = 0xF4;
    pub const END_SYSEX: u8 = 0xF7;
    pub const REPORT_VERSION: u8 = 0xF9;

    /// Sysex command querying the firmware name and version.
    pub const REPORT_FIRMWARE: u8 = 0x79;
}

use cmds::{
    ANALOG_MESSAGE, DIGITAL_MESSAGE, END_SYSEX, REPORT_ANALOG, REPORT_DIGITAL, REPORT_VERSION,
    SET_PIN_MODE, START_SYSEX,
};

/// Largest sysex body accepted by [`FirmataParser`].
pub const MAX_SYSEX_SIZE: usize = 1024;

/// Pin numbers must fit in one wire byte.
pub const MAX_PINS: u8 = 128;

/// The channel or port shares its status byte with the opcode nibble.
pub const MAX_ANALOG_CHANNELS: u8 = 16;
pub const MAX_DIGITAL_PORTS: u8 = 16;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PinMode {
    Input = 0,
    Output = 1,
    Analog = 2,
    Pwm = 3,
    Servo = 4,
}

/// A sysex message carrying `payload` under `command`.
///
/// # Encoding
///
/// | Field     | Size | Description |
/// |-----------|------|-------------|
/// | `start`   | 1    | [`START_SYSEX`](cmds::START_SYSEX) |
/// | `command` | 1    | Sysex command byte, e.g. [`CP_COMMAND`](crate::CP_COMMAND). |
/// | `payload` | n    | Wire bytes. |
/// | `end`     | 1    | [`END_SYSEX`](cmds::END_SYSEX) |
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SysexPacket<P: Encode> {
    pub command: u8,
    pub payload: P,
}

impl<P: Encode> SysexPacket<P> {
    pub fn new(command: u8, payload: P) -> Self {
        Self { command, payload }
    }
}

impl<P: Encode> Encode for SysexPacket<P> {
    fn size(&self) -> usize {
        3 + self.payload.size()
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&START_SYSEX);
        enc.write(&(self.command & WIRE_MASK));
        enc.write(&self.payload);
        enc.write(&END_SYSEX);
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SetPinModePacket {
    pin: u8,
    mode: PinMode,
}

impl SetPinModePacket {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Pin`] unless `pin` is below [`MAX_PINS`].
    pub const fn try_new(pin: u8, mode: PinMode) -> Result<Self, InvalidArgument> {
        if pin >= MAX_PINS {
            return Err(InvalidArgument::Pin(pin));
        }
        Ok(Self { pin, mode })
    }

    pub const fn pin(&self) -> u8 {
        self.pin
    }

    pub const fn mode(&self) -> PinMode {
        self.mode
    }
}

impl Encode for SetPinModePacket {
    fn size(&self) -> usize {
        3
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = SET_PIN_MODE;
        data[1] = self.pin;
        data[2] = self.mode as u8;
    }
}

/// Enables or disables periodic reporting of an analog channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReportAnalogPacket {
    channel: u8,
    enabled: bool,
}

impl ReportAnalogPacket {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::AnalogChannel`] unless `channel` is below
    /// [`MAX_ANALOG_CHANNELS`].
    pub const fn try_new(channel: u8, enabled: bool) -> Result<Self, InvalidArgument> {
        if channel >= MAX_ANALOG_CHANNELS {
            return Err(InvalidArgument::AnalogChannel(channel));
        }
        Ok(Self { channel, enabled })
    }

    pub const fn channel(&self) -> u8 {
        self.channel
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }
}

impl Encode for ReportAnalogPacket {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = REPORT_ANALOG | self.channel;
        data[1] = self.enabled as u8;
    }
}

/// Enables or disables change reporting of an 8-pin digital port.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReportDigitalPacket {
    port: u8,
    enabled: bool,
}

impl ReportDigitalPacket {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::DigitalPort`] unless `port` is below
    /// [`MAX_DIGITAL_PORTS`].
    pub const fn try_new(port: u8, enabled: bool) -> Result<Self, InvalidArgument> {
        if port >= MAX_DIGITAL_PORTS {
            return Err(InvalidArgument::DigitalPort(port));
        }
        Ok(Self { port, enabled })
    }

    pub const fn port(&self) -> u8 {
        self.port
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }
}

impl Encode for ReportDigitalPacket {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = REPORT_DIGITAL | self.port;
        data[1] = self.enabled as u8;
    }
}

/// Firmware name and version, sent in reply to a
/// [`REPORT_FIRMWARE`](cmds::REPORT_FIRMWARE) query.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FirmwareReport {
    pub version: Version,
    pub name: String,
}

impl Decode for FirmwareReport {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let version = Version::decode(data)?;

        // Each character is split over two wire bytes, low 7 bits first.
        let mut name = String::new();
        while data.len() >= 2 {
            let [lsb, msb] = <[u8; 2]>::decode(data)?;
            name.push(char::from((lsb & WIRE_MASK) | ((msb & 0x01) << 7)));
        }

        Ok(Self { version, name })
    }
}

/// A message received from the board.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FirmataMessage {
    Sysex { command: u8, payload: Vec<u8> },
    Analog { channel: u8, value: u16 },
    Digital { port: u8, mask: u16 },
    ProtocolVersion(Version),
}

/// Returned by [`FirmataParser::feed`] when a partially received message is
/// thrown away.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum FrameError {
    #[error("Sysex message exceeded {MAX_SYSEX_SIZE} bytes.")]
    SysexOverflow,

    #[error("Status byte 0x{0:02X} interrupted an incomplete message.")]
    Interrupted(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for a status byte.
    Idle,
    /// Collecting two data bytes for a channel/port message.
    Midi { status: u8, first: Option<u8> },
    /// Got START_SYSEX, collecting the body.
    Sysex,
    /// Skipping data bytes of an overflowed sysex until END_SYSEX.
    Discard,
}

/// State machine turning an inbound byte stream into [`FirmataMessage`]s.
#[derive(Debug, Clone)]
pub struct FirmataParser {
    state: ParseState,
    sysex: Vec<u8>,
}

impl Default for FirmataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FirmataParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            sysex: Vec::new(),
        }
    }

    /// Resets the parser, dropping any partially received message.
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.sysex.clear();
    }

    /// Feeds a single byte to the parser.
    ///
    /// Returns `Ok(Some(message))` when a complete message is parsed,
    /// `Ok(None)` when more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] when a partially received message had to be
    /// dropped. The parser stays usable: an interrupting status byte starts
    /// the next message, and an oversized sysex is skipped up to its end byte.
    pub fn feed(&mut self, byte: u8) -> Result<Option<FirmataMessage>, FrameError> {
        if byte & 0x80 != 0 {
            return self.feed_status(byte);
        }

        match self.state {
            // Data bytes without a status byte are ignored.
            ParseState::Idle | ParseState::Discard => Ok(None),
            ParseState::Sysex => {
                if self.sysex.len() >= MAX_SYSEX_SIZE {
                    self.sysex.clear();
                    self.state = ParseState::Discard;
                    return Err(FrameError::SysexOverflow);
                }
                self.sysex.push(byte);
                Ok(None)
            }
            ParseState::Midi {
                status,
                first: None,
            } => {
                self.state = ParseState::Midi {
                    status,
                    first: Some(byte),
                };
                Ok(None)
            }
            ParseState::Midi {
                status,
                first: Some(first),
            } => {
                self.state = ParseState::Idle;
                Ok(Some(Self::midi_message(status, first, byte)))
            }
        }
    }

    fn feed_status(&mut self, byte: u8) -> Result<Option<FirmataMessage>, FrameError> {
        let interrupted = match self.state {
            ParseState::Sysex if byte == END_SYSEX => {
                self.state = ParseState::Idle;
                let mut body = core::mem::take(&mut self.sysex);
                if body.is_empty() {
                    return Ok(None);
                }
                let command = body.remove(0);
                return Ok(Some(FirmataMessage::Sysex {
                    command,
                    payload: body,
                }));
            }
            ParseState::Discard if byte == END_SYSEX => {
                self.state = ParseState::Idle;
                return Ok(None);
            }
            ParseState::Idle | ParseState::Discard => false,
            ParseState::Sysex | ParseState::Midi { .. } => true,
        };

        self.sysex.clear();
        self.state = match byte {
            START_SYSEX => ParseState::Sysex,
            b if b & 0xF0 == ANALOG_MESSAGE || b & 0xF0 == DIGITAL_MESSAGE || b == REPORT_VERSION => {
                ParseState::Midi {
                    status: b,
                    first: None,
                }
            }
            _ => ParseState::Idle,
        };

        if interrupted {
            Err(FrameError::Interrupted(byte))
        } else {
            Ok(None)
        }
    }

    fn midi_message(status: u8, first: u8, second: u8) -> FirmataMessage {
        let value = first as u16 | ((second as u16) << 7);

        match status & 0xF0 {
            ANALOG_MESSAGE => FirmataMessage::Analog {
                channel: status & 0x0F,
                value,
            },
            DIGITAL_MESSAGE => FirmataMessage::Digital {
                port: status & 0x0F,
                mask: value,
            },
            _ => FirmataMessage::ProtocolVersion(Version {
                major: first,
                minor: second,
            }),
        }
    }
}
