//! Board-bound Circuit Playground commands.
//!
//! Every command shares the same shape: a [sub-command](crate::subcmds) byte
//! followed by a fixed number of wire bytes. Payload types validate their
//! arguments on construction, so an encoded packet is always in range.

use thiserror::Error;

use crate::{
    codec::{WIRE_MASK, encode_byte, encode_rgb_packed, encode_u14},
    encode::{Encode, MessageEncoder},
    subcmds::{
        ACCEL_RANGE, ACCEL_READ, ACCEL_STREAM_OFF, ACCEL_STREAM_ON, CAP_OFF, CAP_ON, CAP_READ,
        NO_TONE, PIXEL_BRIGHTNESS, PIXEL_CLEAR, PIXEL_SET, PIXEL_SHOW, SENSE_COLOR, TAP_CONFIG,
        TAP_READ, TAP_STREAM_OFF, TAP_STREAM_ON, TONE,
    },
};

/// Number of NeoPixels on the board.
pub const PIXEL_COUNT: u8 = 10;

/// Largest accepted pixel brightness.
pub const MAX_BRIGHTNESS: u8 = 100;

/// Inputs that support capacitive touch sensing.
pub const CAP_PINS: [u8; 8] = [0, 1, 2, 3, 6, 9, 10, 12];

/// Returned when a command argument is outside the range the board accepts.
///
/// Validation always happens before anything is encoded, so a rejected
/// command is never partially sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("pixel must be a value between 0-9, found {0}")]
    PixelIndex(u8),

    #[error("brightness must be a value between 0-100, found {0}")]
    Brightness(u8),

    #[error("accelerometer range must be a value between 0-3, found {0}")]
    AccelRange(u8),

    #[error("tap type must be a value between 0-2, found {0}")]
    TapType(u8),

    #[error("capacitive touch pin must be one of 0, 1, 2, 3, 6, 9, 10 or 12, found {0}")]
    CapPin(u8),

    #[error("pin must be a value between 0-127, found {0}")]
    Pin(u8),

    #[error("analog channel must be a value between 0-15, found {0}")]
    AnalogChannel(u8),

    #[error("digital port must be a value between 0-15, found {0}")]
    DigitalPort(u8),
}

/// A board-bound command identified by a sub-command byte.
pub trait CpCommand: Encode {
    const SUBCMD: u8;
}

/// Circuit Playground command packet.
///
/// # Encoding
///
/// | Field     | Size | Description |
/// |-----------|------|-------------|
/// | `subcmd`  | 1    | A [sub-command opcode](crate::subcmds). |
/// | `payload` | n    | Encoded payload, all wire bytes. |
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CpCommandPacket<const SUBCMD: u8, P: Encode> {
    pub payload: P,
}

impl<const SUBCMD: u8, P: Encode> CpCommandPacket<SUBCMD, P> {
    pub fn new(payload: P) -> Self {
        Self { payload }
    }
}

impl<const SUBCMD: u8, P: Encode> CpCommand for CpCommandPacket<SUBCMD, P> {
    const SUBCMD: u8 = SUBCMD;
}

impl<const SUBCMD: u8, P: Encode> Encode for CpCommandPacket<SUBCMD, P> {
    fn size(&self) -> usize {
        1 + self.payload.size()
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = SUBCMD;

        let mut enc = MessageEncoder::new_with_position(data, 1);
        enc.write(&self.payload);
    }
}

impl<const SUBCMD: u8> Default for CpCommandPacket<SUBCMD, ()> {
    fn default() -> Self {
        Self::new(())
    }
}

pub type PixelSetPacket = CpCommandPacket<PIXEL_SET, PixelSetPayload>;
pub type PixelShowPacket = CpCommandPacket<PIXEL_SHOW, ()>;
pub type PixelClearPacket = CpCommandPacket<PIXEL_CLEAR, ()>;
pub type PixelBrightnessPacket = CpCommandPacket<PIXEL_BRIGHTNESS, Brightness>;

pub type TonePacket = CpCommandPacket<TONE, TonePayload>;
pub type NoTonePacket = CpCommandPacket<NO_TONE, ()>;

pub type AccelReadPacket = CpCommandPacket<ACCEL_READ, ()>;
pub type AccelStreamOnPacket = CpCommandPacket<ACCEL_STREAM_ON, ()>;
pub type AccelStreamOffPacket = CpCommandPacket<ACCEL_STREAM_OFF, ()>;
pub type AccelRangePacket = CpCommandPacket<ACCEL_RANGE, AccelRange>;

pub type TapReadPacket = CpCommandPacket<TAP_READ, ()>;
pub type TapStreamOnPacket = CpCommandPacket<TAP_STREAM_ON, ()>;
pub type TapStreamOffPacket = CpCommandPacket<TAP_STREAM_OFF, ()>;
pub type TapConfigPacket = CpCommandPacket<TAP_CONFIG, TapConfigPayload>;

pub type CapReadPacket = CpCommandPacket<CAP_READ, CapPin>;
pub type CapOnPacket = CpCommandPacket<CAP_ON, CapPin>;
pub type CapOffPacket = CpCommandPacket<CAP_OFF, CapPin>;

pub type SenseColorPacket = CpCommandPacket<SENSE_COLOR, ()>;

/// A 24-bit color.
///
/// Encodes as the four-byte packed layout described in
/// [`encode_rgb_packed`](crate::codec::encode_rgb_packed).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl Encode for Rgb {
    fn size(&self) -> usize {
        4
    }

    fn encode(&self, data: &mut [u8]) {
        data[..4].copy_from_slice(&encode_rgb_packed(self.r, self.g, self.b));
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PixelSetPayload {
    pixel: u8,
    color: Rgb,
}

impl PixelSetPayload {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::PixelIndex`] unless `pixel` is below [`PIXEL_COUNT`].
    pub fn try_new(pixel: u8, color: Rgb) -> Result<Self, InvalidArgument> {
        if pixel >= PIXEL_COUNT {
            return Err(InvalidArgument::PixelIndex(pixel));
        }

        Ok(Self { pixel, color })
    }

    pub fn pixel(&self) -> u8 {
        self.pixel
    }

    pub fn color(&self) -> Rgb {
        self.color
    }
}

impl Encode for PixelSetPayload {
    fn size(&self) -> usize {
        1 + self.color.size()
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&(self.pixel & WIRE_MASK));
        enc.write(&self.color);
    }
}

/// Pixel brightness, 0 through [`MAX_BRIGHTNESS`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Brightness(u8);

impl Brightness {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Brightness`] if `value` exceeds [`MAX_BRIGHTNESS`].
    pub const fn try_new(value: u8) -> Result<Self, InvalidArgument> {
        if value > MAX_BRIGHTNESS {
            Err(InvalidArgument::Brightness(value))
        } else {
            Ok(Self(value))
        }
    }

    pub fn into_inner(self) -> u8 {
        self.0
    }
}

impl Encode for Brightness {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.0 & WIRE_MASK;
    }
}

/// Tone frequency and duration.
///
/// Both fields are sent as 14-bit values. Anything above 16383 silently
/// wraps; a duration of zero plays until a [`NoTonePacket`] is sent.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TonePayload {
    pub frequency_hz: u16,
    pub duration_ms: u16,
}

impl Encode for TonePayload {
    fn size(&self) -> usize {
        4
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&encode_u14(self.frequency_hz));
        enc.write(&encode_u14(self.duration_ms));
    }
}

/// Accelerometer measurement range.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AccelRange {
    /// +/- 2G
    #[default]
    G2 = 0,
    /// +/- 4G
    G4 = 1,
    /// +/- 8G
    G8 = 2,
    /// +/- 16G
    G16 = 3,
}

impl TryFrom<u8> for AccelRange {
    type Error = InvalidArgument;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::G2),
            1 => Ok(Self::G4),
            2 => Ok(Self::G8),
            3 => Ok(Self::G16),
            v => Err(InvalidArgument::AccelRange(v)),
        }
    }
}

impl From<AccelRange> for u8 {
    fn from(range: AccelRange) -> Self {
        range as u8
    }
}

impl Encode for AccelRange {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = *self as u8;
    }
}

/// Kind of tap the accelerometer should detect.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TapType {
    /// Tap detection disabled.
    Off = 0,
    #[default]
    Single = 1,
    Double = 2,
}

impl TryFrom<u8> for TapType {
    type Error = InvalidArgument;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            v => Err(InvalidArgument::TapType(v)),
        }
    }
}

impl From<TapType> for u8 {
    fn from(tap_type: TapType) -> Self {
        tap_type as u8
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TapConfigPayload {
    pub tap_type: TapType,
    /// Click threshold; larger values need a harder tap.
    pub threshold: u8,
}

impl Encode for TapConfigPayload {
    fn size(&self) -> usize {
        3
    }

    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&(self.tap_type as u8));
        enc.write(&encode_byte(self.threshold));
    }
}

/// An input that supports capacitive touch sensing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CapPin(u8);

impl CapPin {
    /// # Errors
    ///
    /// Returns [`InvalidArgument::CapPin`] unless `pin` is one of [`CAP_PINS`].
    pub fn try_new(pin: u8) -> Result<Self, InvalidArgument> {
        if !CAP_PINS.contains(&pin) {
            return Err(InvalidArgument::CapPin(pin));
        }

        Ok(Self(pin))
    }

    pub fn into_inner(self) -> u8 {
        self.0
    }
}

impl Encode for CapPin {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.0 & WIRE_MASK;
    }
}
