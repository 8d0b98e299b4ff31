//! Host-bound Circuit Playground replies.
//!
//! The board answers reads (and streams readings) asynchronously. Every reply
//! shares the [`CP_COMMAND`](crate::CP_COMMAND) sysex channel, so the first
//! wire byte decides which feature it belongs to and therefore what shape the
//! rest of the payload has:
//!
//! | Reply                        | Sub-command | Payload |
//! |------------------------------|-------------|---------|
//! | [`AccelReply`]               | `0x36`      | `x`, `y`, `z` as `f32` (8 wire bytes each) |
//! | [`TapReply`]                 | `0x37`      | tap register as `u8` (2 wire bytes) |
//! | [`CapReply`]                 | `0x43`      | pin as `u8` (2), raw reading as `i32` (8) |
//! | [`ColorReply`]               | `0x51`      | `r`, `g`, `b` as `u8` (2 each) |
//!
//! Trailing bytes beyond the fixed shape are ignored. Anything shorter is
//! rejected as a whole; a reply is never partially decoded.

use bitflags::bitflags;
use thiserror::Error;

use crate::{
    codec::{WIRE_MASK, decode_byte, decode_float32, decode_i32},
    decode::{Decode, DecodeError},
    subcmds::{ACCEL_READ_REPLY, CAP_REPLY, SENSE_COLOR_REPLY, TAP_READ_REPLY},
};

/// Raw capacitive reading above which an input counts as touched.
pub const CAP_THRESHOLD: i32 = 300;

/// Returned when an inbound payload cannot be turned into a [`FeatureReply`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    #[error("Reply payload was empty.")]
    Empty,

    #[error("Unrecognized sub-command 0x{0:02X}.")]
    UnknownSubCommand(u8),

    #[error(
        "Reply 0x{subcommand:02X} needs {expected} wire bytes after the sub-command, found {found}."
    )]
    Truncated {
        subcommand: u8,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A host-bound reply identified by a sub-command byte.
pub trait CpReply: Decode {
    const SUBCMD: u8;

    /// Number of wire bytes following the sub-command.
    const PAYLOAD_SIZE: usize;
}

/// Accelerometer reading, in m/s².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelReply {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CpReply for AccelReply {
    const SUBCMD: u8 = ACCEL_READ_REPLY;
    const PAYLOAD_SIZE: usize = 24;
}

impl Decode for AccelReply {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let x = decode_float32(&<[u8; 8]>::decode(data)?)?;
        let y = decode_float32(&<[u8; 8]>::decode(data)?)?;
        let z = decode_float32(&<[u8; 8]>::decode(data)?)?;

        Ok(Self { x, y, z })
    }
}

bitflags! {
    /// Click source register of the accelerometer.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TapFlags: u8 {
        const SINGLE = 1 << 4;
        const DOUBLE = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TapReply {
    pub flags: TapFlags,
}

impl TapReply {
    pub fn single(&self) -> bool {
        self.flags.contains(TapFlags::SINGLE)
    }

    pub fn double(&self) -> bool {
        self.flags.contains(TapFlags::DOUBLE)
    }
}

impl CpReply for TapReply {
    const SUBCMD: u8 = TAP_READ_REPLY;
    const PAYLOAD_SIZE: usize = 2;
}

impl Decode for TapReply {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let register = decode_byte(&<[u8; 2]>::decode(data)?)?;

        Ok(Self {
            flags: TapFlags::from_bits_truncate(register),
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CapReply {
    pub pin: u8,
    pub raw: i32,
}

impl CapReply {
    /// Whether the reading is strictly above [`CAP_THRESHOLD`].
    pub fn touched(&self) -> bool {
        self.raw > CAP_THRESHOLD
    }
}

impl CpReply for CapReply {
    const SUBCMD: u8 = CAP_REPLY;
    const PAYLOAD_SIZE: usize = 10;
}

impl Decode for CapReply {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let pin = decode_byte(&<[u8; 2]>::decode(data)?)?;
        let raw = decode_i32(&<[u8; 8]>::decode(data)?)?;

        Ok(Self { pin, raw })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ColorReply {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl CpReply for ColorReply {
    const SUBCMD: u8 = SENSE_COLOR_REPLY;
    const PAYLOAD_SIZE: usize = 6;
}

impl Decode for ColorReply {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let r = decode_byte(&<[u8; 2]>::decode(data)?)?;
        let g = decode_byte(&<[u8; 2]>::decode(data)?)?;
        let b = decode_byte(&<[u8; 2]>::decode(data)?)?;

        Ok(Self { r, g, b })
    }
}

/// A decoded reply, tagged by the feature it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureReply {
    Accel { x: f32, y: f32, z: f32 },
    Tap { single: bool, double: bool },
    Cap { pin: u8, touched: bool, raw: i32 },
    Color { r: u8, g: u8, b: u8 },
}

fn decode_fixed<R: CpReply>(payload: &[u8]) -> Result<R, ReplyError> {
    if payload.len() < R::PAYLOAD_SIZE {
        return Err(ReplyError::Truncated {
            subcommand: R::SUBCMD,
            expected: R::PAYLOAD_SIZE,
            found: payload.len(),
        });
    }

    Ok(R::decode(&mut &payload[..R::PAYLOAD_SIZE])?)
}

impl FeatureReply {
    /// Decodes a raw payload received under [`CP_COMMAND`](crate::CP_COMMAND).
    ///
    /// # Errors
    ///
    /// - [`ReplyError::Empty`] if there is no sub-command byte.
    /// - [`ReplyError::UnknownSubCommand`] if the sub-command is not a reply.
    /// - [`ReplyError::Truncated`] if the payload is shorter than the reply's
    ///   fixed shape.
    pub fn decode(raw: &[u8]) -> Result<Self, ReplyError> {
        let (&subcommand, payload) = raw.split_first().ok_or(ReplyError::Empty)?;

        match subcommand & WIRE_MASK {
            ACCEL_READ_REPLY => {
                let AccelReply { x, y, z } = decode_fixed(payload)?;
                Ok(Self::Accel { x, y, z })
            }
            TAP_READ_REPLY => {
                let reply: TapReply = decode_fixed(payload)?;
                Ok(Self::Tap {
                    single: reply.single(),
                    double: reply.double(),
                })
            }
            CAP_REPLY => {
                let reply: CapReply = decode_fixed(payload)?;
                Ok(Self::Cap {
                    pin: reply.pin,
                    touched: reply.touched(),
                    raw: reply.raw,
                })
            }
            SENSE_COLOR_REPLY => {
                let ColorReply { r, g, b } = decode_fixed(payload)?;
                Ok(Self::Color { r, g, b })
            }
            other => Err(ReplyError::UnknownSubCommand(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::codec::{encode_byte, encode_float32, encode_i32};

    fn payload(subcommand: u8, fields: &[&[u8]]) -> Vec<u8> {
        let mut raw = alloc::vec![subcommand];
        for field in fields {
            raw.extend_from_slice(field);
        }
        raw
    }

    #[test]
    fn accel() {
        let raw = payload(
            ACCEL_READ_REPLY,
            &[&encode_float32(1.5), &encode_float32(-2.0), &encode_float32(0.0)],
        );

        assert_eq!(
            FeatureReply::decode(&raw),
            Ok(FeatureReply::Accel {
                x: 1.5,
                y: -2.0,
                z: 0.0
            })
        );
    }

    #[test]
    fn tap_bits() {
        for (register, single, double) in [
            (0x30, true, true),
            (0x10, true, false),
            (0x20, false, true),
            (0x00, false, false),
            (0xCF, false, false),
        ] {
            let raw = payload(TAP_READ_REPLY, &[&encode_byte(register)]);
            assert_eq!(
                FeatureReply::decode(&raw),
                Ok(FeatureReply::Tap { single, double })
            );
        }
    }

    #[test]
    fn cap_threshold_is_strict() {
        for (value, touched) in [(301, true), (300, false), (-5, false)] {
            let raw = payload(CAP_REPLY, &[&encode_byte(10), &encode_i32(value)]);
            assert_eq!(
                FeatureReply::decode(&raw),
                Ok(FeatureReply::Cap {
                    pin: 10,
                    touched,
                    raw: value
                })
            );
        }
    }

    #[test]
    fn color() {
        let raw = payload(
            SENSE_COLOR_REPLY,
            &[&encode_byte(255), &encode_byte(128), &encode_byte(7)],
        );

        assert_eq!(
            FeatureReply::decode(&raw),
            Ok(FeatureReply::Color {
                r: 255,
                g: 128,
                b: 7
            })
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let raw = payload(TAP_READ_REPLY, &[&encode_byte(0x10), &[0x7F, 0x7F]]);
        assert_eq!(
            FeatureReply::decode(&raw),
            Ok(FeatureReply::Tap {
                single: true,
                double: false
            })
        );
    }

    #[test]
    fn truncated() {
        let raw = payload(ACCEL_READ_REPLY, &[&encode_float32(1.0), &encode_float32(2.0)]);
        assert_eq!(
            FeatureReply::decode(&raw),
            Err(ReplyError::Truncated {
                subcommand: ACCEL_READ_REPLY,
                expected: 24,
                found: 16
            })
        );

        assert_eq!(
            FeatureReply::decode(&[CAP_REPLY, 0x0A]),
            Err(ReplyError::Truncated {
                subcommand: CAP_REPLY,
                expected: 10,
                found: 1
            })
        );
    }

    #[test]
    fn empty_and_unknown() {
        assert_eq!(FeatureReply::decode(&[]), Err(ReplyError::Empty));
        assert_eq!(
            FeatureReply::decode(&[0x7E, 0, 0]),
            Err(ReplyError::UnknownSubCommand(0x7E))
        );
        // Command opcodes are not replies.
        assert_eq!(
            FeatureReply::decode(&[crate::subcmds::ACCEL_READ]),
            Err(ReplyError::UnknownSubCommand(crate::subcmds::ACCEL_READ))
        );
    }

    #[test]
    fn subcommand_high_bit_is_masked() {
        let raw = payload(0x80 | SENSE_COLOR_REPLY, &[&[1, 0], &[2, 0], &[3, 0]]);
        assert_eq!(
            FeatureReply::decode(&raw),
            Ok(FeatureReply::Color { r: 1, g: 2, b: 3 })
        );
    }
}
