//! Implementation of the Circuit Playground Firmata extension protocol in Rust.
//!
//! The Circuit Playground firmware extends standard Firmata with board-specific
//! features (NeoPixels, speaker, accelerometer, capacitive touch, color sensing).
//! All of that traffic travels inside sysex messages whose command byte is
//! [`CP_COMMAND`]. The first byte of every such payload is a [sub-command](subcmds),
//! followed by a fixed-shape sequence of 7-bit [wire bytes](codec).
//!
//! This crate is split the same way the traffic is:
//!
//! - [`codec`] converts native values into and out of 7-bit wire bytes.
//! - [`command`] contains the board-bound command packets.
//! - [`reply`] decodes the asynchronous replies sent back by the board.
//! - [`firmata`] handles the generic Firmata framing around all of it.

#![no_std]

extern crate alloc;

pub mod codec;
pub mod command;
pub mod firmata;
pub mod reply;

mod decode;
mod encode;
mod version;

pub use decode::{Decode, DecodeError, DecodeErrorKind};
pub use encode::{Encode, MessageEncoder};
pub use version::Version;

/// Sysex command byte reserved for all Circuit Playground traffic.
pub const CP_COMMAND: u8 = 0x40;

/// Circuit Playground sub-command opcodes.
///
/// Exactly one of these is the first byte of every payload carried under
/// [`CP_COMMAND`]. Values are fixed by the board firmware.
pub mod subcmds {
    // pixels
    pub const PIXEL_SET: u8 = 0x10;
    pub const PIXEL_SHOW: u8 = 0x11;
    pub const PIXEL_CLEAR: u8 = 0x12;
    pub const PIXEL_BRIGHTNESS: u8 = 0x13;

    // speaker
    pub const TONE: u8 = 0x20;
    pub const NO_TONE: u8 = 0x21;

    // accelerometer & tap
    pub const ACCEL_READ: u8 = 0x30;
    pub const TAP_READ: u8 = 0x31;
    pub const ACCEL_READ_REPLY: u8 = 0x36;
    pub const TAP_READ_REPLY: u8 = 0x37;
    pub const TAP_STREAM_ON: u8 = 0x38;
    pub const TAP_STREAM_OFF: u8 = 0x39;
    pub const ACCEL_STREAM_ON: u8 = 0x3A;
    pub const ACCEL_STREAM_OFF: u8 = 0x3B;
    pub const ACCEL_RANGE: u8 = 0x3C;
    pub const TAP_CONFIG: u8 = 0x3D;

    // capacitive touch
    pub const CAP_READ: u8 = 0x40;
    pub const CAP_ON: u8 = 0x41;
    pub const CAP_OFF: u8 = 0x42;
    pub const CAP_REPLY: u8 = 0x43;

    // color sense
    pub const SENSE_COLOR: u8 = 0x50;
    pub const SENSE_COLOR_REPLY: u8 = 0x51;
}
