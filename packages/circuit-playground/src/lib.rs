//! Host-side control of Adafruit Circuit Playground boards running the
//! Circuit Playground Firmata sketch.
//!
//! [`router::Router`] implements the board's command/response protocol on top
//! of any [`transport::Transport`], and [`controller::Controller`] routes
//! inbound messages to it. With the `serial` feature enabled,
//! [`CircuitPlayground`] wires a controller to a real serial port.

pub use cp_firmata as protocol;

pub mod controller;
pub mod pins;
pub mod router;
pub mod thermistor;
pub mod transport;

#[cfg(feature = "serial")]
pub mod board;
#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use board::CircuitPlayground;
#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialError};

/// Firmata pin number of analog channel 0 on the board's ATmega32u4.
pub const ANALOG_PIN_OFFSET: u8 = 18;
