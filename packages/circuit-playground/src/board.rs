//! A Circuit Playground board attached over serial.

use std::sync::{Arc, OnceLock, Weak};

use cp_firmata::{command::InvalidArgument, firmata::FirmwareReport, Version};
use log::{debug, info};

use crate::{
    controller::Controller,
    router::Router,
    serial::{SerialConfig, SerialConnection, SerialError, SerialTransport},
};

pub type BoardRouter = Router<Arc<SerialTransport>>;
pub type BoardController = Controller<Arc<SerialTransport>>;

/// An open connection to one board.
///
/// Circuit Playground features are reached through [`CircuitPlayground::router`].
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct CircuitPlayground {
    connection: SerialConnection,
    controller: Arc<BoardController>,
}

impl CircuitPlayground {
    /// Opens the board on `port`.
    ///
    /// Must be called from within a tokio runtime. The board usually resets
    /// when the port opens, so commands sent in the first second or two may be
    /// lost.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError`] if the port cannot be opened.
    pub fn open(port: &str, config: SerialConfig) -> Result<Self, SerialError> {
        // The connection has to exist before the controller can, but its
        // reader needs to reach the controller.
        let slot: Arc<OnceLock<Weak<BoardController>>> = Arc::new(OnceLock::new());

        let connection = SerialConnection::open(port, &config, {
            let slot = slot.clone();
            move |message| match slot.get().and_then(Weak::upgrade) {
                Some(controller) => controller.handle_message(message),
                None => debug!("Board not ready, dropping {message:?}."),
            }
        })?;

        let transport = connection.transport();
        let controller = Controller::new(transport.clone(), transport.dispatchers().clone());
        _ = slot.set(Arc::downgrade(&controller));

        info!("Connected to Circuit Playground on {port}.");

        Ok(Self {
            connection,
            controller,
        })
    }

    pub fn router(&self) -> &BoardRouter {
        self.controller.router()
    }

    pub fn controller(&self) -> &BoardController {
        &self.controller
    }

    pub fn transport(&self) -> &Arc<SerialTransport> {
        self.connection.transport()
    }

    /// Firmata protocol version last announced by the board.
    pub fn protocol_version(&self) -> Option<Version> {
        self.controller.protocol_version()
    }

    /// See [`Controller::set_digital_input`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Pin`] for pins that do not exist.
    pub fn set_digital_input(
        &self,
        pin: u8,
        callback: impl Fn(u8, bool) + Send + Sync + 'static,
    ) -> Result<(), InvalidArgument> {
        self.controller.set_digital_input(pin, callback)
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::Pin`] for pins that do not exist.
    pub fn clear_digital_input(&self, pin: u8) -> Result<(), InvalidArgument> {
        self.controller.clear_digital_input(pin)
    }

    /// See [`Controller::set_analog_input`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::AnalogChannel`] for channels that do not exist.
    pub fn set_analog_input(
        &self,
        channel: u8,
        callback: impl Fn(u8, u16) + Send + Sync + 'static,
    ) -> Result<(), InvalidArgument> {
        self.controller.set_analog_input(channel, callback)
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::AnalogChannel`] for channels that do not exist.
    pub fn clear_analog_input(&self, channel: u8) -> Result<(), InvalidArgument> {
        self.controller.clear_analog_input(channel)
    }

    pub fn digital_level(&self, pin: u8) -> Option<bool> {
        self.controller.digital_level(pin)
    }

    pub fn analog_value(&self, channel: u8) -> Option<u16> {
        self.controller.analog_value(channel)
    }

    /// Asks the board for the name and version of its firmware.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Closed`] if the connection has been closed.
    pub fn query_firmware(
        &self,
        callback: impl Fn(FirmwareReport) + Send + Sync + 'static,
    ) -> Result<(), SerialError> {
        if self.transport().is_closed() {
            return Err(SerialError::Closed);
        }
        self.controller.query_firmware(callback);
        Ok(())
    }

    /// Stops the background tasks. Nothing is sent to the board, so any
    /// stream it was running keeps running until it is reset.
    pub fn close(&self) {
        debug!("Closing board connection.");
        self.connection.close();
    }
}
