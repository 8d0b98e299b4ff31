//! The boundary between the protocol layer and whatever moves bytes.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use cp_firmata::firmata::PinMode;
use log::trace;

/// Outbound primitives a [`Router`](crate::router::Router) needs from the link.
///
/// Every method is fire-and-forget: implementations may block or queue, but
/// failures are never reported back to the caller.
pub trait Transport {
    /// Sends `payload` as a sysex message under `command`.
    fn send_extended_command(&self, command: u8, payload: &[u8]);

    fn set_pin_mode(&self, pin: u8, mode: PinMode);

    /// Enables or disables periodic reporting of an analog channel.
    fn report_analog(&self, channel: u8, enabled: bool);

    /// Enables or disables change reporting of an 8-pin digital port.
    fn report_digital(&self, port: u8, enabled: bool);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_extended_command(&self, command: u8, payload: &[u8]) {
        (**self).send_extended_command(command, payload)
    }

    fn set_pin_mode(&self, pin: u8, mode: PinMode) {
        (**self).set_pin_mode(pin, mode)
    }

    fn report_analog(&self, channel: u8, enabled: bool) {
        (**self).report_analog(channel, enabled)
    }

    fn report_digital(&self, port: u8, enabled: bool) {
        (**self).report_digital(port, enabled)
    }
}

/// Handler invoked with the payload of every sysex message whose command
/// byte it was registered for.
pub type SysexHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Registry mapping sysex command bytes to their handlers.
///
/// One handler per command byte; registering again replaces the previous one.
#[derive(Default)]
pub struct Dispatchers {
    handlers: RwLock<HashMap<u8, SysexHandler>>,
}

impl Dispatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, command: u8, handler: impl Fn(&[u8]) + Send + Sync + 'static) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command, Arc::new(handler));
    }

    pub fn unregister(&self, command: u8) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&command);
    }

    /// Routes a sysex payload to the handler registered for `command`.
    ///
    /// Returns `false` if no handler is registered.
    pub fn dispatch(&self, command: u8, payload: &[u8]) -> bool {
        // Clone the handle out so a handler may register others while running.
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command)
            .cloned();

        match handler {
            Some(handler) => {
                trace!("dispatching sysex 0x{command:02X}: {payload:x?}");
                handler(payload);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Dispatchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut commands: Vec<_> = handlers.keys().copied().collect();
        commands.sort_unstable();
        f.debug_struct("Dispatchers")
            .field("commands", &commands)
            .finish()
    }
}
