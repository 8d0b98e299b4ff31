//! Standard Firmata digital and analog reporting.
//!
//! The board reports digital inputs a port (eight pins) at a time, and only
//! when something in the port changed. [`PinCallbacks`] remembers the last
//! mask of every port so that each per-pin callback fires only when its own
//! pin changes level.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use log::trace;

/// Number of pins in a digital port.
pub const PINS_PER_PORT: u8 = 8;

pub type DigitalCallback = Arc<dyn Fn(u8, bool) + Send + Sync>;
pub type AnalogCallback = Arc<dyn Fn(u8, u16) + Send + Sync>;

/// Returns the digital port a pin reports through.
pub const fn port_of(pin: u8) -> u8 {
    pin / PINS_PER_PORT
}

/// Per-pin digital and per-channel analog callbacks.
#[derive(Default)]
pub struct PinCallbacks {
    digital: Mutex<HashMap<u8, DigitalCallback>>,
    analog: Mutex<HashMap<u8, AnalogCallback>>,
    port_levels: Mutex<HashMap<u8, u16>>,
    analog_values: Mutex<HashMap<u8, u16>>,
}

impl PinCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for level changes of `pin`, replacing any previous one.
    pub fn on_digital(&self, pin: u8, callback: impl Fn(u8, bool) + Send + Sync + 'static) {
        self.digital
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, Arc::new(callback));
    }

    /// Removes the callback of `pin`.
    ///
    /// Returns `true` if no other pin of the same port still has one, meaning
    /// the port's reporting can be switched off.
    pub fn remove_digital(&self, pin: u8) -> bool {
        let mut digital = self.digital.lock().unwrap_or_else(PoisonError::into_inner);
        digital.remove(&pin);
        !digital.keys().any(|&other| port_of(other) == port_of(pin))
    }

    pub fn on_analog(&self, channel: u8, callback: impl Fn(u8, u16) + Send + Sync + 'static) {
        self.analog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, Arc::new(callback));
    }

    pub fn remove_analog(&self, channel: u8) {
        self.analog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel);
    }

    /// Last reported level of `pin`, if its port has reported yet.
    pub fn digital_level(&self, pin: u8) -> Option<bool> {
        self.port_levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&port_of(pin))
            .map(|mask| mask & (1 << (pin % PINS_PER_PORT)) != 0)
    }

    /// Last reported value of an analog channel.
    pub fn analog_value(&self, channel: u8) -> Option<u16> {
        self.analog_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .copied()
    }

    /// Feeds a digital port report.
    ///
    /// Callbacks fire for pins whose level differs from the previous report,
    /// and for every registered pin on the port's first report.
    pub fn handle_digital(&self, port: u8, mask: u16) {
        let previous = self
            .port_levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(port, mask);

        let first_pin = port.saturating_mul(PINS_PER_PORT);
        let changed: Vec<(u8, bool, DigitalCallback)> = {
            let digital = self.digital.lock().unwrap_or_else(PoisonError::into_inner);
            (0..PINS_PER_PORT)
                .filter_map(|bit| {
                    let pin = first_pin.checked_add(bit)?;
                    let callback = digital.get(&pin)?;
                    let level = mask & (1 << bit) != 0;
                    let was = previous.map(|previous| previous & (1 << bit) != 0);
                    (was != Some(level)).then(|| (pin, level, callback.clone()))
                })
                .collect()
        };

        for (pin, level, callback) in changed {
            trace!("pin {pin} changed to {level}");
            callback(pin, level);
        }
    }

    /// Feeds an analog channel report.
    pub fn handle_analog(&self, channel: u8, value: u16) {
        self.analog_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, value);

        let callback = self
            .analog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .cloned();

        if let Some(callback) = callback {
            callback(channel, value);
        }
    }
}

impl std::fmt::Debug for PinCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut digital: Vec<u8> = self
            .digital
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        digital.sort_unstable();
        let mut analog: Vec<u8> = self
            .analog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        analog.sort_unstable();

        f.debug_struct("PinCallbacks")
            .field("digital", &digital)
            .field("analog", &analog)
            .finish()
    }
}
