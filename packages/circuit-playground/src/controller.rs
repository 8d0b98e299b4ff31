//! Everything one board needs above its link.
//!
//! A [`Controller`] owns the [`Router`] and the plain pin callbacks of a
//! board. Feed it every inbound [`FirmataMessage`] through
//! [`Controller::handle_message`]; sysex messages are routed through the
//! shared [`Dispatchers`], where the controller registers itself for
//! [`CP_COMMAND`] when it is created.

use std::sync::{Arc, Mutex, PoisonError};

use cp_firmata::{
    command::InvalidArgument,
    firmata::{
        cmds::REPORT_FIRMWARE, FirmataMessage, FirmwareReport, PinMode, MAX_ANALOG_CHANNELS,
        MAX_PINS,
    },
    Decode, Version, CP_COMMAND,
};
use log::{debug, warn};

use crate::{
    pins::{port_of, PinCallbacks},
    router::{Feature, Router},
    thermistor::THERMISTOR_CHANNEL,
    transport::{Dispatchers, Transport},
    ANALOG_PIN_OFFSET,
};

/// Router, pin callbacks and cached board state for a single board.
pub struct Controller<T: Transport> {
    router: Router<T>,
    pins: PinCallbacks,
    dispatchers: Arc<Dispatchers>,
    protocol_version: Mutex<Option<Version>>,
}

impl<T: Transport + Send + Sync + 'static> Controller<T> {
    /// Creates a controller and registers its router as the
    /// [`CP_COMMAND`] handler of `dispatchers`.
    ///
    /// The handler only holds a weak reference, so dropping the controller
    /// leaves it inert.
    pub fn new(transport: T, dispatchers: Arc<Dispatchers>) -> Arc<Self> {
        let controller = Arc::new(Self {
            router: Router::new(transport),
            pins: PinCallbacks::new(),
            dispatchers,
            protocol_version: Mutex::new(None),
        });

        let weak = Arc::downgrade(&controller);
        controller.dispatchers.register(CP_COMMAND, move |payload| {
            if let Some(controller) = weak.upgrade() {
                controller.router.dispatch(payload);
            }
        });

        controller
    }
}

impl<T: Transport> Controller<T> {
    pub fn router(&self) -> &Router<T> {
        &self.router
    }

    pub fn dispatchers(&self) -> &Arc<Dispatchers> {
        &self.dispatchers
    }

    /// Routes one message received from the board.
    pub fn handle_message(&self, message: FirmataMessage) {
        match message {
            FirmataMessage::Sysex { command, payload } => {
                if !self.dispatchers.dispatch(command, &payload) {
                    debug!("No dispatcher for sysex 0x{command:02X}, dropping {payload:x?}.");
                }
            }
            FirmataMessage::Analog { channel, value } => {
                self.router.handle_analog(channel, value);
                self.pins.handle_analog(channel, value);
            }
            FirmataMessage::Digital { port, mask } => self.pins.handle_digital(port, mask),
            FirmataMessage::ProtocolVersion(version) => {
                debug!("Board speaks Firmata {version}.");
                *self
                    .protocol_version
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(version);
            }
        }
    }

    /// Firmata protocol version last announced by the board.
    pub fn protocol_version(&self) -> Option<Version> {
        *self
            .protocol_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures `pin` as a digital input and calls `callback` with
    /// `(pin, level)` whenever its level changes.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Pin`] unless `pin` is below [`MAX_PINS`].
    pub fn set_digital_input(
        &self,
        pin: u8,
        callback: impl Fn(u8, bool) + Send + Sync + 'static,
    ) -> Result<(), InvalidArgument> {
        check_pin(pin)?;
        self.pins.on_digital(pin, callback);

        self.router.transport().set_pin_mode(pin, PinMode::Input);
        self.router.transport().report_digital(port_of(pin), true);
        Ok(())
    }

    /// Removes the callback of `pin`, switching its port's reporting off if
    /// no other pin of the port is watched.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::Pin`] unless `pin` is below [`MAX_PINS`].
    pub fn clear_digital_input(&self, pin: u8) -> Result<(), InvalidArgument> {
        check_pin(pin)?;
        if self.pins.remove_digital(pin) {
            self.router.transport().report_digital(port_of(pin), false);
        }
        Ok(())
    }

    /// Starts reporting an analog channel and calls `callback` with
    /// `(channel, value)` for every reading.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::AnalogChannel`] unless `channel` is below
    /// [`MAX_ANALOG_CHANNELS`].
    pub fn set_analog_input(
        &self,
        channel: u8,
        callback: impl Fn(u8, u16) + Send + Sync + 'static,
    ) -> Result<(), InvalidArgument> {
        let pin = analog_pin(channel)?;
        self.pins.on_analog(channel, callback);
        if channel == THERMISTOR_CHANNEL {
            self.router.share_thermistor_channel(true);
        }

        self.router.transport().set_pin_mode(pin, PinMode::Analog);
        self.router.transport().report_analog(channel, true);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::AnalogChannel`] unless `channel` is below
    /// [`MAX_ANALOG_CHANNELS`].
    pub fn clear_analog_input(&self, channel: u8) -> Result<(), InvalidArgument> {
        analog_pin(channel)?;
        self.pins.remove_analog(channel);

        if channel == THERMISTOR_CHANNEL {
            self.router.share_thermistor_channel(false);
            // Still needed for temperature readings.
            if self.router.is_active(Feature::Temperature) {
                return Ok(());
            }
        }
        self.router.transport().report_analog(channel, false);
        Ok(())
    }

    pub fn digital_level(&self, pin: u8) -> Option<bool> {
        self.pins.digital_level(pin)
    }

    pub fn analog_value(&self, channel: u8) -> Option<u16> {
        self.pins.analog_value(channel)
    }

    /// Asks the board for the name and version of the firmware it runs.
    ///
    /// This is the standard Firmata firmware report, not a Circuit
    /// Playground sub-command. Only the most recent query's callback is kept.
    pub fn query_firmware(&self, callback: impl Fn(FirmwareReport) + Send + Sync + 'static) {
        self.dispatchers
            .register(REPORT_FIRMWARE, move |mut payload| {
                match FirmwareReport::decode(&mut payload) {
                    Ok(report) => callback(report),
                    Err(e) => warn!("Dropping malformed firmware report: {e}"),
                }
            });
        self.router
            .transport()
            .send_extended_command(REPORT_FIRMWARE, &[]);
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("router", &self.router)
            .field("pins", &self.pins)
            .field("dispatchers", &self.dispatchers)
            .field("protocol_version", &self.protocol_version())
            .finish()
    }
}

const fn check_pin(pin: u8) -> Result<(), InvalidArgument> {
    if pin >= MAX_PINS {
        return Err(InvalidArgument::Pin(pin));
    }
    Ok(())
}

/// Firmata pin number of analog `channel`.
fn analog_pin(channel: u8) -> Result<u8, InvalidArgument> {
    if channel >= MAX_ANALOG_CHANNELS {
        return Err(InvalidArgument::AnalogChannel(channel));
    }
    ANALOG_PIN_OFFSET
        .checked_add(channel)
        .filter(|&pin| pin < MAX_PINS)
        .ok_or(InvalidArgument::AnalogChannel(channel))
}

#[cfg(test)]
mod tests {
    use cp_firmata::{codec::encode_float32, subcmds::ACCEL_READ_REPLY};

    use super::*;
    use crate::transport::tests::{RecordingTransport, Sent};

    fn controller() -> Arc<Controller<RecordingTransport>> {
        Controller::new(RecordingTransport::default(), Arc::new(Dispatchers::new()))
    }

    fn sent(controller: &Controller<RecordingTransport>) -> Vec<Sent> {
        controller.router().transport().take()
    }

    #[test]
    fn inbound_messages_reach_router_and_pins() {
        let controller = controller();

        let accel = Arc::new(Mutex::new(Vec::new()));
        let sink = accel.clone();
        controller
            .router()
            .start_accel(move |x, y, z| sink.lock().unwrap().push((x, y, z)));

        let temperatures = Arc::new(Mutex::new(Vec::new()));
        let sink = temperatures.clone();
        controller
            .router()
            .start_temperature(move |_, raw| sink.lock().unwrap().push(raw));

        let mut payload = vec![ACCEL_READ_REPLY];
        payload.extend(encode_float32(1.0));
        payload.extend(encode_float32(-2.5));
        payload.extend(encode_float32(9.8));
        controller.handle_message(FirmataMessage::Sysex {
            command: CP_COMMAND,
            payload,
        });
        controller.handle_message(FirmataMessage::Analog {
            channel: THERMISTOR_CHANNEL,
            value: 512,
        });

        assert_eq!(*accel.lock().unwrap(), [(1.0, -2.5, 9.8)]);
        assert_eq!(*temperatures.lock().unwrap(), [512]);
        assert_eq!(controller.router().read_temperature_raw(), Some(512));
        assert_eq!(controller.analog_value(THERMISTOR_CHANNEL), Some(512));
    }

    #[test]
    fn protocol_version_and_digital_reports_are_kept() {
        let controller = controller();
        assert_eq!(controller.protocol_version(), None);

        controller.handle_message(FirmataMessage::ProtocolVersion(Version { major: 2, minor: 5 }));
        controller.handle_message(FirmataMessage::Digital {
            port: 0,
            mask: 0b0001_0000,
        });

        assert_eq!(
            controller.protocol_version(),
            Some(Version { major: 2, minor: 5 })
        );
        assert_eq!(controller.digital_level(4), Some(true));
    }

    #[test]
    fn unrouted_sysex_is_dropped() {
        let controller = controller();
        controller.handle_message(FirmataMessage::Sysex {
            command: 0x71,
            payload: vec![0x01],
        });
        assert!(sent(&controller).is_empty());
    }

    #[test]
    fn dropped_controller_leaves_dispatcher_inert() {
        let dispatchers = Arc::new(Dispatchers::new());
        let controller = Controller::new(RecordingTransport::default(), dispatchers.clone());
        drop(controller);

        assert!(dispatchers.dispatch(CP_COMMAND, &[ACCEL_READ_REPLY]));
    }

    #[test]
    fn digital_input() {
        let controller = controller();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();

        controller
            .set_digital_input(19, move |pin, level| sink.lock().unwrap().push((pin, level)))
            .unwrap();
        controller.handle_message(FirmataMessage::Digital {
            port: 2,
            mask: 0b0000_1000,
        });
        controller.clear_digital_input(19).unwrap();

        assert_eq!(*calls.lock().unwrap(), [(19, true)]);
        assert_eq!(
            sent(&controller),
            [
                Sent::PinMode {
                    pin: 19,
                    mode: PinMode::Input
                },
                Sent::ReportDigital {
                    port: 2,
                    enabled: true
                },
                Sent::ReportDigital {
                    port: 2,
                    enabled: false
                },
            ]
        );
    }

    #[test]
    fn analog_input() {
        let controller = controller();
        controller.set_analog_input(5, |_, _| {}).unwrap();
        controller.clear_analog_input(5).unwrap();

        assert_eq!(
            sent(&controller),
            [
                Sent::PinMode {
                    pin: ANALOG_PIN_OFFSET + 5,
                    mode: PinMode::Analog
                },
                Sent::ReportAnalog {
                    channel: 5,
                    enabled: true
                },
                Sent::ReportAnalog {
                    channel: 5,
                    enabled: false
                },
            ]
        );
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        let controller = controller();

        assert_eq!(
            controller.set_analog_input(16, |_, _| {}),
            Err(InvalidArgument::AnalogChannel(16))
        );
        assert_eq!(
            controller.set_analog_input(u8::MAX, |_, _| {}),
            Err(InvalidArgument::AnalogChannel(u8::MAX))
        );
        assert_eq!(
            controller.clear_analog_input(16),
            Err(InvalidArgument::AnalogChannel(16))
        );
        assert_eq!(
            controller.set_digital_input(130, |_, _| {}),
            Err(InvalidArgument::Pin(130))
        );
        assert_eq!(
            controller.clear_digital_input(128),
            Err(InvalidArgument::Pin(128))
        );

        assert!(sent(&controller).is_empty());
        assert_eq!(controller.analog_value(16), None);
    }

    #[test]
    fn thermistor_channel_is_shared() {
        let controller = controller();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();

        controller
            .set_analog_input(THERMISTOR_CHANNEL, move |_, value| sink.lock().unwrap().push(value))
            .unwrap();
        controller.router().start_temperature(|_, _| {});
        controller.router().stop_temperature();
        controller.handle_message(FirmataMessage::Analog {
            channel: THERMISTOR_CHANNEL,
            value: 300,
        });

        assert_eq!(*calls.lock().unwrap(), [300]);
        assert!(!sent(&controller).contains(&Sent::ReportAnalog {
            channel: THERMISTOR_CHANNEL,
            enabled: false
        }));

        // And the other way round: clearing the input keeps temperature alive.
        controller.router().start_temperature(|_, _| {});
        controller.clear_analog_input(THERMISTOR_CHANNEL).unwrap();
        assert!(!sent(&controller).contains(&Sent::ReportAnalog {
            channel: THERMISTOR_CHANNEL,
            enabled: false
        }));

        controller.router().stop_temperature();
        assert_eq!(
            sent(&controller),
            [Sent::ReportAnalog {
                channel: THERMISTOR_CHANNEL,
                enabled: false
            }]
        );
    }

    #[test]
    fn firmware_query() {
        let controller = controller();
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();

        controller.query_firmware(move |report| sink.lock().unwrap().push(report));
        assert_eq!(
            sent(&controller),
            [Sent::Extended {
                command: REPORT_FIRMWARE,
                payload: vec![]
            }]
        );

        // Version 1.2, name "CP".
        controller.handle_message(FirmataMessage::Sysex {
            command: REPORT_FIRMWARE,
            payload: vec![1, 2, b'C', 0, b'P', 0],
        });

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].version, Version { major: 1, minor: 2 });
        assert_eq!(reports[0].name, "CP");
    }
}
