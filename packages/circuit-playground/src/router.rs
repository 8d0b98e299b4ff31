//! Circuit Playground command/response routing.
//!
//! A [`Router`] owns the [`CP_COMMAND`] channel of one board. Outbound, it
//! validates arguments, encodes the matching packet and hands it to the
//! [`Transport`]. Inbound, [`Router::dispatch`] decodes each reply and invokes
//! whichever callback is currently registered for that feature.
//!
//! Each feature has exactly one callback slot. A start or read call fills it,
//! replacing any previous callback; a stop call empties it. Replies never
//! change a slot, they only decide whether a callback fires. Since a stop is
//! fire-and-forget, the board may still send one more reply afterwards; it is
//! decoded and then dropped because the slot is empty.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use cp_firmata::{
    command::{
        AccelRange, AccelRangePacket, AccelReadPacket, AccelStreamOffPacket, AccelStreamOnPacket,
        Brightness, CapOffPacket, CapOnPacket, CapPin, CapReadPacket, CpCommand, InvalidArgument,
        NoTonePacket, PixelBrightnessPacket, PixelClearPacket, PixelSetPacket, PixelSetPayload,
        PixelShowPacket, Rgb, SenseColorPacket, TapConfigPacket, TapConfigPayload, TapReadPacket,
        TapStreamOffPacket, TapStreamOnPacket, TapType, TonePacket, TonePayload,
    },
    firmata::PinMode,
    reply::{FeatureReply, ReplyError},
    CP_COMMAND,
};
use log::{debug, trace, warn};

use crate::{
    thermistor::{adc_to_celsius, THERMISTOR_CHANNEL},
    transport::Transport,
    ANALOG_PIN_OFFSET,
};

pub type AccelCallback = Arc<dyn Fn(f32, f32, f32) + Send + Sync>;
pub type TapCallback = Arc<dyn Fn(bool, bool) + Send + Sync>;
pub type CapCallback = Arc<dyn Fn(u8, bool, i32) + Send + Sync>;
pub type ColorCallback = Arc<dyn Fn(u8, u8, u8) + Send + Sync>;
pub type TemperatureCallback = Arc<dyn Fn(f32, u16) + Send + Sync>;

/// Board features that deliver results through a callback.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Feature {
    Accel,
    Tap,
    Cap,
    Color,
    Temperature,
}

/// Whether a feature currently has a live registration.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FeatureState {
    Idle,
    Active,
}

/// A single-assignment callback holder.
///
/// The lock is only held to swap or clone the handle, never while the
/// callback runs, so a callback may re-register its own feature.
struct Slot<C> {
    callback: Mutex<Option<C>>,
}

impl<C: Clone> Slot<C> {
    const fn new() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    fn set(&self, callback: Option<C>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    fn get(&self) -> Option<C> {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_set(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// One callback slot per feature.
struct FeatureSlots {
    accel: Slot<AccelCallback>,
    tap: Slot<TapCallback>,
    cap: Slot<CapCallback>,
    color: Slot<ColorCallback>,
    temperature: Slot<TemperatureCallback>,
}

impl FeatureSlots {
    const fn new() -> Self {
        Self {
            accel: Slot::new(),
            tap: Slot::new(),
            cap: Slot::new(),
            color: Slot::new(),
            temperature: Slot::new(),
        }
    }
}

/// Router for the Circuit Playground sub-protocol of a single board.
pub struct Router<T: Transport> {
    transport: T,
    slots: FeatureSlots,
    thermistor_shared: AtomicBool,
    last_temperature_raw: Mutex<Option<u16>>,
}

impl<T: Transport> Router<T> {
    /// Creates a router with every feature idle.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            slots: FeatureSlots::new(),
            thermistor_shared: AtomicBool::new(false),
            last_temperature_raw: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self, feature: Feature) -> FeatureState {
        let active = match feature {
            Feature::Accel => self.slots.accel.is_set(),
            Feature::Tap => self.slots.tap.is_set(),
            Feature::Cap => self.slots.cap.is_set(),
            Feature::Color => self.slots.color.is_set(),
            Feature::Temperature => self.slots.temperature.is_set(),
        };

        if active {
            FeatureState::Active
        } else {
            FeatureState::Idle
        }
    }

    pub fn is_active(&self, feature: Feature) -> bool {
        self.state(feature) == FeatureState::Active
    }

    fn send<C: CpCommand>(&self, packet: C) {
        let payload = packet.encode_to_vec();
        trace!("sending sub-command 0x{:02X}: {:x?}", C::SUBCMD, payload);
        self.transport.send_extended_command(CP_COMMAND, &payload);
    }

    /// Stages a pixel color. Nothing changes on the board until
    /// [`Router::show_pixels`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::PixelIndex`] unless `pixel` is 0-9.
    pub fn set_pixel(&self, pixel: u8, r: u8, g: u8, b: u8) -> Result<(), InvalidArgument> {
        let payload = PixelSetPayload::try_new(pixel, Rgb::new(r, g, b))?;
        self.send(PixelSetPacket::new(payload));
        Ok(())
    }

    /// Pushes the staged pixel colors out to the pixels.
    pub fn show_pixels(&self) {
        self.send(PixelShowPacket::default());
    }

    /// Clears every staged pixel color. Call [`Router::show_pixels`] afterwards.
    pub fn clear_pixels(&self) {
        self.send(PixelClearPacket::default());
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::Brightness`] unless `brightness` is 0-100.
    pub fn set_pixel_brightness(&self, brightness: u8) -> Result<(), InvalidArgument> {
        let brightness = Brightness::try_new(brightness)?;
        self.send(PixelBrightnessPacket::new(brightness));
        Ok(())
    }

    /// Plays a tone on the speaker.
    ///
    /// A `duration_ms` of zero plays until [`Router::no_tone`]. Both values are
    /// 14-bit on the wire; larger values wrap around.
    pub fn tone(&self, frequency_hz: u16, duration_ms: u16) {
        self.send(TonePacket::new(TonePayload {
            frequency_hz,
            duration_ms,
        }));
    }

    pub fn no_tone(&self) {
        self.send(NoTonePacket::default());
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::AccelRange`] unless `range` is 0-3 (see [`AccelRange`]).
    pub fn set_accel_range(&self, range: u8) -> Result<(), InvalidArgument> {
        let range = AccelRange::try_from(range)?;
        self.send(AccelRangePacket::new(range));
        Ok(())
    }

    /// Requests a single accelerometer reading.
    pub fn read_accel(&self, callback: impl Fn(f32, f32, f32) + Send + Sync + 'static) {
        self.slots.accel.set(Some(Arc::new(callback)));
        self.send(AccelReadPacket::default());
    }

    /// Starts streaming accelerometer readings to `callback`.
    pub fn start_accel(&self, callback: impl Fn(f32, f32, f32) + Send + Sync + 'static) {
        self.slots.accel.set(Some(Arc::new(callback)));
        self.send(AccelStreamOnPacket::default());
    }

    pub fn stop_accel(&self) {
        self.slots.accel.set(None);
        self.send(AccelStreamOffPacket::default());
    }

    /// # Errors
    ///
    /// Returns [`InvalidArgument::TapType`] unless `tap_type` is 0-2 (see [`TapType`]).
    pub fn set_tap_config(&self, tap_type: u8, threshold: u8) -> Result<(), InvalidArgument> {
        let tap_type = TapType::try_from(tap_type)?;
        self.send(TapConfigPacket::new(TapConfigPayload {
            tap_type,
            threshold,
        }));
        Ok(())
    }

    /// Requests the tap state once. The callback receives `(single, double)`.
    pub fn read_tap(&self, callback: impl Fn(bool, bool) + Send + Sync + 'static) {
        self.slots.tap.set(Some(Arc::new(callback)));
        self.send(TapReadPacket::default());
    }

    pub fn start_tap(&self, callback: impl Fn(bool, bool) + Send + Sync + 'static) {
        self.slots.tap.set(Some(Arc::new(callback)));
        self.send(TapStreamOnPacket::default());
    }

    pub fn stop_tap(&self) {
        self.slots.tap.set(None);
        self.send(TapStreamOffPacket::default());
    }

    /// Requests one capacitive reading of `pin`. The callback receives
    /// `(pin, touched, raw)`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::CapPin`] unless `pin` supports capacitive
    /// touch. Nothing is registered in that case.
    pub fn read_cap_touch(
        &self,
        pin: u8,
        callback: impl Fn(u8, bool, i32) + Send + Sync + 'static,
    ) -> Result<(), InvalidArgument> {
        let pin = CapPin::try_new(pin)?;
        self.slots.cap.set(Some(Arc::new(callback)));
        self.send(CapReadPacket::new(pin));
        Ok(())
    }

    /// Starts streaming capacitive readings of `pin`.
    ///
    /// All pins share one callback slot; the latest registration receives
    /// readings for every streaming pin.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::CapPin`] unless `pin` supports capacitive touch.
    pub fn start_cap_touch(
        &self,
        pin: u8,
        callback: impl Fn(u8, bool, i32) + Send + Sync + 'static,
    ) -> Result<(), InvalidArgument> {
        let pin = CapPin::try_new(pin)?;
        self.slots.cap.set(Some(Arc::new(callback)));
        self.send(CapOnPacket::new(pin));
        Ok(())
    }

    /// Stops streaming `pin` and clears the capacitive callback.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::CapPin`] unless `pin` supports capacitive touch.
    pub fn stop_cap_touch(&self, pin: u8) -> Result<(), InvalidArgument> {
        let pin = CapPin::try_new(pin)?;
        self.slots.cap.set(None);
        self.send(CapOffPacket::new(pin));
        Ok(())
    }

    /// Requests one color reading. The callback receives `(r, g, b)`.
    pub fn sense_color(&self, callback: impl Fn(u8, u8, u8) + Send + Sync + 'static) {
        self.slots.color.set(Some(Arc::new(callback)));
        self.send(SenseColorPacket::default());
    }

    /// Starts reporting the thermistor. `callback` receives `(celsius, raw)`
    /// for every reading, and the latest one is also kept for
    /// [`Router::read_temperature`].
    pub fn start_temperature(&self, callback: impl Fn(f32, u16) + Send + Sync + 'static) {
        self.slots.temperature.set(Some(Arc::new(callback)));

        self.transport
            .set_pin_mode(ANALOG_PIN_OFFSET + THERMISTOR_CHANNEL, PinMode::Analog);
        self.transport.report_analog(THERMISTOR_CHANNEL, true);
    }

    /// Stops delivering temperature readings.
    ///
    /// Reporting of the thermistor channel is left on while it is shared
    /// (see [`Router::share_thermistor_channel`]).
    pub fn stop_temperature(&self) {
        self.slots.temperature.set(None);

        if self.thermistor_shared.load(Ordering::SeqCst) {
            debug!("thermistor channel still watched, leaving its reporting on");
            return;
        }
        self.transport.report_analog(THERMISTOR_CHANNEL, false);
    }

    /// Marks the thermistor channel as also being watched outside the router,
    /// e.g. by a plain analog input callback.
    pub fn share_thermistor_channel(&self, shared: bool) {
        self.thermistor_shared.store(shared, Ordering::SeqCst);
    }

    /// Latest thermistor reading converted to Celsius, if one has arrived.
    pub fn read_temperature(&self) -> Option<f32> {
        self.read_temperature_raw().map(adc_to_celsius)
    }

    /// Latest raw thermistor ADC value (0-1023), if one has arrived.
    pub fn read_temperature_raw(&self) -> Option<u16> {
        *self
            .last_temperature_raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Feeds an analog reading from the board.
    ///
    /// Only the thermistor channel is of interest, and only while the
    /// temperature feature is active.
    pub fn handle_analog(&self, channel: u8, raw: u16) {
        if channel != THERMISTOR_CHANNEL {
            return;
        }
        let Some(callback) = self.slots.temperature.get() else {
            return;
        };

        *self
            .last_temperature_raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(raw);

        callback(adc_to_celsius(raw), raw);
    }

    /// Routes one inbound [`CP_COMMAND`] payload to its feature callback.
    ///
    /// Never fails: empty, unknown, truncated or malformed payloads are
    /// logged and dropped so that one bad reply cannot stall the ones after it.
    pub fn dispatch(&self, raw: &[u8]) {
        let reply = match FeatureReply::decode(raw) {
            Ok(reply) => reply,
            Err(ReplyError::UnknownSubCommand(subcommand)) => {
                warn!("Dropping reply with unrecognized sub-command 0x{subcommand:02X}.");
                return;
            }
            Err(e) => {
                warn!("Dropping reply {raw:x?}: {e}");
                return;
            }
        };

        debug!("received {reply:?}");

        match reply {
            FeatureReply::Accel { x, y, z } => self.on_accel(x, y, z),
            FeatureReply::Tap { single, double } => self.on_tap(single, double),
            FeatureReply::Cap { pin, touched, raw } => self.on_cap(pin, touched, raw),
            FeatureReply::Color { r, g, b } => self.on_color(r, g, b),
        }
    }

    fn on_accel(&self, x: f32, y: f32, z: f32) {
        match self.slots.accel.get() {
            Some(callback) => callback(x, y, z),
            None => trace!("no accelerometer callback registered"),
        }
    }

    fn on_tap(&self, single: bool, double: bool) {
        match self.slots.tap.get() {
            Some(callback) => callback(single, double),
            None => trace!("no tap callback registered"),
        }
    }

    fn on_cap(&self, pin: u8, touched: bool, raw: i32) {
        match self.slots.cap.get() {
            Some(callback) => callback(pin, touched, raw),
            None => trace!("no capacitive touch callback registered"),
        }
    }

    fn on_color(&self, r: u8, g: u8, b: u8) {
        match self.slots.color.get() {
            Some(callback) => callback(r, g, b),
            None => trace!("no color sense callback registered"),
        }
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("transport", &self.transport)
            .field("accel", &self.state(Feature::Accel))
            .field("tap", &self.state(Feature::Tap))
            .field("cap", &self.state(Feature::Cap))
            .field("color", &self.state(Feature::Color))
            .field("temperature", &self.state(Feature::Temperature))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use cp_firmata::{
        codec::{encode_byte, encode_float32, encode_i32, encode_rgb_packed},
        subcmds::*,
    };

    use super::*;
    use crate::transport::tests::{RecordingTransport, Sent};

    fn router() -> Router<RecordingTransport> {
        Router::new(RecordingTransport::default())
    }

    fn extended(payload: &[u8]) -> Sent {
        Sent::Extended {
            command: CP_COMMAND,
            payload: payload.to_vec(),
        }
    }

    fn accel_reply(x: f32, y: f32, z: f32) -> Vec<u8> {
        let mut raw = vec![ACCEL_READ_REPLY];
        raw.extend(encode_float32(x));
        raw.extend(encode_float32(y));
        raw.extend(encode_float32(z));
        raw
    }

    fn tap_reply(register: u8) -> Vec<u8> {
        let mut raw = vec![TAP_READ_REPLY];
        raw.extend(encode_byte(register));
        raw
    }

    fn cap_reply(pin: u8, value: i32) -> Vec<u8> {
        let mut raw = vec![CAP_REPLY];
        raw.extend(encode_byte(pin));
        raw.extend(encode_i32(value));
        raw
    }

    /// Collects every callback invocation for later inspection.
    fn recorder<A: Send + 'static>() -> (Arc<Mutex<Vec<A>>>, Arc<Mutex<Vec<A>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (calls.clone(), calls)
    }

    #[test]
    fn pixel_commands() {
        let router = router();

        router.set_pixel(3, 255, 128, 0).unwrap();
        router.show_pixels();
        router.clear_pixels();
        router.set_pixel_brightness(50).unwrap();

        let mut set = vec![PIXEL_SET, 3];
        set.extend(encode_rgb_packed(255, 128, 0));
        assert_eq!(
            router.transport().take(),
            [
                extended(&set),
                extended(&[PIXEL_SHOW]),
                extended(&[PIXEL_CLEAR]),
                extended(&[PIXEL_BRIGHTNESS, 50]),
            ]
        );
    }

    #[test]
    fn set_pixel_does_not_show() {
        let router = router();
        router.set_pixel(0, 1, 2, 3).unwrap();

        let sent = router.transport().take();
        assert_eq!(sent.len(), 1);
        assert!(!sent.contains(&extended(&[PIXEL_SHOW])));
    }

    #[test]
    fn invalid_arguments_send_nothing() {
        let router = router();

        assert_eq!(router.set_pixel(10, 0, 0, 0), Err(InvalidArgument::PixelIndex(10)));
        assert_eq!(router.set_pixel_brightness(101), Err(InvalidArgument::Brightness(101)));
        assert_eq!(router.set_accel_range(4), Err(InvalidArgument::AccelRange(4)));
        assert_eq!(router.set_tap_config(3, 80), Err(InvalidArgument::TapType(3)));
        assert_eq!(
            router.read_cap_touch(4, |_, _, _| {}),
            Err(InvalidArgument::CapPin(4))
        );
        assert_eq!(
            router.start_cap_touch(11, |_, _, _| {}),
            Err(InvalidArgument::CapPin(11))
        );
        assert_eq!(router.stop_cap_touch(5), Err(InvalidArgument::CapPin(5)));

        assert!(router.transport().take().is_empty());
        assert!(!router.is_active(Feature::Cap));
    }

    #[test]
    fn tone_commands() {
        let router = router();
        router.tone(440, 500);
        router.tone(262, 0);
        router.no_tone();

        assert_eq!(
            router.transport().take(),
            [
                extended(&[TONE, 0x38, 0x03, 0x74, 0x03]),
                extended(&[TONE, 0x06, 0x02, 0x00, 0x00]),
                extended(&[NO_TONE]),
            ]
        );
    }

    #[test]
    fn accel_read_dispatches_to_callback() {
        let router = router();
        let (calls, sink) = recorder();

        router.read_accel(move |x, y, z| sink.lock().unwrap().push((x, y, z)));
        assert_eq!(router.transport().take(), [extended(&[ACCEL_READ])]);

        router.dispatch(&accel_reply(1.5, -2.0, 0.0));
        assert_eq!(*calls.lock().unwrap(), [(1.5, -2.0, 0.0)]);
    }

    #[test]
    fn restarting_accel_replaces_callback() {
        let router = router();
        let (first, sink1) = recorder();
        let (second, sink2) = recorder();

        router.start_accel(move |x, _, _| sink1.lock().unwrap().push(x));
        router.start_accel(move |x, _, _| sink2.lock().unwrap().push(x));
        router.dispatch(&accel_reply(9.8, 0.0, 0.0));

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(*second.lock().unwrap(), [9.8]);
        assert_eq!(
            router.transport().take(),
            [extended(&[ACCEL_STREAM_ON]), extended(&[ACCEL_STREAM_ON])]
        );
    }

    #[test]
    fn accel_stream_and_range() {
        let router = router();
        router.set_accel_range(AccelRange::G4.into()).unwrap();
        router.start_accel(|_, _, _| {});
        assert!(router.is_active(Feature::Accel));

        router.stop_accel();
        assert_eq!(router.state(Feature::Accel), FeatureState::Idle);
        assert_eq!(
            router.transport().take(),
            [
                extended(&[ACCEL_RANGE, 1]),
                extended(&[ACCEL_STREAM_ON]),
                extended(&[ACCEL_STREAM_OFF]),
            ]
        );
    }

    #[test]
    fn tap_flags() {
        let router = router();
        let (calls, sink) = recorder();
        router.start_tap(move |single, double| sink.lock().unwrap().push((single, double)));

        router.dispatch(&tap_reply(0x30));
        router.dispatch(&tap_reply(0x10));
        router.dispatch(&tap_reply(0x00));

        assert_eq!(
            *calls.lock().unwrap(),
            [(true, true), (true, false), (false, false)]
        );
    }

    #[test]
    fn late_tap_reply_after_stop_is_dropped() {
        let router = router();
        let (calls, sink) = recorder();
        router.start_tap(move |single, double| sink.lock().unwrap().push((single, double)));
        router.stop_tap();

        router.dispatch(&tap_reply(0x10));

        assert!(calls.lock().unwrap().is_empty());
        assert!(!router.is_active(Feature::Tap));
        assert_eq!(
            router.transport().take(),
            [extended(&[TAP_STREAM_ON]), extended(&[TAP_STREAM_OFF])]
        );
    }

    #[test]
    fn tap_read_and_config() {
        let router = router();
        router.set_tap_config(TapType::Double.into(), 80).unwrap();
        router.read_tap(|_, _| {});

        assert_eq!(
            router.transport().take(),
            [extended(&[TAP_CONFIG, 2, 80, 0]), extended(&[TAP_READ])]
        );
    }

    #[test]
    fn cap_touch_threshold() {
        let router = router();
        let (calls, sink) = recorder();
        router
            .read_cap_touch(10, move |pin, touched, raw| {
                sink.lock().unwrap().push((pin, touched, raw))
            })
            .unwrap();

        router.dispatch(&cap_reply(10, 301));
        router.dispatch(&cap_reply(10, 300));

        assert_eq!(*calls.lock().unwrap(), [(10, true, 301), (10, false, 300)]);
        assert_eq!(router.transport().take(), [extended(&[CAP_READ, 10])]);
    }

    #[test]
    fn cap_streaming_start_stop() {
        let router = router();
        router.start_cap_touch(3, |_, _, _| {}).unwrap();
        router.start_cap_touch(10, |_, _, _| {}).unwrap();
        router.stop_cap_touch(3).unwrap();

        assert!(!router.is_active(Feature::Cap));
        assert_eq!(
            router.transport().take(),
            [
                extended(&[CAP_ON, 3]),
                extended(&[CAP_ON, 10]),
                extended(&[CAP_OFF, 3]),
            ]
        );
    }

    #[test]
    fn sense_color() {
        let router = router();
        let (calls, sink) = recorder();
        router.sense_color(move |r, g, b| sink.lock().unwrap().push((r, g, b)));

        let mut raw = vec![SENSE_COLOR_REPLY];
        raw.extend(encode_byte(12));
        raw.extend(encode_byte(200));
        raw.extend(encode_byte(130));
        router.dispatch(&raw);

        assert_eq!(*calls.lock().unwrap(), [(12, 200, 130)]);
        assert_eq!(router.transport().take(), [extended(&[SENSE_COLOR])]);
    }

    #[test]
    fn bad_payloads_are_dropped() {
        let router = router();
        let (calls, sink) = recorder();
        let accel_sink = sink.clone();
        router.start_accel(move |_, _, _| accel_sink.lock().unwrap().push("accel"));
        let tap_sink = sink.clone();
        router.start_tap(move |_, _| tap_sink.lock().unwrap().push("tap"));
        router.sense_color(move |_, _, _| sink.lock().unwrap().push("color"));

        router.dispatch(&[]);
        router.dispatch(&[0x7E, 0x01, 0x02]);
        router.dispatch(&accel_reply(1.0, 2.0, 3.0)[..20]);
        router.dispatch(&[TAP_READ_REPLY, 0x10]);
        router.dispatch(&[SENSE_COLOR_REPLY]);

        assert!(calls.lock().unwrap().is_empty());

        // The router keeps working afterwards.
        router.dispatch(&tap_reply(0x20));
        assert_eq!(*calls.lock().unwrap(), ["tap"]);
    }

    #[test]
    fn replies_without_callback_are_dropped() {
        let router = router();
        router.dispatch(&accel_reply(1.0, 2.0, 3.0));
        router.dispatch(&cap_reply(1, 1000));
        assert!(router.transport().take().is_empty());
    }

    #[test]
    fn features_do_not_interfere() {
        let router = router();
        let (accel, accel_sink) = recorder();
        let (cap, cap_sink) = recorder();
        router.start_accel(move |x, _, _| accel_sink.lock().unwrap().push(x));
        router
            .start_cap_touch(1, move |pin, _, _| cap_sink.lock().unwrap().push(pin))
            .unwrap();

        router.dispatch(&cap_reply(1, 5));
        router.stop_accel();
        router.dispatch(&cap_reply(1, 6));
        router.dispatch(&accel_reply(4.0, 0.0, 0.0));

        assert!(accel.lock().unwrap().is_empty());
        assert_eq!(*cap.lock().unwrap(), [1, 1]);
        assert!(router.is_active(Feature::Cap));
    }

    #[test]
    fn callback_may_reregister_itself() {
        let router = Arc::new(router());
        let (calls, sink) = recorder();

        let inner = Arc::downgrade(&router);
        router.read_tap(move |single, _| {
            sink.lock().unwrap().push(single);
            if let Some(router) = inner.upgrade() {
                router.stop_tap();
            }
        });

        router.dispatch(&tap_reply(0x10));
        router.dispatch(&tap_reply(0x10));

        assert_eq!(*calls.lock().unwrap(), [true]);
    }

    #[test]
    fn temperature() {
        let router = router();
        let (calls, sink) = recorder();

        // Readings before start are ignored.
        router.handle_analog(THERMISTOR_CHANNEL, 512);
        assert_eq!(router.read_temperature_raw(), None);

        router.start_temperature(move |celsius, raw| sink.lock().unwrap().push((celsius, raw)));
        assert!(router.is_active(Feature::Temperature));

        router.handle_analog(THERMISTOR_CHANNEL + 1, 100);
        router.handle_analog(THERMISTOR_CHANNEL, 512);

        assert_eq!(router.read_temperature_raw(), Some(512));
        assert!((router.read_temperature().unwrap() - 25.0).abs() < 0.1);
        assert_eq!(calls.lock().unwrap().len(), 1);

        router.stop_temperature();
        router.handle_analog(THERMISTOR_CHANNEL, 600);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(router.read_temperature_raw(), Some(512));

        assert_eq!(
            router.transport().take(),
            [
                Sent::PinMode {
                    pin: ANALOG_PIN_OFFSET + THERMISTOR_CHANNEL,
                    mode: PinMode::Analog
                },
                Sent::ReportAnalog {
                    channel: THERMISTOR_CHANNEL,
                    enabled: true
                },
                Sent::ReportAnalog {
                    channel: THERMISTOR_CHANNEL,
                    enabled: false
                },
            ]
        );
    }

    #[test]
    fn stopping_temperature_keeps_shared_channel_reporting() {
        let router = router();
        router.share_thermistor_channel(true);
        router.start_temperature(|_, _| {});
        router.stop_temperature();

        assert!(!router.is_active(Feature::Temperature));
        assert!(!router
            .transport()
            .take()
            .contains(&Sent::ReportAnalog {
                channel: THERMISTOR_CHANNEL,
                enabled: false
            }));

        router.share_thermistor_channel(false);
        router.start_temperature(|_, _| {});
        router.stop_temperature();
        assert_eq!(
            router.transport().take().last(),
            Some(&Sent::ReportAnalog {
                channel: THERMISTOR_CHANNEL,
                enabled: false
            })
        );
    }
}
