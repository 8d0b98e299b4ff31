//! Serial connection to a board running the Circuit Playground Firmata sketch.
//!
//! The port is split into two tasks. The writer drains a channel of encoded
//! packets so that [`Transport`] calls never block, and the reader feeds every
//! inbound byte through a [`FirmataParser`].

use std::{sync::Arc, time::Duration};

use cp_firmata::{
    firmata::{
        FirmataMessage, FirmataParser, PinMode, ReportAnalogPacket, ReportDigitalPacket,
        SetPinModePacket, SysexPacket,
    },
    Encode,
};
use log::{debug, error, trace, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_serial::SerialStream;

use crate::transport::{Dispatchers, Transport};

/// Baud rate of the StandardFirmata sketch.
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Settings used when opening the serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(1),
        }
    }
}

/// The sending half of a serial connection.
///
/// Packets are queued for the writer task. Once the connection is closed
/// every send is logged and dropped.
#[derive(Debug)]
pub struct SerialTransport {
    outgoing: UnboundedSender<Vec<u8>>,
    dispatchers: Arc<Dispatchers>,
}

impl SerialTransport {
    /// Routes inbound sysex messages with the given command byte to `handler`.
    pub fn register_dispatcher(&self, command: u8, handler: impl Fn(&[u8]) + Send + Sync + 'static) {
        self.dispatchers.register(command, handler);
    }

    pub fn unregister_dispatcher(&self, command: u8) {
        self.dispatchers.unregister(command);
    }

    pub fn dispatchers(&self) -> &Arc<Dispatchers> {
        &self.dispatchers
    }

    /// Queues an already framed packet.
    pub fn send(&self, packet: impl Encode) {
        let encoded = packet.encode_to_vec();
        trace!("queueing packet: {:x?}", encoded);

        if self.outgoing.send(encoded).is_err() {
            warn!("Dropping outbound packet, the serial connection is closed.");
        }
    }

    /// Whether the writer task has gone away.
    pub fn is_closed(&self) -> bool {
        self.outgoing.is_closed()
    }
}

impl Transport for SerialTransport {
    fn send_extended_command(&self, command: u8, payload: &[u8]) {
        self.send(SysexPacket::new(command, payload));
    }

    fn set_pin_mode(&self, pin: u8, mode: PinMode) {
        match SetPinModePacket::try_new(pin, mode) {
            Ok(packet) => self.send(packet),
            Err(e) => warn!("Dropping pin mode change: {e}"),
        }
    }

    fn report_analog(&self, channel: u8, enabled: bool) {
        match ReportAnalogPacket::try_new(channel, enabled) {
            Ok(packet) => self.send(packet),
            Err(e) => warn!("Dropping analog report request: {e}"),
        }
    }

    fn report_digital(&self, port: u8, enabled: bool) {
        match ReportDigitalPacket::try_new(port, enabled) {
            Ok(packet) => self.send(packet),
            Err(e) => warn!("Dropping digital report request: {e}"),
        }
    }
}

/// An open serial connection and its background tasks.
#[derive(Debug)]
pub struct SerialConnection {
    transport: Arc<SerialTransport>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SerialConnection {
    /// Opens `port` and starts the reader and writer tasks.
    ///
    /// Every parsed message is passed to `on_message`. Sysex routing through
    /// [`SerialTransport::dispatchers`] is up to the caller.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::SerialportError`] if the port cannot be opened.
    pub fn open(
        port: &str,
        config: &SerialConfig,
        on_message: impl Fn(FirmataMessage) + Send + Sync + 'static,
    ) -> Result<Self, SerialError> {
        debug!("Opening {port} at {} baud.", config.baud_rate);

        let stream = SerialStream::open(
            &tokio_serial::new(port, config.baud_rate)
                .parity(tokio_serial::Parity::None)
                .data_bits(tokio_serial::DataBits::Eight)
                .stop_bits(tokio_serial::StopBits::One)
                .timeout(config.timeout),
        )?;
        let (read_half, write_half) = tokio::io::split(stream);

        let (outgoing, queue) = mpsc::unbounded_channel();
        let dispatchers = Arc::new(Dispatchers::new());

        let writer = tokio::spawn(write_loop(write_half, queue));
        let reader = tokio::spawn(read_loop(read_half, on_message));

        Ok(Self {
            transport: Arc::new(SerialTransport {
                outgoing,
                dispatchers,
            }),
            reader,
            writer,
        })
    }

    pub fn transport(&self) -> &Arc<SerialTransport> {
        &self.transport
    }

    /// Stops both background tasks. Anything still queued is discarded.
    pub fn close(&self) {
        self.reader.abort();
        self.writer.abort();
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_finished() && self.writer.is_finished()
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn write_loop(mut port: WriteHalf<SerialStream>, mut queue: UnboundedReceiver<Vec<u8>>) {
    while let Some(packet) = queue.recv().await {
        trace!("sent packet: {:x?}", packet);

        if let Err(e) = port.write_all(&packet).await {
            error!("Failed to write to serial port: {e}");
            continue;
        }
        if let Err(e) = port.flush().await {
            error!("Failed to flush serial port: {e}");
        }
    }

    debug!("Serial writer stopped.");
}

async fn read_loop(mut port: ReadHalf<SerialStream>, on_message: impl Fn(FirmataMessage)) {
    let mut parser = FirmataParser::new();
    let mut buf = [0u8; 256];

    loop {
        let read = match port.read(&mut buf).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                error!("Failed to read from serial port: {e}");
                break;
            }
        };

        trace!("received bytes: {:x?}", &buf[..read]);

        for &byte in &buf[..read] {
            match parser.feed(byte) {
                Ok(Some(message)) => on_message(message),
                Ok(None) => {}
                Err(e) => warn!("Discarding inbound data: {e}"),
            }
        }
    }

    debug!("Serial reader stopped.");
}

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Serialport Error: {0}")]
    SerialportError(#[from] serialport::Error),

    #[error("The serial connection is closed")]
    Closed,
}
