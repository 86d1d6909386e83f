use crate::core::event::{LinkEvent, LinkStatus};
use crate::core::framing::Framer;
use crate::core::link::Link;
use crate::domain::config::{
    DataBits, LinkSettings, Parity, StopBits, READ_TIMEOUT, WRITE_TIMEOUT,
};
use crate::domain::error::{CtrlComError, CtrlComResult};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const RX_BUFFER_SIZE: usize = 1024;
const EVENT_CAPACITY: usize = 64;

// serialport applies one timeout to both directions; the fixed read and
// write timeouts are equal, so a single setting covers the contract.
const _: () = assert!(READ_TIMEOUT.as_millis() == WRITE_TIMEOUT.as_millis());

/// Byte-stream link over an OS serial port.
///
/// `None` in the port slot is the Closed state. While a reader is attached,
/// a background task polls the port and pushes arriving bytes through the
/// framer, so subscribers see incoming traffic without polling themselves.
pub struct SerialLink {
    port: Arc<Mutex<Option<Box<dyn SerialPort>>>>,
    framer: Arc<Framer>,
    events: broadcast::Sender<LinkEvent>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SerialLink {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            port: Arc::new(Mutex::new(None)),
            framer: Arc::new(Framer::new()),
            events,
            reader: Mutex::new(None),
        }
    }

    fn emit(&self, event: LinkEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Link for SerialLink {
    fn framer(&self) -> &Arc<Framer> {
        &self.framer
    }

    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    async fn open(&self, settings: &LinkSettings) -> CtrlComResult<()> {
        let mut guard = self.port.lock().await;

        // Re-open closes the previous port before anything else, so a
        // validation failure below still leaves the link closed
        if guard.take().is_some() {
            self.emit(LinkEvent::new(LinkStatus::Disconnected));
            debug!("Closed previously open port before re-open");
        }

        let validated = settings.validate()?;
        self.emit(LinkEvent::with_message(
            LinkStatus::Connecting,
            validated.port_name.clone(),
        ));

        let builder = serialport::new(validated.port_name.clone(), validated.baud_rate)
            .data_bits(map_data_bits(validated.data_bits))
            .stop_bits(map_stop_bits(validated.stop_bits))
            .parity(map_parity(validated.parity))
            .timeout(READ_TIMEOUT);

        match builder.open() {
            Ok(port) => {
                *guard = Some(port);
                info!(
                    "Opened serial port '{}' at {} baud",
                    validated.port_name, validated.baud_rate
                );
                self.emit(LinkEvent::new(LinkStatus::Connected));
                Ok(())
            }
            Err(e) => {
                *guard = None;
                self.emit(LinkEvent::with_message(LinkStatus::CommError, e.to_string()));
                Err(CtrlComError::LinkOpenFailed(e.to_string()))
            }
        }
    }

    async fn close(&self) {
        // The reader must not outlive the port
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }

        let mut guard = self.port.lock().await;
        if guard.take().is_some() {
            self.emit(LinkEvent::new(LinkStatus::Disconnecting));
            self.emit(LinkEvent::new(LinkStatus::Disconnected));
            info!("Serial link closed");
        }
    }

    async fn is_open(&self) -> bool {
        self.port.lock().await.is_some()
    }

    async fn write(&self, bytes: &[u8]) -> CtrlComResult<()> {
        let mut guard = self.port.lock().await;
        let port = guard.as_mut().ok_or(CtrlComError::LinkNotOpen)?;

        match port.write_all(bytes) {
            Ok(()) => {
                debug!("Wrote {} bytes to serial port", bytes.len());
                Ok(())
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                self.emit(LinkEvent::with_message(
                    LinkStatus::CommError,
                    "write timed out",
                ));
                Err(CtrlComError::WriteTimeout)
            }
            Err(e) => {
                self.emit(LinkEvent::with_message(LinkStatus::CommError, e.to_string()));
                Err(CtrlComError::Io(e))
            }
        }
    }

    async fn read_available(&self) -> Vec<u8> {
        let mut guard = self.port.lock().await;
        let Some(port) = guard.as_mut() else {
            return Vec::new();
        };

        let pending = match port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                warn!("Failed to poll serial port: {}", e);
                return Vec::new();
            }
        };
        if pending == 0 {
            return Vec::new();
        }

        let mut buffer = vec![0u8; pending];
        match port.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                debug!("Read {} buffered bytes from serial port", n);
                buffer
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Vec::new(),
            Err(e) => {
                warn!("Failed to read from serial port: {}", e);
                Vec::new()
            }
        }
    }

    async fn attach_reader(&self) {
        let mut reader = self.reader.lock().await;
        if reader.is_some() {
            return;
        }

        let port = Arc::clone(&self.port);
        let framer = Arc::clone(&self.framer);
        let events = self.events.clone();

        *reader = Some(tokio::spawn(async move {
            let mut buffer = vec![0u8; RX_BUFFER_SIZE];
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;

                let mut guard = port.lock().await;
                let Some(p) = guard.as_mut() else {
                    break;
                };

                let pending = match p.bytes_to_read() {
                    Ok(0) => continue,
                    Ok(n) => (n as usize).min(RX_BUFFER_SIZE),
                    Err(e) => {
                        error!("Failed to poll serial port: {}", e);
                        let _ = events
                            .send(LinkEvent::with_message(LinkStatus::CommError, e.to_string()));
                        break;
                    }
                };

                match p.read(&mut buffer[..pending]) {
                    Ok(0) => continue,
                    Ok(n) => {
                        debug!("Received {} bytes over serial", n);
                        // decode emits the Incoming record for subscribers
                        framer.decode(&buffer[..n]);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                    Err(e) => {
                        error!("Failed to read from serial port: {}", e);
                        let _ = events
                            .send(LinkEvent::with_message(LinkStatus::CommError, e.to_string()));
                        break;
                    }
                }
            }
        }));
    }

    async fn detach_reader(&self) {
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
    }
}

fn map_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn map_stop_bits(stop_bits: StopBits) -> serialport::StopBits {
    match stop_bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

fn map_data_bits(data_bits: DataBits) -> serialport::DataBits {
    match data_bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}
