use crate::core::event::WireEvent;
use crate::domain::config::TransmissionMode;
use crate::domain::error::{CtrlComError, CtrlComResult};
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::broadcast;

const MONITOR_CAPACITY: usize = 256;

const MODE_TEXT: u8 = 0;
const MODE_HEX: u8 = 1;

/// Converts payloads between display form and wire bytes under the current
/// transmission mode, mirroring every conversion onto a monitor channel so
/// subscribers can observe raw traffic without polling.
pub struct Framer {
    mode: AtomicU8,
    monitor: broadcast::Sender<WireEvent>,
}

impl Framer {
    /// Create a framer in Text mode
    pub fn new() -> Self {
        let (monitor, _) = broadcast::channel(MONITOR_CAPACITY);
        Self {
            mode: AtomicU8::new(MODE_TEXT),
            monitor,
        }
    }

    /// Current transmission mode
    pub fn mode(&self) -> TransmissionMode {
        match self.mode.load(Ordering::Relaxed) {
            MODE_HEX => TransmissionMode::Hex,
            _ => TransmissionMode::Text,
        }
    }

    /// Switch the transmission mode.
    ///
    /// Affects only subsequent encodes/decodes, never already-buffered data.
    pub fn set_mode(&self, mode: TransmissionMode) {
        let raw = match mode {
            TransmissionMode::Text => MODE_TEXT,
            TransmissionMode::Hex => MODE_HEX,
        };
        self.mode.store(raw, Ordering::Relaxed);
    }

    /// Subscribe to the wire traffic monitor.
    ///
    /// Dropping the receiver cancels the subscription.
    pub fn monitor(&self) -> broadcast::Receiver<WireEvent> {
        self.monitor.subscribe()
    }

    /// Convert an outbound payload into wire bytes.
    ///
    /// Text mode appends a line terminator; Hex mode strips whitespace and
    /// decodes 2-digit groups, failing with `MalformedHexInput` on an odd
    /// digit count or a non-hex character. The write is the caller's job;
    /// a successful encode always emits an Outgoing record.
    pub fn encode(&self, payload: &str) -> CtrlComResult<Vec<u8>> {
        match self.mode() {
            TransmissionMode::Text => {
                let text = format!("{}\n", payload);
                let bytes = text.as_bytes().to_vec();
                self.emit(WireEvent::outgoing(text));
                Ok(bytes)
            }
            TransmissionMode::Hex => {
                let stripped: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = hex::decode(&stripped)
                    .map_err(|e| CtrlComError::MalformedHexInput(e.to_string()))?;
                self.emit(WireEvent::outgoing(render_hex(&bytes)));
                Ok(bytes)
            }
        }
    }

    /// Convert inbound wire bytes into display form.
    ///
    /// Text mode passes the bytes through unchanged; Hex mode renders each
    /// byte as two uppercase hex digits followed by a padding space, a form
    /// `encode` accepts back unchanged. Emits an Incoming record.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let text = match self.mode() {
            TransmissionMode::Text => String::from_utf8_lossy(bytes).into_owned(),
            TransmissionMode::Hex => render_hex(bytes),
        };
        self.emit(WireEvent::incoming(text.clone()));
        text
    }

    fn emit(&self, event: WireEvent) {
        // No subscribers is fine
        let _ = self.monitor.send(event);
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

fn render_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        out.push_str(&format!("{:02X} ", byte));
    }
    out
}
