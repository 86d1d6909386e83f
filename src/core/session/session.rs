use crate::core::event::{SessionStatus, StatusEvent, WireDirection};
use crate::core::link::Link;
use crate::domain::config::{LinkSettings, TransmissionMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Controller metadata reported by the remote device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerInfo {
    pub part_number: String,
    pub firmware_version: String,
    pub boot_revision: String,
}

/// One logical connection to a remote controller, layered on one byte-stream
/// link.
///
/// Lifecycle runs Disconnected -> Connected -> Disconnected, with an
/// orthogonal watchdog flag: once the controller misses its liveness signal
/// the session reads disconnected until it is removed from the pool and
/// recreated. A stale controller is not trusted again without a fresh
/// connection attempt.
pub struct Session {
    /// Remote controller address, immutable after creation
    remote_address: String,
    link: Arc<dyn Link>,
    settings: RwLock<LinkSettings>,
    info: RwLock<ControllerInfo>,
    allow_download: AtomicBool,
    download_filename_tokens: RwLock<(String, String)>,
    connected: AtomicBool,
    watchdog_timed_out: AtomicBool,
    events: broadcast::Sender<StatusEvent>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a new session bound to the given remote address and link
    pub fn new(remote_address: impl Into<String>, link: Arc<dyn Link>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote_address: remote_address.into(),
            link,
            settings: RwLock::new(LinkSettings::default()),
            info: RwLock::new(ControllerInfo::default()),
            allow_download: AtomicBool::new(false),
            download_filename_tokens: RwLock::new((String::new(), String::new())),
            connected: AtomicBool::new(false),
            watchdog_timed_out: AtomicBool::new(false),
            events,
            forwarder: Mutex::new(None),
        }
    }

    /// Remote controller address
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// Subscribe to this session's status events.
    ///
    /// Events from one session arrive in the order they were raised;
    /// dropping the receiver cancels the subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Replace the link settings used by the next `connect`
    pub async fn configure_link(&self, settings: LinkSettings) {
        *self.settings.write().await = settings;
    }

    /// Link settings the next `connect` will use
    pub async fn link_settings(&self) -> LinkSettings {
        self.settings.read().await.clone()
    }

    /// Switch the framing mode for subsequent writes/reads
    pub fn set_transmission_mode(&self, mode: TransmissionMode) {
        self.link.framer().set_mode(mode);
    }

    /// Current framing mode
    pub fn transmission_mode(&self) -> TransmissionMode {
        self.link.framer().mode()
    }

    /// True only while the link is up and the watchdog has not fired
    pub fn is_connected(&self) -> bool {
        !self.watchdog_timed_out.load(Ordering::SeqCst) && self.connected.load(Ordering::SeqCst)
    }

    /// Whether the sticky watchdog flag has been set
    pub fn watchdog_timed_out(&self) -> bool {
        self.watchdog_timed_out.load(Ordering::SeqCst)
    }

    /// Attempt to establish the connection.
    ///
    /// On success raises `Connected` and starts pushing incoming data as
    /// `Data` events. On failure the partial link state is torn down, the
    /// session stays Disconnected and an `Error` event carries the cause;
    /// nothing is returned to the caller either way.
    pub async fn connect(&self) {
        let settings = self.settings.read().await.clone();
        match self.link.open(&settings).await {
            Ok(()) => {
                self.link.attach_reader().await;
                self.start_forwarder().await;
                info!("Connected to controller at {}", self.remote_address);
                self.raise(StatusEvent::new(SessionStatus::Connected));
            }
            Err(e) => {
                warn!(
                    "Connection attempt to {} failed: {}",
                    self.remote_address, e
                );
                self.link.close().await;
                self.connected.store(false, Ordering::SeqCst);
                self.raise(StatusEvent::with_message(SessionStatus::Error, e.to_string()));
            }
        }
    }

    /// Send a command line, best-effort.
    ///
    /// No-op when not connected. Framing and link errors are reported as
    /// `Error` events and logged, never returned.
    pub async fn send(&self, command: &str, append_terminator: bool) {
        if !self.is_connected() {
            return;
        }

        let line = if append_terminator {
            format!("{}\r", command)
        } else {
            command.to_string()
        };

        if let Err(e) = self.link.send_payload(&line).await {
            warn!("Send to {} failed: {}", self.remote_address, e);
            self.raise(StatusEvent::with_message(SessionStatus::Error, e.to_string()));
        } else {
            debug!("Sent command to {}", self.remote_address);
        }
    }

    /// Return whatever the link has buffered, decoded in the current mode.
    ///
    /// Empty string when not connected or nothing has arrived. Intended for
    /// the download workflow; routine consumers use `Data` events.
    pub async fn read(&self) -> String {
        if !self.is_connected() {
            return String::new();
        }
        let bytes = self.link.read_available().await;
        if bytes.is_empty() {
            return String::new();
        }
        self.link.framer().decode(&bytes)
    }

    /// Mark the controller as having missed its liveness signal.
    ///
    /// The flag is sticky: `is_connected` reads false from here on until the
    /// session is recreated. Raised as `WatchdogTimeout` exactly once per
    /// occurrence.
    pub fn signal_watchdog_timeout(&self) {
        if self
            .watchdog_timed_out
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            warn!("Watchdog timeout on controller at {}", self.remote_address);
            self.raise(StatusEvent::new(SessionStatus::WatchdogTimeout));
        }
    }

    /// Pass-through notification for the download collaborator; connection
    /// state is untouched.
    pub fn signal_download_complete(&self) {
        self.raise(StatusEvent::new(SessionStatus::DownloadComplete));
    }

    /// Store controller metadata and raise `ControllerInfo`
    pub async fn update_controller_info(&self, info: ControllerInfo) {
        *self.info.write().await = info;
        self.raise(StatusEvent::new(SessionStatus::ControllerInfo));
    }

    /// Last reported controller metadata
    pub async fn controller_info(&self) -> ControllerInfo {
        self.info.read().await.clone()
    }

    pub fn allow_download(&self) -> bool {
        self.allow_download.load(Ordering::SeqCst)
    }

    pub fn set_allow_download(&self, allow: bool) {
        self.allow_download.store(allow, Ordering::SeqCst);
    }

    /// Opaque filename tokens used by the download collaborator
    pub async fn download_filename_tokens(&self) -> (String, String) {
        self.download_filename_tokens.read().await.clone()
    }

    pub async fn set_download_filename_tokens(
        &self,
        first: impl Into<String>,
        second: impl Into<String>,
    ) {
        *self.download_filename_tokens.write().await = (first.into(), second.into());
    }

    /// Close the connection, raising `AboutToDisconnect`/`Disconnected`
    /// around the teardown when one was up
    pub async fn disconnect(&self) {
        let was_connected = self.connected.load(Ordering::SeqCst);
        if was_connected {
            self.raise(StatusEvent::new(SessionStatus::AboutToDisconnect));
        }

        self.stop_forwarder().await;
        self.link.detach_reader().await;
        self.link.close().await;

        if was_connected {
            self.raise(StatusEvent::new(SessionStatus::Disconnected));
        } else {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    /// Release everything the session holds: background tasks, link, flags.
    /// Idempotent, safe to call multiple times.
    pub async fn dispose(&self) {
        self.stop_forwarder().await;
        self.link.detach_reader().await;
        self.link.close().await;
        self.connected.store(false, Ordering::SeqCst);
    }

    // Private methods

    /// Deliver an event to subscribers, tracking the connection flag the
    /// same way the status transitions drive it
    fn raise(&self, event: StatusEvent) {
        match event.kind {
            SessionStatus::Connected => self.connected.store(true, Ordering::SeqCst),
            SessionStatus::Disconnected => self.connected.store(false, Ordering::SeqCst),
            _ => {}
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn start_forwarder(&self) {
        let mut forwarder = self.forwarder.lock().await;
        if forwarder.is_some() {
            return;
        }

        let mut monitor = self.link.framer().monitor();
        let events = self.events.clone();

        *forwarder = Some(tokio::spawn(async move {
            loop {
                match monitor.recv().await {
                    Ok(record) if record.direction == WireDirection::Incoming => {
                        let _ = events
                            .send(StatusEvent::with_message(SessionStatus::Data, record.text));
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Incoming-data forwarder lagged, skipped {}", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    async fn stop_forwarder(&self) {
        if let Some(handle) = self.forwarder.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::testing::MemoryLink;

    fn make_session(link: Arc<MemoryLink>) -> Session {
        Session::new("192.168.100.42", link as Arc<dyn Link>)
    }

    async fn drain_until(
        receiver: &mut broadcast::Receiver<StatusEvent>,
        kind: SessionStatus,
    ) -> StatusEvent {
        loop {
            let event = tokio::time::timeout(std::time::Duration::from_secs(1), receiver.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event channel closed");
            if event.kind == kind {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_connect_raises_connected_and_attaches_reader() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        let mut events = session.subscribe();

        session.connect().await;

        assert!(session.is_connected());
        assert!(link.reader_attached());
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, SessionStatus::Connected);
    }

    #[tokio::test]
    async fn test_failed_connect_stays_disconnected_and_reports() {
        let link = MemoryLink::failing();
        let session = make_session(Arc::clone(&link));
        let mut events = session.subscribe();

        session.connect().await;

        assert!(!session.is_connected());
        assert!(!link.is_open().await);
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, SessionStatus::Error);
        assert!(event.message.is_some());
    }

    #[tokio::test]
    async fn test_send_is_noop_when_disconnected() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));

        session.send("STATUS?", true).await;

        assert!(link.written().is_empty());
    }

    #[tokio::test]
    async fn test_send_appends_terminator() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;

        session.send("STATUS?", true).await;

        // "\r" from the session, "\n" from the text framer
        assert_eq!(link.written(), vec![b"STATUS?\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_send_without_terminator() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;

        session.send("RAW", false).await;

        assert_eq!(link.written(), vec![b"RAW\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_malformed_hex_send_skips_write_and_reports() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;
        session.set_transmission_mode(TransmissionMode::Hex);
        let mut events = session.subscribe();

        session.send("1A 2", false).await;

        assert!(link.written().is_empty());
        let event = drain_until(&mut events, SessionStatus::Error).await;
        assert!(event.message.unwrap().contains("hex"));
    }

    #[tokio::test]
    async fn test_hex_send_writes_decoded_bytes() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;
        session.set_transmission_mode(TransmissionMode::Hex);

        session.send("1A 2B", false).await;

        assert_eq!(link.written(), vec![vec![0x1A, 0x2B]]);
    }

    #[tokio::test]
    async fn test_read_empty_when_disconnected() {
        let link = MemoryLink::new();
        link.push_incoming(b"ignored");
        let session = make_session(Arc::clone(&link));

        assert_eq!(session.read().await, "");
    }

    #[tokio::test]
    async fn test_read_returns_buffered_data() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;

        link.push_incoming(b"READY\r\n");
        assert_eq!(session.read().await, "READY\r\n");
        assert_eq!(session.read().await, "");
    }

    #[tokio::test]
    async fn test_watchdog_timeout_is_sticky() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;
        assert!(session.is_connected());

        let mut events = session.subscribe();
        session.signal_watchdog_timeout();

        assert!(!session.is_connected());
        assert!(session.watchdog_timed_out());
        // Underlying link still open, connection still reads false
        assert!(link.is_open().await);

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, SessionStatus::WatchdogTimeout);
    }

    #[tokio::test]
    async fn test_watchdog_timeout_reported_once() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        let mut events = session.subscribe();

        session.signal_watchdog_timeout();
        session.signal_watchdog_timeout();

        assert_eq!(events.recv().await.unwrap().kind, SessionStatus::WatchdogTimeout);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_download_complete_passthrough() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;
        let mut events = session.subscribe();

        session.signal_download_complete();

        assert_eq!(
            events.recv().await.unwrap().kind,
            SessionStatus::DownloadComplete
        );
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_controller_info_update_raises_event() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        let mut events = session.subscribe();

        session
            .update_controller_info(ControllerInfo {
                part_number: "PN-1001".to_string(),
                firmware_version: "2.4.0".to_string(),
                boot_revision: "B7".to_string(),
            })
            .await;

        assert_eq!(
            events.recv().await.unwrap().kind,
            SessionStatus::ControllerInfo
        );
        let info = session.controller_info().await;
        assert_eq!(info.part_number, "PN-1001");
        assert_eq!(info.firmware_version, "2.4.0");
    }

    #[tokio::test]
    async fn test_disconnect_event_sequence() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;
        let mut events = session.subscribe();

        session.disconnect().await;

        assert_eq!(
            events.recv().await.unwrap().kind,
            SessionStatus::AboutToDisconnect
        );
        assert_eq!(events.recv().await.unwrap().kind, SessionStatus::Disconnected);
        assert!(!session.is_connected());
        assert!(!link.is_open().await);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;

        session.dispose().await;
        session.dispose().await;

        assert!(!session.is_connected());
        assert!(!link.is_open().await);
    }

    #[tokio::test]
    async fn test_download_metadata_accessors() {
        let link = MemoryLink::new();
        let session = make_session(link);

        assert!(!session.allow_download());
        session.set_allow_download(true);
        assert!(session.allow_download());

        session
            .set_download_filename_tokens("os_part1.bin", "os_part2.bin")
            .await;
        let (first, second) = session.download_filename_tokens().await;
        assert_eq!(first, "os_part1.bin");
        assert_eq!(second, "os_part2.bin");
    }

    #[tokio::test]
    async fn test_reconnect_after_watchdog_requires_new_session() {
        let link = MemoryLink::new();
        let session = make_session(Arc::clone(&link));
        session.connect().await;
        session.signal_watchdog_timeout();

        // Even a fresh successful connect cannot clear the sticky flag
        session.connect().await;
        assert!(!session.is_connected());

        let fresh = Session::new(session.remote_address(), link as Arc<dyn Link>);
        fresh.connect().await;
        assert!(fresh.is_connected());
    }
}
