use serde::{Deserialize, Serialize};

/// Sentinel for an unset status id
pub const STATUS_ID_UNSET: i32 = -1;
/// Sentinel for an unset error id
pub const ERROR_ID_UNSET: i32 = 0;

/// Session-level status kinds a subscriber may observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Alarm,
    AboutToDisconnect,
    Connected,
    Data,
    Disconnected,
    DownloadComplete,
    Error,
    Status,
    StatusError,
    WatchdogReconnect,
    WatchdogTimeout,
    ControllerInfo,
}

/// Link-level status kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Working,
    Warning,
    CommError,
    Exception,
}

/// Direction of a payload crossing the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireDirection {
    Outgoing,
    Incoming,
}

/// Asynchronous session notification.
///
/// `kind` is always set; every other field is optional and absence means
/// "not applicable", not zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: SessionStatus,
    pub message: Option<String>,
    pub status_id: i32,
    pub error_id: i32,
    pub payload: Option<Vec<u8>>,
}

/// Link/transport notification with optional progress for long operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub status: LinkStatus,
    pub message: Option<String>,
    pub progress_percentage: Option<u8>,
}

/// Rendered wire traffic record emitted by the framer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    pub direction: WireDirection,
    pub text: String,
}

impl StatusEvent {
    /// Create an event carrying only a kind
    pub fn new(kind: SessionStatus) -> Self {
        Self {
            kind,
            message: None,
            status_id: STATUS_ID_UNSET,
            error_id: ERROR_ID_UNSET,
            payload: None,
        }
    }

    /// Create an event with a message
    pub fn with_message(kind: SessionStatus, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(kind)
        }
    }

    /// Create an event with status/error ids
    pub fn with_ids(kind: SessionStatus, status_id: i32, error_id: i32) -> Self {
        Self {
            status_id,
            error_id,
            ..Self::new(kind)
        }
    }

    /// Create an event with a status id and an opaque payload
    pub fn with_payload(kind: SessionStatus, status_id: i32, payload: Vec<u8>) -> Self {
        Self {
            status_id,
            payload: Some(payload),
            ..Self::new(kind)
        }
    }
}

impl LinkEvent {
    pub fn new(status: LinkStatus) -> Self {
        Self {
            status,
            message: None,
            progress_percentage: None,
        }
    }

    pub fn with_message(status: LinkStatus, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(status)
        }
    }

    pub fn with_progress(status: LinkStatus, message: impl Into<String>, progress: u8) -> Self {
        Self {
            status,
            message: Some(message.into()),
            progress_percentage: Some(progress),
        }
    }
}

impl WireEvent {
    pub fn outgoing(text: impl Into<String>) -> Self {
        Self {
            direction: WireDirection::Outgoing,
            text: text.into(),
        }
    }

    pub fn incoming(text: impl Into<String>) -> Self {
        Self {
            direction: WireDirection::Incoming,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionStatus::Alarm => "Alarm",
            SessionStatus::AboutToDisconnect => "AboutToDisconnect",
            SessionStatus::Connected => "Connected",
            SessionStatus::Data => "Data",
            SessionStatus::Disconnected => "Disconnected",
            SessionStatus::DownloadComplete => "DownloadComplete",
            SessionStatus::Error => "Error",
            SessionStatus::Status => "Status",
            SessionStatus::StatusError => "StatusError",
            SessionStatus::WatchdogReconnect => "WatchdogReconnect",
            SessionStatus::WatchdogTimeout => "WatchdogTimeout",
            SessionStatus::ControllerInfo => "ControllerInfo",
        };
        write!(f, "{}", name)
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkStatus::Connecting => "Connecting",
            LinkStatus::Connected => "Connected",
            LinkStatus::Disconnecting => "Disconnecting",
            LinkStatus::Disconnected => "Disconnected",
            LinkStatus::Working => "Working",
            LinkStatus::Warning => "Warning",
            LinkStatus::CommError => "CommError",
            LinkStatus::Exception => "Exception",
        };
        write!(f, "{}", name)
    }
}
