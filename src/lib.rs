//! CtrlCom Library
//!
//! Connection and session management for remote hardware controllers:
//! a pool of named sessions over framed serial byte-stream links, with
//! asynchronous status-event notification.

pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::event::{
    LinkEvent, LinkStatus, SessionStatus, StatusEvent, WireDirection, WireEvent,
};
pub use crate::core::framing::Framer;
pub use crate::core::link::Link;
pub use crate::core::session::{ControllerInfo, Session, SessionPool, DEFAULT_REMOTE_ADDRESS};
pub use crate::domain::config::{CtrlComConfig, LinkSettings, TransmissionMode};
pub use crate::domain::error::{CtrlComError, CtrlComResult};
pub use crate::infrastructure::serial::SerialLink;
