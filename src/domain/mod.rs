// Domain module - Core domain types
pub mod config;
pub mod error;

pub use config::{CtrlComConfig, LinkSettings, TransmissionMode};
pub use error::{CtrlComError, CtrlComResult};
