// Session module - Session and pool management
pub mod pool;
pub mod session;

pub use pool::{SessionPool, DEFAULT_REMOTE_ADDRESS};
pub use session::{ControllerInfo, Session};
