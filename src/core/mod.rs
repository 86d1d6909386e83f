// Core module - Framing, link abstraction, events and sessions
pub mod event;
pub mod framing;
pub mod link;
pub mod session;

pub use event::{LinkEvent, LinkStatus, SessionStatus, StatusEvent, WireDirection, WireEvent};
pub use framing::Framer;
pub use link::Link;
pub use session::{Session, SessionPool};
