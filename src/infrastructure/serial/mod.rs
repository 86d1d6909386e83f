// Serial module - Serial byte-stream link implementation
pub mod link;

pub use link::SerialLink;
