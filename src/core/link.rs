use crate::core::event::LinkEvent;
use crate::core::framing::Framer;
use crate::domain::config::LinkSettings;
use crate::domain::error::CtrlComResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Unified byte-stream link abstraction.
///
/// A link owns one byte channel plus the framer converting payloads across
/// it. Implementations push incoming data through the framer while a reader
/// is attached, so callers never busy-wait on the channel.
#[async_trait]
pub trait Link: Send + Sync {
    /// The framer shared with this link's background reader
    fn framer(&self) -> &Arc<Framer>;

    /// Subscribe to link lifecycle events.
    ///
    /// Dropping the receiver cancels the subscription.
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent>;

    /// Open the channel with the given settings.
    ///
    /// An open link is closed first; a validation or OS failure leaves the
    /// link closed.
    async fn open(&self, settings: &LinkSettings) -> CtrlComResult<()>;

    /// Close the channel; idempotent. Any background reader is stopped
    /// before this returns.
    async fn close(&self);

    /// Whether the channel is currently open
    async fn is_open(&self) -> bool;

    /// Write raw bytes; `LinkNotOpen` when closed, `WriteTimeout` when the
    /// write exceeds the fixed timeout.
    async fn write(&self, bytes: &[u8]) -> CtrlComResult<()>;

    /// Return whatever is currently buffered, or empty when nothing is
    /// pending or the link is closed. Never an error for "nothing to read".
    async fn read_available(&self) -> Vec<u8>;

    /// Start the push-based incoming-data reader; no-op when already
    /// attached.
    async fn attach_reader(&self);

    /// Stop the incoming-data reader; no-op when not attached.
    async fn detach_reader(&self);

    /// Frame a payload in the current mode and write it.
    ///
    /// A framing failure skips the write and propagates.
    async fn send_payload(&self, payload: &str) -> CtrlComResult<()> {
        let bytes = self.framer().encode(payload)?;
        self.write(&bytes).await
    }
}
