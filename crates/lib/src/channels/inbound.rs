//! Inbound event contract: what the relay pipeline needs from a stream client.

use crate::error::DownloadError;
use async_trait::async_trait;

/// One media payload, materialized on demand for a single relay attempt and
/// discarded afterwards.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// A message delivered by the stream client, scoped to the subscribed channel.
///
/// The id is unique within the channel. `fetch_media` may block on network
/// I/O, so callers must invoke it from a relay task, never from the delivery
/// loop.
#[async_trait]
pub trait InboundEvent: Send + Sync {
    /// Message id, unique within the channel.
    fn id(&self) -> i64;

    /// True when the event carries a relayable attachment.
    fn has_media(&self) -> bool;

    /// Materialize the attachment bytes.
    async fn fetch_media(&self) -> Result<MediaPayload, DownloadError>;
}
