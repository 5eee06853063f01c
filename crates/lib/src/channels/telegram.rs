//! Telegram channel: long-poll getUpdates for one chat and expose media download.

use crate::channels::inbound::{InboundEvent, MediaPayload};
use crate::error::DownloadError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const LONG_POLL_TIMEOUT: u64 = 30;
const POLL_RETRY_DELAY_SECS: u64 = 2;
// Past this many getUpdates failures in a row the subscription is treated as
// lost and the loop stops, closing the inbound channel.
const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 10;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
    #[serde(default)]
    pub channel_post: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub document: Option<TelegramDocument>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TelegramDocument {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetFileResponse {
    ok: bool,
    #[serde(default)]
    result: Option<TelegramFile>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    #[serde(default)]
    file_path: Option<String>,
}

/// The chat to watch: numeric id or @username, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTarget {
    Id(i64),
    Username(String),
}

impl ChannelTarget {
    /// Parse "-1001234" as an id, "@name" or "name" as a username.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("channel identifier is empty".to_string());
        }
        if let Ok(id) = s.parse::<i64>() {
            return Ok(ChannelTarget::Id(id));
        }
        Ok(ChannelTarget::Username(
            s.trim_start_matches('@').to_lowercase(),
        ))
    }

    fn matches(&self, chat: &TelegramChat) -> bool {
        match self {
            ChannelTarget::Id(id) => chat.id == *id,
            ChannelTarget::Username(name) => chat
                .username
                .as_deref()
                .map(|u| u.eq_ignore_ascii_case(name))
                .unwrap_or(false),
        }
    }
}

/// Telegram connector: long-polls getUpdates and forwards events for one chat.
/// Owned by the delivery loop; relay tasks only call `download_file` through
/// the events they hold.
pub struct TelegramChannel {
    token: String,
    api_base: String,
    target: ChannelTarget,
    poll_retry_delay: Duration,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: String, api_base: String, target: ChannelTarget) -> Self {
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            target,
            poll_retry_delay: Duration::from_secs(POLL_RETRY_DELAY_SECS),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    /// Override the delay between failed polls (for tests or flaky networks).
    pub fn with_poll_retry_delay(mut self, delay: Duration) -> Self {
        self.poll_retry_delay = delay;
        self
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the long-poll loop after the current poll returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Start the getUpdates long-poll loop and forward matching-chat events.
    /// Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<Arc<dyn InboundEvent>>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), String> {
        let url = format!(
            "{}/bot{}/getUpdates?timeout={}",
            self.api_base, self.token, LONG_POLL_TIMEOUT
        );
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("getUpdates failed: {} {}", status, body));
        }
        let data: GetUpdatesResponse = res.json().await.map_err(|e| e.to_string())?;
        if !data.ok {
            return Err("getUpdates returned ok: false".to_string());
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    /// Resolve a file_id via getFile, then download the file bytes.
    pub(crate) async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, DownloadError> {
        let url = format!(
            "{}/bot{}/getFile?file_id={}",
            self.api_base, self.token, file_id
        );
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(DownloadError::Api(format!(
                "getFile failed: {}",
                res.status()
            )));
        }
        let data: GetFileResponse = res.json().await?;
        if !data.ok {
            return Err(DownloadError::Api("getFile returned ok: false".to_string()));
        }
        let file_path = data
            .result
            .and_then(|f| f.file_path)
            .ok_or_else(|| DownloadError::Api("getFile returned no file_path".to_string()))?;
        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, file_path);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(DownloadError::Api(format!(
                "file download failed: {}",
                res.status()
            )));
        }
        Ok(res.bytes().await?.to_vec())
    }
}

/// Attachment reference carried by an event until a relay task materializes it.
#[derive(Debug, Clone)]
struct MediaRef {
    file_id: String,
    content_type: String,
    file_name: String,
}

/// One message from the watched chat, exposing on-demand media download.
pub struct TelegramEvent {
    channel: Arc<TelegramChannel>,
    id: i64,
    media: Option<MediaRef>,
}

impl TelegramEvent {
    fn from_message(channel: Arc<TelegramChannel>, msg: &TelegramMessage) -> Self {
        // Photo sizes come smallest-first; relay the largest variant.
        let media = if let Some(photo) = msg.photo.last() {
            Some(MediaRef {
                file_id: photo.file_id.clone(),
                content_type: "image/jpeg".to_string(),
                file_name: format!("tg_{}.jpg", msg.message_id),
            })
        } else {
            msg.document.as_ref().map(|doc| MediaRef {
                file_id: doc.file_id.clone(),
                content_type: doc
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                file_name: doc
                    .file_name
                    .clone()
                    .unwrap_or_else(|| format!("tg_{}.bin", msg.message_id)),
            })
        };
        Self {
            channel,
            id: msg.message_id,
            media,
        }
    }
}

#[async_trait]
impl InboundEvent for TelegramEvent {
    fn id(&self) -> i64 {
        self.id
    }

    fn has_media(&self) -> bool {
        self.media.is_some()
    }

    async fn fetch_media(&self) -> Result<MediaPayload, DownloadError> {
        let media = self.media.as_ref().ok_or(DownloadError::NoMedia)?;
        let bytes = self.channel.download_file(&media.file_id).await?;
        Ok(MediaPayload {
            bytes,
            content_type: media.content_type.clone(),
            file_name: media.file_name.clone(),
        })
    }
}

async fn run_get_updates_loop(
    channel: Arc<TelegramChannel>,
    inbound_tx: mpsc::Sender<Arc<dyn InboundEvent>>,
) {
    let mut offset: Option<i64> = None;
    let mut consecutive_failures: u32 = 0;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                consecutive_failures = 0;
                offset = next;
                for u in updates {
                    let msg = match u.message.as_ref().or(u.channel_post.as_ref()) {
                        Some(m) => m,
                        None => continue,
                    };
                    if !channel.target.matches(&msg.chat) {
                        continue;
                    }
                    let event: Arc<dyn InboundEvent> =
                        Arc::new(TelegramEvent::from_message(channel.clone(), msg));
                    if inbound_tx.send(event).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_POLL_FAILURES {
                    log::error!(
                        "telegram getUpdates failed {} times in a row, giving up: {}",
                        consecutive_failures,
                        e
                    );
                    return;
                }
                log::warn!("telegram getUpdates error: {}", e);
                tokio::time::sleep(channel.poll_retry_delay).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_channel(target: ChannelTarget) -> Arc<TelegramChannel> {
        Arc::new(TelegramChannel::new(
            "token".to_string(),
            "http://127.0.0.1:1".to_string(),
            target,
        ))
    }

    #[test]
    fn parse_numeric_channel_id() {
        assert_eq!(
            ChannelTarget::parse("-1001234567").unwrap(),
            ChannelTarget::Id(-1001234567)
        );
    }

    #[test]
    fn parse_username_strips_at_prefix() {
        assert_eq!(
            ChannelTarget::parse("@MyChannel").unwrap(),
            ChannelTarget::Username("mychannel".to_string())
        );
    }

    #[test]
    fn empty_channel_is_rejected() {
        assert!(ChannelTarget::parse("  ").is_err());
    }

    #[test]
    fn username_match_is_case_insensitive() {
        let target = ChannelTarget::parse("mychannel").unwrap();
        let chat = TelegramChat {
            id: 7,
            username: Some("MyChannel".to_string()),
        };
        assert!(target.matches(&chat));
        assert!(!ChannelTarget::Id(8).matches(&chat));
    }

    #[test]
    fn photo_message_picks_largest_size() {
        let msg: TelegramMessage = serde_json::from_value(json!({
            "message_id": 42,
            "chat": { "id": -100, "username": "c" },
            "photo": [
                { "file_id": "small" },
                { "file_id": "large" }
            ]
        }))
        .expect("decode message");
        let event = TelegramEvent::from_message(test_channel(ChannelTarget::Id(-100)), &msg);
        assert!(event.has_media());
        let media = event.media.as_ref().unwrap();
        assert_eq!(media.file_id, "large");
        assert_eq!(media.content_type, "image/jpeg");
        assert_eq!(media.file_name, "tg_42.jpg");
    }

    #[test]
    fn document_message_keeps_declared_mime_and_name() {
        let msg: TelegramMessage = serde_json::from_value(json!({
            "message_id": 7,
            "chat": { "id": -100 },
            "document": { "file_id": "doc1", "file_name": "scan.png", "mime_type": "image/png" }
        }))
        .expect("decode message");
        let event = TelegramEvent::from_message(test_channel(ChannelTarget::Id(-100)), &msg);
        let media = event.media.as_ref().unwrap();
        assert_eq!(media.content_type, "image/png");
        assert_eq!(media.file_name, "scan.png");
    }

    #[test]
    fn text_message_has_no_media() {
        let msg: TelegramMessage = serde_json::from_value(json!({
            "message_id": 9,
            "chat": { "id": -100 }
        }))
        .expect("decode message");
        let event = TelegramEvent::from_message(test_channel(ChannelTarget::Id(-100)), &msg);
        assert!(!event.has_media());
    }

    #[test]
    fn channel_post_updates_are_decoded() {
        let u: TelegramUpdate = serde_json::from_value(json!({
            "update_id": 1,
            "channel_post": { "message_id": 5, "chat": { "id": -1 } }
        }))
        .expect("decode update");
        assert!(u.channel_post.is_some());
        assert!(u.message.is_none());
    }
}
