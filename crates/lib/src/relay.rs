//! Relay: one qualifying event in, one recorded outcome out, on its own task.

use crate::channels::InboundEvent;
use crate::uploader::Uploader;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Outcome of one relay attempt. Produced exactly once per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { reference: String },
    Failure { reason: String },
}

/// Observability boundary: receives one outcome per completed relay task.
/// Errors from `record` are logged and swallowed, never escalated.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, event_id: i64, outcome: &UploadOutcome) -> Result<(), String>;
}

/// Default sink: one log line per outcome.
pub struct LogSink;

impl OutcomeSink for LogSink {
    fn record(&self, event_id: i64, outcome: &UploadOutcome) -> Result<(), String> {
        match outcome {
            UploadOutcome::Success { reference } => {
                log::info!("relayed message {}: {}", event_id, reference);
            }
            UploadOutcome::Failure { reason } => {
                log::warn!("relay of message {} failed: {}", event_id, reason);
            }
        }
        Ok(())
    }
}

/// Dispatches each qualifying event to an isolated upload task. Tasks share
/// no mutable state; the uploader and sink are read-only handles.
pub struct Relay {
    uploader: Arc<Uploader>,
    sink: Arc<dyn OutcomeSink>,
}

impl Relay {
    pub fn new(uploader: Arc<Uploader>, sink: Arc<dyn OutcomeSink>) -> Self {
        Self { uploader, sink }
    }

    /// Fire-and-forget: spawn one task for the event. The caller never awaits
    /// the handle; every error path inside the task resolves to a `Failure`
    /// outcome, so nothing propagates back into the delivery loop.
    pub fn dispatch(&self, event: Arc<dyn InboundEvent>) -> JoinHandle<()> {
        let uploader = self.uploader.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let outcome = run_relay(event.as_ref(), &uploader).await;
            if let Err(e) = sink.record(event.id(), &outcome) {
                log::warn!(
                    "outcome sink rejected record for message {}: {}",
                    event.id(),
                    e
                );
            }
        })
    }
}

/// Download then upload. Every path terminates in exactly one outcome; a
/// download failure skips the upload entirely.
async fn run_relay(event: &dyn InboundEvent, uploader: &Uploader) -> UploadOutcome {
    let payload = match event.fetch_media().await {
        Ok(p) => p,
        Err(e) => {
            log::warn!("media download for message {} failed: {}", event.id(), e);
            return UploadOutcome::Failure {
                reason: "download failed".to_string(),
            };
        }
    };
    log::info!(
        "downloaded {} bytes for message {}, uploading",
        payload.bytes.len(),
        event.id()
    );
    match uploader.upload(&payload).await {
        Ok(reference) => UploadOutcome::Success { reference },
        Err(e) => UploadOutcome::Failure {
            reason: e.to_string(),
        },
    }
}
