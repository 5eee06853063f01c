//! Listener: drains inbound events for one channel and triggers the relay.

use crate::channels::InboundEvent;
use crate::relay::Relay;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Consumes the inbound stream in arrival order and dispatches qualifying
/// events without awaiting relay work. Events without media are dropped
/// silently; the listener never materializes payload bytes itself.
pub struct Listener {
    relay: Relay,
}

impl Listener {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }

    /// Run until the inbound channel closes (connector stopped or lost its
    /// subscription).
    pub async fn run(self, mut inbound_rx: mpsc::Receiver<Arc<dyn InboundEvent>>) {
        while let Some(event) = inbound_rx.recv().await {
            if !event.has_media() {
                continue;
            }
            self.relay.dispatch(event);
        }
        log::info!("listener: inbound stream closed");
    }
}
