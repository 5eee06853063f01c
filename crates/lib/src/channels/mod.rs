//! Communication channels (Telegram).
//!
//! Channel connector plus the inbound event contract the relay pipeline
//! consumes. The connector long-polls one channel and forwards matching
//! events to the listener; it never downloads media itself.

mod inbound;
mod telegram;

pub use inbound::{InboundEvent, MediaPayload};
pub use telegram::{ChannelTarget, TelegramChannel};
