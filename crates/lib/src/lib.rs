//! imgrelay core library — Telegram channel connector, relay pipeline, and
//! upload endpoint client used by the CLI.

pub mod channels;
pub mod config;
pub mod error;
pub mod listener;
pub mod relay;
pub mod uploader;
