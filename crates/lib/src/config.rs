//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.imgrelay/config.json`) and environment.
//! Credentials resolve env-first (`TELEGRAM_BOT_TOKEN`, `IMGRELAY_CHANNEL`, `UPLOAD_URL`,
//! `UPLOAD_TOKEN`), falling back to the config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Telegram connector settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Upload endpoint settings.
    #[serde(default)]
    pub uploader: UploaderConfig,
}

/// Telegram connector config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,

    /// Channel to watch: numeric chat id (e.g. "-1001234") or "@name".
    /// Overridden by IMGRELAY_CHANNEL env when set.
    pub channel: Option<String>,

    /// Bot API base URL. Override for tests or a self-hosted Bot API server.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel: None,
            api_base: default_api_base(),
        }
    }
}

/// Upload endpoint config. Field names vary per host (SM.MS expects the file
/// part as "smfile", Chevereto "source", Imgur "image"), so they live here
/// rather than in the upload client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderConfig {
    /// Upload endpoint URL (e.g. "https://sm.ms/api/v2/upload"). Overridden by UPLOAD_URL env.
    pub url: Option<String>,

    /// Authorization header value. Overridden by UPLOAD_TOKEN env. Optional: some hosts take none.
    pub token: Option<String>,

    /// Per-upload deadline in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Multipart file field name (default "file").
    #[serde(default = "default_file_field")]
    pub file_field: String,

    /// Response field marking success: boolean `true` or the string "success" (default "success").
    #[serde(default = "default_success_field")]
    pub success_field: String,

    /// Dot path to the stored artifact reference in the response body (default "data.url").
    #[serde(default = "default_reference_field")]
    pub reference_field: String,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
            file_field: default_file_field(),
            success_field: default_success_field(),
            reference_field: default_reference_field(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_file_field() -> String {
    "file".to_string()
}

fn default_success_field() -> String {
    "success".to_string()
}

fn default_reference_field() -> String {
    "data.url".to_string()
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn config_nonempty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_bot_token(config: &Config) -> Option<String> {
    env_nonempty("TELEGRAM_BOT_TOKEN").or_else(|| config_nonempty(config.telegram.bot_token.as_ref()))
}

/// Resolve the watched channel: env IMGRELAY_CHANNEL overrides config.
pub fn resolve_channel(config: &Config) -> Option<String> {
    env_nonempty("IMGRELAY_CHANNEL").or_else(|| config_nonempty(config.telegram.channel.as_ref()))
}

/// Resolve the upload endpoint URL: env UPLOAD_URL overrides config.
pub fn resolve_upload_url(config: &Config) -> Option<String> {
    env_nonempty("UPLOAD_URL").or_else(|| config_nonempty(config.uploader.url.as_ref()))
}

/// Resolve the upload credential: env UPLOAD_TOKEN overrides config.
pub fn resolve_upload_token(config: &Config) -> Option<String> {
    env_nonempty("UPLOAD_TOKEN").or_else(|| config_nonempty(config.uploader.token.as_ref()))
}

/// Fully resolved upload client settings.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub file_field: String,
    pub success_field: String,
    pub reference_field: String,
}

/// Fully resolved startup settings. Construction fails when a required value
/// is missing, so a misconfigured process dies at startup rather than at the
/// first event.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub channel: String,
    pub api_base: String,
    pub upload: UploadSettings,
}

impl Settings {
    pub fn resolve(config: &Config) -> Result<Self> {
        let bot_token = resolve_bot_token(config)
            .context("telegram bot token not configured (set TELEGRAM_BOT_TOKEN or telegram.botToken)")?;
        let channel = resolve_channel(config)
            .context("channel not configured (set IMGRELAY_CHANNEL or telegram.channel)")?;
        let url = resolve_upload_url(config)
            .context("upload endpoint not configured (set UPLOAD_URL or uploader.url)")?;
        let u = &config.uploader;
        Ok(Self {
            bot_token,
            channel,
            api_base: config.telegram.api_base.trim_end_matches('/').to_string(),
            upload: UploadSettings {
                url,
                token: resolve_upload_token(config),
                timeout: Duration::from_secs(u.timeout_secs),
                file_field: u.file_field.clone(),
                success_field: u.success_field.clone(),
                reference_field: u.reference_field.clone(),
            },
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("IMGRELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".imgrelay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or IMGRELAY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploader_defaults() {
        let c = Config::default();
        assert_eq!(c.uploader.timeout_secs, 30);
        assert_eq!(c.uploader.file_field, "file");
        assert_eq!(c.uploader.success_field, "success");
        assert_eq!(c.uploader.reference_field, "data.url");
        assert_eq!(c.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn parse_camel_case_config() {
        let c: Config = serde_json::from_str(
            r#"{"telegram":{"botToken":"t","channel":"@c"},"uploader":{"url":"https://host/upload","timeoutSecs":10,"fileField":"smfile"}}"#,
        )
        .expect("parse config");
        assert_eq!(c.telegram.bot_token.as_deref(), Some("t"));
        assert_eq!(c.telegram.channel.as_deref(), Some("@c"));
        assert_eq!(c.uploader.timeout_secs, 10);
        assert_eq!(c.uploader.file_field, "smfile");
    }

    #[test]
    fn resolve_carries_uploader_fields_through() {
        let mut c = Config::default();
        c.telegram.bot_token = Some("token".to_string());
        c.telegram.channel = Some("@chan".to_string());
        c.uploader.url = Some("https://host/upload".to_string());
        let s = Settings::resolve(&c).expect("resolve");
        assert_eq!(s.upload.timeout, Duration::from_secs(30));
        assert_eq!(s.upload.file_field, "file");
        assert_eq!(s.upload.success_field, "success");
        assert_eq!(s.upload.reference_field, "data.url");
    }

    #[test]
    fn resolve_requires_upload_url() {
        if std::env::var("UPLOAD_URL").is_ok() {
            return;
        }
        let mut c = Config::default();
        c.telegram.bot_token = Some("token".to_string());
        c.telegram.channel = Some("@chan".to_string());
        let err = Settings::resolve(&c).expect_err("missing url must fail");
        assert!(err.to_string().contains("upload endpoint"));
    }

    #[test]
    fn resolve_requires_bot_token() {
        if std::env::var("TELEGRAM_BOT_TOKEN").is_ok() {
            return;
        }
        let mut c = Config::default();
        c.telegram.channel = Some("@chan".to_string());
        c.uploader.url = Some("https://host/upload".to_string());
        let err = Settings::resolve(&c).expect_err("missing token must fail");
        assert!(err.to_string().contains("bot token"));
    }
}
