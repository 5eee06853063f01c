//! Upload endpoint client: multipart POST with a configurable response mapping.
//!
//! The core contract is "bytes in, reference or diagnostic out"; which fields
//! carry the success marker and the reference is endpoint-specific config.

use crate::channels::MediaPayload;
use crate::config::UploadSettings;
use crate::error::UploadError;
use reqwest::multipart;
use serde_json::Value;

/// Client for one upload endpoint. The reqwest client carries the per-upload
/// deadline, so a stuck endpoint resolves to an error instead of hanging.
pub struct Uploader {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    file_field: String,
    success_field: String,
    reference_field: String,
}

impl Uploader {
    pub fn new(settings: &UploadSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            token: settings.token.clone(),
            file_field: settings.file_field.clone(),
            success_field: settings.success_field.clone(),
            reference_field: settings.reference_field.clone(),
        })
    }

    /// POST the payload and map the response to a stored-artifact reference.
    pub async fn upload(&self, payload: &MediaPayload) -> Result<String, UploadError> {
        let part = multipart::Part::bytes(payload.bytes.clone())
            .file_name(payload.file_name.clone())
            .mime_str(&payload.content_type)?;
        let form = multipart::Form::new().part(self.file_field.clone(), part);
        let mut req = self.client.post(&self.url).multipart(form);
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, token.as_str());
        }
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(UploadError::Status { status, body });
        }
        let body: Value = res
            .json()
            .await
            .map_err(|e| UploadError::Malformed(format!("response is not JSON: {}", e)))?;
        if !success_marker_set(&body, &self.success_field) {
            return Err(UploadError::Rejected(body.to_string()));
        }
        match lookup_path(&body, &self.reference_field).and_then(Value::as_str) {
            Some(reference) => Ok(reference.to_string()),
            None => Err(UploadError::Malformed(format!(
                "success response has no string at {}: {}",
                self.reference_field, body
            ))),
        }
    }
}

/// True when the marker field says success: boolean `true` or the string
/// "success" (both conventions exist among image hosts).
fn success_marker_set(body: &Value, field: &str) -> bool {
    match lookup_path(body, field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "success",
        _ => false,
    }
}

/// Walk a dot-separated path into a JSON object (e.g. "data.url").
fn lookup_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |v, key| v.get(key))
}
