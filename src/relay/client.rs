use reqwest::{multipart, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::relay::signing::{DATA_TYPE, ENDPOINT, SIGNATURE_VERSION};
use crate::relay::{SigningContext, UploadedSample};

/// Record type sent when the caller does not pick one.
pub const DEFAULT_RECORD_TYPE: &str = "audio";

/// Forwards samples to the recognition provider.
///
/// Holds the provider settings read at startup and one pooled HTTP client.
/// Cloning is cheap; clones share the client's connection pool.
#[derive(Debug, Clone)]
pub struct RecognitionRelay {
    client: reqwest::Client,
    provider: ProviderConfig,
}

impl RecognitionRelay {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
        }
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.provider.base_url.trim_end_matches('/'), ENDPOINT)
    }

    /// Sign `sample`, send it to the provider and hand back the provider's JSON untouched.
    ///
    /// `record_type` only affects the `record_type` form field; the signed string
    /// always uses the fixed `"audio"` value. An empty string counts as absent.
    pub async fn recognize(
        &self,
        sample: UploadedSample,
        record_type: Option<&str>,
    ) -> AppResult<Value> {
        let record_type = record_type
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_RECORD_TYPE);

        let signing = SigningContext::now(&self.provider.access_key, &self.provider.secret_key);
        let signature = signing.signature()?;
        let form = build_form(sample, &signing, &signature, record_type)?;

        let url = self.endpoint_url();
        info!(
            provider = %self.provider.host(),
            record_type = %record_type,
            timestamp = signing.timestamp(),
            "Sending sample to recognition provider"
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Recognition request failed to reach provider");
                AppError::TransportError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = upstream_error_message(status, &body);
            warn!(
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Recognition provider returned an error"
            );
            return Err(AppError::UpstreamError(message));
        }

        let body = response.bytes().await?;
        let result: Value = serde_json::from_slice(&body).map_err(|e| {
            AppError::UpstreamError(format!("Provider returned invalid JSON: {}", e))
        })?;

        debug!(response = %result, "Recognition provider response");
        Ok(result)
    }
}

/// Outbound form in the field order the provider documents.
fn build_form(
    sample: UploadedSample,
    signing: &SigningContext<'_>,
    signature: &str,
    record_type: &str,
) -> AppResult<multipart::Form> {
    let sample_bytes = sample.size();
    let filename = sample.filename().to_string();
    let content_type = sample.content_type().to_string();

    let part = multipart::Part::bytes(sample.into_bytes())
        .file_name(filename)
        .mime_str(&content_type)
        .map_err(|e| {
            AppError::ValidationError(format!("Invalid content type '{}': {}", content_type, e))
        })?;

    Ok(multipart::Form::new()
        .part("sample", part)
        .text("access_key", signing.access_key().to_string())
        .text("data_type", DATA_TYPE)
        .text("signature_version", SIGNATURE_VERSION)
        .text("signature", signature.to_string())
        .text("timestamp", signing.timestamp().to_string())
        .text("sample_bytes", sample_bytes.to_string())
        .text("record_type", record_type.to_string()))
}

/// Prefer the provider's own `status.msg`; otherwise describe the HTTP status.
fn upstream_error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/status/msg")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()))
}
