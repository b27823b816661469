//! Request signing for the provider's identify endpoint.
//!
//! The provider authenticates each call with an HMAC-SHA1 over six newline-joined
//! fields. Field order and the literal values are fixed by the provider; the
//! record type inside the signed string is always `"audio"`, even when the form
//! body carries a different `record_type`. Check the provider's documentation
//! before changing any of these literals.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{AppError, AppResult};

type HmacSha1 = Hmac<Sha1>;

/// HTTP method included in the signed string.
pub const HTTP_METHOD: &str = "POST";

/// Path of the identify endpoint, both signed and requested.
pub const ENDPOINT: &str = "/v1/identify";

/// Value of the `data_type` form field.
pub const DATA_TYPE: &str = "audio";

/// Record type used inside the signed string, independent of the form field.
pub const SIGNED_RECORD_TYPE: &str = "audio";

/// Value of the `signature_version` form field and of the signed string.
pub const SIGNATURE_VERSION: &str = "1";

/// Inputs for one outbound signature.
///
/// The same `timestamp` must be sent in the form body; the relay builds one
/// context per request and reads the timestamp back from it.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    timestamp: i64,
}

impl<'a> SigningContext<'a> {
    pub fn new(access_key: &'a str, secret_key: &'a str, timestamp: i64) -> Self {
        Self {
            access_key,
            secret_key,
            timestamp,
        }
    }

    /// Context stamped with the current Unix time in whole seconds.
    pub fn now(access_key: &'a str, secret_key: &'a str) -> Self {
        Self::new(access_key, secret_key, chrono::Utc::now().timestamp())
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn access_key(&self) -> &str {
        self.access_key
    }

    pub fn string_to_sign(&self) -> String {
        let timestamp = self.timestamp.to_string();
        [
            HTTP_METHOD,
            ENDPOINT,
            self.access_key,
            SIGNED_RECORD_TYPE,
            SIGNATURE_VERSION,
            timestamp.as_str(),
        ]
        .join("\n")
    }

    /// Base64 (standard alphabet, padded) of HMAC-SHA1 over the string-to-sign.
    pub fn signature(&self) -> AppResult<String> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(self.string_to_sign().as_bytes());
        let digest = mac.finalize().into_bytes();
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }
}
