/// Upload limit enforced at the ingestion boundary (5 MiB).
pub const MAX_SAMPLE_BYTES: usize = 5 * 1024 * 1024;

/// Filename forwarded when the client did not declare one.
pub const DEFAULT_FILENAME: &str = "sample";

/// Content type forwarded when the client did not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An audio sample received from the client.
///
/// Lives for one request only and is consumed by the relay when it builds the
/// outbound form.
#[derive(Debug, Clone)]
pub struct UploadedSample {
    bytes: Vec<u8>,
    filename: String,
    content_type: String,
}

impl UploadedSample {
    pub fn new(bytes: Vec<u8>, filename: Option<String>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            filename: filename
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            content_type: content_type
                .filter(|mime| !mime.is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size in bytes; this is the value sent as `sample_bytes`.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
