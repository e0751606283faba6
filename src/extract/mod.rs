//! External text-extraction collaborator
//!
//! The engine treats the language-model service as a single function from a
//! prompt (plus optional document) to text. Nothing it returns is trusted
//! until it has been parsed and schema-validated, and every call site keeps a
//! deterministic fallback for failures and timeouts.

pub mod command;
pub mod documents;
pub mod json;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use command::CommandExtractor;
pub use documents::{extract_measurements, extract_vendor_quote};
pub use json::{extract_json, parse_json_response, strip_code_fences};

/// Hard timeout for proposal organization calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Binary document sent alongside a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// MIME type (e.g. "application/pdf", "image/png")
    pub media_type: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
}

impl Attachment {
    /// Read a file, guessing the media type from its extension
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let media_type = match ext.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        };
        Ok(Self {
            media_type: media_type.to_string(),
            data,
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        })
    }
}

/// One call to the collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub prompt: String,
    pub attachment: Option<Attachment>,
    pub max_tokens: u32,
}

impl ExtractionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: None,
            max_tokens: 2048,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Ways a collaborator call can fail
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extraction service unavailable: {0}")]
    Unavailable(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Extraction failed: {0}")]
    Failed(String),

    #[error("Invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Response failed schema validation: {}", errors.join("; "))]
    Schema { errors: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The text/vision extraction service
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Send one prompt and return the raw text reply
    async fn extract(&self, request: ExtractionRequest) -> Result<String, ExtractError>;

    /// Name used in log messages
    fn name(&self) -> &str {
        "extractor"
    }
}

/// Call the extractor, giving up after `timeout`
pub async fn extract_with_timeout(
    extractor: &dyn TextExtractor,
    request: ExtractionRequest,
    timeout: Duration,
) -> Result<String, ExtractError> {
    match tokio::time::timeout(timeout, extractor.extract(request)).await {
        Ok(result) => result,
        Err(_) => Err(ExtractError::Timeout(timeout)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process extractors for tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with queued responses in order, recording each prompt
    pub struct ScriptedExtractor {
        replies: Mutex<VecDeque<Result<String, ExtractError>>>,
        pub prompts: Mutex<Vec<String>>,
        pub max_tokens: Mutex<Vec<u32>>,
    }

    impl ScriptedExtractor {
        pub fn new(replies: Vec<Result<String, ExtractError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
                max_tokens: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub fn failing() -> Self {
            Self::new(vec![Err(ExtractError::Unavailable("offline".to_string()))])
        }
    }

    #[async_trait]
    impl TextExtractor for ScriptedExtractor {
        async fn extract(&self, request: ExtractionRequest) -> Result<String, ExtractError> {
            self.max_tokens.lock().unwrap().push(request.max_tokens);
            self.prompts.lock().unwrap().push(request.prompt);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ExtractError::Unavailable("no scripted reply".into())))
        }
    }

    /// Never answers within any reasonable timeout
    pub struct StalledExtractor;

    #[async_trait]
    impl TextExtractor for StalledExtractor {
        async fn extract(&self, _request: ExtractionRequest) -> Result<String, ExtractError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let result = extract_with_timeout(
            &StalledExtractor,
            ExtractionRequest::new("hello"),
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(result, Err(ExtractError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_reply_passes_through() {
        let extractor = ScriptedExtractor::replying("{\"ok\": true}");
        let text = extract_with_timeout(
            &extractor,
            ExtractionRequest::new("ping"),
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap();
        assert_eq!(text, "{\"ok\": true}");
        assert_eq!(extractor.prompts.lock().unwrap().as_slice(), ["ping"]);
    }

    #[test]
    fn test_attachment_media_type() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("report.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.media_type, "application/pdf");
        assert_eq!(attachment.file_name.as_deref(), Some("report.PDF"));
    }
}
