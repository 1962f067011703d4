//! Wire types shared with clients.

use serde::{Deserialize, Serialize};

/// Successful colorization response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorizeResponse {
    /// Base64 (standard alphabet, padded) of the colorized image.
    pub result: String,
    /// MIME type of the decoded image.
    pub content_type: String,
}

/// RFC 9457 problem document returned for every error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short, constant summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Pipeline error category (`upload_error`, `worker_error`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}
