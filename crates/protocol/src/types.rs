use serde::{Deserialize, Serialize};

/// A stored image as reported by the list endpoint.
///
/// `content_hash` is the sole identity used by delete, resize and list
/// reconciliation. Older servers used `md5`/`image_url`, which are still
/// accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(alias = "md5")]
    pub content_hash: String,
    #[serde(alias = "image_url", alias = "url")]
    pub display_url: String,
    #[serde(
        default,
        alias = "original_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub width: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub height: u32,
}

impl Asset {
    /// URL of the untransformed source, falling back to the display rendition
    /// for assets created before originals were kept.
    pub fn original_or_display(&self) -> &str {
        self.original_url.as_deref().unwrap_or(&self.display_url)
    }
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// A local file ready to be sent as the single multipart field of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    /// Size in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Body returned by a successful upload.
///
/// The upload endpoint has answered with different shapes over time, so
/// every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Confirmation body returned by delete and resize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// JSON body of the resize request.
///
/// Values are sent as entered; the service owns validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionsRequest {
    pub width: i64,
    pub height: i64,
}
