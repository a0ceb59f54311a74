//! Local file selection and its scoped preview reference.
//!
//! A selection owns a preview lease. The lease is released when the
//! selection is dropped: superseded by a new selection, consumed by a
//! successful upload, cleared, or torn down with the controller.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assetdeck_protocol::UploadFile;
use tracing::debug;

use crate::error::SelectionError;

/// MIME type used when the extension is not a known image format.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Detects an image content type from a file name's extension.
pub fn detect_content_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("bmp") => Some("image/bmp"),
        Some("tif" | "tiff") => Some("image/tiff"),
        _ => None,
    }
}

/// A file chosen by the user, not yet uploaded.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    file: Arc<UploadFile>,
}

impl SelectedFile {
    /// Wraps in-memory file contents, detecting the content type from the name.
    ///
    /// Unknown extensions are sent as `application/octet-stream` and left
    /// to the service to reject.
    pub fn from_bytes(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = detect_content_type(&file_name).unwrap_or(FALLBACK_CONTENT_TYPE);
        Self::with_content_type(file_name, content_type, data)
    }

    pub fn with_content_type(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file: Arc::new(UploadFile {
                file_name: file_name.into(),
                content_type: content_type.into(),
                data,
            }),
        }
    }

    /// Reads a local file.
    pub async fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(SelectionError::NotAFile(path.to_path_buf()));
        }

        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());

        debug!(path = %path.display(), bytes = data.len(), "file selected");
        Ok(Self::from_bytes(file_name, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.file.content_type
    }

    pub fn len(&self) -> u64 {
        self.file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }

    pub(crate) fn upload_file(&self) -> Arc<UploadFile> {
        Arc::clone(&self.file)
    }
}

/// Creates and releases local preview references for selected files.
pub trait PreviewProvider: Send + Sync {
    /// Creates a preview reference and returns its URL.
    fn create(&self, file: &SelectedFile) -> String;

    /// Releases a reference previously returned by [`create`](Self::create).
    fn release(&self, url: &str);
}

/// A live preview reference, released on drop.
pub struct PreviewLease {
    url: String,
    provider: Arc<dyn PreviewProvider>,
}

impl PreviewLease {
    pub(crate) fn acquire(provider: Arc<dyn PreviewProvider>, file: &SelectedFile) -> Self {
        let url = provider.create(file);
        Self { url, provider }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        debug!(url = %self.url, "releasing preview");
        self.provider.release(&self.url);
    }
}

impl std::fmt::Debug for PreviewLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewLease").field("url", &self.url).finish()
    }
}

/// The one locally selected file and its preview.
#[derive(Debug)]
pub(crate) struct PendingSelection {
    pub(crate) id: u64,
    pub(crate) file: SelectedFile,
    pub(crate) preview: PreviewLease,
}

/// Read-only view of the pending selection for surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInfo {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub preview_url: String,
}

impl From<&PendingSelection> for SelectionInfo {
    fn from(sel: &PendingSelection) -> Self {
        Self {
            file_name: sel.file.file_name().to_string(),
            content_type: sel.file.content_type().to_string(),
            size: sel.file.len(),
            preview_url: sel.preview.url().to_string(),
        }
    }
}

/// In-process preview registry handing out opaque `preview:` URLs.
#[derive(Debug, Default)]
pub struct LocalPreviews {
    live: Mutex<HashSet<String>>,
}

impl LocalPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of references created and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

impl PreviewProvider for LocalPreviews {
    fn create(&self, file: &SelectedFile) -> String {
        let url = format!("preview:{}/{}", uuid::Uuid::new_v4(), file.file_name());
        self.live.lock().unwrap().insert(url.clone());
        url
    }

    fn release(&self, url: &str) {
        self.live.lock().unwrap().remove(url);
    }
}
