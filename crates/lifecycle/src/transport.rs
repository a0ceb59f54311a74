//! Transport seam used by the lifecycle controller.
//!
//! The app implements this trait on top of the HTTP client. Keeping the
//! controller behind a trait decouples it from `reqwest` and lets tests
//! drive it with scripted responses.

use std::future::Future;
use std::pin::Pin;

use assetdeck_protocol::{Asset, MessageResponse, TransportError, UploadFile, UploadResult};
use assetdeck_transfer::ProgressCallback;

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Abstract connection to the image service.
pub trait AssetTransport: Send + Sync {
    /// Fetches the full asset collection in server order.
    fn list(&self) -> TransportFuture<'_, Vec<Asset>>;

    /// Uploads one file, reporting progress through `on_progress` until
    /// the returned future settles.
    fn upload<'a>(
        &'a self,
        file: &'a UploadFile,
        on_progress: ProgressCallback,
    ) -> TransportFuture<'a, UploadResult>;

    /// Deletes one asset by content hash.
    fn delete<'a>(&'a self, content_hash: &'a str) -> TransportFuture<'a, MessageResponse>;

    /// Sends new dimensions for one asset.
    fn update_dimensions<'a>(
        &'a self,
        content_hash: &'a str,
        width: i64,
        height: i64,
    ) -> TransportFuture<'a, MessageResponse>;
}
