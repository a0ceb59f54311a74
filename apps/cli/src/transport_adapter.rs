//! Adapter bridging the HTTP `Client` to the lifecycle `AssetTransport` trait.

use assetdeck_client::Client;
use assetdeck_lifecycle::{AssetTransport, TransportFuture};
use assetdeck_protocol::{Asset, MessageResponse, UploadFile, UploadResult};
use assetdeck_transfer::ProgressCallback;

/// Implements `AssetTransport` by delegating to the HTTP client.
pub struct ClientTransport {
    client: Client,
}

impl ClientTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl AssetTransport for ClientTransport {
    fn list(&self) -> TransportFuture<'_, Vec<Asset>> {
        Box::pin(self.client.list())
    }

    fn upload<'a>(
        &'a self,
        file: &'a UploadFile,
        on_progress: ProgressCallback,
    ) -> TransportFuture<'a, UploadResult> {
        Box::pin(self.client.upload(file, on_progress))
    }

    fn delete<'a>(&'a self, content_hash: &'a str) -> TransportFuture<'a, MessageResponse> {
        Box::pin(self.client.delete(content_hash))
    }

    fn update_dimensions<'a>(
        &'a self,
        content_hash: &'a str,
        width: i64,
        height: i64,
    ) -> TransportFuture<'a, MessageResponse> {
        Box::pin(self.client.update_dimensions(content_hash, width, height))
    }
}
