//! Image service transport client.
//!
//! Async HTTP client using `reqwest`. Each operation issues exactly one
//! request; refreshing the list after a mutation is the caller's job.

use futures_util::stream;
use reqwest::RequestBuilder;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use assetdeck_protocol::{
    Asset, DimensionsRequest, MessageResponse, TransportError, UploadFile, UploadResult,
};
use assetdeck_transfer::{ProgressCallback, ProgressScope, ProgressStream, UPLOAD_CHUNK_SIZE};

use crate::config::{ClientConfig, ConfigError};

/// Image service API client.
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Creates a client from a startup configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches the full asset collection in server order.
    pub async fn list(&self) -> Result<Vec<Asset>, TransportError> {
        let url = self.config.url(&self.config.endpoints().list, None);
        let (status, body) = self.execute(self.http.get(&url)).await?;
        let assets: Vec<Asset> = decode(status, &body)?;
        debug!(count = assets.len(), "listed assets");
        Ok(assets)
    }

    /// Uploads `file` as a single multipart field.
    ///
    /// `on_progress` receives increasing percentages while the body is
    /// streamed and reaches 100 exactly once before this returns `Ok`. It
    /// is detached on every exit path, so nothing is reported after the
    /// future settles.
    pub async fn upload(
        &self,
        file: &UploadFile,
        on_progress: ProgressCallback,
    ) -> Result<UploadResult, TransportError> {
        let total = file.len();
        let scope = ProgressScope::attach(total, on_progress);

        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = file
            .data
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|c| Ok(c.to_vec()))
            .collect();
        let body = reqwest::Body::wrap_stream(ProgressStream::new(stream::iter(chunks), &scope));

        let part = Part::stream_with_length(body, total)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                warn!(content_type = %file.content_type, error = %e, "invalid content type");
                TransportError::InvalidRequest(format!(
                    "invalid content type {:?}: {e}",
                    file.content_type
                ))
            })?;
        let form = Form::new().part(self.config.endpoints().file_field.clone(), part);

        let url = self.config.url(&self.config.endpoints().upload, None);
        debug!(file = %file.file_name, bytes = total, "uploading");

        let (status, body) = self.execute(self.http.post(&url).multipart(form)).await?;
        let result: UploadResult = decode_or_default(status, &body)?;

        scope.complete();
        Ok(result)
    }

    /// Deletes the asset identified by `content_hash`.
    ///
    /// Deleting an asset that is already gone is reported as a transport
    /// error by the service, not ignored.
    pub async fn delete(&self, content_hash: &str) -> Result<MessageResponse, TransportError> {
        let url = self
            .config
            .url(&self.config.endpoints().delete, Some(content_hash));
        let (status, body) = self.execute(self.http.delete(&url)).await?;
        decode_or_default(status, &body)
    }

    /// Sends new dimensions for `content_hash`; the service validates them.
    pub async fn update_dimensions(
        &self,
        content_hash: &str,
        width: i64,
        height: i64,
    ) -> Result<MessageResponse, TransportError> {
        let url = self
            .config
            .url(&self.config.endpoints().resize, Some(content_hash));
        let req = DimensionsRequest { width, height };
        let (status, body) = self.execute(self.http.put(&url).json(&req)).await?;
        decode_or_default(status, &body)
    }

    /// Sends a request and returns the status and body of a 2xx response.
    async fn execute(&self, req: RequestBuilder) -> Result<(u16, Vec<u8>), TransportError> {
        let resp = req.send().await.map_err(network_error)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(network_error)?;

        if !status.is_success() {
            let err = TransportError::from_response(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok((status.as_u16(), body.to_vec()))
    }
}

fn network_error(e: reqwest::Error) -> TransportError {
    warn!(error = %e, "request failed without a response");
    TransportError::Network(e.to_string())
}

fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, TransportError> {
    serde_json::from_slice(body).map_err(|e| TransportError::Malformed {
        status,
        reason: e.to_string(),
    })
}

/// Like [`decode`], but an empty body yields `T::default()`.
fn decode_or_default<T: DeserializeOwned + Default>(
    status: u16,
    body: &[u8],
) -> Result<T, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    decode(status, body)
}
