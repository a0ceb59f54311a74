//! Wire types for the AssetDeck image service API.
//!
//! Shared by the HTTP transport client and the lifecycle controller so
//! both sides agree on the asset shape and the closed failure taxonomy.

pub mod error;
pub mod types;

pub use error::{ErrorBody, TransportError};
pub use types::{Asset, DimensionsRequest, MessageResponse, UploadFile, UploadResult};
