//! Transport client for the AssetDeck image service.
//!
//! Provides an async client for the four remote operations (list,
//! upload, delete, resize) with typed results and the closed
//! [`TransportError`](assetdeck_protocol::TransportError) taxonomy.

pub mod client;
pub mod config;

pub use client::Client;
pub use config::{ClientConfig, ConfigError, Endpoints};
