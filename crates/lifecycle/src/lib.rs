//! Client-side image asset lifecycle: select, upload, list, resize, delete.
//!
//! This crate holds the **state and orchestration** for a single
//! presentation surface. It has no HTTP dependency: the app provides an
//! `AssetTransport` implementation that bridges to the real client.
//!
//! # Flows
//!
//! 1. **Select**: pick a local file and hold a preview reference
//! 2. **Upload**: send it with progress, then refresh the list
//! 3. **Resize**: edit width/height per asset, then commit
//! 4. **Delete**: remove one asset, filter locally, then refresh

pub mod controller;
pub mod dimensions;
pub mod error;
mod locks;
pub mod notification;
pub mod selection;
pub mod store;
pub mod transport;
pub mod types;

// Re-export primary types for convenience.
pub use controller::LifecycleController;
pub use dimensions::{Dimension, DimensionEdit, PendingDimensions};
pub use error::SelectionError;
pub use notification::{Notification, NotificationKind, NotificationSlot};
pub use selection::{
    LocalPreviews, PreviewLease, PreviewProvider, SelectedFile, SelectionInfo,
    detect_content_type,
};
pub use store::AssetStore;
pub use transport::{AssetTransport, TransportFuture};
pub use types::{AssetPhase, LifecycleEvent, Outcome, PreviewModal, UploadPhase};
