//! State and event types exposed to presentation surfaces.

use serde::Serialize;

use crate::notification::Notification;

/// State of the upload concern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum UploadPhase {
    #[default]
    Idle,
    /// A file is selected and waiting for `start_upload`.
    Selecting,
    Uploading,
    /// Upload finished, list refresh in flight.
    Refreshing,
}

impl UploadPhase {
    /// Whether an upload currently owns the single upload slot.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Uploading | Self::Refreshing)
    }
}

/// State of the delete/resize concern for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AssetPhase {
    #[default]
    Idle,
    EditingDimensions,
    Committing,
    Deleting,
    /// Mutation finished, list refresh in flight.
    Refreshing,
}

/// Result of a controller intent.
///
/// Remote failures are already recorded in the notification slot when
/// `Failed` is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    /// A local precondition did not hold; nothing was sent.
    Skipped,
}

/// Visibility and target of the original-image preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewModal {
    pub visible: bool,
    pub url: Option<String>,
}

/// Change notifications for presentation surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Upload percentage; non-decreasing within one upload.
    Progress(u8),
    Loading(bool),
    /// Store contents changed (full replace or local delete filter).
    AssetsChanged { count: usize },
    Notification(Option<Notification>),
    SelectionChanged,
    PreviewChanged(PreviewModal),
}
