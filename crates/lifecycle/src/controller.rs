//! Lifecycle controller.
//!
//! Coordinates selection, upload, delete and resize against the remote
//! service, reconciles the asset store from full list fetches, and owns
//! the notification slot, loading flag and upload progress. It is the
//! only error boundary: transport failures become notifications and are
//! never returned to the surface.
//!
//! # Flows
//!
//! - Upload: `Idle → Selecting → Uploading → Refreshing → Idle`
//! - Delete: `Idle → Deleting → Refreshing → Idle`
//! - Resize: `Idle → EditingDimensions → Committing → Refreshing → Idle`

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use assetdeck_protocol::Asset;
use assetdeck_transfer::ProgressCallback;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dimensions::{Dimension, DimensionEdit, PendingDimensions};
use crate::locks::HashLocks;
use crate::notification::{Notification, NotificationSlot};
use crate::selection::{PendingSelection, PreviewLease, PreviewProvider, SelectedFile, SelectionInfo};
use crate::store::AssetStore;
use crate::transport::AssetTransport;
use crate::types::{AssetPhase, LifecycleEvent, Outcome, PreviewModal, UploadPhase};

const UPLOAD_FAILED: &str = "Upload failed";
const DELETE_FAILED: &str = "Delete failed";
const UPDATE_FAILED: &str = "Update failed";
const LIST_FAILED: &str = "Failed to load images";

#[derive(Default)]
struct State {
    store: AssetStore,
    notification: NotificationSlot,
    loading: bool,
    progress: u8,
    selection: Option<PendingSelection>,
    next_selection_id: u64,
    upload_phase: UploadPhase,
    asset_phases: HashMap<String, AssetPhase>,
    dimensions: PendingDimensions,
    preview: PreviewModal,
}

impl State {
    fn set_asset_phase(&mut self, content_hash: &str, phase: AssetPhase) {
        if phase == AssetPhase::Idle {
            self.asset_phases.remove(content_hash);
        } else {
            self.asset_phases.insert(content_hash.to_string(), phase);
        }
    }

    fn asset_phase(&self, content_hash: &str) -> AssetPhase {
        self.asset_phases
            .get(content_hash)
            .copied()
            .unwrap_or_default()
    }

    fn settled_upload_phase(&self) -> UploadPhase {
        if self.selection.is_some() {
            UploadPhase::Selecting
        } else {
            UploadPhase::Idle
        }
    }
}

/// Orchestrates the asset lifecycle for one presentation surface.
///
/// Intents take `&self`, so delete and resize for different assets can run
/// concurrently; state is only touched between suspension points.
pub struct LifecycleController {
    transport: Arc<dyn AssetTransport>,
    previews: Arc<dyn PreviewProvider>,
    state: Arc<Mutex<State>>,
    locks: HashLocks,
    events_tx: mpsc::UnboundedSender<LifecycleEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<LifecycleEvent>>>,
}

impl LifecycleController {
    /// Creates a controller with an empty store.
    pub fn new(transport: Arc<dyn AssetTransport>, previews: Arc<dyn PreviewProvider>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            previews,
            state: Arc::new(Mutex::new(State::default())),
            locks: HashLocks::default(),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<LifecycleEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn emit(&self, event: LifecycleEvent) {
        // A surface that dropped its receiver simply stops observing.
        let _ = self.events_tx.send(event);
    }

    fn notify(&self, notification: Notification) {
        self.state().notification.set(notification.clone());
        self.emit(LifecycleEvent::Notification(Some(notification)));
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    /// Snapshot of the store in server order.
    pub fn assets(&self) -> Vec<Asset> {
        self.state().store.as_slice().to_vec()
    }

    pub fn asset(&self, content_hash: &str) -> Option<Asset> {
        self.state().store.get(content_hash).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn progress(&self) -> u8 {
        self.state().progress
    }

    pub fn notification(&self) -> Option<Notification> {
        self.state().notification.get().cloned()
    }

    pub fn pending_selection(&self) -> Option<SelectionInfo> {
        self.state().selection.as_ref().map(SelectionInfo::from)
    }

    pub fn pending_dimensions(&self, content_hash: &str) -> Option<DimensionEdit> {
        self.state().dimensions.get(content_hash)
    }

    pub fn preview(&self) -> PreviewModal {
        self.state().preview.clone()
    }

    pub fn upload_phase(&self) -> UploadPhase {
        self.state().upload_phase
    }

    pub fn asset_phase(&self, content_hash: &str) -> AssetPhase {
        self.state().asset_phase(content_hash)
    }

    // -----------------------------------------------------------------------
    // List
    // -----------------------------------------------------------------------

    /// Replaces the store from a full list fetch.
    pub async fn refresh(&self) -> Outcome {
        if self.reload().await {
            Outcome::Completed
        } else {
            Outcome::Failed
        }
    }

    async fn reload(&self) -> bool {
        match self.transport.list().await {
            Ok(assets) => {
                let count = {
                    let mut st = self.state();
                    st.store.replace_all(assets);
                    st.store.len()
                };
                debug!(count, "asset list refreshed");
                self.emit(LifecycleEvent::AssetsChanged { count });
                true
            }
            Err(err) => {
                error!(status = err.status(), error = %err, "asset list refresh failed");
                self.notify(Notification::from_transport(&err, LIST_FAILED));
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Selection and upload
    // -----------------------------------------------------------------------

    /// Replaces the pending selection.
    ///
    /// The previous preview reference is released before the new one is
    /// created. No network call is made.
    pub fn select_file(&self, file: SelectedFile) {
        let previous = self.state().selection.take();
        drop(previous);

        let preview = PreviewLease::acquire(Arc::clone(&self.previews), &file);
        {
            let mut st = self.state();
            st.next_selection_id += 1;
            let id = st.next_selection_id;
            debug!(file = %file.file_name(), bytes = file.len(), id, "file selected");
            st.selection = Some(PendingSelection { id, file, preview });
            if st.upload_phase == UploadPhase::Idle {
                st.upload_phase = UploadPhase::Selecting;
            }
        }
        self.emit(LifecycleEvent::SelectionChanged);
    }

    /// Drops the pending selection and releases its preview.
    pub fn clear_selection(&self) -> bool {
        let previous = {
            let mut st = self.state();
            let previous = st.selection.take();
            if st.upload_phase == UploadPhase::Selecting {
                st.upload_phase = UploadPhase::Idle;
            }
            previous
        };
        let cleared = previous.is_some();
        drop(previous);
        if cleared {
            self.emit(LifecycleEvent::SelectionChanged);
        }
        cleared
    }

    /// Uploads the pending selection, then refreshes the list.
    ///
    /// Skipped when nothing is selected or another upload is in flight.
    /// On failure the selection is kept so the user can retry.
    pub async fn start_upload(&self) -> Outcome {
        let picked = {
            let mut st = self.state();
            if st.upload_phase.is_busy() {
                debug!("upload already in flight, ignoring");
                return Outcome::Skipped;
            }
            let Some(sel) = st.selection.as_ref() else {
                debug!("no file selected, ignoring upload");
                return Outcome::Skipped;
            };
            let picked = (sel.id, sel.file.upload_file());

            st.upload_phase = UploadPhase::Uploading;
            st.loading = true;
            st.progress = 0;
            st.notification.clear();
            picked
        };
        let (selection_id, file) = picked;

        self.emit(LifecycleEvent::Loading(true));
        self.emit(LifecycleEvent::Progress(0));
        self.emit(LifecycleEvent::Notification(None));

        info!(file = %file.file_name, bytes = file.len(), "upload started");
        let result = self
            .transport
            .upload(&file, self.progress_callback())
            .await;

        match result {
            Ok(uploaded) => {
                info!(file = %file.file_name, id = ?uploaded.id, "upload completed");

                let consumed = {
                    let mut st = self.state();
                    st.progress = 0;
                    st.upload_phase = UploadPhase::Refreshing;
                    // A newer selection made during the upload stays pending.
                    if st.selection.as_ref().is_some_and(|s| s.id == selection_id) {
                        st.selection.take()
                    } else {
                        None
                    }
                };
                if consumed.is_some() {
                    drop(consumed);
                    self.emit(LifecycleEvent::SelectionChanged);
                }

                let refreshed = self.reload().await;

                let notification = {
                    let mut st = self.state();
                    if refreshed {
                        st.notification.clear();
                    }
                    st.loading = false;
                    st.upload_phase = st.settled_upload_phase();
                    st.notification.get().cloned()
                };
                self.emit(LifecycleEvent::Notification(notification));
                self.emit(LifecycleEvent::Loading(false));
                Outcome::Completed
            }
            Err(err) => {
                warn!(
                    file = %file.file_name,
                    status = err.status(),
                    error = %err,
                    "upload failed"
                );
                let notification = Notification::from_transport(&err, UPLOAD_FAILED);
                {
                    let mut st = self.state();
                    st.notification.set(notification.clone());
                    st.loading = false;
                    st.progress = 0;
                    st.upload_phase = st.settled_upload_phase();
                }
                self.emit(LifecycleEvent::Notification(Some(notification)));
                self.emit(LifecycleEvent::Loading(false));
                Outcome::Failed
            }
        }
    }

    fn progress_callback(&self) -> ProgressCallback {
        let state = Arc::clone(&self.state);
        let events_tx = self.events_tx.clone();
        Box::new(move |pct| {
            if let Ok(mut st) = state.lock() {
                st.progress = pct;
            }
            let _ = events_tx.send(LifecycleEvent::Progress(pct));
        })
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Deletes one asset, filters it out locally, then refreshes the list.
    ///
    /// If the refresh fails the filtered store is kept and the refresh
    /// failure is surfaced instead.
    pub async fn delete_asset(&self, content_hash: &str) -> Outcome {
        let _guard = self.locks.acquire(content_hash).await;

        let prior = {
            let mut st = self.state();
            let prior = st.asset_phase(content_hash);
            st.set_asset_phase(content_hash, AssetPhase::Deleting);
            prior
        };

        match self.transport.delete(content_hash).await {
            Ok(resp) => {
                info!(hash = %content_hash, "asset deleted");
                let (count, notification) = {
                    let mut st = self.state();
                    st.store.remove(content_hash);
                    st.dimensions.forget(content_hash);
                    if let Some(message) = resp.message {
                        st.notification.set(Notification::success(message));
                    }
                    st.set_asset_phase(content_hash, AssetPhase::Refreshing);
                    (st.store.len(), st.notification.get().cloned())
                };
                self.emit(LifecycleEvent::AssetsChanged { count });
                self.emit(LifecycleEvent::Notification(notification));

                self.reload().await;
                self.state()
                    .set_asset_phase(content_hash, AssetPhase::Idle);
                Outcome::Completed
            }
            Err(err) => {
                error!(
                    hash = %content_hash,
                    status = err.status(),
                    error = %err,
                    "delete failed"
                );
                self.state().set_asset_phase(content_hash, prior);
                self.notify(Notification::from_transport(&err, DELETE_FAILED));
                Outcome::Failed
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dimensions
    // -----------------------------------------------------------------------

    /// Records one user-entered dimension. Purely local.
    pub fn set_pending_dimension(
        &self,
        content_hash: &str,
        field: Dimension,
        value: i64,
    ) -> DimensionEdit {
        let mut st = self.state();
        let edit = st.dimensions.set(content_hash, field, value);
        if st.asset_phase(content_hash) == AssetPhase::Idle {
            st.set_asset_phase(content_hash, AssetPhase::EditingDimensions);
        }
        edit
    }

    /// Sends the pending edit for `content_hash`, then refreshes the list.
    ///
    /// Skipped when no edit exists. Zero or negative values are sent as-is.
    /// On success the edit is reset to `{0, 0}`; on failure it is kept.
    pub async fn commit_dimensions(&self, content_hash: &str) -> Outcome {
        let _guard = self.locks.acquire(content_hash).await;

        let edit = self.state().dimensions.get(content_hash);
        let Some(edit) = edit else {
            debug!(hash = %content_hash, "no pending dimensions, ignoring commit");
            return Outcome::Skipped;
        };
        self.state()
            .set_asset_phase(content_hash, AssetPhase::Committing);

        match self
            .transport
            .update_dimensions(content_hash, edit.width, edit.height)
            .await
        {
            Ok(resp) => {
                info!(
                    hash = %content_hash,
                    width = edit.width,
                    height = edit.height,
                    "dimensions updated"
                );
                if let Some(message) = resp.message {
                    self.notify(Notification::success(message));
                }
                self.state()
                    .set_asset_phase(content_hash, AssetPhase::Refreshing);

                self.reload().await;

                let mut st = self.state();
                st.dimensions.reset(content_hash);
                st.set_asset_phase(content_hash, AssetPhase::Idle);
                Outcome::Completed
            }
            Err(err) => {
                error!(
                    hash = %content_hash,
                    status = err.status(),
                    error = %err,
                    "dimension update failed"
                );
                self.state()
                    .set_asset_phase(content_hash, AssetPhase::EditingDimensions);
                self.notify(Notification::from_transport(&err, UPDATE_FAILED));
                Outcome::Failed
            }
        }
    }

    // -----------------------------------------------------------------------
    // Preview modal and notification
    // -----------------------------------------------------------------------

    /// Shows `url` in the preview modal.
    pub fn open_preview(&self, url: impl Into<String>) {
        let modal = {
            let mut st = self.state();
            st.preview = PreviewModal {
                visible: true,
                url: Some(url.into()),
            };
            st.preview.clone()
        };
        self.emit(LifecycleEvent::PreviewChanged(modal));
    }

    /// Shows the original of a stored asset, falling back to its display
    /// rendition. Returns `false` if the hash is unknown.
    pub fn open_original(&self, content_hash: &str) -> bool {
        let url = self
            .state()
            .store
            .get(content_hash)
            .map(|a| a.original_or_display().to_string());
        match url {
            Some(url) => {
                self.open_preview(url);
                true
            }
            None => false,
        }
    }

    /// Hides the preview modal and forgets its URL.
    pub fn close_preview(&self) {
        let modal = {
            let mut st = self.state();
            st.preview = PreviewModal::default();
            st.preview.clone()
        };
        self.emit(LifecycleEvent::PreviewChanged(modal));
    }

    /// Clears the live notification.
    pub fn dismiss_notification(&self) {
        if self.state().notification.clear() {
            self.emit(LifecycleEvent::Notification(None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use assetdeck_protocol::{MessageResponse, TransportError, UploadFile, UploadResult};
    use assetdeck_transfer::ProgressScope;
    use tokio::sync::Notify;

    use crate::notification::NotificationKind;
    use crate::selection::LocalPreviews;
    use crate::transport::TransportFuture;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List,
        Upload(String),
        Delete(String),
        Update(String, i64, i64),
    }

    type Scripted<T> = Mutex<VecDeque<Result<T, TransportError>>>;

    #[derive(Default)]
    struct MockTransport {
        lists: Scripted<Vec<Asset>>,
        uploads: Scripted<UploadResult>,
        deletes: Scripted<MessageResponse>,
        updates: Scripted<MessageResponse>,
        calls: Mutex<Vec<Call>>,
        upload_gate: Option<Arc<Notify>>,
        delete_gate: Option<Arc<Notify>>,
        list_gate: Option<Arc<Notify>>,
    }

    impl MockTransport {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn push_list(&self, r: Result<Vec<Asset>, TransportError>) {
            self.lists.lock().unwrap().push_back(r);
        }

        fn push_upload(&self, r: Result<UploadResult, TransportError>) {
            self.uploads.lock().unwrap().push_back(r);
        }

        fn push_delete(&self, r: Result<MessageResponse, TransportError>) {
            self.deletes.lock().unwrap().push_back(r);
        }

        fn push_update(&self, r: Result<MessageResponse, TransportError>) {
            self.updates.lock().unwrap().push_back(r);
        }
    }

    fn unscripted<T>() -> Result<T, TransportError> {
        Err(TransportError::Network("no scripted response".into()))
    }

    impl AssetTransport for MockTransport {
        fn list(&self) -> TransportFuture<'_, Vec<Asset>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(Call::List);
                if let Some(gate) = &self.list_gate {
                    gate.notified().await;
                }
                self.lists
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok(Vec::new()))
            })
        }

        fn upload<'a>(
            &'a self,
            file: &'a UploadFile,
            on_progress: ProgressCallback,
        ) -> TransportFuture<'a, UploadResult> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(Call::Upload(file.file_name.clone()));
                let scope = ProgressScope::attach(file.len(), on_progress);
                let quarter = file.len() / 4;
                scope.record(quarter);
                scope.record(quarter);
                if let Some(gate) = &self.upload_gate {
                    gate.notified().await;
                }
                scope.record(file.len() - 3 * quarter);

                let result = self
                    .uploads
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(unscripted);
                if result.is_ok() {
                    scope.complete();
                }
                result
            })
        }

        fn delete<'a>(&'a self, content_hash: &'a str) -> TransportFuture<'a, MessageResponse> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(Call::Delete(content_hash.to_string()));
                if let Some(gate) = &self.delete_gate {
                    gate.notified().await;
                }
                self.deletes
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(unscripted)
            })
        }

        fn update_dimensions<'a>(
            &'a self,
            content_hash: &'a str,
            width: i64,
            height: i64,
        ) -> TransportFuture<'a, MessageResponse> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(Call::Update(
                    content_hash.to_string(),
                    width,
                    height,
                ));
                self.updates
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(unscripted)
            })
        }
    }

    /// Preview provider logging create/release order.
    #[derive(Default)]
    struct CountingPreviews {
        log: Mutex<Vec<String>>,
        next: AtomicUsize,
    }

    impl CountingPreviews {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.log().iter().filter(|e| e.starts_with(prefix)).count()
        }
    }

    impl PreviewProvider for CountingPreviews {
        fn create(&self, _file: &SelectedFile) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            self.log.lock().unwrap().push(format!("create:{n}"));
            format!("preview:{n}")
        }

        fn release(&self, url: &str) {
            let n = url.trim_start_matches("preview:");
            self.log.lock().unwrap().push(format!("release:{n}"));
        }
    }

    fn asset(hash: &str) -> Asset {
        Asset {
            content_hash: hash.into(),
            display_url: format!("https://cdn/{hash}.jpg"),
            original_url: Some(format!("https://cdn/{hash}.png")),
            width: 0,
            height: 0,
        }
    }

    fn png(name: &str) -> SelectedFile {
        SelectedFile::from_bytes(name, vec![0u8; 400])
    }

    fn controller(transport: &Arc<MockTransport>) -> (LifecycleController, Arc<CountingPreviews>) {
        let previews = Arc::new(CountingPreviews::default());
        let c = LifecycleController::new(transport.clone(), previews.clone());
        (c, previews)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    // --- list ---------------------------------------------------------------

    #[tokio::test]
    async fn refresh_replaces_store_in_order() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Ok(vec![asset("b"), asset("a")]));
        let (c, _) = controller(&transport);

        assert_eq!(c.refresh().await, Outcome::Completed);
        let hashes: Vec<String> = c.assets().into_iter().map(|a| a.content_hash).collect();
        assert_eq!(hashes, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn refresh_twice_is_idempotent() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Ok(vec![asset("a"), asset("b")]));
        transport.push_list(Ok(vec![asset("a"), asset("b")]));
        let (c, _) = controller(&transport);

        c.refresh().await;
        let first = c.assets();
        c.refresh().await;
        assert_eq!(c.assets(), first);
    }

    #[tokio::test]
    async fn refresh_failure_is_surfaced_and_store_kept() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Ok(vec![asset("a")]));
        transport.push_list(Err(TransportError::Unstructured { status: 503 }));
        let (c, _) = controller(&transport);

        c.refresh().await;
        assert_eq!(c.refresh().await, Outcome::Failed);

        assert_eq!(c.assets(), vec![asset("a")]);
        let n = c.notification().unwrap();
        assert_eq!(n.message, "Failed to load images");
        assert_eq!(n.code.as_deref(), Some("503"));
    }

    // --- upload -------------------------------------------------------------

    #[tokio::test]
    async fn upload_without_selection_is_noop() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Err(TransportError::Unstructured { status: 500 }));
        let (c, _) = controller(&transport);
        c.refresh().await;
        let before = c.notification();
        let calls_before = transport.calls().len();

        assert_eq!(c.start_upload().await, Outcome::Skipped);

        assert!(!c.is_loading());
        assert_eq!(c.notification(), before);
        assert_eq!(transport.calls().len(), calls_before);
        assert_eq!(c.upload_phase(), UploadPhase::Idle);
    }

    #[tokio::test]
    async fn upload_success_refreshes_and_clears_selection() {
        let transport = Arc::new(MockTransport::default());
        transport.push_upload(Ok(UploadResult::default()));
        transport.push_list(Ok(vec![asset("new")]));
        let (c, previews) = controller(&transport);
        let mut rx = c.take_events().unwrap();

        c.select_file(png("cat.png"));
        assert_eq!(c.upload_phase(), UploadPhase::Selecting);

        assert_eq!(c.start_upload().await, Outcome::Completed);

        assert_eq!(
            transport.calls(),
            vec![Call::Upload("cat.png".into()), Call::List]
        );
        assert_eq!(c.assets(), vec![asset("new")]);
        assert!(c.pending_selection().is_none());
        assert!(c.notification().is_none());
        assert!(!c.is_loading());
        assert_eq!(c.progress(), 0);
        assert_eq!(c.upload_phase(), UploadPhase::Idle);
        assert_eq!(previews.count("create"), previews.count("release"));

        let events = drain(&mut rx);
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert_eq!(progress.last(), Some(&100));

        let hundred = events
            .iter()
            .position(|e| *e == LifecycleEvent::Progress(100))
            .unwrap();
        let done = events
            .iter()
            .position(|e| *e == LifecycleEvent::Loading(false))
            .unwrap();
        let started = events
            .iter()
            .position(|e| *e == LifecycleEvent::Loading(true))
            .unwrap();
        assert!(started < hundred);
        assert!(hundred < done);
    }

    #[tokio::test]
    async fn upload_rejection_becomes_notification() {
        let transport = Arc::new(MockTransport::default());
        transport.push_upload(Err(TransportError::Rejection {
            status: 413,
            detail: "too large".into(),
        }));
        let (c, previews) = controller(&transport);

        c.select_file(png("huge.png"));
        assert_eq!(c.start_upload().await, Outcome::Failed);

        let n = c.notification().unwrap();
        assert_eq!(n.message, "too large");
        assert_eq!(n.code.as_deref(), Some("413"));
        assert_eq!(n.kind, NotificationKind::Error);

        // Selection and its preview survive for a manual retry.
        assert_eq!(c.pending_selection().unwrap().file_name, "huge.png");
        assert_eq!(previews.count("release"), 0);
        assert!(!c.is_loading());
        assert_eq!(c.upload_phase(), UploadPhase::Selecting);
        // No refresh after a failed upload.
        assert_eq!(transport.calls(), vec![Call::Upload("huge.png".into())]);
    }

    #[tokio::test]
    async fn upload_failure_never_reports_completion() {
        let transport = Arc::new(MockTransport::default());
        transport.push_upload(Err(TransportError::Rejection {
            status: 413,
            detail: "too large".into(),
        }));
        let (c, _) = controller(&transport);
        let mut rx = c.take_events().unwrap();

        c.select_file(png("huge.png"));
        assert_eq!(c.start_upload().await, Outcome::Failed);

        let progress: Vec<u8> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                LifecycleEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        // Every byte was handed over, yet the upload was not accepted.
        assert_eq!(progress.last(), Some(&99));
        assert!(!progress.contains(&100), "{progress:?}");
        assert_eq!(c.progress(), 0);
    }

    #[tokio::test]
    async fn upload_failure_without_body_uses_default_message() {
        let transport = Arc::new(MockTransport::default());
        transport.push_upload(Err(TransportError::Unstructured { status: 500 }));
        let (c, _) = controller(&transport);

        c.select_file(png("cat.png"));
        c.start_upload().await;

        let n = c.notification().unwrap();
        assert_eq!(n.message, "Upload failed");
        assert_eq!(n.code.as_deref(), Some("500"));
    }

    #[tokio::test]
    async fn upload_network_failure_reports_status_zero() {
        let transport = Arc::new(MockTransport::default());
        transport.push_upload(Err(TransportError::Network("refused".into())));
        let (c, _) = controller(&transport);

        c.select_file(png("cat.png"));
        c.start_upload().await;

        let n = c.notification().unwrap();
        assert_eq!(n.message, "network error");
        assert_eq!(n.code.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn retry_after_failure_clears_notification_on_start() {
        let transport = Arc::new(MockTransport::default());
        transport.push_upload(Err(TransportError::Unstructured { status: 500 }));
        transport.push_upload(Ok(UploadResult::default()));
        let (c, _) = controller(&transport);

        c.select_file(png("cat.png"));
        c.start_upload().await;
        assert!(c.notification().is_some());

        assert_eq!(c.start_upload().await, Outcome::Completed);
        assert!(c.notification().is_none());
        assert!(c.pending_selection().is_none());
    }

    #[tokio::test]
    async fn second_upload_ignored_while_first_in_flight() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport {
            upload_gate: Some(gate.clone()),
            ..Default::default()
        });
        transport.push_upload(Ok(UploadResult::default()));
        let (c, _) = controller(&transport);
        c.select_file(png("cat.png"));

        let first = c.start_upload();
        let second = async {
            tokio::task::yield_now().await;
            assert!(c.is_loading());
            assert_eq!(c.upload_phase(), UploadPhase::Uploading);
            let r = c.start_upload().await;
            gate.notify_one();
            r
        };
        let (a, b) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(first, second)
        })
        .await
        .unwrap();

        assert_eq!(a, Outcome::Completed);
        assert_eq!(b, Outcome::Skipped);
        let uploads = transport
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upload(_)))
            .count();
        assert_eq!(uploads, 1);
    }

    #[tokio::test]
    async fn second_upload_ignored_while_refreshing() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport {
            list_gate: Some(gate.clone()),
            ..Default::default()
        });
        transport.push_upload(Ok(UploadResult::default()));
        let (c, _) = controller(&transport);
        c.select_file(png("first.png"));

        let first = c.start_upload();
        let second = async {
            while c.upload_phase() != UploadPhase::Refreshing {
                tokio::task::yield_now().await;
            }
            assert!(c.is_loading());
            c.select_file(png("second.png"));
            let r = c.start_upload().await;
            gate.notify_one();
            r
        };
        let (a, b) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(first, second)
        })
        .await
        .unwrap();

        assert_eq!(a, Outcome::Completed);
        assert_eq!(b, Outcome::Skipped);
        assert_eq!(
            transport.calls(),
            vec![Call::Upload("first.png".into()), Call::List]
        );
        assert_eq!(c.pending_selection().unwrap().file_name, "second.png");
        assert_eq!(c.upload_phase(), UploadPhase::Selecting);
    }

    #[tokio::test]
    async fn selection_made_during_upload_stays_pending() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport {
            upload_gate: Some(gate.clone()),
            ..Default::default()
        });
        transport.push_upload(Ok(UploadResult::default()));
        let (c, previews) = controller(&transport);
        c.select_file(png("first.png"));

        let upload = c.start_upload();
        let reselect = async {
            tokio::task::yield_now().await;
            c.select_file(png("second.png"));
            gate.notify_one();
        };
        let (outcome, ()) = tokio::join!(upload, reselect);

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(c.pending_selection().unwrap().file_name, "second.png");
        assert_eq!(c.upload_phase(), UploadPhase::Selecting);
        assert_eq!(previews.log(), vec!["create:1", "release:1", "create:2"]);
    }

    // --- selection ----------------------------------------------------------

    #[tokio::test]
    async fn reselect_releases_previous_preview_first() {
        let transport = Arc::new(MockTransport::default());
        let (c, previews) = controller(&transport);

        c.select_file(png("a.png"));
        c.select_file(png("b.png"));
        c.select_file(png("c.png"));

        assert_eq!(
            previews.log(),
            vec![
                "create:1",
                "release:1",
                "create:2",
                "release:2",
                "create:3"
            ]
        );
        assert_eq!(c.pending_selection().unwrap().preview_url, "preview:3");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn dropping_controller_releases_preview() {
        let transport = Arc::new(MockTransport::default());
        let previews = Arc::new(LocalPreviews::new());
        let c = LifecycleController::new(transport, previews.clone());

        c.select_file(png("a.png"));
        assert_eq!(previews.live_count(), 1);
        drop(c);
        assert_eq!(previews.live_count(), 0);
    }

    #[tokio::test]
    async fn clear_selection_releases_preview() {
        let transport = Arc::new(MockTransport::default());
        let (c, previews) = controller(&transport);

        c.select_file(png("a.png"));
        assert!(c.clear_selection());
        assert!(!c.clear_selection());
        assert_eq!(previews.log(), vec!["create:1", "release:1"]);
        assert_eq!(c.upload_phase(), UploadPhase::Idle);
    }

    // --- delete -------------------------------------------------------------

    #[tokio::test]
    async fn delete_removes_only_target() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Ok(vec![asset("a"), asset("b"), asset("c")]));
        transport.push_delete(Ok(MessageResponse {
            message: Some("Image deleted".into()),
        }));
        transport.push_list(Ok(vec![asset("a"), asset("c")]));
        let (c, _) = controller(&transport);
        c.refresh().await;

        assert_eq!(c.delete_asset("b").await, Outcome::Completed);

        assert_eq!(c.assets(), vec![asset("a"), asset("c")]);
        let n = c.notification().unwrap();
        assert_eq!(n.message, "Image deleted");
        assert_eq!(n.kind, NotificationKind::Success);
        assert_eq!(
            transport.calls(),
            vec![Call::List, Call::Delete("b".into()), Call::List]
        );
        assert_eq!(c.asset_phase("b"), AssetPhase::Idle);
    }

    #[tokio::test]
    async fn delete_keeps_local_filter_when_refresh_fails() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Ok(vec![asset("a"), asset("b")]));
        transport.push_delete(Ok(MessageResponse::default()));
        transport.push_list(Err(TransportError::Unstructured { status: 502 }));
        let (c, _) = controller(&transport);
        c.refresh().await;

        assert_eq!(c.delete_asset("a").await, Outcome::Completed);

        assert_eq!(c.assets(), vec![asset("b")]);
        assert_eq!(c.notification().unwrap().message, "Failed to load images");
    }

    #[tokio::test]
    async fn delete_failure_is_surfaced_and_store_untouched() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(Ok(vec![asset("a"), asset("b")]));
        transport.push_delete(Err(TransportError::Rejection {
            status: 404,
            detail: "Image not found".into(),
        }));
        let (c, _) = controller(&transport);
        c.refresh().await;

        assert_eq!(c.delete_asset("a").await, Outcome::Failed);

        assert_eq!(c.assets(), vec![asset("a"), asset("b")]);
        let n = c.notification().unwrap();
        assert_eq!(n.message, "Image not found");
        assert_eq!(n.code.as_deref(), Some("404"));
        assert_eq!(transport.calls(), vec![Call::List, Call::Delete("a".into())]);
    }

    #[tokio::test]
    async fn delete_failure_without_detail_uses_default() {
        let transport = Arc::new(MockTransport::default());
        transport.push_delete(Err(TransportError::Unstructured { status: 500 }));
        let (c, _) = controller(&transport);

        c.delete_asset("a").await;
        assert_eq!(c.notification().unwrap().message, "Delete failed");
    }

    // --- dimensions ---------------------------------------------------------

    #[tokio::test]
    async fn commit_sends_pending_edit_and_resets_only_target() {
        let transport = Arc::new(MockTransport::default());
        transport.push_update(Ok(MessageResponse {
            message: Some("Image resized".into()),
        }));
        transport.push_list(Ok(vec![asset("a"), asset("b")]));
        let (c, _) = controller(&transport);

        c.set_pending_dimension("a", Dimension::Width, 200);
        c.set_pending_dimension("a", Dimension::Height, 100);
        c.set_pending_dimension("b", Dimension::Width, 640);
        assert_eq!(c.asset_phase("a"), AssetPhase::EditingDimensions);

        assert_eq!(c.commit_dimensions("a").await, Outcome::Completed);

        assert_eq!(
            transport.calls(),
            vec![Call::Update("a".into(), 200, 100), Call::List]
        );
        assert_eq!(
            c.pending_dimensions("a"),
            Some(DimensionEdit { width: 0, height: 0 })
        );
        assert_eq!(
            c.pending_dimensions("b"),
            Some(DimensionEdit { width: 640, height: 0 })
        );
        assert_eq!(c.notification().unwrap().message, "Image resized");
        assert_eq!(c.asset_phase("a"), AssetPhase::Idle);
        assert_eq!(c.assets().len(), 2);
    }

    #[tokio::test]
    async fn commit_without_edit_is_skipped() {
        let transport = Arc::new(MockTransport::default());
        let (c, _) = controller(&transport);

        assert_eq!(c.commit_dimensions("a").await, Outcome::Skipped);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn commit_zero_and_negative_values_are_sent() {
        let transport = Arc::new(MockTransport::default());
        transport.push_update(Err(TransportError::Rejection {
            status: 422,
            detail: "width must be positive".into(),
        }));
        let (c, _) = controller(&transport);

        c.set_pending_dimension("a", Dimension::Width, -1);
        assert_eq!(c.commit_dimensions("a").await, Outcome::Failed);

        assert_eq!(transport.calls(), vec![Call::Update("a".into(), -1, 0)]);
        assert_eq!(c.notification().unwrap().message, "width must be positive");
    }

    #[tokio::test]
    async fn commit_failure_keeps_pending_edit() {
        let transport = Arc::new(MockTransport::default());
        transport.push_update(Err(TransportError::Unstructured { status: 500 }));
        let (c, _) = controller(&transport);

        c.set_pending_dimension("a", Dimension::Width, 300);
        c.set_pending_dimension("a", Dimension::Height, 150);
        assert_eq!(c.commit_dimensions("a").await, Outcome::Failed);

        assert_eq!(
            c.pending_dimensions("a"),
            Some(DimensionEdit { width: 300, height: 150 })
        );
        assert_eq!(c.notification().unwrap().message, "Update failed");
        assert_eq!(c.asset_phase("a"), AssetPhase::EditingDimensions);
    }

    // --- concurrency --------------------------------------------------------

    #[tokio::test]
    async fn commit_waits_for_delete_of_same_hash() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport {
            delete_gate: Some(gate.clone()),
            ..Default::default()
        });
        transport.push_delete(Ok(MessageResponse::default()));
        let (c, _) = controller(&transport);
        c.set_pending_dimension("a", Dimension::Width, 10);

        let delete = c.delete_asset("a");
        let commit = async {
            tokio::task::yield_now().await;
            c.commit_dimensions("a").await
        };
        let release = async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            gate.notify_one();
        };
        let (d, m, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(delete, commit, release)
        })
        .await
        .unwrap();

        assert_eq!(d, Outcome::Completed);
        // The edit went away with the asset, so nothing is sent.
        assert_eq!(m, Outcome::Skipped);
        assert!(
            !transport
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Update(..)))
        );
    }

    #[tokio::test]
    async fn different_hashes_run_concurrently() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport {
            delete_gate: Some(gate.clone()),
            ..Default::default()
        });
        transport.push_delete(Ok(MessageResponse::default()));
        transport.push_update(Ok(MessageResponse::default()));
        let (c, _) = controller(&transport);
        c.set_pending_dimension("b", Dimension::Height, 50);

        let delete = c.delete_asset("a");
        let commit = async {
            // Completes while the delete of "a" is still blocked.
            let r = c.commit_dimensions("b").await;
            assert_eq!(c.asset_phase("a"), AssetPhase::Deleting);
            gate.notify_one();
            r
        };
        let (d, m) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(delete, commit)
        })
        .await
        .unwrap();

        assert_eq!(d, Outcome::Completed);
        assert_eq!(m, Outcome::Completed);
    }

    // --- preview and notification -------------------------------------------

    #[tokio::test]
    async fn preview_open_and_close() {
        let transport = Arc::new(MockTransport::default());
        let mut legacy = asset("old");
        legacy.original_url = None;
        transport.push_list(Ok(vec![asset("a"), legacy]));
        let (c, _) = controller(&transport);
        c.refresh().await;

        assert!(c.open_original("a"));
        assert_eq!(
            c.preview(),
            PreviewModal {
                visible: true,
                url: Some("https://cdn/a.png".into())
            }
        );

        c.close_preview();
        assert_eq!(c.preview(), PreviewModal::default());

        assert!(c.open_original("old"));
        assert_eq!(c.preview().url.as_deref(), Some("https://cdn/old.jpg"));

        assert!(!c.open_original("missing"));
        assert!(transport.calls().iter().all(|c| *c == Call::List));
    }

    #[tokio::test]
    async fn dismiss_clears_notification() {
        let transport = Arc::new(MockTransport::default());
        transport.push_delete(Err(TransportError::Unstructured { status: 500 }));
        let (c, _) = controller(&transport);
        let mut rx = c.take_events().unwrap();

        c.delete_asset("a").await;
        c.dismiss_notification();

        assert!(c.notification().is_none());
        assert_eq!(
            drain(&mut rx).last(),
            Some(&LifecycleEvent::Notification(None))
        );
    }

    #[tokio::test]
    async fn take_events_once() {
        let transport = Arc::new(MockTransport::default());
        let (c, _) = controller(&transport);
        assert!(c.take_events().is_some());
        assert!(c.take_events().is_none());
    }
}
