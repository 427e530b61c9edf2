//! The item store: shell around the Crux core plus the CRUD and upload
//! workflow.
//!
//! The core owns the model and changes it only in `update`. The store runs
//! the effects the core cannot: it awaits HTTP and file reads, then feeds
//! the outcome back as an event. No core lock is held across an await, and
//! every reconciliation is applied by id to whatever the collection holds
//! when the result arrives.

use crux_core::Core;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::api;
use crate::app::{Catalog, CatalogCapabilities, Effect};
use crate::capabilities::{Capabilities, ViewChannel};
use crate::config::StoreConfig;
use crate::event::Event;
use crate::model::{
    FileRef, FormDraft, ImageUrl, Item, ItemCollection, ItemField, ItemId, ItemPayload, LatLon,
    SubmissionState, ViewModel,
};
use crate::{AppError, AppResult, ErrorKind};

pub struct ItemStore {
    config: StoreConfig,
    caps: Capabilities,
    core: Core<Effect, Catalog>,
    views: ViewChannel,
    submission_slot: Mutex<()>,
}

// ============================================================================
// Construction & snapshots
// ============================================================================

impl ItemStore {
    pub fn new(config: StoreConfig, caps: Capabilities) -> Self {
        let store = Self {
            caps,
            core: Core::new::<CatalogCapabilities>(),
            views: ViewChannel::default(),
            submission_slot: Mutex::new(()),
            config,
        };
        store.process(Event::Configured {
            placeholder_image: store.config.placeholder_image.clone(),
        });
        store
    }

    /// Store backed by reqwest and the local filesystem.
    #[cfg(feature = "native-http")]
    pub fn native(config: StoreConfig) -> Self {
        Self::new(config, Capabilities::native())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn view(&self) -> ViewModel {
        self.core.view()
    }

    /// Receives a `ViewModel` at every completion point.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.views.subscribe()
    }

    pub fn items(&self) -> ItemCollection {
        ItemCollection::from_items(self.view().items)
    }

    pub fn draft(&self) -> FormDraft {
        self.view().draft
    }

    pub fn is_modal_visible(&self) -> bool {
        self.view().show_modal
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.view().submission
    }

    pub fn is_submitting(&self) -> bool {
        self.submission_state().is_active()
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.view().active_error
    }

    /// Runs `event` through the core and handles the effects it requests.
    fn process(&self, event: Event) {
        for effect in self.core.process_event(event) {
            match effect {
                Effect::Render(_) => self.views.publish(|| self.core.view()),
            }
        }
    }

    fn surface(&self, operation: &'static str, err: AppError) -> AppError {
        error!(
            operation,
            code = err.code(),
            internal = err.internal_message.as_deref().unwrap_or(""),
            "{}",
            err.message
        );
        self.process(Event::OperationFailed(Box::new(err.clone())));
        err
    }

    fn settle<T>(&self, operation: &'static str, result: AppResult<T>) -> AppResult<T> {
        result.map_err(|err| self.surface(operation, err))
    }
}

// ============================================================================
// Synchronous intents
// ============================================================================

impl ItemStore {
    pub fn dispatch(&self, event: Event) {
        debug!(event = event.name(), "dispatch");
        self.process(event);
    }

    pub fn set_draft_field(&self, field: ItemField, value: impl Into<String>) {
        self.process(Event::FieldChanged {
            field,
            value: value.into(),
        });
    }

    /// Returns whether `name` was a known field.
    pub fn set_draft_field_by_name(&self, name: &str, value: impl Into<String>) -> bool {
        let known = ItemField::parse(name).is_some();
        self.process(Event::FieldChangedByName {
            name: name.to_string(),
            value: value.into(),
        });
        known
    }

    pub fn load_draft_from_item(&self, item: &Item) {
        self.process(Event::EditItemSelected(Box::new(item.clone())));
    }

    pub fn set_pending_file(&self, file: Option<FileRef>) {
        self.process(Event::FileSelected(file));
    }

    pub fn apply_location(&self, coordinate: LatLon) {
        self.process(Event::LocationChosen(coordinate));
    }

    pub fn reset_draft(&self) {
        self.process(Event::ResetDraft);
    }

    pub fn show_modal(&self) {
        self.process(Event::ShowModal);
    }

    pub fn hide_modal(&self) {
        self.process(Event::HideModal);
    }

    pub fn dismiss_error(&self) {
        self.process(Event::DismissError);
    }
}

// ============================================================================
// Submission phase
// ============================================================================

/// Holds the submission slot; returns the core to `Idle` when dropped.
struct Submission<'a> {
    store: &'a ItemStore,
    _slot: MutexGuard<'a, ()>,
}

impl<'a> Submission<'a> {
    /// Claims the slot for `draft`. A claim while another submission runs is
    /// refused with `InvalidState` and leaves the core untouched.
    fn begin(store: &'a ItemStore, draft: &FormDraft) -> AppResult<Self> {
        let Ok(slot) = store.submission_slot.try_lock() else {
            let phase = store.submission_state();
            warn!(phase = phase.as_str(), "submission already in progress");
            return Err(AppError::new(
                ErrorKind::InvalidState,
                "A submission is already in progress",
            )
            .with_context("phase", phase.as_str()));
        };

        store.process(Event::SubmissionStarted(initial_phase(draft)));
        Ok(Self {
            store,
            _slot: slot,
        })
    }

    fn advance(&self, phase: SubmissionState) {
        self.store.process(Event::SubmissionAdvanced(phase));
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.store.process(Event::SubmissionFinished);
    }
}

// ============================================================================
// Async operations
// ============================================================================

impl ItemStore {
    /// Replaces the collection with the backend listing.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> AppResult<ItemCollection> {
        let result = self.fetch_items().await;
        let items = self.settle("fetch_all", result)?;

        self.process(Event::ItemsFetched(items));
        Ok(self.items())
    }

    async fn fetch_items(&self) -> AppResult<Vec<Item>> {
        let request = api::list_items(&self.config)?;
        let response = self.caps.http.execute(request).await?;
        api::decode_items(response)
    }

    /// Uploads `file` and returns the hosted URL. Touches no store state.
    #[instrument(skip(self, file), fields(file_name = %file.file_name()))]
    pub async fn upload_pending_file(&self, file: &FileRef) -> AppResult<ImageUrl> {
        let data = self
            .caps
            .files
            .read(file)
            .await
            .map_err(|e| AppError::from(e).into_upload())?;
        let size = data.len();

        let request =
            api::upload_file(&self.config, file, data).map_err(AppError::into_upload)?;
        let response = self
            .caps
            .http
            .execute(request)
            .await
            .map_err(|e| AppError::from(e).into_upload())?;

        let url = api::decode_upload(response).inspect_err(|e| {
            warn!(code = e.code(), "upload rejected: {}", e.message);
        })?;
        info!(size, image_url = %url, "file uploaded");
        Ok(url)
    }

    /// Creates an item from the current draft, then reloads the collection.
    ///
    /// The draft is left as is on success and on failure. A failed reload
    /// after a successful create is surfaced as the active error but does
    /// not fail the call. A call made while another submission is running
    /// is refused without touching the active error.
    #[instrument(skip(self))]
    pub async fn add_item(&self) -> AppResult<()> {
        let draft = self.draft();
        self.settle("add_item", draft.validate())?;

        let submission = Submission::begin(self, &draft)?;
        let result = self.create_from(&draft, &submission).await;
        drop(submission);
        self.settle("add_item", result)?;

        if let Err(err) = self.fetch_all().await {
            warn!(code = err.code(), "item created but reload failed");
        }
        Ok(())
    }

    async fn create_from(&self, draft: &FormDraft, submission: &Submission<'_>) -> AppResult<()> {
        let payload = self.resolve_payload(draft, submission).await?;

        let request = api::create_item(&self.config, &payload)?;
        let response = self.caps.http.execute(request).await?;
        let response = response.error_for_status()?;

        match response.json::<Item>() {
            Ok(created) => info!(item_id = %created.id, "item created"),
            Err(e) => debug!("create response carried no item: {e}"),
        }
        Ok(())
    }

    /// Updates `target_id` from `draft` and swaps the response into the
    /// collection by its id.
    #[instrument(skip(self, draft), fields(item_id = %target_id, has_file = draft.pending_file.is_some()))]
    pub async fn edit_item(&self, draft: FormDraft, target_id: ItemId) -> AppResult<Item> {
        self.settle("edit_item", draft.validate())?;

        let submission = Submission::begin(self, &draft)?;
        let result = self.update_from(&draft, &target_id, &submission).await;
        drop(submission);
        let updated = self.settle("edit_item", result)?;

        if updated.id != target_id {
            warn!(response_id = %updated.id, "update response id differs from target");
        }
        self.process(Event::ItemUpdated(Box::new(updated.clone())));
        Ok(updated)
    }

    async fn update_from(
        &self,
        draft: &FormDraft,
        target_id: &ItemId,
        submission: &Submission<'_>,
    ) -> AppResult<Item> {
        let payload = self.resolve_payload(draft, submission).await?;

        let request = api::update_item(&self.config, target_id, &payload)?;
        let response = self.caps.http.execute(request).await?;
        api::decode_item(response)
    }

    #[instrument(skip(self), fields(item_id = %target_id))]
    pub async fn delete_item(&self, target_id: &ItemId) -> AppResult<()> {
        let result = self.delete_remote(target_id).await;
        self.settle("delete_item", result)?;

        self.process(Event::ItemDeleted(target_id.clone()));
        Ok(())
    }

    async fn delete_remote(&self, target_id: &ItemId) -> AppResult<()> {
        let request = api::delete_item(&self.config, target_id)?;
        let response = self.caps.http.execute(request).await?;
        api::decode_deleted(response)
    }

    /// Snapshot of the draft as a request body, with the uploaded URL in
    /// `image` when a file is pending. Upload failure ends the submission.
    async fn resolve_payload(
        &self,
        draft: &FormDraft,
        submission: &Submission<'_>,
    ) -> AppResult<ItemPayload> {
        let mut payload = draft.to_payload(&self.config.placeholder_image);

        if let Some(file) = &draft.pending_file {
            let url = self.upload_pending_file(file).await?;
            payload.image = url.0;
        }

        submission.advance(SubmissionState::Submitting);
        Ok(payload)
    }
}

fn initial_phase(draft: &FormDraft) -> SubmissionState {
    if draft.pending_file.is_some() {
        SubmissionState::UploadingFile
    } else {
        SubmissionState::Submitting
    }
}

impl std::fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view();
        f.debug_struct("ItemStore")
            .field("server_url", &self.config.server_url.as_str())
            .field("items", &view.items.len())
            .field("submission", &view.submission)
            .field("renders", &self.views.revision())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::testing::{mock_capabilities, MemoryFileSource, MockTransport};
    use crate::capabilities::HttpMethod;
    use crate::PLACEHOLDER_IMAGE_URL;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    fn item_json(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": "furniture",
            "itemName": name,
            "image": PLACEHOLDER_IMAGE_URL,
            "location": "Lobby",
            "description": ""
        })
    }

    fn store_with(http: &Arc<MockTransport>, files: &Arc<MemoryFileSource>) -> ItemStore {
        ItemStore::new(
            StoreConfig::default(),
            mock_capabilities(http.clone(), files.clone()),
        )
    }

    fn setup() -> (ItemStore, Arc<MockTransport>, Arc<MemoryFileSource>) {
        let http = Arc::new(MockTransport::new());
        let files = Arc::new(MemoryFileSource::new());
        (store_with(&http, &files), http, files)
    }

    fn chair_draft(store: &ItemStore) {
        store.set_draft_field(ItemField::Type, "furniture");
        store.set_draft_field(ItemField::ItemName, "Chair");
        store.set_draft_field(ItemField::Location, "Lobby");
    }

    async fn seed(store: &ItemStore, http: &MockTransport, items: serde_json::Value) {
        http.respond_json(HttpMethod::Get, "/items", 200, &items);
        store.fetch_all().await.unwrap();
    }

    mod intent_tests {
        use super::*;

        #[test]
        fn test_set_field_changes_only_that_field() {
            let (store, _, _) = setup();
            let before = store.draft();
            store.set_draft_field(ItemField::ItemName, "Chair");

            let after = store.draft();
            assert_eq!(after.item_name, "Chair");
            assert_eq!(after.item_type, before.item_type);
            assert_eq!(after.image, before.image);
            assert_eq!(after.location, before.location);
            assert_eq!(after.description, before.description);
            assert_eq!(after.pending_file, before.pending_file);
        }

        #[test]
        fn test_unknown_field_name_is_ignored() {
            let (store, _, _) = setup();
            let before = store.draft();
            assert!(!store.set_draft_field_by_name("price", "12"));
            assert_eq!(store.draft(), before);

            assert!(store.set_draft_field_by_name("description", "Oak"));
            assert_eq!(store.draft().description, "Oak");
        }

        #[test]
        fn test_load_draft_from_item_clears_file() {
            let (store, _, _) = setup();
            store.set_pending_file(Some(FileRef::new("/tmp/a.png")));
            let item: Item = serde_json::from_value(item_json("3", "Stool")).unwrap();

            store.load_draft_from_item(&item);
            let draft = store.draft();
            assert_eq!(draft.item_name, "Stool");
            assert_eq!(draft.item_type, "furniture");
            assert!(draft.pending_file.is_none());
        }

        #[test]
        fn test_modal_toggle_and_render() {
            let (store, _, _) = setup();
            let rx = store.subscribe();
            assert!(!store.is_modal_visible());

            store.dispatch(Event::ShowModal);
            assert!(store.is_modal_visible());
            assert!(rx.borrow().show_modal);

            store.dispatch(Event::HideModal);
            assert!(!rx.borrow().show_modal);
        }

        #[test]
        fn test_location_chosen_writes_coordinates() {
            let (store, _, _) = setup();
            store.dispatch(Event::LocationChosen(LatLon::new(40.5, -3.25).unwrap()));
            assert_eq!(store.draft().location, "40.5,-3.25");
        }

        #[tokio::test]
        async fn test_configured_placeholder_seeds_draft_and_payload() {
            let http = Arc::new(MockTransport::new());
            let config = StoreConfig::from_lookup(|key| {
                (key == crate::config::PLACEHOLDER_IMAGE_VAR).then(|| "http://cdn/blank.png".to_string())
            })
            .unwrap();
            let store = ItemStore::new(
                config,
                mock_capabilities(http.clone(), Arc::new(MemoryFileSource::new())),
            );
            assert_eq!(store.draft().image, "http://cdn/blank.png");
            assert_eq!(store.subscribe().borrow().draft.image, "http://cdn/blank.png");

            store.set_draft_field(ItemField::Image, "http://cdn/chair.png");
            store.reset_draft();
            assert_eq!(store.draft().image, "http://cdn/blank.png");

            store.set_draft_field(ItemField::ItemName, "Chair");
            store.set_draft_field(ItemField::Image, "");
            http.respond_json(HttpMethod::Post, "/items", 201, &item_json("1", "Chair"));
            http.respond_json(HttpMethod::Get, "/items", 200, &json!([]));
            store.add_item().await.unwrap();

            assert_eq!(http.calls()[0].json_body().unwrap()["image"], "http://cdn/blank.png");
        }

        #[test]
        fn test_reset_draft() {
            let (store, _, _) = setup();
            chair_draft(&store);
            store.dispatch(Event::FileSelected(Some(FileRef::new("/tmp/x.png"))));
            store.dispatch(Event::ResetDraft);
            assert_eq!(store.draft(), FormDraft::new());
        }
    }

    mod fetch_tests {
        use super::*;

        #[tokio::test]
        async fn test_fetch_replaces_collection() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a"), item_json("2", "b")])).await;
            assert_eq!(store.items().len(), 2);

            http.respond_json(HttpMethod::Get, "/items", 200, &json!([item_json("3", "c")]));
            let snapshot = store.fetch_all().await.unwrap();
            assert_eq!(snapshot.ids(), vec![ItemId::new("3")]);
            assert_eq!(store.items(), snapshot);
        }

        #[tokio::test]
        async fn test_fetch_failure_keeps_collection() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a")])).await;

            http.respond_network_error(HttpMethod::Get, "/items");
            let err = store.fetch_all().await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Network);
            assert_eq!(store.items().len(), 1);
            assert_eq!(store.last_error().unwrap().kind, ErrorKind::Network);
            assert_eq!(store.view().error.unwrap().error_code, "NETWORK_ERROR");
        }

        #[tokio::test]
        async fn test_fetch_drops_duplicate_ids() {
            let (store, http, _) = setup();
            seed(
                &store,
                &http,
                json!([item_json("1", "first"), item_json("1", "second"), item_json("2", "b")]),
            )
            .await;
            let items = store.items();
            assert_eq!(items.len(), 2);
            assert_eq!(items.get(&ItemId::new("1")).unwrap().item_name, "first");
        }

        #[tokio::test]
        async fn test_fetch_accepts_underscore_ids() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([{"_id": "m1", "itemName": "Lamp"}])).await;
            assert!(store.items().contains(&ItemId::new("m1")));
        }
    }

    mod add_tests {
        use super::*;

        #[tokio::test]
        async fn test_add_without_file_posts_draft_then_refetches() {
            let (store, http, _) = setup();
            chair_draft(&store);
            http.respond_json(HttpMethod::Post, "/items", 201, &item_json("10", "Chair"));
            http.respond_json(HttpMethod::Get, "/items", 200, &json!([item_json("10", "Chair")]));

            store.add_item().await.unwrap();

            let calls = http.calls();
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[0].method, HttpMethod::Post);
            assert_eq!(calls[0].path, "/items");
            assert_eq!(
                calls[0].json_body().unwrap(),
                json!({
                    "type": "furniture",
                    "itemName": "Chair",
                    "image": PLACEHOLDER_IMAGE_URL,
                    "location": "Lobby",
                    "description": ""
                })
            );
            assert_eq!(calls[1].method, HttpMethod::Get);
            assert_eq!(store.items().len(), 1);
            assert_eq!(store.submission_state(), SubmissionState::Idle);
        }

        #[tokio::test]
        async fn test_add_with_file_uploads_first() {
            let (store, http, files) = setup();
            chair_draft(&store);
            files.insert("/photos/chair.png", b"PNG".to_vec());
            store.set_pending_file(Some(FileRef::new("/photos/chair.png")));

            http.respond_json(HttpMethod::Post, "/upload", 200, &json!({"imageUrl": "http://cdn/chair.png"}));
            http.respond_json(HttpMethod::Post, "/items", 201, &item_json("10", "Chair"));
            http.respond_json(HttpMethod::Get, "/items", 200, &json!([]));

            store.add_item().await.unwrap();

            let calls = http.calls();
            assert_eq!(calls[0].path, "/upload");
            assert_eq!(calls[1].path, "/items");
            assert_eq!(calls[1].json_body().unwrap()["image"], "http://cdn/chair.png");
            // the draft itself still carries the placeholder
            assert_eq!(store.draft().image, PLACEHOLDER_IMAGE_URL);
            assert!(store.draft().pending_file.is_some());
        }

        #[tokio::test]
        async fn test_upload_failure_aborts_create() {
            let (store, http, files) = setup();
            chair_draft(&store);
            files.insert("/photos/chair.png", b"PNG".to_vec());
            store.set_pending_file(Some(FileRef::new("/photos/chair.png")));
            let before = store.draft();

            http.respond_json(HttpMethod::Post, "/upload", 500, &json!({"error": "disk full"}));

            let err = store.add_item().await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Upload);
            assert_eq!(http.count(HttpMethod::Post, "/items"), 0);
            assert_eq!(http.count(HttpMethod::Get, "/items"), 0);
            assert_eq!(store.draft(), before);
            assert_eq!(store.submission_state(), SubmissionState::Idle);
            assert_eq!(store.last_error().unwrap().kind, ErrorKind::Upload);
        }

        #[tokio::test]
        async fn test_unreadable_file_is_upload_failure() {
            let (store, http, _) = setup();
            chair_draft(&store);
            store.set_pending_file(Some(FileRef::new("/missing.png")));

            let err = store.add_item().await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Upload);
            assert!(http.calls().is_empty());
        }

        #[tokio::test]
        async fn test_create_failure_skips_refetch() {
            let (store, http, _) = setup();
            chair_draft(&store);
            http.respond_json(HttpMethod::Post, "/items", 400, &json!({"message": "bad type"}));

            let err = store.add_item().await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
            assert_eq!(err.message, "bad type");
            assert_eq!(http.count(HttpMethod::Get, "/items"), 0);
            assert_eq!(store.draft().item_name, "Chair");
        }

        #[tokio::test]
        async fn test_refetch_failure_after_create_is_surfaced_not_returned() {
            let (store, http, _) = setup();
            chair_draft(&store);
            http.respond_json(HttpMethod::Post, "/items", 201, &item_json("10", "Chair"));
            http.respond_network_error(HttpMethod::Get, "/items");

            assert!(store.add_item().await.is_ok());
            assert_eq!(store.last_error().unwrap().kind, ErrorKind::Network);
        }

        #[tokio::test]
        async fn test_empty_name_is_rejected_before_any_request() {
            let (store, http, _) = setup();
            let err = store.add_item().await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
            assert!(http.calls().is_empty());
        }

        #[tokio::test]
        async fn test_reentrant_submission_is_rejected() {
            let (store, http, _) = setup();
            chair_draft(&store);
            let gate = http.respond_json_gated(HttpMethod::Post, "/items", 201, &item_json("1", "Chair"));
            http.respond_json(HttpMethod::Get, "/items", 200, &json!([item_json("1", "Chair")]));

            let first = store.add_item();
            let second = async {
                tokio::task::yield_now().await;
                assert!(store.is_submitting());
                let err = store.add_item().await.unwrap_err();
                gate.notify_one();
                err
            };
            let (first, err) = tokio::join!(first, second);

            first.unwrap();
            assert_matches!(err.kind, ErrorKind::InvalidState);
            assert_eq!(http.count(HttpMethod::Post, "/items"), 1);
            assert_eq!(store.submission_state(), SubmissionState::Idle);
        }

        #[tokio::test]
        async fn test_refused_second_submit_leaves_no_stale_error() {
            let (store, http, _) = setup();
            chair_draft(&store);
            let gate = http.respond_json_gated(HttpMethod::Post, "/items", 201, &item_json("1", "Chair"));
            http.respond_json(HttpMethod::Get, "/items", 200, &json!([item_json("1", "Chair")]));

            let first = store.add_item();
            let second = async {
                tokio::task::yield_now().await;
                let err = store.add_item().await.unwrap_err();
                assert!(store.last_error().is_none());
                gate.notify_one();
                err
            };
            let (first, err) = tokio::join!(first, second);

            first.unwrap();
            assert_eq!(err.kind, ErrorKind::InvalidState);
            assert_eq!(store.items().len(), 1);
            assert!(store.last_error().is_none());
            assert!(store.view().error.is_none());
        }
    }

    mod edit_tests {
        use super::*;

        #[tokio::test]
        async fn test_edit_replaces_exactly_one() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a"), item_json("2", "b"), item_json("3", "c")])).await;
            let before = store.items();

            let mut draft = FormDraft::from_item(before.get(&ItemId::new("2")).unwrap());
            draft.set(ItemField::ItemName, "B");
            http.respond_json(HttpMethod::Put, "/items/2", 200, &item_json("2", "B"));

            let updated = store.edit_item(draft, ItemId::new("2")).await.unwrap();
            assert_eq!(updated.item_name, "B");

            let after = store.items();
            assert_eq!(after.len(), 3);
            assert_eq!(after.as_slice()[0], before.as_slice()[0]);
            assert_eq!(after.as_slice()[1].item_name, "B");
            assert_eq!(after.as_slice()[2], before.as_slice()[2]);
        }

        #[tokio::test]
        async fn test_edit_of_absent_id_does_not_insert() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a")])).await;
            http.respond_json(HttpMethod::Put, "/items/9", 200, &item_json("9", "z"));

            let mut draft = FormDraft::new();
            draft.set(ItemField::ItemName, "z");
            store.edit_item(draft, ItemId::new("9")).await.unwrap();
            assert_eq!(store.items().ids(), vec![ItemId::new("1")]);
        }

        #[tokio::test]
        async fn test_edit_failure_leaves_collection() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a")])).await;
            let before = store.items();
            http.respond_json(HttpMethod::Put, "/items/1", 404, &json!({"message": "gone"}));

            let mut draft = FormDraft::new();
            draft.set(ItemField::ItemName, "A");
            let err = store.edit_item(draft, ItemId::new("1")).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::NotFound);
            assert_eq!(store.items(), before);
        }

        #[tokio::test]
        async fn test_edit_with_file_substitutes_image() {
            let (store, http, files) = setup();
            seed(&store, &http, json!([item_json("1", "a")])).await;
            files.insert("/p.jpg", vec![1, 2, 3]);
            http.respond_json(HttpMethod::Post, "/upload", 200, &json!({"imageUrl": "http://cdn/p.jpg"}));
            http.respond_json(HttpMethod::Put, "/items/1", 200, &json!({
                "_id": "1", "itemName": "a", "image": "http://cdn/p.jpg"
            }));

            let mut draft = FormDraft::new();
            draft.set(ItemField::ItemName, "a");
            draft.pending_file = Some(FileRef::new("/p.jpg"));
            store.edit_item(draft, ItemId::new("1")).await.unwrap();

            let put = &http.calls()[2];
            assert_eq!(put.json_body().unwrap()["image"], "http://cdn/p.jpg");
            assert_eq!(store.items().as_slice()[0].image, "http://cdn/p.jpg");
        }
    }

    mod delete_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_removes_match() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a"), item_json("2", "b")])).await;
            http.respond(HttpMethod::Delete, "/items/1", 204, "");

            store.delete_item(&ItemId::new("1")).await.unwrap();
            assert_eq!(store.items().ids(), vec![ItemId::new("2")]);
        }

        #[tokio::test]
        async fn test_delete_absent_id_leaves_collection() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a")])).await;
            http.respond(HttpMethod::Delete, "/items/7", 200, "\"7\"");

            store.delete_item(&ItemId::new("7")).await.unwrap();
            assert_eq!(store.items().len(), 1);
        }

        #[tokio::test]
        async fn test_delete_failure_keeps_item() {
            let (store, http, _) = setup();
            seed(&store, &http, json!([item_json("1", "a")])).await;
            http.respond(HttpMethod::Delete, "/items/1", 500, "");

            let err = store.delete_item(&ItemId::new("1")).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Internal);
            assert_eq!(store.items().len(), 1);
        }
    }

    mod upload_tests {
        use super::*;

        #[tokio::test]
        async fn test_upload_has_no_state_side_effects() {
            let (store, http, files) = setup();
            files.insert("/a.png", b"x".to_vec());
            http.respond_json(HttpMethod::Post, "/upload", 200, &json!({"imageUrl": "http://cdn/a.png"}));
            let before = store.view();

            let url = store.upload_pending_file(&FileRef::new("/a.png")).await.unwrap();
            assert_eq!(url.as_str(), "http://cdn/a.png");
            assert_eq!(store.view(), before);
        }

        #[tokio::test]
        async fn test_upload_transport_failure() {
            let (store, http, files) = setup();
            files.insert("/a.png", b"x".to_vec());
            http.respond_network_error(HttpMethod::Post, "/upload");

            let err = store.upload_pending_file(&FileRef::new("/a.png")).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Upload);
            assert_eq!(err.context.get("cause").map(String::as_str), Some("NETWORK_ERROR"));
            assert!(store.last_error().is_none());
        }
    }
}
