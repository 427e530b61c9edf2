//! The Crux core of the catalog.
//!
//! `update` is the only place the model changes. UI intents arrive from the
//! shell; operation results arrive from `ItemStore`, which plays the shell's
//! part for HTTP and file effects. Every event ends with a render request.

use crux_core::macros::Effect;
use crux_core::render::Render;
use tracing::{debug, info, warn};

use crate::event::Event;
use crate::model::{FormDraft, ItemField, Model, SubmissionState, ViewModel};

#[derive(Effect)]
#[effect(app = "Catalog")]
pub struct CatalogCapabilities {
    pub render: Render<Event>,
}

#[derive(Default)]
pub struct Catalog;

impl crux_core::App for Catalog {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = CatalogCapabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &CatalogCapabilities) {
        if event.is_user_initiated() {
            debug!(event = event.name(), "user action");
        }

        match event {
            // Form
            Event::FieldChanged { field, value } => model.draft.set(field, value),
            Event::FieldChangedByName { name, value } => match ItemField::parse(&name) {
                Some(field) => model.draft.set(field, value),
                None => {
                    debug!(field = %name, "ignoring unknown form field");
                    return;
                }
            },
            Event::FileSelected(file) => model.draft.pending_file = file,
            Event::EditItemSelected(item) => model.draft = FormDraft::from_item(&item),
            Event::LocationChosen(coordinate) => {
                model
                    .draft
                    .set(ItemField::Location, coordinate.to_location_string());
            }
            Event::ResetDraft => model.draft = model.fresh_draft(),

            // Modal
            Event::ShowModal => model.modal_visible = true,
            Event::HideModal => model.modal_visible = false,

            // Errors
            Event::DismissError => model.clear_error(),
            Event::OperationFailed(error) => model.set_error(*error),

            // Results
            Event::Configured { placeholder_image } => {
                model.placeholder_image = placeholder_image;
                model.draft = model.fresh_draft();
            }
            Event::ItemsFetched(items) => {
                let fetched = items.len();
                let dropped = model.items.replace_all(items);
                if dropped > 0 {
                    warn!(dropped, "listing contained duplicate ids; kept first occurrence");
                }
                info!(fetched, kept = model.items.len(), "items fetched");
            }
            Event::ItemUpdated(item) => {
                let item_id = item.id.clone();
                if model.items.replace_by_id(*item) {
                    info!(%item_id, "item updated");
                } else {
                    debug!(%item_id, "updated item is not in the collection");
                }
            }
            Event::ItemDeleted(item_id) => match model.items.remove_by_id(&item_id) {
                Some(_) => info!(%item_id, "item deleted"),
                None => debug!(%item_id, "deleted item was not in the collection"),
            },

            // Submission
            Event::SubmissionStarted(phase) => {
                model.submission = phase;
                model.clear_error();
            }
            Event::SubmissionAdvanced(phase) => {
                debug!(phase = phase.as_str(), "submission phase");
                model.submission = phase;
            }
            Event::SubmissionFinished => model.submission = SubmissionState::Idle,
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        model.view()
    }
}
