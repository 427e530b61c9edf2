use serde::{Deserialize, Serialize};

use crate::model::{FileRef, Item, ItemField, ItemId, LatLon, SubmissionState};
use crate::AppError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // --- UI intents ---
    FieldChanged {
        field: ItemField,
        value: String,
    },
    /// Untyped form input; unknown names are ignored.
    FieldChangedByName {
        name: String,
        value: String,
    },
    FileSelected(Option<FileRef>),
    EditItemSelected(Box<Item>),
    LocationChosen(LatLon),
    ResetDraft,
    ShowModal,
    HideModal,
    DismissError,

    // --- Shell results, sent by `ItemStore` as operations complete ---
    Configured {
        placeholder_image: String,
    },
    ItemsFetched(Vec<Item>),
    ItemUpdated(Box<Item>),
    ItemDeleted(ItemId),
    SubmissionStarted(SubmissionState),
    SubmissionAdvanced(SubmissionState),
    SubmissionFinished,
    OperationFailed(Box<AppError>),
}

impl Event {
    /// Stable name for log fields.
    pub const fn name(&self) -> &'static str {
        match self {
            Event::FieldChanged { .. } => "field_changed",
            Event::FieldChangedByName { .. } => "field_changed_by_name",
            Event::FileSelected(_) => "file_selected",
            Event::EditItemSelected(_) => "edit_item_selected",
            Event::LocationChosen(_) => "location_chosen",
            Event::ResetDraft => "reset_draft",
            Event::ShowModal => "show_modal",
            Event::HideModal => "hide_modal",
            Event::DismissError => "dismiss_error",
            Event::Configured { .. } => "configured",
            Event::ItemsFetched(_) => "items_fetched",
            Event::ItemUpdated(_) => "item_updated",
            Event::ItemDeleted(_) => "item_deleted",
            Event::SubmissionStarted(_) => "submission_started",
            Event::SubmissionAdvanced(_) => "submission_advanced",
            Event::SubmissionFinished => "submission_finished",
            Event::OperationFailed(_) => "operation_failed",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Event::FieldChanged { .. }
                | Event::FieldChangedByName { .. }
                | Event::FileSelected(_)
                | Event::EditItemSelected(_)
                | Event::LocationChosen(_)
                | Event::ResetDraft
                | Event::ShowModal
                | Event::HideModal
                | Event::DismissError
        )
    }
}
