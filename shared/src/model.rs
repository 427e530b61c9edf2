use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{AppError, CoordinateError, ErrorKind, UserFacingError, PLACEHOLDER_IMAGE_URL};

/// Server-assigned item identifier.
///
/// Backends disagree on whether ids are strings or numbers; both normalise
/// to the same string form so reconciliation compares like with like.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        let id = match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s,
            RawId::Unsigned(n) => n.to_string(),
            RawId::Signed(n) => n.to_string(),
        };

        if id.trim().is_empty() {
            return Err(serde::de::Error::custom("item id cannot be empty"));
        }
        Ok(Self(id))
    }
}

/// URL of an uploaded image, as returned by the upload endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUrl(pub String);

impl ImageUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated lat/lon
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(self) -> f64 {
        self.lat
    }

    pub fn lon(self) -> f64 {
        self.lon
    }

    /// `"lat,lng"`, the form stored in an item's `location`.
    pub fn to_location_string(self) -> String {
        format!("{},{}", self.lat, self.lon)
    }

    /// Reads back a coordinate-encoded location; free-form text yields `None`.
    pub fn parse_location(location: &str) -> Option<Self> {
        let (lat, lon) = location.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lon = lon.trim().parse::<f64>().ok()?;
        Self::new(lat, lon).ok()
    }
}

/// Item fields minus the identifier: the create/update request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    #[serde(rename = "type")]
    pub item_type: String,
    pub item_name: String,
    pub image: String,
    pub location: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawItem")]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: String,
    pub item_name: String,
    pub image: String,
    pub location: String,
    pub description: String,
}

impl Item {
    pub fn from_payload(id: ItemId, payload: ItemPayload) -> Self {
        Self {
            id,
            item_type: payload.item_type,
            item_name: payload.item_name,
            image: payload.image,
            location: payload.location,
            description: payload.description,
        }
    }

    pub fn payload(&self) -> ItemPayload {
        ItemPayload {
            item_type: self.item_type.clone(),
            item_name: self.item_name.clone(),
            image: self.image.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
        }
    }
}

/// Wire shape accepted for an item. `id` is canonical; `_id` is read as a
/// fallback so both backend conventions land in the same field.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    id: Option<ItemId>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<ItemId>,
    #[serde(default, rename = "type")]
    item_type: Option<String>,
    #[serde(default)]
    item_name: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<RawItem> for Item {
    type Error = String;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .or(raw.underscore_id)
            .ok_or_else(|| "item is missing its `id`".to_string())?;

        Ok(Self {
            id,
            item_type: raw.item_type.unwrap_or_default(),
            item_name: raw.item_name.unwrap_or_default(),
            image: raw
                .image
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            location: raw.location.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
        })
    }
}

/// Cached copy of the backend's items, in listing order, unique by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ItemCollection {
    items: Vec<Item>,
}

impl ItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection, keeping the first entry for any repeated id.
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut collection = Self::new();
        collection.replace_all(items);
        collection
    }

    /// Replaces every entry. Returns how many duplicate-id entries were dropped.
    pub fn replace_all(&mut self, items: Vec<Item>) -> usize {
        let total = items.len();
        let mut seen = HashSet::with_capacity(total);
        self.items = items
            .into_iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect();
        total - self.items.len()
    }

    /// Swaps in `updated` for the entry with the same id. Absent ids are not inserted.
    pub fn replace_by_id(&mut self, updated: Item) -> bool {
        match self.items.iter_mut().find(|item| item.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn remove_by_id(&mut self, id: &ItemId) -> Option<Item> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }
}

impl From<ItemCollection> for Vec<Item> {
    fn from(collection: ItemCollection) -> Self {
        collection.items
    }
}

/// Editable form fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemField {
    Type,
    ItemName,
    Image,
    Location,
    Description,
}

impl ItemField {
    pub const ALL: [ItemField; 5] = [
        ItemField::Type,
        ItemField::ItemName,
        ItemField::Image,
        ItemField::Location,
        ItemField::Description,
    ];

    /// Field name as the UI and the backend spell it.
    pub const fn wire_name(self) -> &'static str {
        match self {
            ItemField::Type => "type",
            ItemField::ItemName => "itemName",
            ItemField::Image => "image",
            ItemField::Location => "location",
            ItemField::Description => "description",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Handle to a local file picked for upload. Bytes are read only when the
/// upload runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    path: PathBuf,
    file_name: String,
    mime_type: Option<String>,
}

impl FileRef {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self {
            path,
            file_name,
            mime_type: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Explicit MIME type, else a guess from the file name's extension.
    pub fn mime_type(&self) -> String {
        match &self.mime_type {
            Some(mime) => mime.clone(),
            None => mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

/// In-progress create/edit form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDraft {
    pub item_type: String,
    pub item_name: String,
    pub image: String,
    pub location: String,
    pub description: String,
    pub pending_file: Option<FileRef>,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self {
            item_type: String::new(),
            item_name: String::new(),
            image: PLACEHOLDER_IMAGE_URL.to_string(),
            location: String::new(),
            description: String::new(),
            pending_file: None,
        }
    }
}

impl FormDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty draft whose image starts at `placeholder`.
    pub fn with_placeholder(placeholder: &str) -> Self {
        Self {
            image: placeholder.to_string(),
            ..Self::default()
        }
    }

    /// Editable fields of `item`; no pending file.
    pub fn from_item(item: &Item) -> Self {
        Self {
            item_type: item.item_type.clone(),
            item_name: item.item_name.clone(),
            image: item.image.clone(),
            location: item.location.clone(),
            description: item.description.clone(),
            pending_file: None,
        }
    }

    pub fn get(&self, field: ItemField) -> &str {
        match field {
            ItemField::Type => &self.item_type,
            ItemField::ItemName => &self.item_name,
            ItemField::Image => &self.image,
            ItemField::Location => &self.location,
            ItemField::Description => &self.description,
        }
    }

    pub fn set(&mut self, field: ItemField, value: impl Into<String>) {
        let slot = match field {
            ItemField::Type => &mut self.item_type,
            ItemField::ItemName => &mut self.item_name,
            ItemField::Image => &mut self.image,
            ItemField::Location => &mut self.location,
            ItemField::Description => &mut self.description,
        };
        *slot = value.into();
    }

    /// Snapshot of the fields as a request body. An empty image falls back to
    /// `placeholder`.
    pub fn to_payload(&self, placeholder: &str) -> ItemPayload {
        let image = if self.image.trim().is_empty() {
            placeholder.to_string()
        } else {
            self.image.clone()
        };
        ItemPayload {
            item_type: self.item_type.clone(),
            item_name: self.item_name.clone(),
            image,
            location: self.location.clone(),
            description: self.description.clone(),
        }
    }

    /// Empty-field check; only the name is required.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.item_name.trim().is_empty() {
            return Err(AppError::new(ErrorKind::Validation, "Item name is required.")
                .with_context("field", ItemField::ItemName.wire_name()));
        }
        Ok(())
    }
}

/// Phase of the current add/edit submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    UploadingFile,
    Submitting,
}

impl SubmissionState {
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::UploadingFile => "uploading_file",
            Self::Submitting => "submitting",
        }
    }
}

/// Everything the core owns.
#[derive(Clone, Debug)]
pub struct Model {
    pub items: ItemCollection,
    pub draft: FormDraft,
    pub modal_visible: bool,
    pub submission: SubmissionState,
    pub active_error: Option<AppError>,
    /// Image used by fresh drafts and by payloads with a blank image.
    pub placeholder_image: String,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            items: ItemCollection::new(),
            draft: FormDraft::new(),
            modal_visible: false,
            submission: SubmissionState::Idle,
            active_error: None,
            placeholder_image: PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_draft(&self) -> FormDraft {
        FormDraft::with_placeholder(&self.placeholder_image)
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn view(&self) -> ViewModel {
        ViewModel {
            items: self.items.as_slice().to_vec(),
            draft: self.draft.clone(),
            show_modal: self.modal_visible,
            submission: self.submission,
            is_submitting: self.submission.is_active(),
            error: self.active_error.as_ref().map(UserFacingError::from),
            active_error: self.active_error.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub items: Vec<Item>,
    pub draft: FormDraft,
    pub show_modal: bool,
    pub submission: SubmissionState,
    /// Disable the submit affordance while true.
    pub is_submitting: bool,
    pub error: Option<UserFacingError>,
    /// Full error behind `error`. Kept on the Rust side only.
    #[serde(skip)]
    pub active_error: Option<AppError>,
}
