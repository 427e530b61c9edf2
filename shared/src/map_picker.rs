//! Modal adapter around an external map widget. The widget reports a click
//! through `select_location`; the dialog validates it, hands it to the
//! caller and closes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::LatLon;
use crate::store::ItemStore;
use crate::CoordinateError;

pub const MAP_PICKER_TITLE: &str = "Choose a location";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogSize {
    Small,
    Medium,
    #[default]
    Large,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PickerError {
    #[error("map picker is not open")]
    Closed,

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}

type LocationCallback = Box<dyn FnMut(LatLon) + Send>;

pub struct MapPickerDialog {
    size: DialogSize,
    item_type: String,
    open: bool,
    on_location_chosen: LocationCallback,
}

impl MapPickerDialog {
    pub fn new(item_type: impl Into<String>, on_location_chosen: impl FnMut(LatLon) + Send + 'static) -> Self {
        Self {
            size: DialogSize::default(),
            item_type: item_type.into(),
            open: false,
            on_location_chosen: Box::new(on_location_chosen),
        }
    }

    /// Dialog whose chosen coordinate lands in the store's draft location.
    pub fn for_store(store: Arc<ItemStore>, item_type: impl Into<String>) -> Self {
        Self::new(item_type, move |coordinate| store.apply_location(coordinate))
    }

    pub fn title(&self) -> &'static str {
        MAP_PICKER_TITLE
    }

    pub fn size(&self) -> DialogSize {
        self.size
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Mirrors the caller's `show` flag.
    pub fn set_open(&mut self, show: bool) {
        self.open = show;
    }

    pub fn open(&mut self) {
        self.set_open(true);
    }

    pub fn close(&mut self) {
        self.set_open(false);
    }

    /// Validates a click, hands it to the callback and closes. Clicks that
    /// arrive while the dialog is closed are refused.
    pub fn select_location(&mut self, lat: f64, lng: f64) -> Result<LatLon, PickerError> {
        if !self.open {
            debug!(lat, lng, "ignoring selection on a closed map picker");
            return Err(PickerError::Closed);
        }

        let coordinate = LatLon::new(lat, lng).inspect_err(|e| {
            warn!(lat, lng, "rejected map selection: {e}");
        })?;

        debug!(lat, lng, item_type = %self.item_type, "location chosen");
        (self.on_location_chosen)(coordinate);
        self.close();
        Ok(coordinate)
    }
}

impl fmt::Debug for MapPickerDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapPickerDialog")
            .field("size", &self.size)
            .field("item_type", &self.item_type)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}
