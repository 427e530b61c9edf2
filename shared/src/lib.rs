// lib.rs - item catalog client core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod map_picker;
pub mod model;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::{FileError, HttpError};

pub use app::{Catalog, CatalogCapabilities, Effect};
pub use capabilities::Capabilities;
pub use config::{ConfigError, StoreConfig};
pub use event::Event;
pub use map_picker::{DialogSize, MapPickerDialog, PickerError};
pub use model::{
    FileRef, FormDraft, ImageUrl, Item, ItemCollection, ItemField, ItemId, ItemPayload, LatLon,
    Model, SubmissionState, ViewModel,
};
pub use store::ItemStore;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/200x200";
pub const ITEMS_PATH: &str = "items";
pub const UPLOAD_PATH: &str = "upload";
pub const UPLOAD_FIELD_NAME: &str = "file";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Upload,
    FileAccess,
    Serialization,
    Deserialization,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Upload => "UPLOAD_FAILED",
            Self::FileAccess => "FILE_ACCESS_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network
            | Self::Timeout
            | Self::Conflict
            | Self::RateLimited
            | Self::Upload
            | Self::InvalidState => ErrorSeverity::Transient,

            Self::Serialization | Self::Deserialization | Self::Internal => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::FileAccess
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Conflict | Self::Upload
        )
    }

    #[must_use]
    pub const fn http_status_hint(self) -> Option<u16> {
        match self {
            Self::Authentication => Some(401),
            Self::Authorization => Some(403),
            Self::NotFound => Some(404),
            Self::Conflict => Some(409),
            Self::RateLimited => Some(429),
            Self::Validation => Some(400),
            Self::Internal => Some(500),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Re-labels a failure as an upload failure, keeping its detail.
    #[must_use]
    pub fn into_upload(self) -> Self {
        if self.kind == ErrorKind::Upload {
            return self;
        }
        let cause = self.code();
        let mut err = AppError::new(ErrorKind::Upload, self.message)
            .with_context("cause", cause);
        err.internal_message = self.internal_message;
        err.context.extend(self.context);
        err
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => "The server rejected the request as unauthenticated.".into(),
            ErrorKind::Authorization => {
                "You don't have permission to perform this action.".into()
            }
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Conflict => {
                "This action conflicts with a recent change. Please refresh and try again.".into()
            }
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Upload => "The image could not be uploaded. Please try again.".into(),
            ErrorKind::FileAccess => {
                "The selected file could not be read. Please choose another file.".into()
            }
            ErrorKind::Serialization | ErrorKind::Deserialization => {
                "The server sent data we could not understand.".into()
            }
            ErrorKind::InvalidState => {
                "Please wait for the current save to finish.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(Self::kind_for_status(status), message)
            .with_context("http_status", status.to_string())
    }

    const fn kind_for_status(status: u16) -> ErrorKind {
        match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            408 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub type AppResult<T> = Result<T, AppError>;

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        let internal = e.to_string();
        let request_id = e.request_id().map(str::to_string);

        let err = match e {
            HttpError::ConnectionError { host, .. } => {
                AppError::new(ErrorKind::Network, format!("Could not reach {host}"))
            }
            HttpError::Timeout { timeout_ms, .. } => {
                AppError::new(ErrorKind::Timeout, format!("No response after {timeout_ms}ms"))
                    .with_context("timeout_ms", timeout_ms.to_string())
            }
            HttpError::HttpStatus {
                status, message, ..
            } => AppError::new(AppError::kind_for_status(status), message)
                .with_context("http_status", status.to_string()),
            HttpError::InvalidResponse { reason, .. } => {
                AppError::new(ErrorKind::Deserialization, reason)
            }
            HttpError::SerializationError { message } => {
                AppError::new(ErrorKind::Serialization, message)
            }
            HttpError::BodyTooLarge { size, max } => AppError::new(
                ErrorKind::Validation,
                format!("Request body of {size} bytes exceeds the {max} byte limit"),
            ),
            HttpError::ResponseTooLarge { size, max } => AppError::new(
                ErrorKind::Deserialization,
                format!("Response of {size} bytes exceeds the {max} byte limit"),
            ),
            HttpError::InvalidUrl { .. }
            | HttpError::InvalidHeader { .. }
            | HttpError::TooManyHeaders { .. }
            | HttpError::InvalidRequest { .. } => {
                AppError::new(ErrorKind::Internal, "Request could not be built")
            }
        };

        let err = err.with_internal(internal);
        match request_id {
            Some(id) => err.with_context("request_id", id),
            None => err,
        }
    }
}

impl From<FileError> for AppError {
    fn from(e: FileError) -> Self {
        let kind = match e {
            FileError::TooLarge { .. } => ErrorKind::Validation,
            _ => ErrorKind::FileAccess,
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::new(ErrorKind::Deserialization, "Malformed response body")
            .with_internal(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}
