//! Request builders and response decoders for the catalog REST backend.

use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpRequest, HttpResponse, MultipartForm};
use crate::config::StoreConfig;
use crate::model::{FileRef, ImageUrl, Item, ItemId, ItemPayload};
use crate::{AppError, AppResult, ErrorKind, UPLOAD_FIELD_NAME};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

pub fn list_items(config: &StoreConfig) -> AppResult<HttpRequest> {
    let request = HttpRequest::get(config.items_url()?)
        .with_header("Accept", "application/json")?
        .with_timeout(config.request_timeout)?;
    Ok(request)
}

pub fn create_item(config: &StoreConfig, payload: &ItemPayload) -> AppResult<HttpRequest> {
    let request = HttpRequest::post(config.items_url()?)
        .with_json(payload)?
        .with_timeout(config.request_timeout)?;
    Ok(request)
}

/// PUT body is the full item, id included.
pub fn update_item(config: &StoreConfig, id: &ItemId, payload: &ItemPayload) -> AppResult<HttpRequest> {
    let body = Item::from_payload(id.clone(), payload.clone());
    let request = HttpRequest::put(config.item_url(id.as_str())?)
        .with_json(&body)?
        .with_timeout(config.request_timeout)?;
    Ok(request)
}

pub fn delete_item(config: &StoreConfig, id: &ItemId) -> AppResult<HttpRequest> {
    let request = HttpRequest::delete(config.item_url(id.as_str())?)
        .with_timeout(config.request_timeout)?;
    Ok(request)
}

pub fn upload_file(config: &StoreConfig, file: &FileRef, data: Vec<u8>) -> AppResult<HttpRequest> {
    let form = MultipartForm::new().file(
        UPLOAD_FIELD_NAME,
        file.file_name(),
        file.mime_type(),
        data,
    );
    let request = HttpRequest::post(config.upload_url()?)
        .with_multipart(form)?
        .with_timeout(config.upload_timeout)?;
    Ok(request)
}

pub fn decode_items(response: HttpResponse) -> AppResult<Vec<Item>> {
    let response = response.error_for_status()?;
    Ok(response.json::<Vec<Item>>()?)
}

pub fn decode_item(response: HttpResponse) -> AppResult<Item> {
    let response = response.error_for_status()?;
    Ok(response.json::<Item>()?)
}

/// Any 2xx counts; the body (deleted id or nothing) is not inspected.
pub fn decode_deleted(response: HttpResponse) -> AppResult<()> {
    response.error_for_status()?;
    Ok(())
}

/// Only a 200 carrying a non-empty `imageUrl` is a successful upload.
pub fn decode_upload(response: HttpResponse) -> AppResult<ImageUrl> {
    if response.status() != 200 {
        let status = response.status();
        let err = match response.error_for_status() {
            Err(e) => AppError::from(e),
            Ok(_) => AppError::new(ErrorKind::Upload, format!("Upload returned status {status}"))
                .with_context("http_status", status.to_string()),
        };
        return Err(err.into_upload());
    }

    let body: UploadResponse = response
        .json()
        .map_err(|e| AppError::from(e).into_upload())?;

    if body.image_url.trim().is_empty() {
        return Err(AppError::new(ErrorKind::Upload, "Upload response has an empty imageUrl"));
    }
    Ok(ImageUrl(body.image_url))
}
