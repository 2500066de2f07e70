//! Request bodies: plain JSON, and admin form submissions that carry either
//! a JSON body or multipart with a JSON `payload` part and an optional `image`
//! file. Malformed bodies reject with the API error envelope.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::{header, StatusCode},
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;
use crate::storage::{discard_image, store_image, ImageUpload, StoredImage};
use crate::AppState;

pub const PAYLOAD_PART: &str = "payload";
pub const IMAGE_PART: &str = "image";

#[derive(Debug)]
pub enum Submission<T> {
    Json(T),
    Multipart {
        payload: T,
        image: Option<ImageUpload>,
    },
}

impl<T> Submission<T> {
    pub fn into_parts(self) -> (T, Option<ImageUpload>) {
        match self {
            Submission::Json(payload) => (payload, None),
            Submission::Multipart { payload, image } => (payload, image),
        }
    }
}

fn content_type(req: &Request) -> String {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

async fn read_json<T, S>(req: Request, state: &S) -> Result<T, AppError>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    let body = Bytes::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(serde_json::from_slice(&body)?)
}

/// A JSON request body. Unlike `axum::Json`, a missing or mistyped field is a
/// 400 `BAD_REQUEST`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !content_type(&req).starts_with("application/json") {
            return Err(AppError::UnsupportedMediaType(
                "Expected application/json".to_string(),
            ));
        }
        Ok(JsonBody(read_json(req, state).await?))
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    tracing::warn!("Multipart read error: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("Upload too large".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

impl<T, S> FromRequest<S> for Submission<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = content_type(&req);

        if content_type.starts_with("application/json") {
            return Ok(Submission::Json(read_json(req, state).await?));
        }

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            let mut payload = None;
            let mut image = None;
            while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
                let name = field.name().unwrap_or_default().to_string();
                match name.as_str() {
                    PAYLOAD_PART => {
                        let text = field.text().await.map_err(multipart_error)?;
                        payload = Some(serde_json::from_str(&text)?);
                    }
                    IMAGE_PART => {
                        let file_name = field.file_name().map(str::to_string);
                        let content_type = field
                            .content_type()
                            .unwrap_or("application/octet-stream")
                            .to_string();
                        let data = field.bytes().await.map_err(multipart_error)?;
                        // Browsers send an empty part when no file was picked.
                        if !data.is_empty() {
                            image = Some(ImageUpload {
                                file_name,
                                content_type,
                                data,
                            });
                        }
                    }
                    other => tracing::debug!("Ignoring multipart field {:?}", other),
                }
            }

            let payload = payload.ok_or_else(|| {
                AppError::BadRequest(format!("Missing '{}' part", PAYLOAD_PART))
            })?;
            return Ok(Submission::Multipart { payload, image });
        }

        Err(AppError::UnsupportedMediaType(
            "Expected application/json or multipart/form-data".to_string(),
        ))
    }
}

/// Upload the submitted image, if any, into `folder`.
pub async fn upload_submitted_image(
    state: &AppState,
    folder: &str,
    image: Option<ImageUpload>,
) -> Result<Option<StoredImage>, AppError> {
    match image {
        Some(upload) => {
            let stored = store_image(
                state.storage.as_ref(),
                &state.config.image_function,
                folder,
                upload,
            )
            .await?;
            tracing::info!("Stored image {}", stored.path);
            Ok(Some(stored))
        }
        None => Ok(None),
    }
}

/// Remove an upload whose database write failed.
pub async fn discard_upload(state: &AppState, stored: Option<&StoredImage>) {
    if let Some(stored) = stored {
        discard_image(state.storage.as_ref(), &stored.path).await;
    }
}
