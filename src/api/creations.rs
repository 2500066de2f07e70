//! Creation (gallery) API endpoints.

use axum::extract::{Path, State};

use super::{
    created, discard_upload, success, upload_submitted_image, ApiResult, Deleted, Submission,
};
use crate::auth::{AdminUser, Viewer};
use crate::errors::AppError;
use crate::models::{Creation, CreationRequest};
use crate::storage::remove_image_url;
use crate::AppState;

const IMAGE_FOLDER: &str = "creations";

/// GET /api/creations - List published creations.
pub async fn list_creations(State(state): State<AppState>) -> ApiResult<Vec<Creation>> {
    success(state.repo.list_creations(true).await?)
}

/// GET /api/admin/creations
pub async fn list_all_creations(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> ApiResult<Vec<Creation>> {
    success(state.repo.list_creations(false).await?)
}

/// GET /api/creations/{id}
pub async fn get_creation(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ApiResult<Creation> {
    let creation = state
        .repo
        .get_creation(&id)
        .await?
        .filter(|c| c.published || viewer.is_admin())
        .ok_or_else(|| AppError::NotFound(format!("Creation {} not found", id)))?;

    success(creation)
}

/// POST /api/creations
pub async fn create_creation(
    _admin: AdminUser,
    State(state): State<AppState>,
    submission: Submission<CreationRequest>,
) -> ApiResult<Creation> {
    let (request, image) = submission.into_parts();
    let mut request = request.validate()?;

    let stored = upload_submitted_image(&state, IMAGE_FOLDER, image).await?;
    if let Some(stored) = &stored {
        request.image = Some(stored.url.clone());
    }

    match state.repo.create_creation(&request).await {
        Ok(creation) => {
            tracing::info!("Created creation {}", creation.id);
            created(creation)
        }
        Err(e) => {
            discard_upload(&state, stored.as_ref()).await;
            Err(e)
        }
    }
}

/// PUT /api/creations/{id}
pub async fn update_creation(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    submission: Submission<CreationRequest>,
) -> ApiResult<Creation> {
    let (request, image) = submission.into_parts();
    let mut request = request.validate()?;

    let existing = state
        .repo
        .get_creation(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Creation {} not found", id)))?;

    let stored = upload_submitted_image(&state, IMAGE_FOLDER, image).await?;
    if let Some(stored) = &stored {
        request.image = Some(stored.url.clone());
    }

    let creation = match state.repo.update_creation(&id, &request).await {
        Ok(creation) => creation,
        Err(e) => {
            discard_upload(&state, stored.as_ref()).await;
            return Err(e);
        }
    };

    if let Some(old) = existing.image.filter(|old| creation.image.as_ref() != Some(old)) {
        remove_image_url(state.storage.as_ref(), &old).await;
    }

    success(creation)
}

/// DELETE /api/creations/{id}
pub async fn delete_creation(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let existing = state
        .repo
        .get_creation(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Creation {} not found", id)))?;

    state.repo.delete_creation(&id).await?;

    if let Some(image) = existing.image {
        remove_image_url(state.storage.as_ref(), &image).await;
    }

    tracing::info!("Deleted creation {} ({})", id, admin.email);
    success(Deleted { id })
}
