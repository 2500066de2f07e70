//! Article API endpoints.

use axum::extract::{Path, Query, State};
use chrono::Utc;

use super::{
    created, discard_upload, success, upload_submitted_image, ApiResult, Deleted, Submission,
};
use crate::auth::{AdminUser, Viewer};
use crate::errors::AppError;
use crate::models::{timestamp, Article, ArticleListQuery, ArticleRequest};
use crate::storage::remove_image_url;
use crate::AppState;

const IMAGE_FOLDER: &str = "articles";

/// Whether the article's publication date has passed.
fn is_public(article: &Article, now: &str) -> bool {
    article
        .published_at
        .as_deref()
        .is_some_and(|at| at <= now)
}

/// GET /api/articles - List published articles, optionally by `?tag=`.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> ApiResult<Vec<Article>> {
    success(state.repo.list_articles(true, query.tag.as_deref()).await?)
}

/// GET /api/admin/articles
pub async fn list_all_articles(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> ApiResult<Vec<Article>> {
    success(state.repo.list_articles(false, None).await?)
}

/// GET /api/articles/{id}
pub async fn get_article(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ApiResult<Article> {
    let article = state.repo.get_article(&id).await?;
    visible_article(article, &viewer, &id)
}

/// GET /api/articles/slug/{slug}
pub async fn get_article_by_slug(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> ApiResult<Article> {
    let article = state.repo.get_article_by_slug(&slug).await?;
    visible_article(article, &viewer, &slug)
}

fn visible_article(article: Option<Article>, viewer: &Viewer, key: &str) -> ApiResult<Article> {
    let now = timestamp(Utc::now());
    let article = article
        .filter(|a| viewer.is_admin() || is_public(a, &now))
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", key)))?;
    success(article)
}

/// POST /api/articles
pub async fn create_article(
    _admin: AdminUser,
    State(state): State<AppState>,
    submission: Submission<ArticleRequest>,
) -> ApiResult<Article> {
    let (request, image) = submission.into_parts();
    let mut draft = request.validate()?;

    let stored = upload_submitted_image(&state, IMAGE_FOLDER, image).await?;
    if let Some(stored) = &stored {
        draft.image = Some(stored.url.clone());
    }

    match state.repo.create_article(&draft).await {
        Ok(article) => {
            tracing::info!("Created article {} ({})", article.id, article.slug);
            created(article)
        }
        Err(e) => {
            discard_upload(&state, stored.as_ref()).await;
            Err(e)
        }
    }
}

/// PUT /api/articles/{id}
pub async fn update_article(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    submission: Submission<ArticleRequest>,
) -> ApiResult<Article> {
    let (request, image) = submission.into_parts();
    let mut draft = request.validate()?;

    let existing = state
        .repo
        .get_article(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

    let stored = upload_submitted_image(&state, IMAGE_FOLDER, image).await?;
    if let Some(stored) = &stored {
        draft.image = Some(stored.url.clone());
    }

    let article = match state.repo.update_article(&id, &draft).await {
        Ok(article) => article,
        Err(e) => {
            discard_upload(&state, stored.as_ref()).await;
            return Err(e);
        }
    };

    if let Some(old) = existing.image.filter(|old| article.image.as_ref() != Some(old)) {
        remove_image_url(state.storage.as_ref(), &old).await;
    }

    success(article)
}

/// DELETE /api/articles/{id}
pub async fn delete_article(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let existing = state
        .repo
        .get_article(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

    state.repo.delete_article(&id).await?;

    if let Some(image) = existing.image {
        remove_image_url(state.storage.as_ref(), &image).await;
    }

    tracing::info!("Deleted article {} ({})", id, admin.email);
    success(Deleted { id })
}
