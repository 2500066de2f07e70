//! Recipe API endpoints.

use axum::extract::{Path, Query, State};

use super::{
    created, discard_upload, success, upload_submitted_image, ApiResult, Deleted, Submission,
};
use crate::auth::{AdminUser, Viewer};
use crate::errors::AppError;
use crate::models::{PortionsQuery, Recipe, RecipeListQuery, RecipeRequest, RecipeView};
use crate::storage::remove_image_url;
use crate::AppState;

const IMAGE_FOLDER: &str = "recipes";

/// GET /api/recipes - List published recipes.
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> ApiResult<Vec<Recipe>> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    success(state.repo.list_recipes(true, category).await?)
}

/// GET /api/admin/recipes - List all recipes, drafts included.
pub async fn list_all_recipes(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> ApiResult<Vec<Recipe>> {
    success(state.repo.list_recipes(false, None).await?)
}

/// GET /api/recipes/{id} - Get a recipe, optionally rescaled with `?portions=`.
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Query(query): Query<PortionsQuery>,
) -> ApiResult<RecipeView> {
    let recipe = state.repo.get_recipe(&id).await?;
    recipe_view(recipe, &viewer, &query, &id)
}

/// GET /api/recipes/slug/{slug}
pub async fn get_recipe_by_slug(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PortionsQuery>,
) -> ApiResult<RecipeView> {
    let recipe = state.repo.get_recipe_by_slug(&slug).await?;
    recipe_view(recipe, &viewer, &query, &slug)
}

fn recipe_view(
    recipe: Option<Recipe>,
    viewer: &Viewer,
    query: &PortionsQuery,
    key: &str,
) -> ApiResult<RecipeView> {
    if matches!(query.portions, Some(p) if p < 1) {
        return Err(AppError::Validation(
            "portions must be at least 1".to_string(),
        ));
    }

    // Drafts only exist for the admin.
    let recipe = recipe
        .filter(|r| r.published || viewer.is_admin())
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", key)))?;

    let portions = query.portions.unwrap_or(recipe.base_portions);
    success(recipe.scaled(portions))
}

/// POST /api/recipes - Create a recipe.
pub async fn create_recipe(
    _admin: AdminUser,
    State(state): State<AppState>,
    submission: Submission<RecipeRequest>,
) -> ApiResult<Recipe> {
    let (request, image) = submission.into_parts();
    let mut draft = request.validate()?;

    let stored = upload_submitted_image(&state, IMAGE_FOLDER, image).await?;
    if let Some(stored) = &stored {
        draft.image = Some(stored.url.clone());
    }

    match state.repo.create_recipe(&draft).await {
        Ok(recipe) => {
            tracing::info!("Created recipe {} ({})", recipe.id, recipe.slug);
            created(recipe)
        }
        Err(e) => {
            discard_upload(&state, stored.as_ref()).await;
            Err(e)
        }
    }
}

/// PUT /api/recipes/{id} - Replace a recipe, children included.
pub async fn update_recipe(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    submission: Submission<RecipeRequest>,
) -> ApiResult<Recipe> {
    let (request, image) = submission.into_parts();
    let mut draft = request.validate()?;

    let existing = state
        .repo
        .get_recipe(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))?;

    let stored = upload_submitted_image(&state, IMAGE_FOLDER, image).await?;
    if let Some(stored) = &stored {
        draft.image = Some(stored.url.clone());
    }

    let recipe = match state.repo.update_recipe(&id, &draft).await {
        Ok(recipe) => recipe,
        Err(e) => {
            discard_upload(&state, stored.as_ref()).await;
            return Err(e);
        }
    };

    if let Some(old) = existing.image.filter(|old| recipe.image.as_ref() != Some(old)) {
        remove_image_url(state.storage.as_ref(), &old).await;
    }

    tracing::info!("Updated recipe {}", recipe.id);
    success(recipe)
}

/// DELETE /api/recipes/{id}
pub async fn delete_recipe(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let existing = state
        .repo
        .get_recipe(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))?;

    state.repo.delete_recipe(&id).await?;

    if let Some(image) = existing.image {
        remove_image_url(state.storage.as_ref(), &image).await;
    }

    tracing::info!("Deleted recipe {} ({})", id, admin.email);
    success(Deleted { id })
}
