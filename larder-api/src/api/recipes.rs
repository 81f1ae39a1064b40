//! Recipe catalogue and ingestion endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::api::AuthUser;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Result of reconciling upstream against storage
#[derive(Debug, Serialize)]
pub struct CheckNewResponse {
    /// Slugs present upstream but never stored or marked bad
    pub new_slugs: Vec<String>,
    /// Slugs present upstream that previously failed ingestion
    pub previously_bad: Vec<String>,
}

/// Result of ingesting one slug
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

/// GET /recipes
pub async fn list_recipes(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<db::recipes::RecipeSummary>>> {
    let summaries = db::recipes::list_recipes(&state.db).await?;
    Ok(Json(summaries))
}

/// GET /recipes/:id
pub async fn get_recipe(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<db::recipes::StoredRecipe>> {
    match db::recipes::get_recipe(&state.db, id).await? {
        Some(recipe) => Ok(Json(recipe)),
        None => Err(ApiError::NotFound(format!("No recipe with id {}", id))),
    }
}

/// GET /recipes/check-new
///
/// Walks the upstream listing and reports which slugs are not yet
/// stored. Slug lists are sorted so repeated calls compare cleanly.
pub async fn check_new(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<CheckNewResponse>> {
    let reconciliation = state.ingestor.check_new(&state.shutdown).await?;

    let mut new_slugs: Vec<String> = reconciliation.new_slugs.into_iter().collect();
    let mut previously_bad: Vec<String> = reconciliation.previously_bad.into_iter().collect();
    new_slugs.sort();
    previously_bad.sort();

    Ok(Json(CheckNewResponse {
        new_slugs,
        previously_bad,
    }))
}

/// POST /recipes/add/:slug
pub async fn add_recipe(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<IngestResponse>> {
    let recipe = state.ingestor.ingest_slug(&slug).await?;

    let id = db::recipes::get_recipe_id_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Recipe '{}' vanished after ingest", slug)))?;

    info!(slug = %slug, id, "Recipe added via API");
    Ok(Json(IngestResponse {
        id,
        slug,
        title: recipe.title,
    }))
}

/// Build recipe routes
pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/check-new", get(check_new))
        .route("/recipes/:id", get(get_recipe))
        .route("/recipes/add/:slug", post(add_recipe))
}
