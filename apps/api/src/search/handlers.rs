//! Axum route handlers for talent search and saved searches.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::saved_search::{NewSavedSearch, SavedSearch};
use crate::search::criteria::SearchCriteria;
use crate::search::executor::SearchPage;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub criteria: SearchCriteria,
    #[serde(default = "first_page")]
    pub page: u32,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SaveSearchRequest {
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub criteria: SearchCriteria,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/talent/search
///
/// Always 200: a failed store read comes back as an empty page.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchPage> {
    Json(
        state
            .intelligence
            .search(&request.query, &request.criteria, request.page)
            .await,
    )
}

/// GET /api/v1/saved-searches?owner_id=
pub async fn handle_list_saved_searches(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<SavedSearch>>, AppError> {
    Ok(Json(
        state.intelligence.saved_searches(params.owner_id).await?,
    ))
}

/// POST /api/v1/saved-searches
pub async fn handle_save_search(
    State(state): State<AppState>,
    Json(request): Json<SaveSearchRequest>,
) -> Result<(StatusCode, Json<SavedSearch>), AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let criteria = serde_json::to_value(&request.criteria)
        .map_err(|e| AppError::Validation(format!("criteria could not be stored: {e}")))?;

    let saved = state
        .intelligence
        .save_search(NewSavedSearch {
            owner_id: request.owner_id,
            name: name.to_string(),
            query: request.query,
            criteria,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /api/v1/saved-searches/:id?owner_id=
pub async fn handle_delete_saved_search(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    state
        .intelligence
        .delete_saved_search(params.owner_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
