//! Axum route handlers for the profile intelligence API.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intelligence::convergence::ConvergenceReport;
use crate::intelligence::ProfileScore;
use crate::state::AppState;

/// GET /api/v1/profiles/:id/score
///
/// Computes the Talent Score breakdown for the stored profile. Read-only.
pub async fn handle_get_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileScore>, AppError> {
    Ok(Json(state.intelligence.score_profile(id).await?))
}

/// POST /api/v1/profiles/:id/converge
///
/// Called by the edit surface after a profile save. Runs one convergence pass
/// and reports what was written; write failures show up in the report, not as errors.
pub async fn handle_converge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConvergenceReport>, AppError> {
    Ok(Json(state.intelligence.converge_profile(id).await?))
}
