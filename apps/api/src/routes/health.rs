use axum::Json;
use serde::Serialize;

use crate::search::executor::PAGE_SIZE;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Fixed page size of talent search results.
    pub search_page_size: i64,
}

/// GET /health
/// Liveness check. Does not touch the database.
pub async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: "talent-api",
        version: env!("CARGO_PKG_VERSION"),
        search_page_size: PAGE_SIZE,
    })
}
