pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::intelligence::handlers as intelligence;
use crate::search::handlers as search;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profile intelligence
        .route(
            "/api/v1/profiles/:id/score",
            get(intelligence::handle_get_score),
        )
        .route(
            "/api/v1/profiles/:id/converge",
            post(intelligence::handle_converge),
        )
        // Talent search
        .route("/api/v1/talent/search", post(search::handle_search))
        .route(
            "/api/v1/saved-searches",
            get(search::handle_list_saved_searches).post(search::handle_save_search),
        )
        .route(
            "/api/v1/saved-searches/:id",
            delete(search::handle_delete_saved_search),
        )
        .with_state(state)
}
