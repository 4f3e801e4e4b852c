use crate::intelligence::ProfileIntelligence;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Scoring, convergence and search over the configured stores.
    pub intelligence: ProfileIntelligence,
}
