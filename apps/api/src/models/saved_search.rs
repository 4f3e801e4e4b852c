use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedSearch {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub query: String,
    pub criteria: Value,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a saved search. The store assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavedSearch {
    pub owner_id: Uuid,
    pub name: String,
    pub query: String,
    pub criteria: Value,
}
