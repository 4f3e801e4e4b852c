//! Storage collaborators consumed by the intelligence core.
//!
//! `ProfileStore` serves the convergence engine (targeted derived-field patches)
//! and saved searches; `SearchStore` serves the match executor. `PgStore`
//! implements both against Postgres.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::profile::{Profile, VerificationStatus};
use crate::models::saved_search::{NewSavedSearch, SavedSearch};
use crate::search::composer::PredicateSpec;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A field-level write of derived profile state. Never touches user-owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "aspect", rename_all = "snake_case")]
pub enum ProfilePatch {
    TalentScore {
        talent_score: i32,
    },
    Verification {
        is_verified_pro: bool,
        verification_status: VerificationStatus,
    },
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut Profile) {
        match self {
            ProfilePatch::TalentScore { talent_score } => profile.talent_score = *talent_score,
            ProfilePatch::Verification {
                is_verified_pro,
                verification_status,
            } => {
                profile.is_verified_pro = *is_verified_pro;
                profile.verification_status = *verification_status;
            }
        }
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn read_profile(&self, id: Uuid) -> Result<Profile, StoreError>;

    async fn patch_profile(&self, id: Uuid, patch: &ProfilePatch) -> Result<(), StoreError>;

    async fn list_saved_searches(&self, owner_id: Uuid) -> Result<Vec<SavedSearch>, StoreError>;

    async fn save_search(&self, search: NewSavedSearch) -> Result<SavedSearch, StoreError>;

    async fn delete_saved_search(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError>;
}

/// Paged record source over the seeker population.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Returns one page of matching profiles and the total match count.
    async fn find_profiles(
        &self,
        predicate: &PredicateSpec,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Profile>, i64), StoreError>;
}
