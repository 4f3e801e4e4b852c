//! Profile intelligence: Talent Score, pro verification and their convergence,
//! plus the `ProfileIntelligence` facade handed to the presentation layer.

pub mod convergence;
pub mod handlers;
pub mod score;
pub mod verification;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::intelligence::convergence::{ConvergenceEngine, ConvergenceReport, Observation};
use crate::intelligence::score::{compute_score, ScoreBreakdown};
use crate::models::profile::Profile;
use crate::models::saved_search::{NewSavedSearch, SavedSearch};
use crate::search::criteria::SearchCriteria;
use crate::search::executor::{MatchExecutor, SearchPage};
use crate::store::{ProfileStore, SearchStore, StoreError};

const MAX_CONVERGENCE_PASSES: usize = 2;

/// A stored profile's freshly computed breakdown next to its persisted score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileScore {
    pub profile_id: Uuid,
    pub breakdown: ScoreBreakdown,
    pub stored_talent_score: i32,
    /// False while convergence has yet to persist the current total.
    pub in_sync: bool,
}

/// In-process API over both halves of the subsystem.
#[derive(Clone)]
pub struct ProfileIntelligence {
    profiles: Arc<dyn ProfileStore>,
    convergence: Arc<ConvergenceEngine>,
    matcher: MatchExecutor,
}

impl ProfileIntelligence {
    pub fn new(profiles: Arc<dyn ProfileStore>, search: Arc<dyn SearchStore>) -> Self {
        Self {
            convergence: Arc::new(ConvergenceEngine::new(profiles.clone())),
            profiles,
            matcher: MatchExecutor::new(search),
        }
    }

    pub fn compute_score(&self, profile: &Profile) -> ScoreBreakdown {
        compute_score(profile)
    }

    pub async fn score_profile(&self, id: Uuid) -> Result<ProfileScore, StoreError> {
        let profile = self.profiles.read_profile(id).await?;
        let breakdown = self.compute_score(&profile);
        Ok(ProfileScore {
            profile_id: id,
            in_sync: breakdown.total as i32 == profile.talent_score,
            stored_talent_score: profile.talent_score,
            breakdown,
        })
    }

    /// Converges every snapshot published on `profiles` until the sender is dropped.
    pub fn subscribe_to_convergence(
        &self,
        profiles: watch::Receiver<Observation>,
    ) -> JoinHandle<()> {
        self.convergence.clone().subscribe(profiles)
    }

    /// Reads the stored record and converges it. A verification write moves the
    /// score, so a pass that wrote is followed by one more over a fresh read.
    pub async fn converge_profile(&self, id: Uuid) -> Result<ConvergenceReport, StoreError> {
        let profile = self.profiles.read_profile(id).await?;
        let mut report = self
            .convergence
            .on_profile_changed(&Observation::Loaded(profile))
            .await;

        for _ in 1..MAX_CONVERGENCE_PASSES {
            if report.writes() == 0 {
                break;
            }
            let profile = self.profiles.read_profile(id).await?;
            let next = self
                .convergence
                .on_profile_changed(&Observation::Loaded(profile))
                .await;
            report = report.followed_by(next);
        }
        Ok(report)
    }

    pub async fn search(&self, query: &str, criteria: &SearchCriteria, page: u32) -> SearchPage {
        self.matcher.search(query, criteria, page).await
    }

    pub async fn saved_searches(&self, owner_id: Uuid) -> Result<Vec<SavedSearch>, StoreError> {
        self.profiles.list_saved_searches(owner_id).await
    }

    pub async fn save_search(&self, search: NewSavedSearch) -> Result<SavedSearch, StoreError> {
        self.profiles.save_search(search).await
    }

    pub async fn delete_saved_search(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        self.profiles.delete_saved_search(owner_id, id).await
    }
}
