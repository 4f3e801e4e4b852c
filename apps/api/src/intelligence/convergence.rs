//! Convergence Engine — keeps derived profile fields in line with the raw facts.
//!
//! Two aspects converge independently:
//! - score: `talent_score` follows `compute_score(profile).total`
//! - verification (seekers only): `is_verified_pro` / `verification_status`
//!   follow `is_eligible_for_pro_verification(profile)`
//!
//! Each aspect issues at most one field-level patch per observation, only when
//! the derived value actually moves, and never while a previous patch for the
//! same (profile, aspect) is still in flight. Busy observations are dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::intelligence::score::compute_score;
use crate::intelligence::verification::is_eligible_for_pro_verification;
use crate::models::profile::{Profile, Role, VerificationStatus};
use crate::store::{ProfilePatch, ProfileStore};

// ────────────────────────────────────────────────────────────────────────────
// Observations and outcomes
// ────────────────────────────────────────────────────────────────────────────

/// One snapshot of the live profile as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The profile has not been fetched yet.
    Loading,
    Loaded(Profile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    Score,
    Verification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AspectOutcome {
    /// Still loading, or no stable identity yet.
    Inert,
    /// The aspect does not apply to this profile (verification on employers).
    NotApplicable,
    Unchanged,
    /// Another write for this aspect was in flight; the observation was dropped.
    Coalesced,
    Written(ProfilePatch),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvergenceReport {
    pub score: AspectOutcome,
    pub verification: AspectOutcome,
}

impl ConvergenceReport {
    fn inert() -> Self {
        Self {
            score: AspectOutcome::Inert,
            verification: AspectOutcome::Inert,
        }
    }

    pub fn writes(&self) -> usize {
        self.written().count()
    }

    /// Patches this pass persisted.
    pub fn written(&self) -> impl Iterator<Item = &ProfilePatch> {
        [&self.score, &self.verification]
            .into_iter()
            .filter_map(|o| match o {
                AspectOutcome::Written(patch) => Some(patch),
                _ => None,
            })
    }

    /// Brings an in-memory snapshot in line with what this pass persisted.
    pub fn apply_to(&self, profile: &mut Profile) {
        for patch in self.written() {
            patch.apply(profile);
        }
    }

    /// Folds a follow-up pass into this one. An aspect the later pass left
    /// `Unchanged` keeps the earlier outcome.
    pub fn followed_by(self, next: ConvergenceReport) -> ConvergenceReport {
        fn fold(earlier: AspectOutcome, later: AspectOutcome) -> AspectOutcome {
            match later {
                AspectOutcome::Unchanged => earlier,
                later => later,
            }
        }
        ConvergenceReport {
            score: fold(self.score, next.score),
            verification: fold(self.verification, next.verification),
        }
    }

    /// False when an aspect may still be out of date (failed or dropped write).
    pub fn is_settled(&self) -> bool {
        ![&self.score, &self.verification]
            .into_iter()
            .any(|o| matches!(o, AspectOutcome::Failed(_) | AspectOutcome::Coalesced))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Derived fields are compared against the observed snapshot itself, so a
/// record repaired or broken by another writer converges on its next pass.
pub struct ConvergenceEngine {
    store: Arc<dyn ProfileStore>,
    in_flight: Mutex<HashSet<(Uuid, Aspect)>>,
}

/// Releases an in-flight slot on drop, including when the write future is dropped.
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<(Uuid, Aspect)>>,
    key: (Uuid, Aspect),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.slots).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConvergenceEngine {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Processes one observation. Never fails: store errors are logged and
    /// reported in the outcome so the next observation retries from the same
    /// snapshot values.
    pub async fn on_profile_changed(&self, observation: &Observation) -> ConvergenceReport {
        let profile = match observation {
            Observation::Loading => return ConvergenceReport::inert(),
            Observation::Loaded(profile) if profile.id.is_nil() => {
                return ConvergenceReport::inert()
            }
            Observation::Loaded(profile) => profile,
        };

        let score = self.converge_score(profile).await;
        let verification = if profile.role == Role::Seeker {
            self.converge_verification(profile).await
        } else {
            AspectOutcome::NotApplicable
        };

        let report = ConvergenceReport {
            score,
            verification,
        };
        debug!(profile_id = %profile.id, ?report, "Convergence pass complete");
        report
    }

    async fn converge_score(&self, profile: &Profile) -> AspectOutcome {
        let Some(_guard) = self.begin(profile.id, Aspect::Score) else {
            return AspectOutcome::Coalesced;
        };

        let target = compute_score(profile).total as i32;
        if target == profile.talent_score {
            return AspectOutcome::Unchanged;
        }

        let patch = ProfilePatch::TalentScore {
            talent_score: target,
        };
        let outcome = self.write(profile.id, patch).await;
        if matches!(outcome, AspectOutcome::Written(_)) {
            info!(profile_id = %profile.id, from = profile.talent_score, to = target, "Talent score converged");
        }
        outcome
    }

    async fn converge_verification(&self, profile: &Profile) -> AspectOutcome {
        let Some(_guard) = self.begin(profile.id, Aspect::Verification) else {
            return AspectOutcome::Coalesced;
        };

        let eligible = is_eligible_for_pro_verification(profile);
        if eligible == profile.is_verified_pro {
            return AspectOutcome::Unchanged;
        }

        let patch = ProfilePatch::Verification {
            is_verified_pro: eligible,
            verification_status: if eligible {
                VerificationStatus::Verified
            } else {
                VerificationStatus::Unverified
            },
        };
        let outcome = self.write(profile.id, patch).await;
        if matches!(outcome, AspectOutcome::Written(_)) {
            info!(profile_id = %profile.id, verified = eligible, "Pro verification converged");
        }
        outcome
    }

    async fn write(&self, id: Uuid, patch: ProfilePatch) -> AspectOutcome {
        match self.store.patch_profile(id, &patch).await {
            Ok(()) => AspectOutcome::Written(patch),
            Err(e) => {
                // No retry here; the next observation re-evaluates.
                warn!(profile_id = %id, ?patch, "Convergence write failed: {e}");
                AspectOutcome::Failed(e.to_string())
            }
        }
    }

    fn begin(&self, id: Uuid, aspect: Aspect) -> Option<InFlightGuard<'_>> {
        let key = (id, aspect);
        if !lock(&self.in_flight).insert(key) {
            debug!(profile_id = %id, ?aspect, "Write already in flight, dropping observation");
            return None;
        }
        Some(InFlightGuard {
            slots: &self.in_flight,
            key,
        })
    }

    /// Drives the engine from a live profile value until the sender is dropped.
    ///
    /// The current value is evaluated immediately. Later values are evaluated
    /// when a trigger field changed, or when the previous pass did not settle.
    /// Values published before the live source caught up with a write made
    /// here are read with that write applied, so they do not re-fire it.
    pub fn subscribe(self: Arc<Self>, mut profiles: watch::Receiver<Observation>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut last_seen: Option<Profile> = None;
            let mut echoes: Vec<Echo> = Vec::new();
            let mut settled = false;
            loop {
                let snapshot = profiles.borrow_and_update().clone();
                let observation = match snapshot {
                    Observation::Loaded(mut current) => {
                        if last_seen.as_ref().map(|p| p.id) != Some(current.id) {
                            echoes.clear();
                        }
                        echoes.retain(|echo| echo.overlay(&mut current));
                        Observation::Loaded(current)
                    }
                    Observation::Loading => {
                        echoes.clear();
                        Observation::Loading
                    }
                };

                let skip = match (&observation, &last_seen) {
                    (Observation::Loaded(current), Some(previous)) => {
                        settled
                            && previous.id == current.id
                            && !trigger_fields_changed(previous, current)
                    }
                    _ => false,
                };

                if !skip {
                    let report = self.on_profile_changed(&observation).await;
                    settled = report.is_settled();
                    last_seen = match observation {
                        Observation::Loaded(mut profile) => {
                            echoes.extend(Echo::from_report(&report, &profile));
                            report.apply_to(&mut profile);
                            Some(profile)
                        }
                        Observation::Loading => None,
                    };
                }

                if profiles.changed().await.is_err() {
                    debug!("Profile stream closed, stopping convergence");
                    break;
                }
            }
        })
    }
}

/// A write made by a subscription that the live value may not show yet.
#[derive(Debug)]
struct Echo {
    before: ProfilePatch,
    written: ProfilePatch,
}

impl Echo {
    fn from_report(report: &ConvergenceReport, profile: &Profile) -> Vec<Echo> {
        report
            .written()
            .map(|patch| Echo {
                before: observed(patch, profile),
                written: patch.clone(),
            })
            .collect()
    }

    /// Applies the write to a value that still shows the pre-write fields.
    /// Returns false once the value moved on, whoever moved it.
    fn overlay(&self, profile: &mut Profile) -> bool {
        if observed(&self.written, profile) != self.before {
            return false;
        }
        self.written.apply(profile);
        true
    }
}

/// The profile's current values for the fields `patch` writes.
fn observed(patch: &ProfilePatch, profile: &Profile) -> ProfilePatch {
    match patch {
        ProfilePatch::TalentScore { .. } => ProfilePatch::TalentScore {
            talent_score: profile.talent_score,
        },
        ProfilePatch::Verification { .. } => ProfilePatch::Verification {
            is_verified_pro: profile.is_verified_pro,
            verification_status: profile.verification_status,
        },
    }
}

/// True when an edit touched a derived field or any field that feeds the
/// score or eligibility.
pub fn trigger_fields_changed(before: &Profile, after: &Profile) -> bool {
    before.role != after.role
        || before.talent_score != after.talent_score
        || before.full_name != after.full_name
        || before.photo_url != after.photo_url
        || before.resume_url != after.resume_url
        || before.education_level != after.education_level
        || before.iq_score != after.iq_score
        || before.verification_proof_url != after.verification_proof_url
        || before.verification_status != after.verification_status
        || before.is_verified_pro != after.is_verified_pro
        || before.skills != after.skills
        || before.social_links() != after.social_links()
        || before.government_id_url != after.government_id_url
        || before.billing_address != after.billing_address
        || before.mobile_number != after.mobile_number
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::models::saved_search::{NewSavedSearch, SavedSearch};
    use crate::store::memory::InMemoryStore;
    use crate::store::StoreError;

    fn seeker(name: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            role: Role::Seeker,
            full_name: Some(name.to_string()),
            talent_score: 5,
            ..Profile::default()
        }
    }

    /// Patches fail while `failures_left > 0`, then succeed. Counts attempts.
    #[derive(Default)]
    struct FlakyStore {
        failures_left: AtomicUsize,
        attempts: AtomicUsize,
    }

    /// Patches block until `gate` is notified. Counts attempts.
    #[derive(Default)]
    struct GatedStore {
        gate: Notify,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl ProfileStore for FlakyStore {
        async fn read_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
            Err(StoreError::NotFound(id))
        }

        async fn patch_profile(&self, _id: Uuid, _patch: &ProfilePatch) -> Result<(), StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            Ok(())
        }

        async fn list_saved_searches(&self, _owner: Uuid) -> Result<Vec<SavedSearch>, StoreError> {
            Ok(vec![])
        }

        async fn save_search(&self, _search: NewSavedSearch) -> Result<SavedSearch, StoreError> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }

        async fn delete_saved_search(&self, _owner: Uuid, id: Uuid) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id))
        }
    }

    #[async_trait]
    impl ProfileStore for GatedStore {
        async fn read_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
            Err(StoreError::NotFound(id))
        }

        async fn patch_profile(&self, _id: Uuid, _patch: &ProfilePatch) -> Result<(), StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(())
        }

        async fn list_saved_searches(&self, _owner: Uuid) -> Result<Vec<SavedSearch>, StoreError> {
            Ok(vec![])
        }

        async fn save_search(&self, _search: NewSavedSearch) -> Result<SavedSearch, StoreError> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }

        async fn delete_saved_search(&self, _owner: Uuid, id: Uuid) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id))
        }
    }

    #[tokio::test]
    async fn test_resume_upload_issues_exactly_one_write() {
        let before = seeker("Ana");
        let store = Arc::new(InMemoryStore::with_profiles([before.clone()]));
        let engine = ConvergenceEngine::new(store.clone());

        let report = engine
            .on_profile_changed(&Observation::Loaded(before.clone()))
            .await;
        assert_eq!(report.score, AspectOutcome::Unchanged);
        assert_eq!(report.writes(), 0);

        let mut after = before.clone();
        after.resume_url = Some("https://cdn.example.com/ana.pdf".to_string());
        let report = engine
            .on_profile_changed(&Observation::Loaded(after.clone()))
            .await;
        assert_eq!(
            report.score,
            AspectOutcome::Written(ProfilePatch::TalentScore { talent_score: 25 })
        );

        report.apply_to(&mut after);
        assert_eq!(after.talent_score, 25);
        let report = engine.on_profile_changed(&Observation::Loaded(after)).await;
        assert_eq!(report.writes(), 0);

        let patches = store.patches().await;
        assert_eq!(patches.len(), 1);
        assert_eq!(
            store.read_profile(before.id).await.unwrap().talent_score,
            25
        );
    }

    #[tokio::test]
    async fn test_record_changed_by_another_writer_is_repaired() {
        let mut profile = seeker("Gia");
        profile.resume_url = Some("gia.pdf".to_string());
        let store = Arc::new(InMemoryStore::with_profiles([profile.clone()]));
        let first = ConvergenceEngine::new(store.clone());
        let second = ConvergenceEngine::new(store.clone());

        first
            .on_profile_changed(&Observation::Loaded(store.read_profile(profile.id).await.unwrap()))
            .await;
        assert_eq!(store.read_profile(profile.id).await.unwrap().talent_score, 25);

        let mut edited = store.read_profile(profile.id).await.unwrap();
        edited.resume_url = None;
        store.insert(edited.clone()).await;
        second.on_profile_changed(&Observation::Loaded(edited)).await;
        assert_eq!(store.read_profile(profile.id).await.unwrap().talent_score, 5);

        let mut restored = store.read_profile(profile.id).await.unwrap();
        restored.resume_url = Some("gia-v2.pdf".to_string());
        store.insert(restored.clone()).await;
        let report = first.on_profile_changed(&Observation::Loaded(restored)).await;
        assert_eq!(
            report.score,
            AspectOutcome::Written(ProfilePatch::TalentScore { talent_score: 25 })
        );
        assert_eq!(store.read_profile(profile.id).await.unwrap().talent_score, 25);
    }

    #[tokio::test]
    async fn test_loading_and_guest_observations_are_inert() {
        let store = Arc::new(InMemoryStore::default());
        let engine = ConvergenceEngine::new(store.clone());

        let report = engine.on_profile_changed(&Observation::Loading).await;
        assert_eq!(report, ConvergenceReport::inert());

        let mut guest = seeker("Guest");
        guest.id = Uuid::nil();
        guest.resume_url = Some("cv.pdf".to_string());
        let report = engine.on_profile_changed(&Observation::Loaded(guest)).await;
        assert_eq!(report, ConvergenceReport::inert());
        assert!(store.patches().await.is_empty());
    }

    #[tokio::test]
    async fn test_seeker_verification_follows_eligibility() {
        let mut profile = seeker("Ben");
        profile.government_id_url = Some("id.jpg".to_string());
        profile.billing_address = Some("1 Rizal Ave".to_string());
        profile.mobile_number = Some("+639170000000".to_string());
        let store = Arc::new(InMemoryStore::with_profiles([profile.clone()]));
        let engine = ConvergenceEngine::new(store.clone());

        let report = engine
            .on_profile_changed(&Observation::Loaded(profile.clone()))
            .await;
        assert_eq!(
            report.verification,
            AspectOutcome::Written(ProfilePatch::Verification {
                is_verified_pro: true,
                verification_status: VerificationStatus::Verified,
            })
        );

        report.apply_to(&mut profile);
        profile.mobile_number = None;
        let report = engine.on_profile_changed(&Observation::Loaded(profile)).await;
        assert_eq!(
            report.verification,
            AspectOutcome::Written(ProfilePatch::Verification {
                is_verified_pro: false,
                verification_status: VerificationStatus::Unverified,
            })
        );
    }

    #[tokio::test]
    async fn test_employer_verification_is_never_touched() {
        let mut employer = seeker("Acme Hiring");
        employer.role = Role::Employer;
        employer.is_verified_pro = true;
        employer.government_id_url = Some("id.jpg".to_string());
        employer.billing_address = Some("HQ".to_string());
        employer.mobile_number = Some("+15550100".to_string());
        employer.talent_score = compute_score(&employer).total as i32;
        let store = Arc::new(InMemoryStore::with_profiles([employer.clone()]));
        let engine = ConvergenceEngine::new(store.clone());

        let report = engine.on_profile_changed(&Observation::Loaded(employer)).await;
        assert_eq!(report.verification, AspectOutcome::NotApplicable);
        assert_eq!(report.score, AspectOutcome::Unchanged);
        assert!(store.patches().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_is_retried_by_next_observation() {
        let store = Arc::new(FlakyStore::default());
        store.failures_left.store(1, Ordering::SeqCst);
        let engine = ConvergenceEngine::new(store.clone());

        let mut employer = seeker("Acme");
        employer.role = Role::Employer;
        employer.resume_url = Some("deck.pdf".to_string());
        let observation = Observation::Loaded(employer);

        let report = engine.on_profile_changed(&observation).await;
        assert!(matches!(report.score, AspectOutcome::Failed(_)));
        assert!(!report.is_settled());
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);

        let report = engine.on_profile_changed(&observation).await;
        assert_eq!(
            report.score,
            AspectOutcome::Written(ProfilePatch::TalentScore { talent_score: 25 })
        );
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_observation_is_coalesced_while_write_in_flight() {
        let store = Arc::new(GatedStore::default());
        let engine = ConvergenceEngine::new(store.clone());

        let mut employer = seeker("Acme");
        employer.role = Role::Employer;
        employer.resume_url = Some("deck.pdf".to_string());
        let observation = Observation::Loaded(employer);

        let first = engine.on_profile_changed(&observation);
        let second = async {
            tokio::task::yield_now().await;
            let report = engine.on_profile_changed(&observation).await;
            store.gate.notify_one();
            report
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(first.score, AspectOutcome::Written(_)));
        assert_eq!(second.score, AspectOutcome::Coalesced);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);

        // Slot released: the refreshed snapshot is already converged.
        let Observation::Loaded(mut refreshed) = observation else {
            unreachable!()
        };
        first.apply_to(&mut refreshed);
        let third = engine
            .on_profile_changed(&Observation::Loaded(refreshed))
            .await;
        assert_eq!(third.score, AspectOutcome::Unchanged);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscription_converges_latest_snapshot() {
        let profile = seeker("Cara");
        let store = Arc::new(InMemoryStore::with_profiles([profile.clone()]));
        let engine = Arc::new(ConvergenceEngine::new(store.clone()));

        let (tx, rx) = watch::channel(Observation::Loading);
        let handle = engine.subscribe(rx);

        let mut edited = profile.clone();
        edited.skills = vec!["Bookkeeping".to_string()];
        tx.send(Observation::Loaded(edited)).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            store.patches().await,
            vec![(
                profile.id,
                ProfilePatch::TalentScore { talent_score: 15 }
            )]
        );
    }

    async fn drain() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_subscription_does_not_refire_on_stale_republish() {
        let profile = seeker("Hugo");
        let store = Arc::new(InMemoryStore::with_profiles([profile.clone()]));
        let engine = Arc::new(ConvergenceEngine::new(store.clone()));

        let mut uploaded = profile.clone();
        uploaded.resume_url = Some("hugo.pdf".to_string());
        let (tx, rx) = watch::channel(Observation::Loaded(uploaded.clone()));
        let handle = engine.subscribe(rx);
        drain().await;

        // The live value has not caught up with the score write yet.
        let mut stale = uploaded.clone();
        stale.bio = Some("Night-shift support lead".to_string());
        tx.send(Observation::Loaded(stale.clone())).unwrap();
        drain().await;
        assert_eq!(store.patches().await.len(), 1);

        // A trigger edit on the still-stale value converges from the written score.
        stale.resume_url = None;
        tx.send(Observation::Loaded(stale)).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            store.patches().await,
            vec![
                (profile.id, ProfilePatch::TalentScore { talent_score: 25 }),
                (profile.id, ProfilePatch::TalentScore { talent_score: 5 }),
            ]
        );
    }

    #[test]
    fn test_stale_overlay_yields_to_other_writers() {
        let mut profile = seeker("Ivy");
        let echo = Echo {
            before: ProfilePatch::TalentScore { talent_score: 5 },
            written: ProfilePatch::TalentScore { talent_score: 25 },
        };
        assert!(echo.overlay(&mut profile));
        assert_eq!(profile.talent_score, 25);

        profile.talent_score = 40;
        assert!(!echo.overlay(&mut profile));
        assert_eq!(profile.talent_score, 40);
    }

    #[test]
    fn test_trigger_fields_ignore_non_scoring_edits() {
        let before = seeker("Dana");
        let mut after = before.clone();
        after.bio = Some("Ten years in customer support".to_string());
        after.expected_salary = Some(900);
        assert!(!trigger_fields_changed(&before, &after));

        after.twitter_url = Some("https://x.com/dana".to_string());
        assert!(trigger_fields_changed(&before, &after));

        let mut rescored = before.clone();
        rescored.talent_score = 90;
        assert!(trigger_fields_changed(&before, &rescored));
    }
}
