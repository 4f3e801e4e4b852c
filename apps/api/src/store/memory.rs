//! In-memory store used as a fake collaborator in tests.
//!
//! Evaluates predicates with `PredicateSpec::matches`, orders by talent score
//! like the Postgres store, and records every patch it applies. Patch
//! failures can be injected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::profile::{Profile, Role};
use crate::models::saved_search::{NewSavedSearch, SavedSearch};
use crate::search::composer::PredicateSpec;
use crate::store::{ProfilePatch, ProfileStore, SearchStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    profiles: Arc<RwLock<HashMap<Uuid, Profile>>>,
    saved_searches: Arc<RwLock<Vec<SavedSearch>>>,
    patch_log: Arc<RwLock<Vec<(Uuid, ProfilePatch)>>>,
    patch_attempts: Arc<AtomicUsize>,
    failing_patches: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let map = profiles.into_iter().map(|p| (p.id, p)).collect();
        Self {
            profiles: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    pub async fn insert(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.id, profile);
    }

    /// Successful patches, in order.
    pub async fn patches(&self) -> Vec<(Uuid, ProfilePatch)> {
        self.patch_log.read().await.clone()
    }

    pub fn patch_attempts(&self) -> usize {
        self.patch_attempts.load(Ordering::SeqCst)
    }

    /// Makes the next `count` patch calls fail with `StoreError::Unavailable`.
    pub fn fail_next_patches(&self, count: usize) {
        self.failing_patches.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn read_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        self.profiles
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn patch_profile(&self, id: Uuid, patch: &ProfilePatch) -> Result<(), StoreError> {
        self.patch_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_patches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::Unavailable("injected patch failure".to_string()));
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply(profile);
        self.patch_log.write().await.push((id, patch.clone()));
        Ok(())
    }

    async fn list_saved_searches(&self, owner_id: Uuid) -> Result<Vec<SavedSearch>, StoreError> {
        let mut searches: Vec<SavedSearch> = self
            .saved_searches
            .read()
            .await
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        searches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(searches)
    }

    async fn save_search(&self, search: NewSavedSearch) -> Result<SavedSearch, StoreError> {
        let saved = SavedSearch {
            id: Uuid::new_v4(),
            owner_id: search.owner_id,
            name: search.name,
            query: search.query,
            criteria: search.criteria,
            created_at: Utc::now(),
        };
        self.saved_searches.write().await.push(saved.clone());
        Ok(saved)
    }

    async fn delete_saved_search(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut searches = self.saved_searches.write().await;
        let before = searches.len();
        searches.retain(|s| !(s.id == id && s.owner_id == owner_id));
        if searches.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchStore for InMemoryStore {
    async fn find_profiles(
        &self,
        predicate: &PredicateSpec,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Profile>, i64), StoreError> {
        let now = Utc::now();
        let mut matched: Vec<Profile> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|p| p.role == Role::Seeker && predicate.matches(p, now))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.talent_score
                .cmp(&a.talent_score)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}
