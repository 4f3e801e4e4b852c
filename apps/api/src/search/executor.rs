//! Match Executor — runs a composed query against the `SearchStore` one page at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::profile::{
    has_text, EmploymentType, EnglishProficiency, Profile, VerificationStatus,
};
use crate::search::composer::compose;
use crate::search::criteria::SearchCriteria;
use crate::store::SearchStore;

pub const PAGE_SIZE: i64 = 20;

pub const DEFAULT_NAME: &str = "Anonymous Talent";
pub const DEFAULT_HEADLINE: &str = "Open to opportunities";
pub const DEFAULT_BIO: &str = "This candidate has not written a bio yet.";
pub const DEFAULT_PHOTO_URL: &str = "https://api.dicebear.com/7.x/initials/svg?seed=Guest";

/// Display-ready projection of a matched seeker. Text fields are never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentResult {
    pub id: Uuid,
    pub full_name: String,
    pub photo_url: String,
    pub headline: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub talent_score: i32,
    pub iq_score: Option<i32>,
    pub is_verified_pro: bool,
    pub verification_status: VerificationStatus,
    pub expected_salary: Option<i32>,
    pub employment_type: Option<EmploymentType>,
    pub english_proficiency: Option<EnglishProficiency>,
}

impl From<Profile> for TalentResult {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            full_name: or_default(profile.full_name, DEFAULT_NAME),
            photo_url: or_default(profile.photo_url, DEFAULT_PHOTO_URL),
            headline: or_default(profile.headline, DEFAULT_HEADLINE),
            bio: or_default(profile.bio, DEFAULT_BIO),
            skills: profile.skills,
            talent_score: profile.talent_score,
            iq_score: profile.iq_score,
            is_verified_pro: profile.is_verified_pro,
            verification_status: profile.verification_status,
            expected_salary: profile.expected_salary,
            employment_type: profile.employment_type,
            english_proficiency: profile.english_proficiency,
        }
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if has_text(Some(v.as_str())) => v,
        _ => default.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<TalentResult>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: i64,
}

#[derive(Clone)]
pub struct MatchExecutor {
    store: Arc<dyn SearchStore>,
}

impl MatchExecutor {
    pub fn new(store: Arc<dyn SearchStore>) -> Self {
        Self { store }
    }

    /// Returns one page of matches. Pages are 1-based; 0 is read as 1.
    ///
    /// Store failures are logged and come back as an empty page with
    /// `total_count = 0`, so callers always have something to render.
    pub async fn search(&self, query: &str, criteria: &SearchCriteria, page: u32) -> SearchPage {
        let page = page.max(1);
        let offset = i64::from(page - 1) * PAGE_SIZE;
        let predicate = compose(query, criteria);

        match self.store.find_profiles(&predicate, offset, PAGE_SIZE).await {
            Ok((records, total_count)) => {
                debug!(query, page, total_count, "Talent search complete");
                SearchPage {
                    results: records.into_iter().map(TalentResult::from).collect(),
                    total_count,
                    page,
                    page_size: PAGE_SIZE,
                }
            }
            Err(e) => {
                error!(query, page, "Talent search failed: {e}");
                SearchPage {
                    results: vec![],
                    total_count: 0,
                    page,
                    page_size: PAGE_SIZE,
                }
            }
        }
    }
}
