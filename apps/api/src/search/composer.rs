//! Query Composer — turns a free-text query plus a `SearchCriteria` into a `PredicateSpec`.
//!
//! Pure and deterministic: identical inputs always yield an identical predicate,
//! clause for clause, in the same order. The predicate is backend-neutral; the
//! Postgres store renders it to SQL and `PredicateSpec::matches` evaluates it
//! in-process.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::profile::{EmploymentType, EnglishProficiency, Profile};
use crate::search::criteria::SearchCriteria;

/// Tokens shorter than this are dropped as noise.
const MIN_TERM_CHARS: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Predicate data model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Headline,
    Bio,
    FullName,
}

impl TextField {
    pub fn column(&self) -> &'static str {
        match self {
            TextField::Headline => "headline",
            TextField::Bio => "bio",
            TextField::FullName => "full_name",
        }
    }

    fn value<'a>(&self, profile: &'a Profile) -> Option<&'a str> {
        match self {
            TextField::Headline => profile.headline.as_deref(),
            TextField::Bio => profile.bio.as_deref(),
            TextField::FullName => profile.full_name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchClause {
    /// Case-insensitive substring test.
    Contains { field: TextField, needle: String },
    /// Non-empty intersection with the candidate's skills (exact element equality).
    SkillsOverlap { skills: Vec<String> },
}

impl MatchClause {
    pub fn matches(&self, profile: &Profile) -> bool {
        match self {
            MatchClause::Contains { field, needle } => field
                .value(profile)
                .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            MatchClause::SkillsOverlap { skills } => {
                profile.skills.iter().any(|s| skills.contains(s))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterClause {
    MinSalary { amount: i32 },
    MaxSalary { amount: i32 },
    MinTalentScore { score: i32 },
    MinIq { score: i32 },
    EmploymentType { value: EmploymentType },
    EnglishProficiency { value: EnglishProficiency },
    /// Profile updated within the last `days` days, relative to evaluation time.
    ActiveWithinDays { days: i32 },
}

impl FilterClause {
    pub fn matches(&self, profile: &Profile, now: DateTime<Utc>) -> bool {
        match self {
            FilterClause::MinSalary { amount } => {
                profile.expected_salary.is_some_and(|s| s >= *amount)
            }
            FilterClause::MaxSalary { amount } => {
                profile.expected_salary.is_some_and(|s| s <= *amount)
            }
            FilterClause::MinTalentScore { score } => profile.talent_score >= *score,
            FilterClause::MinIq { score } => profile.iq_score.is_some_and(|iq| iq >= *score),
            FilterClause::EmploymentType { value } => profile.employment_type == Some(*value),
            FilterClause::EnglishProficiency { value } => {
                profile.english_proficiency == Some(*value)
            }
            FilterClause::ActiveWithinDays { days } => {
                profile.updated_at >= now - Duration::days(i64::from(*days))
            }
        }
    }
}

/// Composed search request: `any_of` clauses are ORed together, then ANDed
/// with every `all_of` clause and every filter. Empty groups constrain nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateSpec {
    pub any_of: Vec<MatchClause>,
    pub all_of: Vec<MatchClause>,
    pub filters: Vec<FilterClause>,
}

impl PredicateSpec {
    pub fn is_match_all(&self) -> bool {
        self.any_of.is_empty() && self.all_of.is_empty() && self.filters.is_empty()
    }

    pub fn matches(&self, profile: &Profile, now: DateTime<Utc>) -> bool {
        let text_ok = self.any_of.is_empty() || self.any_of.iter().any(|c| c.matches(profile));
        text_ok
            && self.all_of.iter().all(|c| c.matches(profile))
            && self.filters.iter().all(|f| f.matches(profile, now))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Composition
// ────────────────────────────────────────────────────────────────────────────

pub fn compose(query: &str, criteria: &SearchCriteria) -> PredicateSpec {
    let full_query = query.trim();
    let terms = tokenize(full_query);

    let mut any_of: Vec<MatchClause> = Vec::new();
    if !full_query.is_empty() {
        push_unique(&mut any_of, contains(TextField::Headline, full_query));
        push_unique(
            &mut any_of,
            MatchClause::SkillsOverlap {
                skills: variations(full_query),
            },
        );
        for term in &terms {
            push_unique(&mut any_of, contains(TextField::Headline, term));
        }
        if criteria.search_descriptions {
            push_field_clauses(&mut any_of, TextField::Bio, full_query, &terms);
        }
        if criteria.search_names {
            push_field_clauses(&mut any_of, TextField::FullName, full_query, &terms);
        }
    }

    let mut all_of = Vec::new();
    let required = expand_skills(&criteria.required_skills);
    if !required.is_empty() {
        all_of.push(MatchClause::SkillsOverlap { skills: required });
    }

    PredicateSpec {
        any_of,
        all_of,
        filters: compose_filters(criteria),
    }
}

fn compose_filters(criteria: &SearchCriteria) -> Vec<FilterClause> {
    let mut filters = Vec::new();
    if let Some(amount) = criteria.min_salary {
        filters.push(FilterClause::MinSalary { amount });
    }
    if let Some(amount) = criteria.max_salary {
        filters.push(FilterClause::MaxSalary { amount });
    }
    if criteria.min_talent_score > 0 {
        filters.push(FilterClause::MinTalentScore {
            score: criteria.min_talent_score,
        });
    }
    if criteria.min_iq > 0 {
        filters.push(FilterClause::MinIq {
            score: criteria.min_iq,
        });
    }
    if let Some(value) = criteria.employment_type.selected() {
        filters.push(FilterClause::EmploymentType { value });
    }
    if let Some(value) = criteria.english_proficiency.selected() {
        filters.push(FilterClause::EnglishProficiency { value });
    }
    if let Some(days) = criteria.recency.window_days() {
        filters.push(FilterClause::ActiveWithinDays { days });
    }
    filters
}

fn push_field_clauses(
    clauses: &mut Vec<MatchClause>,
    field: TextField,
    full_query: &str,
    terms: &[String],
) {
    push_unique(clauses, contains(field, full_query));
    for term in terms {
        push_unique(clauses, contains(field, term));
    }
}

fn contains(field: TextField, needle: &str) -> MatchClause {
    MatchClause::Contains {
        field,
        needle: needle.to_string(),
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Splits on whitespace and commas, keeping tokens of at least two characters.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for token in query.split(|c: char| c.is_whitespace() || c == ',') {
        if token.chars().count() >= MIN_TERM_CHARS {
            push_unique(&mut terms, token.to_string());
        }
    }
    terms
}

/// Case variations of a term (as-given, lowercase, Capitalized, UPPERCASE). Duplicates collapse.
pub fn variations(value: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(4);
    for candidate in [
        value.to_string(),
        value.to_lowercase(),
        capitalize(value),
        value.to_uppercase(),
    ] {
        push_unique(&mut out, candidate);
    }
    out
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

fn expand_skills(skills: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();
    for skill in skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        for variant in variations(skill) {
            push_unique(&mut expanded, variant);
        }
    }
    expanded
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
