use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::models::profile::Profile;
use crate::models::saved_search::{NewSavedSearch, SavedSearch};
use crate::search::composer::{FilterClause, MatchClause, PredicateSpec};
use crate::store::{ProfilePatch, ProfileStore, SearchStore, StoreError};

/// Postgres-backed store. Implements both collaborator traits over one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn read_profile(&self, id: Uuid) -> Result<Profile, StoreError> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn patch_profile(&self, id: Uuid, patch: &ProfilePatch) -> Result<(), StoreError> {
        // Targeted UPDATEs only: a concurrent user edit to any other column survives.
        let result = match patch {
            ProfilePatch::TalentScore { talent_score } => {
                sqlx::query("UPDATE profiles SET talent_score = $1 WHERE id = $2")
                    .bind(talent_score)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            ProfilePatch::Verification {
                is_verified_pro,
                verification_status,
            } => {
                sqlx::query(
                    "UPDATE profiles SET is_verified_pro = $1, verification_status = $2 WHERE id = $3",
                )
                .bind(is_verified_pro)
                .bind(verification_status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_saved_searches(&self, owner_id: Uuid) -> Result<Vec<SavedSearch>, StoreError> {
        Ok(sqlx::query_as::<_, SavedSearch>(
            "SELECT * FROM saved_searches WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_search(&self, search: NewSavedSearch) -> Result<SavedSearch, StoreError> {
        Ok(sqlx::query_as::<_, SavedSearch>(
            r#"
            INSERT INTO saved_searches (id, owner_id, name, query, criteria)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(search.owner_id)
        .bind(&search.name)
        .bind(&search.query)
        .bind(&search.criteria)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_saved_search(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM saved_searches WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchStore for PgStore {
    async fn find_profiles(
        &self,
        predicate: &PredicateSpec,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Profile>, i64), StoreError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        push_predicate(&mut count_query, predicate);
        debug!(sql = count_query.sql(), "Counting talent matches");
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::<Postgres>::new("SELECT * FROM profiles");
        push_predicate(&mut page_query, predicate);
        page_query
            .push(" ORDER BY talent_score DESC, updated_at DESC, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = page_query
            .build_query_as::<Profile>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }
}

/// Renders a predicate as a WHERE clause over the seeker population.
fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &PredicateSpec) {
    builder.push(" WHERE role = 'seeker'");

    if !predicate.any_of.is_empty() {
        builder.push(" AND (");
        for (i, clause) in predicate.any_of.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            push_match_clause(builder, clause);
        }
        builder.push(")");
    }

    for clause in &predicate.all_of {
        builder.push(" AND ");
        push_match_clause(builder, clause);
    }

    for filter in &predicate.filters {
        builder.push(" AND ");
        push_filter(builder, filter);
    }
}

fn push_match_clause(builder: &mut QueryBuilder<'_, Postgres>, clause: &MatchClause) {
    match clause {
        MatchClause::Contains { field, needle } => {
            builder
                .push(field.column())
                .push(" ILIKE ")
                .push_bind(like_pattern(needle));
        }
        MatchClause::SkillsOverlap { skills } => {
            builder.push("skills && ").push_bind(skills.clone());
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &FilterClause) {
    match filter {
        FilterClause::MinSalary { amount } => {
            builder.push("expected_salary >= ").push_bind(*amount);
        }
        FilterClause::MaxSalary { amount } => {
            builder.push("expected_salary <= ").push_bind(*amount);
        }
        FilterClause::MinTalentScore { score } => {
            builder.push("talent_score >= ").push_bind(*score);
        }
        FilterClause::MinIq { score } => {
            builder.push("iq_score >= ").push_bind(*score);
        }
        FilterClause::EmploymentType { value } => {
            builder.push("employment_type = ").push_bind(value.as_str());
        }
        FilterClause::EnglishProficiency { value } => {
            builder.push("english_proficiency = ").push_bind(value.as_str());
        }
        FilterClause::ActiveWithinDays { days } => {
            builder
                .push("updated_at >= NOW() - make_interval(days => ")
                .push_bind(*days)
                .push(")");
        }
    }
}

/// Wraps a needle for ILIKE, escaping the LIKE metacharacters.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
