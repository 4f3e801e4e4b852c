use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum Role {
    #[default]
    Seeker,
    Employer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Pending,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
            EmploymentType::Contract => "contract",
            EmploymentType::Freelance => "freelance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum EnglishProficiency {
    Basic,
    Conversational,
    Fluent,
    Native,
}

impl EnglishProficiency {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnglishProficiency::Basic => "basic",
            EnglishProficiency::Conversational => "conversational",
            EnglishProficiency::Fluent => "fluent",
            EnglishProficiency::Native => "native",
        }
    }
}

/// Canonical record for one account, seeker or employer.
///
/// `talent_score`, `is_verified_pro` and `verification_status` are derived
/// fields. Only the convergence engine writes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    pub full_name: Option<String>,
    pub photo_url: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
    pub education_level: Option<String>,
    pub iq_score: Option<i32>,
    pub disc_profile: Option<String>,
    pub english_proficiency: Option<EnglishProficiency>,
    pub verification_proof_url: Option<String>,
    pub verification_status: VerificationStatus,
    pub is_verified_pro: bool,
    pub skills: Vec<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub twitter_url: Option<String>,
    pub government_id_url: Option<String>,
    pub billing_address: Option<String>,
    pub mobile_number: Option<String>,
    pub expected_salary: Option<i32>,
    pub employment_type: Option<EmploymentType>,
    pub talent_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn social_links(&self) -> [Option<&str>; 4] {
        [
            self.linkedin_url.as_deref(),
            self.github_url.as_deref(),
            self.portfolio_url.as_deref(),
            self.twitter_url.as_deref(),
        ]
    }
}

/// True when the value is present and not blank. Whitespace-only counts as absent.
pub fn has_text(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}
