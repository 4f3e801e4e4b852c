use serde::{Deserialize, Serialize};

use crate::models::profile::{has_text, Profile, VerificationStatus};

pub const NAME_POINTS: u32 = 5;
pub const PICTURE_POINTS: u32 = 5;
pub const RESUME_POINTS: u32 = 20;
pub const EDUCATION_POINTS: u32 = 10;
pub const PSYCHOMETRIC_POINTS: u32 = 20;
pub const VERIFIED_POINTS: u32 = 20;
pub const PENDING_VERIFICATION_POINTS: u32 = 10;
pub const SKILLS_POINTS: u32 = 10;
pub const SOCIAL_POINTS: u32 = 10;

/// Marker carried by the auto-generated avatar every new account gets.
pub const DEFAULT_PHOTO_MARKER: &str = "guest";

/// Per-component Talent Score. Only `total` is ever persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub name: u32,
    pub picture: u32,
    pub resume: u32,
    pub education: u32,
    pub psychometric: u32,
    pub verification: u32,
    pub skills: u32,
    pub social: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerificationStage {
    Verified,
    Pending,
    None,
}

/// Computes the 0–100 Talent Score for a profile. Absent fields score zero.
pub fn compute_score(profile: &Profile) -> ScoreBreakdown {
    let name = points(has_text(profile.full_name.as_deref()), NAME_POINTS);
    let picture = points(has_custom_photo(profile), PICTURE_POINTS);
    let resume = points(has_text(profile.resume_url.as_deref()), RESUME_POINTS);
    let education = points(
        has_text(profile.education_level.as_deref()),
        EDUCATION_POINTS,
    );
    // IQ alone drives this component; DISC and English results are not counted.
    let psychometric = points(
        profile.iq_score.is_some_and(|iq| iq > 0),
        PSYCHOMETRIC_POINTS,
    );
    let verification = match verification_stage(profile) {
        VerificationStage::Verified => VERIFIED_POINTS,
        VerificationStage::Pending => PENDING_VERIFICATION_POINTS,
        VerificationStage::None => 0,
    };
    let skills = points(
        profile.skills.iter().any(|s| has_text(Some(s.as_str()))),
        SKILLS_POINTS,
    );
    let social = points(
        profile.social_links().into_iter().any(has_text),
        SOCIAL_POINTS,
    );

    ScoreBreakdown {
        name,
        picture,
        resume,
        education,
        psychometric,
        verification,
        skills,
        social,
        total: name + picture + resume + education + psychometric + verification + skills + social,
    }
}

fn points(present: bool, max: u32) -> u32 {
    if present {
        max
    } else {
        0
    }
}

fn has_custom_photo(profile: &Profile) -> bool {
    match profile.photo_url.as_deref() {
        Some(url) if has_text(Some(url)) => !url.to_lowercase().contains(DEFAULT_PHOTO_MARKER),
        _ => false,
    }
}

fn verification_stage(profile: &Profile) -> VerificationStage {
    if profile.is_verified_pro || profile.verification_status == VerificationStatus::Verified {
        VerificationStage::Verified
    } else if profile.verification_status == VerificationStatus::Pending
        || has_text(profile.verification_proof_url.as_deref())
    {
        VerificationStage::Pending
    } else {
        VerificationStage::None
    }
}
