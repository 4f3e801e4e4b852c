use crate::models::profile::{has_text, Profile, Role};

/// Whether a seeker qualifies for the verified-pro badge.
///
/// Requires a government ID, billing address and mobile number. Format checks
/// belong to the edit surface. Employers are never eligible.
pub fn is_eligible_for_pro_verification(profile: &Profile) -> bool {
    profile.role == Role::Seeker
        && has_text(profile.government_id_url.as_deref())
        && has_text(profile.billing_address.as_deref())
        && has_text(profile.mobile_number.as_deref())
}
