use serde::{Deserialize, Serialize};

use crate::models::profile::{EmploymentType, EnglishProficiency};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentTypeFilter {
    #[default]
    Any,
    FullTime,
    PartTime,
    Contract,
    Freelance,
}

impl EmploymentTypeFilter {
    pub fn selected(&self) -> Option<EmploymentType> {
        match self {
            EmploymentTypeFilter::Any => None,
            EmploymentTypeFilter::FullTime => Some(EmploymentType::FullTime),
            EmploymentTypeFilter::PartTime => Some(EmploymentType::PartTime),
            EmploymentTypeFilter::Contract => Some(EmploymentType::Contract),
            EmploymentTypeFilter::Freelance => Some(EmploymentType::Freelance),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyFilter {
    #[default]
    Any,
    Basic,
    Conversational,
    Fluent,
    Native,
}

impl ProficiencyFilter {
    pub fn selected(&self) -> Option<EnglishProficiency> {
        match self {
            ProficiencyFilter::Any => None,
            ProficiencyFilter::Basic => Some(EnglishProficiency::Basic),
            ProficiencyFilter::Conversational => Some(EnglishProficiency::Conversational),
            ProficiencyFilter::Fluent => Some(EnglishProficiency::Fluent),
            ProficiencyFilter::Native => Some(EnglishProficiency::Native),
        }
    }
}

/// How recently a candidate must have updated their profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyFilter {
    #[default]
    Any,
    Day,
    Week,
    Month,
}

impl RecencyFilter {
    pub fn window_days(&self) -> Option<i32> {
        match self {
            RecencyFilter::Any => None,
            RecencyFilter::Day => Some(1),
            RecencyFilter::Week => Some(7),
            RecencyFilter::Month => Some(30),
        }
    }
}

/// Filter set assembled per search request. The default value filters nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    pub search_names: bool,
    pub search_descriptions: bool,
    pub required_skills: Vec<String>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    /// 0 means "any".
    pub min_talent_score: i32,
    /// 0 means "any".
    pub min_iq: i32,
    pub employment_type: EmploymentTypeFilter,
    pub english_proficiency: ProficiencyFilter,
    pub recency: RecencyFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_default_criteria() {
        let criteria: SearchCriteria = serde_json::from_str("{}").unwrap();
        assert_eq!(criteria, SearchCriteria::default());
        assert_eq!(criteria.employment_type, EmploymentTypeFilter::Any);
        assert_eq!(criteria.recency.window_days(), None);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let criteria: SearchCriteria = serde_json::from_str(
            r#"{"required_skills": ["Rust"], "employment_type": "part_time", "recency": "week"}"#,
        )
        .unwrap();
        assert_eq!(criteria.required_skills, vec!["Rust".to_string()]);
        assert_eq!(
            criteria.employment_type.selected(),
            Some(EmploymentType::PartTime)
        );
        assert_eq!(criteria.recency.window_days(), Some(7));
        assert!(!criteria.search_names);
        assert_eq!(criteria.english_proficiency.selected(), None);
    }
}
