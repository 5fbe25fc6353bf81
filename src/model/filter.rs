use serde::{Deserialize, Serialize};

use crate::model::{Availability, LookupKey};

/// Raw query-string parameters accepted by the candidate and job search
/// endpoints. Nothing here is trusted; see `logic::filter_params`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_sector: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_level: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education_sector: Option<String>,

    /// Comma separated skill names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,

    /// Return the summary projection instead of full records
    #[serde(default)]
    pub minimal: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFilter {
    PostalCode(String),
    /// Lowercased province name
    Province(String),
}

/// At least one of the two fields is always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceFilter {
    pub months: Option<i32>,
    pub sector: Option<LookupKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageFilter {
    pub language: LookupKey,
    pub minimum_level: Option<i32>,
}

/// A qualification name excludes filtering by level or sector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationFilter {
    Name(String),
    Level {
        minimum_level: Option<i32>,
        sector: Option<LookupKey>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillsFilter {
    pub skills: Vec<String>,
    pub availability: Option<Availability>,
}

/// The validated set of filter dimensions for one search request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub location: Option<LocationFilter>,
    pub experience: Option<ExperienceFilter>,
    pub language: Option<LanguageFilter>,
    pub education: Option<EducationFilter>,
    pub skills: Option<SkillsFilter>,
}
