use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Address, Availability, Id, NewAddress};

/// Full candidate record, including the relations the search endpoints
/// load eagerly. Eager fields are empty when the query did not request them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Id,
    pub user_id: Id,
    pub first_name: String,
    pub last_name: String,
    pub headline: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub availability: Vec<Availability>,
    pub address_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub languages: Vec<LanguageSkill>,
    #[serde(default)]
    pub educations: Vec<EducationRecord>,
}

/// Minimal projection used by listing screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub user_id: Id,
    pub first_name: String,
    pub last_name: String,
    pub headline: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub availability: Vec<Availability>,
    pub address: Option<NewAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub skills: Option<Vec<String>>,
    pub availability: Option<Vec<Availability>>,
    pub address: Option<NewAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: Id,
    pub candidate_id: Id,
    pub sector_id: Option<Id>,
    pub title: String,
    pub company_name: String,
    pub start_date: NaiveDate,
    /// `None` while the position is ongoing
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExperience {
    pub title: String,
    pub company_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Sector name; an existing sector with the same name is reused
    pub sector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub language_id: Id,
    pub language: String,
    pub level: String,
    pub level_value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLanguageSkill {
    pub language_id: Id,
    pub level_id: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub education_id: Id,
    pub qualification: String,
    pub level: String,
    pub level_value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEducationRecord {
    pub education_id: Id,
}
