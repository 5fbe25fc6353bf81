use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Address, Availability, EducationRecord, Id, LanguageSkill, NewAddress, NewLanguageSkill,
    Sector,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub address_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
    pub user_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<NewAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Id,
    pub company_id: Id,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub availability: Vec<Availability>,
    pub sector_id: Option<Id>,
    pub required_experience_months: i32,
    pub address_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    #[serde(default)]
    pub languages: Vec<LanguageSkill>,
    #[serde(default)]
    pub educations: Vec<EducationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Id,
    pub title: String,
    pub company_id: Id,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub availability: Vec<Availability>,
    pub sector: Option<String>,
    #[serde(default)]
    pub required_experience_months: i32,
    pub address: Option<NewAddress>,
    #[serde(default)]
    pub languages: Vec<NewLanguageSkill>,
    #[serde(default)]
    pub educations: Vec<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub availability: Option<Vec<Availability>>,
    pub sector: Option<String>,
    pub required_experience_months: Option<i32>,
    pub address: Option<NewAddress>,
}
