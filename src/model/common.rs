use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primary keys in the relational catalog are `bigserial`.
pub type Id = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Candidate,
    Company,
}

impl Role {
    /// The elevated role short-circuits every authorization check
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Candidate => "candidate",
            Role::Company => "company",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "candidate" => Ok(Role::Candidate),
            "company" => Ok(Role::Company),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    FullTime,
    PartTime,
    Freelance,
    Internship,
    Remote,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::FullTime => "full_time",
            Availability::PartTime => "part_time",
            Availability::Freelance => "freelance",
            Availability::Internship => "internship",
            Availability::Remote => "remote",
        }
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "full_time" => Ok(Availability::FullTime),
            "part_time" => Ok(Availability::PartTime),
            "freelance" => Ok(Availability::Freelance),
            "internship" => Ok(Availability::Internship),
            "remote" => Ok(Availability::Remote),
            other => Err(format!("unknown availability '{}'", other)),
        }
    }
}

/// Reference to a lookup row given either by primary key or by name.
///
/// Request values that parse as an identifier are treated as one; anything
/// else is compared case-insensitively against the lookup's name column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupKey {
    Id(Id),
    Name(String),
}

impl LookupKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<Id>() {
            Ok(id) => LookupKey::Id(id),
            Err(_) => LookupKey::Name(trimmed.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}
