//! Validation of raw search parameters into normalized filter dimensions.
//!
//! Each validator returns `Ok(None)` when its dimension was not requested and
//! rejects combinations that cannot be expressed as a single filter.

use crate::error::{DomainError, DomainResult};
use crate::model::{
    Availability, EducationFilter, ExperienceFilter, LanguageFilter, LocationFilter, LookupKey,
    SearchFilters, SearchParams, SkillsFilter,
};

/// Treat empty or whitespace-only query values as absent
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn validate_location(
    postal_code: Option<&str>,
    province: Option<&str>,
) -> DomainResult<Option<LocationFilter>> {
    match (present(postal_code), present(province)) {
        (Some(_), Some(_)) => Err(DomainError::validation(
            "postal_code and province cannot be combined",
            &["postal_code", "province"],
        )),
        (Some(code), None) => Ok(Some(LocationFilter::PostalCode(code.to_string()))),
        (None, Some(province)) => Ok(Some(LocationFilter::Province(province.to_lowercase()))),
        (None, None) => Ok(None),
    }
}

pub fn validate_experience(
    months: Option<u32>,
    sector: Option<&str>,
) -> DomainResult<Option<ExperienceFilter>> {
    // Bound as a Postgres int
    let months = months
        .map(i32::try_from)
        .transpose()
        .map_err(|_| {
            DomainError::validation("experience_months is out of range", &["experience_months"])
        })?;
    let sector = present(sector).map(LookupKey::parse);
    if months.is_none() && sector.is_none() {
        return Ok(None);
    }
    Ok(Some(ExperienceFilter { months, sector }))
}

pub fn validate_language(
    language: Option<&str>,
    minimum_level: Option<i32>,
) -> DomainResult<Option<LanguageFilter>> {
    match (present(language), minimum_level) {
        (None, Some(_)) => Err(DomainError::validation(
            "language_level requires a language",
            &["language", "language_level"],
        )),
        (None, None) => Ok(None),
        (Some(language), minimum_level) => Ok(Some(LanguageFilter {
            language: LookupKey::parse(language),
            minimum_level,
        })),
    }
}

pub fn validate_education(
    name: Option<&str>,
    minimum_level: Option<i32>,
    sector: Option<&str>,
) -> DomainResult<Option<EducationFilter>> {
    let sector = present(sector);
    match present(name) {
        Some(_) if minimum_level.is_some() || sector.is_some() => {
            let mut parameters = vec!["education"];
            if minimum_level.is_some() {
                parameters.push("education_level");
            }
            if sector.is_some() {
                parameters.push("education_sector");
            }
            Err(DomainError::validation(
                "education cannot be combined with education_level or education_sector",
                &parameters,
            ))
        }
        Some(name) => Ok(Some(EducationFilter::Name(name.to_lowercase()))),
        None if minimum_level.is_none() && sector.is_none() => Ok(None),
        None => Ok(Some(EducationFilter::Level {
            minimum_level,
            sector: sector.map(LookupKey::parse),
        })),
    }
}

pub fn validate_skills(
    skills: Option<&str>,
    availability: Option<&str>,
) -> DomainResult<Option<SkillsFilter>> {
    let skills: Vec<String> = present(skills)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let availability = present(availability)
        .map(|raw| {
            raw.parse::<Availability>()
                .map_err(|e| DomainError::validation(e, &["availability"]))
        })
        .transpose()?;

    if skills.is_empty() && availability.is_none() {
        return Ok(None);
    }
    Ok(Some(SkillsFilter {
        skills,
        availability,
    }))
}

/// Validate every dimension of a search request
pub fn validate_search(params: &SearchParams) -> DomainResult<SearchFilters> {
    Ok(SearchFilters {
        location: validate_location(params.postal_code.as_deref(), params.province.as_deref())?,
        experience: validate_experience(
            params.experience_months,
            params.experience_sector.as_deref(),
        )?,
        language: validate_language(params.language.as_deref(), params.language_level)?,
        education: validate_education(
            params.education.as_deref(),
            params.education_level,
            params.education_sector.as_deref(),
        )?,
        skills: validate_skills(params.skills.as_deref(), params.availability.as_deref())?,
    })
}
