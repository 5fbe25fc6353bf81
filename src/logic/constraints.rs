//! Translation of integrity violations raised by write transactions into
//! stable domain errors.

use axum::http::StatusCode;
use sqlx::{Postgres, Transaction};

use crate::error::{DomainError, DomainResult};

const CONFLICT: StatusCode = StatusCode::CONFLICT;
const UNPROCESSABLE: StatusCode = StatusCode::UNPROCESSABLE_ENTITY;

/// Named constraints of the catalog schema and the error each one maps to
static CONSTRAINTS: &[(&str, StatusCode, &str)] = &[
    ("users_username_key", CONFLICT, "Username is already taken"),
    ("users_email_key", CONFLICT, "Email is already registered"),
    ("addresses_location_key", CONFLICT, "Address already exists"),
    ("sectors_name_key", CONFLICT, "Sector already exists"),
    ("languages_name_key", CONFLICT, "Language already exists"),
    ("language_levels_value_key", CONFLICT, "Language level already exists"),
    ("education_levels_value_key", CONFLICT, "Education level already exists"),
    ("educations_level_id_fkey", UNPROCESSABLE, "Education level does not exist"),
    ("education_sectors_pkey", CONFLICT, "Education is already linked to this sector"),
    ("candidates_user_id_key", CONFLICT, "User already has a candidate profile"),
    ("candidates_user_id_fkey", UNPROCESSABLE, "User does not exist"),
    ("candidates_address_id_fkey", UNPROCESSABLE, "Address does not exist"),
    ("experiences_candidate_id_fkey", UNPROCESSABLE, "Candidate does not exist"),
    ("experiences_sector_id_fkey", UNPROCESSABLE, "Sector does not exist"),
    ("experiences_dates_check", UNPROCESSABLE, "Experience cannot end before it starts"),
    ("candidate_languages_pkey", CONFLICT, "Language is already listed for this candidate"),
    ("candidate_languages_candidate_id_fkey", UNPROCESSABLE, "Candidate does not exist"),
    ("candidate_languages_language_id_fkey", UNPROCESSABLE, "Language does not exist"),
    ("candidate_languages_level_id_fkey", UNPROCESSABLE, "Language level does not exist"),
    ("candidate_educations_pkey", CONFLICT, "Education is already listed for this candidate"),
    ("candidate_educations_candidate_id_fkey", UNPROCESSABLE, "Candidate does not exist"),
    ("candidate_educations_education_id_fkey", UNPROCESSABLE, "Education does not exist"),
    ("companies_user_id_key", CONFLICT, "User already has a company"),
    ("companies_name_key", CONFLICT, "Company name is already taken"),
    ("companies_user_id_fkey", UNPROCESSABLE, "User does not exist"),
    ("companies_address_id_fkey", UNPROCESSABLE, "Address does not exist"),
    ("jobs_company_id_fkey", UNPROCESSABLE, "Company does not exist"),
    ("jobs_sector_id_fkey", UNPROCESSABLE, "Sector does not exist"),
    ("jobs_address_id_fkey", UNPROCESSABLE, "Address does not exist"),
    ("job_languages_pkey", CONFLICT, "Language is already listed for this job"),
    ("job_languages_job_id_fkey", UNPROCESSABLE, "Job does not exist"),
    ("job_languages_language_id_fkey", UNPROCESSABLE, "Language does not exist"),
    ("job_languages_level_id_fkey", UNPROCESSABLE, "Language level does not exist"),
    ("job_educations_pkey", CONFLICT, "Education is already listed for this job"),
    ("job_educations_job_id_fkey", UNPROCESSABLE, "Job does not exist"),
    ("job_educations_education_id_fkey", UNPROCESSABLE, "Education does not exist"),
];

pub fn lookup(constraint: &str) -> Option<(StatusCode, &'static str)> {
    CONSTRAINTS
        .iter()
        .find(|(name, _, _)| *name == constraint)
        .map(|(_, status, message)| (*status, *message))
}

/// Constraint identifier of a violation. The driver-supplied name wins; the
/// quoted name in the server message is a degraded fallback.
pub fn extract_constraint(name: Option<&str>, message: &str) -> Option<String> {
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    const MARKER: &str = "constraint \"";
    let start = message.find(MARKER)? + MARKER.len();
    let len = message[start..].find('"')?;
    let parsed = &message[start..start + len];
    if parsed.is_empty() {
        return None;
    }
    log::debug!("constraint name parsed from message: {}", parsed);
    Some(parsed.to_string())
}

pub fn translate_violation(name: Option<&str>, message: &str) -> DomainError {
    let constraint = extract_constraint(name, message);
    match constraint.as_deref().and_then(|c| lookup(c).map(|mapped| (c, mapped))) {
        Some((constraint, (status, message))) => DomainError::Constraint {
            status,
            message: message.to_string(),
            constraint: constraint.to_string(),
        },
        None => {
            log::error!(
                target: "audit",
                "unmapped write failure: constraint={:?} message={}",
                constraint,
                message
            );
            DomainError::UnknownWrite
        }
    }
}

pub fn translate_sqlx_error(err: &sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db) => translate_violation(db.constraint(), db.message()),
        other => {
            log::error!(target: "audit", "write failed: {}", other);
            DomainError::UnknownWrite
        }
    }
}

/// Commit `tx` when the write body succeeded, otherwise roll it back and
/// translate the failure. Every write path finishes through here.
pub async fn finish_write<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, sqlx::Error>,
) -> DomainResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| translate_sqlx_error(&e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                log::error!("rollback failed: {}", rollback);
            }
            Err(translate_sqlx_error(&err))
        }
    }
}
