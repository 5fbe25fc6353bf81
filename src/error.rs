//! Domain error taxonomy shared by the query, authorization and write paths

use axum::{http::StatusCode, Json};
use serde::Serialize;
use thiserror::Error;

pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid filter parameters: {message}")]
    Validation {
        message: String,
        parameters: Vec<String>,
    },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Integrity violation with a known constraint
    #[error("{message}")]
    Constraint {
        status: StatusCode,
        message: String,
        constraint: String,
    },

    #[error("Integration error")]
    UnknownWrite,

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl DomainError {
    pub fn validation(message: impl Into<String>, parameters: &[&str]) -> Self {
        DomainError::Validation {
            message: message.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Constraint { status, .. } => *status,
            DomainError::UnknownWrite | DomainError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            parameters: None,
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl From<DomainError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: DomainError) -> Self {
        let status = err.status();
        let body = match &err {
            DomainError::Validation { parameters, .. } => ErrorResponse {
                error: err.to_string(),
                parameters: Some(parameters.clone()),
            },
            // Store internals stay in the logs
            DomainError::Store(inner) => {
                log::error!("store failure: {:#}", inner);
                ErrorResponse::new("Internal server error")
            }
            _ => ErrorResponse::new(&err.to_string()),
        };
        (status, Json(body))
    }
}
