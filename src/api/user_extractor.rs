use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};

use crate::error::ErrorResponse;
use crate::model::{Id, Role, UserContext};

/// Axum extractor for UserContext from request headers
///
/// The authentication layer in front of the service forwards the caller as:
/// - X-User-Id: numeric user identifier
/// - X-User-Role: one of admin, candidate, company
///
/// Missing or malformed headers reject with 401. Handlers that must reach the
/// authorization step without a caller take `Option<UserContext>`.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Authentication required")),
            )
        })
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Option<UserContext> {
    let user_id = extract_header_value(headers, "x-user-id")?
        .trim()
        .parse::<Id>()
        .ok()?;
    let role = extract_header_value(headers, "x-user-role")?
        .parse::<Role>()
        .ok()?;
    Some(UserContext::new(user_id, role))
}

/// Extract header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}
