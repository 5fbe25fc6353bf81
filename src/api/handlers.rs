use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension, Json as RequestJson,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::policies;
use crate::config::SearchConfig;
use crate::error::{ApiError, DomainError};
use crate::logic::experience::total_experience;
use crate::logic::filter_params::validate_search;
use crate::logic::permissions::authorize;
use crate::logic::query_params::{rel, EagerLoad};
use crate::logic::search::{compose_search, SearchOptions, SearchTarget};
use crate::model::{
    Candidate, CandidateSummary, CandidateUpdate, Company, Id, Job, JobSummary, JobUpdate,
    ListResponse, NewCandidate, NewCompany, NewEducationRecord, NewExperience, NewJob,
    NewLanguageSkill, NewUser, SearchParams, User, UserContext,
};
use crate::store::accessor::RecordAccessor;
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Search results: full records, or summaries when `minimal` was requested
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResponse<F, M> {
    Full(ListResponse<F>),
    Minimal(ListResponse<M>),
}

/// Candidate with the experience total the search filter compares against
#[derive(Debug, Serialize)]
pub struct CandidateProfile {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub total_experience_months: i64,
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

async fn search<S, F, M>(
    store: &S,
    target: SearchTarget,
    params: &SearchParams,
    config: &SearchConfig,
) -> Result<SearchResponse<F, M>, DomainError>
where
    S: Store,
    F: serde::de::DeserializeOwned,
    M: serde::de::DeserializeOwned,
{
    let filters = validate_search(params)?;
    let options = SearchOptions::from_params(params, config);
    let query = compose_search(target, &filters, &options, today())?;
    log::debug!("{:?} search with {:?}", target, filters);

    let accessor = RecordAccessor::new(store);
    if options.minimal {
        Ok(SearchResponse::Minimal(ListResponse::new(
            accessor.fetch_all(query).await?,
        )))
    } else {
        Ok(SearchResponse::Full(ListResponse::new(
            accessor.fetch_all(query).await?,
        )))
    }
}

async fn load_candidate<S: Store>(store: &S, id: Id) -> Result<CandidateProfile, DomainError> {
    let candidate: Candidate = RecordAccessor::new(store)
        .fetch_by_id(
            rel::CANDIDATES,
            id,
            SearchTarget::Candidates.profile_eager_loads(),
        )
        .await?;
    let total_experience_months = total_experience(&candidate.experiences, today()).whole_months();
    Ok(CandidateProfile {
        candidate,
        total_experience_months,
    })
}

async fn load_job<S: Store>(store: &S, id: Id) -> Result<Job, DomainError> {
    RecordAccessor::new(store)
        .fetch_by_id(rel::JOBS, id, SearchTarget::Jobs.profile_eager_loads())
        .await
}

pub async fn search_candidates<S: Store>(
    State(store): State<AppState<S>>,
    Extension(config): Extension<SearchConfig>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse<Candidate, CandidateSummary>>, ApiError> {
    let results = search(&*store, SearchTarget::Candidates, &params, &config).await?;
    Ok(Json(results))
}

pub async fn search_jobs<S: Store>(
    State(store): State<AppState<S>>,
    Extension(config): Extension<SearchConfig>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse<Job, JobSummary>>, ApiError> {
    let results = search(&*store, SearchTarget::Jobs, &params, &config).await?;
    Ok(Json(results))
}

pub async fn get_candidate<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<CandidateProfile>, ApiError> {
    Ok(Json(load_candidate(&*store, id).await?))
}

pub async fn get_job<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(load_job(&*store, id).await?))
}

pub async fn get_company<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Company>, ApiError> {
    let company = RecordAccessor::new(&*store)
        .fetch_by_id(rel::COMPANIES, id, &[EagerLoad::Address])
        .await?;
    Ok(Json(company))
}

// Users

/// Registration is open except for elevated accounts
pub async fn create_user<S: Store>(
    State(store): State<AppState<S>>,
    caller: Option<UserContext>,
    RequestJson(new_user): RequestJson<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if new_user.role.is_elevated() {
        authorize(caller.as_ref(), policies::REGISTER_ADMIN, None, &*store).await?;
    }
    let id = store.create_user(new_user).await?;
    let user = RecordAccessor::new(&*store)
        .fetch_by_id(rel::USERS, id, &[])
        .await?;
    log::info!("registered user {}", id);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(caller.as_ref(), policies::DELETE_USER, Some(id), &*store).await?;
    if !store.delete_user(id).await? {
        return Err(DomainError::NotFound { entity: "User" }.into());
    }
    Ok(Json(json!({ "deleted": id })))
}

// Candidates

pub async fn create_candidate<S: Store>(
    State(store): State<AppState<S>>,
    caller: Option<UserContext>,
    RequestJson(new_candidate): RequestJson<NewCandidate>,
) -> Result<(StatusCode, Json<CandidateProfile>), ApiError> {
    authorize(
        caller.as_ref(),
        policies::CREATE_CANDIDATE,
        Some(new_candidate.user_id),
        &*store,
    )
    .await?;
    let id = store.create_candidate(new_candidate).await?;
    Ok((StatusCode::CREATED, Json(load_candidate(&*store, id).await?)))
}

pub async fn update_candidate<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
    RequestJson(update): RequestJson<CandidateUpdate>,
) -> Result<Json<CandidateProfile>, ApiError> {
    authorize(caller.as_ref(), policies::EDIT_CANDIDATE, Some(id), &*store).await?;
    if !store.update_candidate(id, update).await? {
        return Err(DomainError::NotFound { entity: "Candidate" }.into());
    }
    Ok(Json(load_candidate(&*store, id).await?))
}

pub async fn delete_candidate<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(caller.as_ref(), policies::EDIT_CANDIDATE, Some(id), &*store).await?;
    if !store.delete_candidate(id).await? {
        return Err(DomainError::NotFound { entity: "Candidate" }.into());
    }
    Ok(Json(json!({ "deleted": id })))
}

pub async fn add_experience<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
    RequestJson(experience): RequestJson<NewExperience>,
) -> Result<(StatusCode, Json<CandidateProfile>), ApiError> {
    authorize(caller.as_ref(), policies::EDIT_CANDIDATE, Some(id), &*store).await?;
    store.add_experience(id, experience).await?;
    Ok((StatusCode::CREATED, Json(load_candidate(&*store, id).await?)))
}

pub async fn add_language<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
    RequestJson(language): RequestJson<NewLanguageSkill>,
) -> Result<(StatusCode, Json<CandidateProfile>), ApiError> {
    authorize(caller.as_ref(), policies::EDIT_CANDIDATE, Some(id), &*store).await?;
    store.add_language(id, language).await?;
    Ok((StatusCode::CREATED, Json(load_candidate(&*store, id).await?)))
}

pub async fn add_education<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
    RequestJson(education): RequestJson<NewEducationRecord>,
) -> Result<(StatusCode, Json<CandidateProfile>), ApiError> {
    authorize(caller.as_ref(), policies::EDIT_CANDIDATE, Some(id), &*store).await?;
    store.add_education(id, education).await?;
    Ok((StatusCode::CREATED, Json(load_candidate(&*store, id).await?)))
}

// Companies and jobs

pub async fn create_company<S: Store>(
    State(store): State<AppState<S>>,
    caller: Option<UserContext>,
    RequestJson(new_company): RequestJson<NewCompany>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    authorize(
        caller.as_ref(),
        policies::CREATE_COMPANY,
        Some(new_company.user_id),
        &*store,
    )
    .await?;
    let id = store.create_company(new_company).await?;
    let company = RecordAccessor::new(&*store)
        .fetch_by_id(rel::COMPANIES, id, &[EagerLoad::Address])
        .await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn create_job<S: Store>(
    State(store): State<AppState<S>>,
    Path(company_id): Path<Id>,
    caller: Option<UserContext>,
    RequestJson(new_job): RequestJson<NewJob>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    authorize(
        caller.as_ref(),
        policies::POST_JOB,
        Some(company_id),
        &*store,
    )
    .await?;
    let id = store.create_job(company_id, new_job).await?;
    Ok((StatusCode::CREATED, Json(load_job(&*store, id).await?)))
}

pub async fn update_job<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
    RequestJson(update): RequestJson<JobUpdate>,
) -> Result<Json<Job>, ApiError> {
    authorize(caller.as_ref(), policies::EDIT_JOB, Some(id), &*store).await?;
    if !store.update_job(id, update).await? {
        return Err(DomainError::NotFound { entity: "Job" }.into());
    }
    Ok(Json(load_job(&*store, id).await?))
}

pub async fn delete_job<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    caller: Option<UserContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(caller.as_ref(), policies::EDIT_JOB, Some(id), &*store).await?;
    if !store.delete_job(id).await? {
        return Err(DomainError::NotFound { entity: "Job" }.into());
    }
    Ok(Json(json!({ "deleted": id })))
}
