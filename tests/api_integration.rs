use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use jobmatch_db::api::routes::create_router;
use jobmatch_db::config::SearchConfig;
use jobmatch_db::logic::constraints::translate_violation;
use jobmatch_db::logic::query_params::QueryParams;
use jobmatch_db::store::traits::{OwnershipStore, RecordStore, ResourceKind, WriteStore};
use jobmatch_db::{
    CandidateUpdate, DomainResult, Id, JobUpdate, NewCandidate, NewCompany, NewEducationRecord,
    NewExperience, NewJob, NewLanguageSkill, NewUser,
};

/// Store double: every query returns the canned rows, ownership comes from a
/// fixed map and writes are recorded.
#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<Value>>,
    /// Rendered statements, in execution order
    queries: Mutex<Vec<String>>,
    owners: HashMap<(ResourceKind, Id), Id>,
    usernames: Mutex<Vec<String>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    fn owned(mut self, kind: ResourceKind, id: Id, owner: Id) -> Self {
        self.owners.insert((kind, id), owner);
        self
    }

    fn record(&self, write: String) {
        self.writes.lock().unwrap().push(write);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query_records(&self, query: &QueryParams) -> anyhow::Result<Vec<Value>> {
        self.queries.lock().unwrap().push(query.to_sql());
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[async_trait]
impl OwnershipStore for MemoryStore {
    async fn owner_of(&self, kind: ResourceKind, id: Id) -> anyhow::Result<Option<Id>> {
        Ok(self.owners.get(&(kind, id)).copied())
    }
}

#[async_trait]
impl WriteStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> DomainResult<Id> {
        let mut usernames = self.usernames.lock().unwrap();
        if usernames.contains(&user.username) {
            return Err(translate_violation(Some("users_username_key"), ""));
        }
        usernames.push(user.username);
        Ok(usernames.len() as Id)
    }

    async fn delete_user(&self, id: Id) -> DomainResult<bool> {
        self.record(format!("delete_user {}", id));
        Ok(true)
    }

    async fn create_candidate(&self, candidate: NewCandidate) -> DomainResult<Id> {
        self.record(format!("create_candidate {}", candidate.user_id));
        Ok(1)
    }

    async fn update_candidate(&self, id: Id, _update: CandidateUpdate) -> DomainResult<bool> {
        self.record(format!("update_candidate {}", id));
        Ok(true)
    }

    async fn delete_candidate(&self, id: Id) -> DomainResult<bool> {
        self.record(format!("delete_candidate {}", id));
        Ok(false)
    }

    async fn add_experience(&self, candidate_id: Id, _experience: NewExperience) -> DomainResult<Id> {
        self.record(format!("add_experience {}", candidate_id));
        Ok(1)
    }

    async fn add_language(&self, candidate_id: Id, _language: NewLanguageSkill) -> DomainResult<()> {
        self.record(format!("add_language {}", candidate_id));
        Ok(())
    }

    async fn add_education(
        &self,
        candidate_id: Id,
        _education: NewEducationRecord,
    ) -> DomainResult<()> {
        self.record(format!("add_education {}", candidate_id));
        Ok(())
    }

    async fn create_company(&self, company: NewCompany) -> DomainResult<Id> {
        self.record(format!("create_company {}", company.user_id));
        Ok(1)
    }

    async fn create_job(&self, company_id: Id, _job: NewJob) -> DomainResult<Id> {
        self.record(format!("create_job {}", company_id));
        Ok(1)
    }

    async fn update_job(&self, id: Id, _update: JobUpdate) -> DomainResult<bool> {
        self.record(format!("update_job {}", id));
        Ok(true)
    }

    async fn delete_job(&self, id: Id) -> DomainResult<bool> {
        self.record(format!("delete_job {}", id));
        Ok(true)
    }
}

fn app(store: Arc<MemoryStore>) -> Router {
    create_router::<MemoryStore>(SearchConfig::default()).with_state(store)
}

fn candidate_row() -> Value {
    json!({
        "id": 10,
        "user_id": 5,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "headline": null,
        "skills": ["rust"],
        "availability": ["remote"],
        "address_id": null,
        "created_at": "2024-01-01T00:00:00Z",
        "experiences": [
            {
                "id": 1,
                "candidate_id": 10,
                "sector_id": null,
                "title": "Engineer",
                "company_name": "Acme",
                "start_date": "2020-01-01",
                "end_date": "2021-01-01"
            }
        ],
        "languages": [],
        "educations": []
    })
}

fn job_row() -> Value {
    json!({
        "id": 20,
        "company_id": 3,
        "title": "Backend developer",
        "description": null,
        "skills": ["rust", "sql"],
        "availability": ["full_time"],
        "sector_id": null,
        "required_experience_months": 12,
        "address_id": null,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send(method: &str, uri: &str, caller: Option<(Id, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = caller {
        builder = builder
            .header("x-user-id", id.to_string())
            .header("x-user-role", role);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = app(Arc::new(MemoryStore::default()))
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_mutually_exclusive_location_is_rejected() {
    let store = Arc::new(MemoryStore::default());
    let response = app(store.clone())
        .oneshot(get("/candidates?postal_code=28001&province=Madrid"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["parameters"], json!(["postal_code", "province"]));
    // Never reaches the store
    assert!(store.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_candidate_search_composes_experience_subquery() {
    let store = Arc::new(MemoryStore::with_rows(vec![candidate_row()]));
    let response = app(store.clone())
        .oneshot(get(
            "/candidates?experience_sector=IT&experience_months=24&skills=Rust",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["first_name"], "Ada");

    let queries = store.queries.lock().unwrap();
    let sql = &queries[0];
    assert!(sql.contains(") experience_totals ON experience_totals.candidate_id = candidates.id"));
    assert_eq!(sql.matches("JOIN sectors ").count(), 1);
    assert!(sql.contains("candidates.skills @> "));
    assert!(sql.ends_with("LIMIT $5"));
}

#[tokio::test]
async fn test_minimal_job_search_returns_summaries() {
    let store = Arc::new(MemoryStore::with_rows(vec![json!({
        "id": 20,
        "title": "Backend developer",
        "company_id": 3,
        "city": "madrid"
    })]));
    let response = app(store.clone())
        .oneshot(get("/jobs?minimal=true&experience_months=24&limit=5"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["items"][0]["city"], "madrid");

    let queries = store.queries.lock().unwrap();
    assert!(queries[0].starts_with("SELECT jsonb_build_object("));
    assert!(queries[0].contains("jobs.required_experience_months <= $1"));
}

#[tokio::test]
async fn test_unknown_order_column_is_rejected() {
    let response = app(Arc::new(MemoryStore::default()))
        .oneshot(get("/candidates?order_by=email"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_out_of_range_months_is_a_validation_error() {
    let store = Arc::new(MemoryStore::default());
    let response = app(store.clone())
        .oneshot(get("/candidates?experience_months=3000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["parameters"], json!(["experience_months"]));
    assert!(store.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_candidate_is_not_found() {
    let response = app(Arc::new(MemoryStore::default()))
        .oneshot(get("/candidates/99"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Candidate not found");
}

#[tokio::test]
async fn test_candidate_profile_reports_total_experience() {
    let response = app(Arc::new(MemoryStore::with_rows(vec![candidate_row()])))
        .oneshot(get("/candidates/10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 10);
    assert_eq!(body["total_experience_months"], 12);
}

#[tokio::test]
async fn test_delete_user_requires_admin() {
    let store = Arc::new(MemoryStore::default());

    let anonymous = app(store.clone())
        .oneshot(send("DELETE", "/users/5", None, json!({})))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let own_account = app(store.clone())
        .oneshot(send("DELETE", "/users/5", Some((5, "candidate")), json!({})))
        .await
        .unwrap();
    assert_eq!(own_account.status(), StatusCode::FORBIDDEN);

    let admin = app(store.clone())
        .oneshot(send("DELETE", "/users/5", Some((1, "admin")), json!({})))
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    assert_eq!(*store.writes.lock().unwrap(), vec!["delete_user 5"]);
}

#[tokio::test]
async fn test_job_update_checks_company_ownership() {
    let store = Arc::new(
        MemoryStore::with_rows(vec![job_row()]).owned(ResourceKind::Job, 20, 7),
    );
    let update = json!({ "title": "Senior backend developer" });

    let stranger = app(store.clone())
        .oneshot(send("PATCH", "/jobs/20", Some((8, "company")), update.clone()))
        .await
        .unwrap();
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);
    assert!(store.writes.lock().unwrap().is_empty());

    let owner = app(store.clone())
        .oneshot(send("PATCH", "/jobs/20", Some((7, "company")), update))
        .await
        .unwrap();
    assert_eq!(owner.status(), StatusCode::OK);
    assert_eq!(*store.writes.lock().unwrap(), vec!["update_job 20"]);
}

#[tokio::test]
async fn test_admin_bypasses_ownership() {
    let store = Arc::new(MemoryStore::default());
    let response = app(store.clone())
        .oneshot(send("DELETE", "/candidates/10", Some((1, "admin")), json!({})))
        .await
        .unwrap();
    // Allowed through; the store reports nothing was deleted
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(*store.writes.lock().unwrap(), vec!["delete_candidate 10"]);
}

#[tokio::test]
async fn test_candidate_profile_creation_is_limited_to_self() {
    let store = Arc::new(MemoryStore::with_rows(vec![candidate_row()]));
    let profile = json!({
        "user_id": 5,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "headline": null,
        "address": null
    });

    let other = app(store.clone())
        .oneshot(send("POST", "/candidates", Some((6, "candidate")), profile.clone()))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::FORBIDDEN);

    let own = app(store.clone())
        .oneshot(send("POST", "/candidates", Some((5, "candidate")), profile))
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_duplicate_username_maps_to_conflict() {
    let store = Arc::new(MemoryStore::with_rows(vec![json!({
        "id": 1,
        "username": "ada",
        "email": "ada@example.com",
        "role": "candidate",
        "created_at": "2024-01-01T00:00:00Z"
    })]));
    let user = json!({ "username": "ada", "email": "ada@example.com", "role": "candidate" });

    let first = app(store.clone())
        .oneshot(send("POST", "/users", None, user.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app(store.clone())
        .oneshot(send("POST", "/users", None, user))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["error"], "Username is already taken");
}

#[tokio::test]
async fn test_admin_accounts_cannot_self_register() {
    let store = Arc::new(MemoryStore::default());
    let user = json!({ "username": "root", "email": "root@example.com", "role": "admin" });

    let response = app(store.clone())
        .oneshot(send("POST", "/users", None, user))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.usernames.lock().unwrap().is_empty());
}
