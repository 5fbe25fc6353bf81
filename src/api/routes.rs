use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use crate::api::handlers;
use crate::config::SearchConfig;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>(search: SearchConfig) -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Users
        .route("/users", post(handlers::create_user::<S>))
        .route("/users/:id", delete(handlers::delete_user::<S>))
        // Candidates
        .route(
            "/candidates",
            get(handlers::search_candidates::<S>).post(handlers::create_candidate::<S>),
        )
        .route(
            "/candidates/:id",
            get(handlers::get_candidate::<S>)
                .patch(handlers::update_candidate::<S>)
                .delete(handlers::delete_candidate::<S>),
        )
        .route(
            "/candidates/:id/experiences",
            post(handlers::add_experience::<S>),
        )
        .route("/candidates/:id/languages", post(handlers::add_language::<S>))
        .route(
            "/candidates/:id/educations",
            post(handlers::add_education::<S>),
        )
        // Companies
        .route("/companies", post(handlers::create_company::<S>))
        .route("/companies/:id", get(handlers::get_company::<S>))
        .route("/companies/:id/jobs", post(handlers::create_job::<S>))
        // Jobs
        .route("/jobs", get(handlers::search_jobs::<S>))
        .route(
            "/jobs/:id",
            get(handlers::get_job::<S>)
                .patch(handlers::update_job::<S>)
                .delete(handlers::delete_job::<S>),
        )
        .layer(Extension(search))
        .layer(CatchPanicLayer::new())
}
