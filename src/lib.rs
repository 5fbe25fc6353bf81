pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

pub use api::handlers;
pub use api::routes;

pub use error::{DomainError, DomainResult, ErrorResponse};

pub use logic::{compose_search, validate_search, QueryParams, SearchTarget};

pub use model::*;

pub use store::{PostgresStore, RecordAccessor, Store};

/// Start the HTTP server with configuration from the environment
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = crate::config::AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    let database_url = config.database_url()?;
    let postgres_store =
        crate::store::PostgresStore::connect(&database_url, &config.database).await?;
    postgres_store.migrate().await?;

    let store = Arc::new(postgres_store);
    let app = crate::api::routes::create_router(config.search.clone()).with_state(store);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
