#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use env_logger::Builder;
    use log::LevelFilter;

    // Explicit filter so sqlx statement logs stay quiet
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    log::info!("jobmatch: candidate and job search service");

    jobmatch_db::run_server().await
}
