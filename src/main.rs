// src/main.rs

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use embercoach::coach::CoachService;
use embercoach::config::Config;
use embercoach::llm::OpenAiBackend;
use embercoach::providers::SqliteProviders;
use embercoach::session::SessionStore;
use embercoach::{db, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("starting embercoach (model: {})", config.completion_model);

    let pool = db::create_pool(&config.database_url).await?;
    db::init_schema(&pool).await?;

    let providers = Arc::new(SqliteProviders::new(pool.clone()));
    let backend = Arc::new(OpenAiBackend::new(&config)?);
    let coach = Arc::new(CoachService::new(
        SessionStore::new(pool),
        providers.clone(),
        providers.clone(),
        providers,
        backend,
    ));

    server::run(&config, coach).await
}
