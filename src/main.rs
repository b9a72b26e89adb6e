use library_catalog::config::Config;
use library_catalog::database::{DefaultAuthorRepository, DefaultBookRepository, establish_pool};
use library_catalog::http::{AppState, HttpServer, HttpServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("library_catalog=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    let pool = establish_pool(config.database_url(), config.database_max_connections()).await?;
    tracing::info!(url = config.database_url(), "connected to database");

    let state = AppState::new(
        DefaultAuthorRepository::new(pool.clone()),
        DefaultBookRepository::new(pool.clone()),
    );
    let server_config = HttpServerConfig::new(config.server_host(), config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    let result = http_server.run().await;

    pool.close().await;
    result
}
