mod config;
mod error;
mod extract;
mod fetch;
mod models;
mod normalize;
mod routes;

use config::Config;
use fetch::Fetcher;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let app = routes::router(AppState {
        fetcher: Fetcher::new(&config)?,
        require_instagram_host: config.require_instagram_host,
    });

    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    tracing::info!(
        page_timeout = ?config.page_timeout,
        media_timeout = ?config.media_timeout,
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
