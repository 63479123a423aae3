mod assignment;
mod cache;
mod config;
mod db;
mod export;
mod ids;
mod notice;
mod preferences;
mod projection;
mod routes;
mod session;
mod state;
mod templates;
mod validation;
mod view;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oponentura=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    let store = db::connect(&config.database_url).await?;
    let (cache, _watcher) = cache::LiveCache::start(store.clone()).await?;

    let state = Arc::new(state::AppState {
        store,
        cache,
        config: config.clone(),
    });

    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Oponentura listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
