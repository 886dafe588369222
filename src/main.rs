use std::sync::Arc;

use anirec_api::{
    config::Config,
    db::{create_redis_client, Cache},
    routes::{create_router, AppState},
    services::{
        catalog::{AniListClient, CatalogClient},
        recommendations::{PipelineSettings, RecommendationPipeline},
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anirec_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let catalog: Arc<dyn CatalogClient> = Arc::new(AniListClient::new(
        config.anilist_api_url.clone(),
        config.anilist_token.clone(),
        config.retry_policy(),
    ));

    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?);
            tracing::info!("Result cache enabled");
            (Some(cache), Some(handle))
        }
        None => {
            tracing::warn!("REDIS_URL not set, result cache disabled");
            (None, None)
        }
    };

    let state = Arc::new(AppState {
        pipeline: RecommendationPipeline::new(catalog.clone(), PipelineSettings::default()),
        catalog,
        cache,
        freshness: config.cache_freshness(),
    });

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}
