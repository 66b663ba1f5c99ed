//! Fleet engine HTTP server.

use std::error::Error;
use std::sync::Arc;

use fleet_engine::api::{AppState, create_router};
use fleet_engine::config::{ConfigLoader, ServerSettings};
use fleet_engine::store::{EntityStore, MemoryStore, PgStore};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = ServerSettings::from_env()?;
    let config = ConfigLoader::load(&settings.config_dir)?;
    info!(config_dir = %settings.config_dir.display(), "Loaded rule configuration");

    let store: Arc<dyn EntityStore> = match &settings.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            store.migrate().await?;
            info!("Connected to Postgres");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let app = create_router(AppState::new(config, store)).layer(TraceLayer::new_for_http());

    info!("Listening on {}", settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
