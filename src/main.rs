use mimalloc::MiMalloc;
use profile_vault::config::Config;
use profile_vault::db::ProfilesStorage;
use profile_vault::router::{VaultState, vault_router};
use profile_vault::service::secret_codec::AesGcmCodec;
use profile_vault::service::store::ProfileStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        max_connections = cfg.max_connections,
        "configuration loaded"
    );

    let codec = AesGcmCodec::from_hex_key(&cfg.secret_key)?;
    let storage = ProfilesStorage::connect(&cfg.database_url, cfg.max_connections).await?;
    let store = ProfileStore::new(storage);

    let state = VaultState::new(store, Arc::new(codec), cfg.api_key.as_str());
    let app = vault_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
