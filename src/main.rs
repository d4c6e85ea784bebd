//! Music Bingo Back binary entrypoint wiring REST, SSE, the music provider and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
#[cfg(feature = "couch-store")]
use tracing::warn;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "couch-store")]
use music_bingo_back::{
    dao::{
        bingo_store::{
            BingoStore,
            couchdb::{CouchBingoStore, CouchConfig},
        },
        storage::StorageError,
    },
    services::storage_supervisor,
};
use music_bingo_back::{
    config::AppConfig,
    dao::bingo_store::memory::InMemoryBingoStore,
    provider::spotify::{SpotifyConfig, SpotifyProvider},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let provider =
        SpotifyProvider::new(SpotifyConfig::from_env()).context("building music provider")?;
    let app_state = AppState::new(config, Arc::new(provider));

    install_storage(app_state.clone()).await;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervise CouchDB when configured, otherwise keep everything in memory.
#[cfg(feature = "couch-store")]
async fn install_storage(state: SharedState) {
    match CouchConfig::from_env() {
        Ok(couch) => {
            info!(base_url = %couch.base_url, database = %couch.database, "using CouchDB storage");
            tokio::spawn(storage_supervisor::run(state, move || {
                let couch = couch.clone();
                async move {
                    CouchBingoStore::connect(couch)
                        .await
                        .map(|store| Arc::new(store) as Arc<dyn BingoStore>)
                        .map_err(StorageError::from)
                }
            }));
        }
        Err(err) => {
            warn!(error = %err, "CouchDB not configured; sessions and credentials stay in memory");
            state.set_store(Arc::new(InMemoryBingoStore::new())).await;
        }
    }
}

#[cfg(not(feature = "couch-store"))]
async fn install_storage(state: SharedState) {
    info!("built without CouchDB support; sessions and credentials stay in memory");
    state.set_store(Arc::new(InMemoryBingoStore::new())).await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
