//! Typerace Back binary entrypoint wiring REST, WebSocket, relay, and storage layers.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "redis-bus")]
use typerace_back::bus::RedisBus;
use typerace_back::bus::{LocalBus, MessageBus};
use typerace_back::config::AppConfig;
use typerace_back::dao::match_store::MatchStore;
use typerace_back::dao::match_store::memory::MemoryMatchStore;
#[cfg(feature = "mongo-store")]
use typerace_back::dao::match_store::mongodb::{MongoConfig, MongoMatchStore};
use typerace_back::routes;
use typerace_back::services::relay_service;
#[cfg(feature = "mongo-store")]
use typerace_back::services::storage_supervisor;
use typerace_back::state::{AppState, SharedState};

/// How long the server waits for open connections once session queues are closed.
const FINAL_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let bus = select_bus(&config).await?;
    let state = AppState::new(config, bus);

    spawn_storage(state.clone()).await;
    tokio::spawn(relay_service::run(state.clone()));

    let app = build_router(state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serve_task = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    info!("shutdown signal received; draining sessions");

    // Stop accepting new connections, grant in-flight work the configured
    // grace window, then close every session queue.
    let _ = stop_tx.send(());
    tokio::time::sleep(state.config().shutdown_grace()).await;
    state.hub().shutdown().await;

    match tokio::time::timeout(FINAL_DRAIN_TIMEOUT, serve_task).await {
        Ok(joined) => {
            joined.context("joining server task")?.context("serving axum")?;
            info!("server stopped cleanly");
        }
        Err(_) => warn!("connections still open after the grace window; exiting anyway"),
    }

    Ok(())
}

/// Choose the bus backend: Redis when `REDIS_URL` is set, in-process otherwise.
async fn select_bus(config: &AppConfig) -> anyhow::Result<Arc<dyn MessageBus>> {
    #[cfg(feature = "redis-bus")]
    if let Ok(url) = env::var("REDIS_URL") {
        let bus = RedisBus::connect(&url)
            .await
            .context("connecting to redis bus")?;
        info!("using redis bus for cross-instance broadcast");
        return Ok(Arc::new(bus));
    }

    info!("using in-process bus; broadcasts stay on this instance");
    Ok(Arc::new(LocalBus::new(config.bus_channel_capacity)))
}

/// Keep a match store installed, supervising MongoDB in the background when it
/// is configured and falling back to the in-memory store otherwise.
async fn spawn_storage(state: SharedState) {
    #[cfg(feature = "mongo-store")]
    match MongoConfig::from_env().await {
        Ok(mongo_config) => {
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = mongo_config.clone();
                async move {
                    let store = MongoMatchStore::connect(config).await?;
                    Ok(Arc::new(store) as Arc<dyn MatchStore>)
                }
            }));
            return;
        }
        Err(err) => {
            warn!(error = %err, "mongodb not configured; using in-memory match store");
        }
    }

    let store: Arc<dyn MatchStore> = Arc::new(MemoryMatchStore::new());
    state.install_match_store(store).await;
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
