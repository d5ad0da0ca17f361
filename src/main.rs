//! Classroom poll binary entrypoint wiring REST, WebSocket, SSE, and poll store layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, http::HeaderValue};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::{
    poll_store::{MemoryPollStore, PollStore},
    storage::StorageError,
};
use services::storage_supervisor;
use state::{AppState, SharedState};

#[cfg(feature = "mongo-store")]
const DEFAULT_BACKEND: &str = "mongo";
#[cfg(not(feature = "mongo-store"))]
const DEFAULT_BACKEND: &str = "memory";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    spawn_storage_supervisor(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state, env::var("CLIENT_URL").ok());

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

/// Start the background task that installs the poll store selected by `POLL_STORE`.
fn spawn_storage_supervisor(state: SharedState) {
    let backend = env::var("POLL_STORE").unwrap_or_else(|_| DEFAULT_BACKEND.into());

    match backend.as_str() {
        "memory" => {
            info!("using in-memory poll store; polls are lost on restart");
            tokio::spawn(storage_supervisor::run(state, connect_memory));
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            let uri =
                env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
            let db_name = env::var("MONGO_DB").ok();
            info!("using MongoDB poll store");
            tokio::spawn(storage_supervisor::run(state, move || {
                connect_mongo(uri.clone(), db_name.clone())
            }));
        }
        other => {
            warn!(backend = other, "unknown POLL_STORE value; using in-memory poll store");
            tokio::spawn(storage_supervisor::run(state, connect_memory));
        }
    }
}

async fn connect_memory() -> Result<Arc<dyn PollStore>, StorageError> {
    Ok(Arc::new(MemoryPollStore::new()))
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(
    uri: String,
    db_name: Option<String>,
) -> Result<Arc<dyn PollStore>, StorageError> {
    use dao::poll_store::mongodb::{MongoConfig, MongoPollStore};

    let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
    let store = MongoPollStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, client_url: Option<String>) -> Router<()> {
    routes::router(state)
        .layer(cors_layer(client_url))
        .layer(TraceLayer::new_for_http())
}

/// Restrict CORS to the frontend origin when one is configured.
fn cors_layer(client_url: Option<String>) -> CorsLayer {
    let Some(url) = client_url.filter(|url| !url.trim().is_empty()) else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(url.trim()) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(err) => {
            warn!(client_url = %url, error = %err, "invalid CLIENT_URL; allowing any origin");
            CorsLayer::permissive()
        }
    }
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
