//! Dart marathon scoreboard entrypoint wiring the REST API to the selected storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use dart_marathon_back::{
    config::{AppConfig, StorageBackend},
    dao::score_store::{ScoreStore, memory::MemoryScoreStore},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState, StorageStatus},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    start_storage(app_state.clone()).await;

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

/// Pick the backend from the environment and hand it to the storage supervisor.
///
/// A missing or invalid configuration leaves the server in degraded mode with
/// a `NotConfigured` status rather than aborting startup.
async fn start_storage(state: SharedState) {
    let backend = match StorageBackend::from_env() {
        Ok(backend) => backend,
        Err(reason) => {
            not_configured(&state, reason).await;
            return;
        }
    };
    info!(%backend, "storage backend selected");

    match backend {
        StorageBackend::Memory => {
            warn!("using the in-memory store; scores are lost on restart");
            let store = MemoryScoreStore::new();
            tokio::spawn(storage_supervisor::run(state, "memory", move || {
                let store = store.clone();
                async move { Ok(Arc::new(store) as Arc<dyn ScoreStore>) }
            }));
        }
        StorageBackend::Mongo => start_mongo(state).await,
        StorageBackend::Couch => start_couch(state).await,
    }
}

#[cfg(feature = "mongo-store")]
async fn start_mongo(state: SharedState) {
    use dart_marathon_back::dao::score_store::mongodb::{MongoConfig, MongoScoreStore};

    let config = match MongoConfig::from_env().await {
        Ok(config) => config,
        Err(err) => {
            not_configured(&state, err.to_string()).await;
            return;
        }
    };

    tokio::spawn(storage_supervisor::run(state, "mongo", move || {
        let config = config.clone();
        async move {
            MongoScoreStore::connect(config)
                .await
                .map(|store| Arc::new(store) as Arc<dyn ScoreStore>)
                .map_err(Into::into)
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
async fn start_mongo(state: SharedState) {
    not_configured(&state, "built without the `mongo-store` feature".into()).await;
}

#[cfg(feature = "couch-store")]
async fn start_couch(state: SharedState) {
    use dart_marathon_back::dao::score_store::couchdb::{CouchConfig, CouchScoreStore};

    let config = match CouchConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            not_configured(&state, err.to_string()).await;
            return;
        }
    };

    tokio::spawn(storage_supervisor::run(state, "couch", move || {
        let config = config.clone();
        async move {
            CouchScoreStore::connect(config)
                .await
                .map(|store| Arc::new(store) as Arc<dyn ScoreStore>)
                .map_err(Into::into)
        }
    }));
}

#[cfg(not(feature = "couch-store"))]
async fn start_couch(state: SharedState) {
    not_configured(&state, "built without the `couch-store` feature".into()).await;
}

async fn not_configured(state: &SharedState, reason: String) {
    error!(%reason, "storage not configured; serving the fallback scoreboard");
    state
        .set_storage_status(StorageStatus::NotConfigured { reason })
        .await;
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
