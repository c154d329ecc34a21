use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{score_store::ScoreStore, storage::StorageError},
    state::{SharedState, StorageStatus},
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend, seed the game record and keep the shared
/// state in degraded mode whenever the backend is unavailable.
pub async fn run<F, Fut>(state: SharedState, backend: &'static str, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ScoreStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;
    state
        .set_storage_status(StorageStatus::Connecting { backend })
        .await;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(backend, error = %err, "storage connection attempt failed");
                mark_unreachable(&state, backend, &err).await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        if let Err(err) = seed_game(&state, store.as_ref()).await {
            warn!(backend, error = %err, "failed to seed the game record");
            mark_unreachable(&state, backend, &err).await;
            sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
            continue;
        }

        state.set_score_store(store.clone()).await;
        info!(backend, "storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            match store.health_check().await {
                Ok(()) => {
                    if !state.storage_status().await.is_connected() {
                        info!(backend, "storage healthy again; leaving degraded mode");
                        state
                            .set_storage_status(StorageStatus::Connected { backend })
                            .await;
                    }
                    sleep(HEALTH_POLL_INTERVAL).await;
                }
                Err(health_err) => {
                    let mut attempt = 0;
                    let mut reconnect_delay = INITIAL_DELAY;
                    let mut reconnected = false;

                    while attempt < MAX_RECONNECT_ATTEMPTS {
                        match store.try_reconnect().await {
                            Ok(()) => {
                                info!(
                                    backend,
                                    "storage reconnection succeeded after health check failure"
                                );
                                reconnected = true;
                                break;
                            }
                            Err(reconnect_err) => {
                                if attempt == 0 {
                                    warn!(
                                        backend, attempt, error = %reconnect_err,
                                        "storage reconnect first attempt failed; entering degraded mode"
                                    );
                                    mark_unreachable(&state, backend, &health_err).await;
                                } else {
                                    warn!(backend, attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                }
                                attempt += 1;
                                sleep(reconnect_delay).await;
                                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                            }
                        }
                    }

                    if reconnected {
                        state
                            .set_storage_status(StorageStatus::Connected { backend })
                            .await;
                        sleep(HEALTH_POLL_INTERVAL).await;
                        continue;
                    }

                    warn!(
                        backend,
                        "exhausted storage reconnect attempts; dropping the store"
                    );
                    state.clear_score_store().await;
                    break;
                }
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

async fn seed_game(state: &SharedState, store: &dyn ScoreStore) -> Result<(), StorageError> {
    let teams = state
        .config()
        .teams()
        .iter()
        .cloned()
        .map(Into::into)
        .collect();
    store.ensure_game(teams).await
}

async fn mark_unreachable(state: &SharedState, backend: &'static str, err: &StorageError) {
    state
        .set_storage_status(StorageStatus::Unreachable {
            backend,
            error: err.to_string(),
        })
        .await;
}
