pub mod budget;
pub mod game;
pub mod ledger;
pub mod stats;
mod storage;
pub mod timer;

use std::{sync::Arc, time::Instant};

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::{config::AppConfig, dao::score_store::ScoreStore, error::ServiceError};

pub use self::storage::StorageStatus;

pub type SharedState = Arc<AppState>;

/// Authenticated scorer session issued by `/auth/login`.
#[derive(Debug, Clone)]
pub struct ScorerSession {
    /// Username the token was issued to.
    pub username: String,
    /// When the token was issued.
    pub issued_at: Instant,
}

/// Central application state: the storage handle, its health, and scorer sessions.
///
/// Game data itself lives in the store; nothing here caches balances or the timer,
/// so several instances of the server can run against the same backend.
pub struct AppState {
    score_store: RwLock<Option<Arc<dyn ScoreStore>>>,
    storage_status: RwLock<StorageStatus>,
    sessions: DashMap<String, ScorerSession>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            score_store: RwLock::new(None),
            storage_status: RwLock::new(StorageStatus::NotConfigured {
                reason: "no storage backend installed yet".into(),
            }),
            sessions: DashMap::new(),
            config,
        })
    }

    /// Obtain a handle to the current score store, if one is installed.
    pub async fn score_store(&self) -> Option<Arc<dyn ScoreStore>> {
        let guard = self.score_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the score store or fail with a degraded-mode error describing why it is missing.
    pub async fn require_score_store(&self) -> Result<Arc<dyn ScoreStore>, ServiceError> {
        let status = self.storage_status().await;
        match self.score_store().await {
            Some(store) if status.is_connected() => Ok(store),
            _ => Err(ServiceError::Degraded(status.to_string())),
        }
    }

    /// Install a new score store implementation and leave degraded mode.
    pub async fn set_score_store(&self, store: Arc<dyn ScoreStore>) {
        let backend = store.backend();
        {
            let mut guard = self.score_store.write().await;
            *guard = Some(store);
        }
        self.set_storage_status(StorageStatus::Connected { backend })
            .await;
    }

    /// Remove the current score store. The status is left to the caller.
    pub async fn clear_score_store(&self) {
        let mut guard = self.score_store.write().await;
        guard.take();
    }

    /// Current storage connectivity.
    pub async fn storage_status(&self) -> StorageStatus {
        self.storage_status.read().await.clone()
    }

    /// Record a storage connectivity change.
    pub async fn set_storage_status(&self, status: StorageStatus) {
        let mut guard = self.storage_status.write().await;
        *guard = status;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        self.score_store.read().await.is_none() || !self.storage_status().await.is_connected()
    }

    /// Registry of issued scorer tokens.
    pub fn sessions(&self) -> &DashMap<String, ScorerSession> {
        &self.sessions
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
