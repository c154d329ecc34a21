use tracing::warn;

use crate::{
    dto::health::{HealthResponse, StorageStatusResponse},
    state::{SharedState, StorageStatus},
};

/// Respond with a static health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_score_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(err) => warn!(error = %err, "storage unavailable (degraded mode)"),
    }

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

/// Describe the storage backend, probing it live when one is installed.
///
/// The probe result is only reported; the supervisor owns status transitions.
pub async fn storage_diagnostics(state: &SharedState) -> StorageStatusResponse {
    let status = state.storage_status().await;
    let Some(store) = state.score_store().await else {
        return StorageStatusResponse::from(&status);
    };

    match store.health_check().await {
        Ok(()) => StorageStatusResponse::from(&status),
        Err(err) => {
            warn!(backend = store.backend(), error = %err, "storage diagnostics probe failed");
            StorageStatusResponse::from(&StorageStatus::Unreachable {
                backend: store.backend(),
                error: err.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::score_store::memory::MemoryScoreStore, state::AppState};

    #[tokio::test]
    async fn reports_not_configured_before_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());

        assert_eq!(health_status(&state).await.status, "degraded");
        let diagnostics = storage_diagnostics(&state).await;
        assert!(!diagnostics.configured);
        assert!(!diagnostics.connected);
        assert!(diagnostics.message.contains("not configured"));
    }

    #[tokio::test]
    async fn reports_connected_memory_store() {
        let state = AppState::new(AppConfig::default());
        state
            .set_score_store(Arc::new(MemoryScoreStore::new()))
            .await;

        assert_eq!(health_status(&state).await.status, "ok");
        let diagnostics = storage_diagnostics(&state).await;
        assert!(diagnostics.configured);
        assert!(diagnostics.connected);
        assert_eq!(diagnostics.backend.as_deref(), Some("memory"));
        assert_eq!(diagnostics.error, None);
    }
}
