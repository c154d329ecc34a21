use serde::Serialize;
use utoipa::ToSchema;

use crate::state::StorageStatus;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}

/// Storage diagnostics returned by `/api/check-db`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StorageStatusResponse {
    /// A backend is configured, whether or not it is reachable.
    pub configured: bool,
    /// The backend answered its last health check.
    pub connected: bool,
    /// Name of the configured backend.
    pub backend: Option<String>,
    /// Human readable summary.
    pub message: String,
    /// Last error, when configured but not connected.
    pub error: Option<String>,
}

impl From<&StorageStatus> for StorageStatusResponse {
    fn from(status: &StorageStatus) -> Self {
        let error = match status {
            StorageStatus::NotConfigured { reason } => Some(reason.clone()),
            StorageStatus::Unreachable { error, .. } => Some(error.clone()),
            StorageStatus::Connecting { .. } | StorageStatus::Connected { .. } => None,
        };

        Self {
            configured: status.is_configured(),
            connected: status.is_connected(),
            backend: status.backend().map(str::to_owned),
            message: status.to_string(),
            error,
        }
    }
}
