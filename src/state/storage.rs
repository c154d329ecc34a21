use std::fmt;

/// Connectivity of the persistence backend as tracked by the storage supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    /// No usable backend was configured (unknown backend, missing settings, disabled feature).
    NotConfigured {
        /// Why the backend could not be configured.
        reason: String,
    },
    /// A backend is configured and the first connection is in progress.
    Connecting {
        /// Backend name.
        backend: &'static str,
    },
    /// The backend is installed and answered its last health check.
    Connected {
        /// Backend name.
        backend: &'static str,
    },
    /// The backend is configured but currently failing.
    Unreachable {
        /// Backend name.
        backend: &'static str,
        /// Last error reported by the backend.
        error: String,
    },
}

impl StorageStatus {
    /// Whether a backend has been configured at all.
    pub fn is_configured(&self) -> bool {
        !matches!(self, StorageStatus::NotConfigured { .. })
    }

    /// Whether the backend is usable.
    pub fn is_connected(&self) -> bool {
        matches!(self, StorageStatus::Connected { .. })
    }

    /// Name of the configured backend, if any.
    pub fn backend(&self) -> Option<&'static str> {
        match self {
            StorageStatus::NotConfigured { .. } => None,
            StorageStatus::Connecting { backend }
            | StorageStatus::Connected { backend }
            | StorageStatus::Unreachable { backend, .. } => Some(*backend),
        }
    }
}

impl fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageStatus::NotConfigured { reason } => {
                write!(f, "storage not configured: {reason}")
            }
            StorageStatus::Connecting { backend } => {
                write!(f, "storage backend `{backend}` is configured but not connected yet")
            }
            StorageStatus::Connected { backend } => {
                write!(f, "storage backend `{backend}` is connected")
            }
            StorageStatus::Unreachable { backend, error } => {
                write!(f, "storage backend `{backend}` is configured but unreachable: {error}")
            }
        }
    }
}
