use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::auth::{AuthConfigResponse, LoginRequest, LoginResponse},
    error::ServiceError,
    state::{ScorerSession, SharedState},
};

/// How long an issued scorer token stays valid.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Check the scorer login and issue a fresh token.
pub async fn login(
    state: &SharedState,
    request: LoginRequest,
) -> Result<LoginResponse, ServiceError> {
    let credentials = state.config().credentials();
    let (Some(username), Some(password)) = (&credentials.username, &credentials.password) else {
        warn!("login attempt while scorer credentials are not configured");
        return Err(ServiceError::Unauthorized(
            "scorer login is not configured".into(),
        ));
    };

    if request.username != *username || request.password != *password {
        warn!(username = %request.username, "rejected scorer login");
        return Err(ServiceError::Unauthorized("invalid credentials".into()));
    }

    prune_expired(state);

    let token = Uuid::new_v4().to_string();
    state.sessions().insert(
        token.clone(),
        ScorerSession {
            username: request.username,
            issued_at: Instant::now(),
        },
    );
    info!(username = %username, "scorer logged in");

    Ok(LoginResponse { token })
}

/// Forget a token. Returns whether it was known.
pub fn logout(state: &SharedState, token: &str) -> bool {
    state.sessions().remove(token).is_some()
}

/// The single authorization predicate in front of every write route.
pub fn authorize(state: &SharedState, token: Option<&str>) -> Result<ScorerSession, ServiceError> {
    let token = token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("missing scorer token".into()))?;

    let session = state
        .sessions()
        .get(token)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ServiceError::Unauthorized("invalid scorer token".into()))?;

    if session.issued_at.elapsed() >= SESSION_TTL {
        state.sessions().remove(token);
        return Err(ServiceError::Unauthorized("scorer token expired".into()));
    }

    Ok(session)
}

/// Which credential variables are set, for troubleshooting deployments.
pub fn credentials_status(state: &SharedState) -> AuthConfigResponse {
    let credentials = state.config().credentials();
    AuthConfigResponse {
        has_username: credentials.username.is_some(),
        has_password: credentials.password.is_some(),
        username_length: credentials.username.as_deref().map_or(0, str::len),
        password_length: credentials.password.as_deref().map_or(0, str::len),
    }
}

fn prune_expired(state: &SharedState) {
    state
        .sessions()
        .retain(|_, session| session.issued_at.elapsed() < SESSION_TTL);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfig, ScorerCredentials},
        state::AppState,
    };

    fn state_with_login() -> SharedState {
        AppState::new(AppConfig::default().with_credentials(ScorerCredentials {
            username: Some("scorer".into()),
            password: Some("oche".into()),
        }))
    }

    fn request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn issued_token_authorizes_until_logout() {
        let state = state_with_login();
        let token = login(&state, request("scorer", "oche")).await.unwrap().token;

        let session = authorize(&state, Some(&token)).unwrap();
        assert_eq!(session.username, "scorer");

        assert!(logout(&state, &token));
        assert!(authorize(&state, Some(&token)).is_err());
        assert!(!logout(&state, &token));
    }

    #[tokio::test]
    async fn wrong_credentials_are_refused() {
        let state = state_with_login();
        assert!(matches!(
            login(&state, request("scorer", "bull")).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(state.sessions().is_empty());
    }

    #[tokio::test]
    async fn login_is_refused_without_configured_credentials() {
        let state = AppState::new(AppConfig::default());
        let result = login(&state, request("scorer", "oche")).await;
        match result {
            Err(ServiceError::Unauthorized(message)) => assert!(message.contains("not configured")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_unknown_and_expired_tokens_are_unauthorized() {
        let state = state_with_login();
        assert!(authorize(&state, None).is_err());
        assert!(authorize(&state, Some("")).is_err());
        assert!(authorize(&state, Some("nope")).is_err());

        let issued_at = Instant::now()
            .checked_sub(SESSION_TTL + Duration::from_secs(1))
            .unwrap();
        state.sessions().insert(
            "stale".into(),
            ScorerSession {
                username: "scorer".into(),
                issued_at,
            },
        );
        assert!(authorize(&state, Some("stale")).is_err());
        assert!(state.sessions().get("stale").is_none());
    }

    #[test]
    fn credentials_status_never_exposes_values() {
        let state = state_with_login();
        let status = credentials_status(&state);
        assert!(status.has_username && status.has_password);
        assert_eq!(status.username_length, 6);
        assert_eq!(status.password_length, 4);
    }
}
