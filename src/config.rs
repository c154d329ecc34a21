//! Application-level configuration loading: the team roster, scorer credentials
//! and the storage backend selection.

use std::{collections::HashSet, env, fmt, fs, io::ErrorKind, path::PathBuf, str::FromStr};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::{TEAM_COUNT, Team, default_teams};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DART_MARATHON_CONFIG_PATH";
/// Environment variables holding the scorer login.
const USERNAME_ENV: &str = "AUTH_CREDENTIALS_USERNAME";
const PASSWORD_ENV: &str = "AUTH_CREDENTIALS_PASSWORD";
/// Environment variable selecting the storage backend.
const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    teams: Vec<Team>,
    credentials: ScorerCredentials,
}

/// Login accepted for scorers. Either half may be missing, in which case nobody can log in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScorerCredentials {
    /// Expected username.
    pub username: Option<String>,
    /// Expected password.
    pub password: Option<String>,
}

impl ScorerCredentials {
    /// Read the credentials from the environment. Empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            username: non_empty_env(USERNAME_ENV),
            password: non_empty_env(PASSWORD_ENV),
        }
    }

    /// Both halves of the login are present.
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl AppConfig {
    /// Load the roster from disk, falling back to the built-in teams, and the
    /// scorer credentials from the environment.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let teams = match fs::read_to_string(&path) {
            Ok(contents) => match parse_teams(&contents) {
                Ok(teams) => {
                    info!(
                        path = %path.display(),
                        count = teams.len(),
                        "loaded team roster from config"
                    );
                    teams
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "invalid config; falling back to default teams"
                    );
                    default_teams()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in teams"
                );
                default_teams()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to default teams"
                );
                default_teams()
            }
        };

        let credentials = ScorerCredentials::from_env();
        if !credentials.is_configured() {
            warn!("scorer credentials are not configured; logins will be refused");
        }

        Self { teams, credentials }
    }

    /// Replace the scorer credentials.
    pub fn with_credentials(mut self, credentials: ScorerCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Roster in display order.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Accepted scorer login.
    pub fn credentials(&self) -> &ScorerCredentials {
        &self.credentials
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            teams: default_teams(),
            credentials: ScorerCredentials::default(),
        }
    }
}

/// Which [`ScoreStore`](crate::dao::score_store::ScoreStore) implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// MongoDB, the default.
    Mongo,
    /// CouchDB over HTTP.
    Couch,
    /// Process-local store, lost on restart.
    Memory,
}

impl StorageBackend {
    /// Read [`STORAGE_BACKEND_ENV`], defaulting to MongoDB when unset.
    pub fn from_env() -> Result<Self, String> {
        match env::var(STORAGE_BACKEND_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(StorageBackend::Mongo),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "couch" | "couchdb" => Ok(StorageBackend::Couch),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "unknown {STORAGE_BACKEND_ENV} `{other}` (expected mongo, couch or memory)"
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Mongo => "mongo",
            StorageBackend::Couch => "couch",
            StorageBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    teams: Vec<RawTeam>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: String,
    name: String,
}

/// Parse and check the roster: exactly [`TEAM_COUNT`] teams with unique, non-empty ids.
fn parse_teams(contents: &str) -> Result<Vec<Team>, String> {
    let raw: RawConfig = serde_json::from_str(contents).map_err(|err| err.to_string())?;

    if raw.teams.len() != TEAM_COUNT {
        return Err(format!(
            "expected {TEAM_COUNT} teams, found {}",
            raw.teams.len()
        ));
    }

    let mut seen = HashSet::new();
    for team in &raw.teams {
        let id = team.id.trim();
        if id.is_empty() {
            return Err("team id must not be empty".into());
        }
        if !seen.insert(id) {
            return Err(format!("duplicate team id `{id}`"));
        }
    }

    Ok(raw
        .teams
        .into_iter()
        .map(|team| {
            let name = if team.name.trim().is_empty() {
                team.id.clone()
            } else {
                team.name
            };
            Team::new(team.id.trim(), name)
        })
        .collect())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.is_empty())
}
