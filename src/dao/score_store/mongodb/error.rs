use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to seed the game document")]
    SeedGame {
        #[source]
        source: MongoError,
    },
    #[error("failed to load the game document")]
    LoadGame {
        #[source]
        source: MongoError,
    },
    #[error("game document not found")]
    MissingGame,
    #[error("failed to start the challenge timer")]
    StartTimer {
        #[source]
        source: MongoError,
    },
    #[error("failed to reset the game")]
    ResetGame {
        #[source]
        source: MongoError,
    },
    #[error("failed to append a score for team `{team_id}`")]
    AppendScore {
        team_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list scores")]
    ListScores {
        #[source]
        source: MongoError,
    },
    #[error("stored score {value} for team `{team_id}` is outside 0-180")]
    CorruptedScore { team_id: String, value: i32 },
}
