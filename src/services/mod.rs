/// Scorer login and token checks.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Scoreboard reads and score/timer writes.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
