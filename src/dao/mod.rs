/// Database model definitions.
pub mod models;
/// Score ledger and timer storage backends.
pub mod score_store;
/// Storage abstraction layer for database operations.
pub mod storage;
