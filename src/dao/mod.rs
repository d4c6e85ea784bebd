/// Session and credential storage and retrieval operations.
pub mod bingo_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
