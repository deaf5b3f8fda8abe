/// Database model definitions.
pub mod models;
/// Scouting data storage and retrieval operations.
pub mod scout_store;
/// Storage abstraction layer for store operations.
pub mod storage;
