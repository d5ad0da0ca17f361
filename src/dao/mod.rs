/// Database model definitions.
pub mod models;
/// Poll persistence backends and the store abstraction.
pub mod poll_store;
/// Storage abstraction layer for database operations.
pub mod storage;
