//! Durable state for the relay: a SQLite key/value store and the submission
//! ledger built on it.

pub mod error;
pub mod sqlite;
pub use sqlite::SqliteStateRepository;
pub mod traits;
