//! External concerns: database, in-memory store, liveness cache, device
//! credential derivation.

pub mod cache;
pub mod crypto;
pub mod database;
pub mod memory;

pub use cache::LivenessCache;
pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use memory::InMemoryRepositoryProvider;
