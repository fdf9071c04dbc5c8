//! social-publish adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `social`: TikTok, Instagram and LinkedIn providers
//! - `state`: SQLite and in-memory publication stores
//! - `audit`: SQLite, JSONL and in-memory audit sinks

pub mod audit;
pub mod social;
mod state_memory;
mod state_sqlite;

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_memory::InMemoryPublicationStore;
    pub use crate::state_sqlite::SqlitePublicationStore;
}
