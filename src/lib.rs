//! # Tierkv - Layered key/value storage facade
//!
//! Namespaced, versioned, expiring key/value store layered over two
//! byte-oriented stores: a durable tier and a session-scoped tier.
//!
//! Tierkv provides:
//! - An entry envelope with timestamp, schema version, optional expiry and a
//!   text-safe encoding flag for large payloads
//! - Pluggable backends (in-memory and SQLite-backed)
//! - Lazy eviction of stale, expired and corrupt entries plus a startup sweep
//! - Cache, preferences and offline-queue conveniences on top
//! - Namespace-scoped usage reporting, export, import and clear

pub mod entry;
pub mod backend;
pub mod clock;
pub mod events;
pub mod facade;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use backend::{Backend, MemoryBackend, SqliteBackend, SqliteTable};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FacadeConfig;
pub use entry::Entry;
pub use events::{EvictionReason, StorageEvent};
pub use facade::{SetOptions, StorageFacade, StorageFacadeBuilder, SweepReport, Tier, TierUsage, Usage};

/// Result type alias for Tierkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Tierkv operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Quota exceeded: {used} of {quota} bytes")]
    QuotaExceeded { used: usize, quota: usize },

    #[error("Decode error: {0}")]
    Decode(String),
}
