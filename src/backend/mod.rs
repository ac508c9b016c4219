//! Backend Layer - byte-oriented key/value stores
//!
//! A facade tier sits on exactly one backend. Two implementations ship:
//! - `MemoryBackend`: shared in-process map, used for session tiers and tests
//! - `SqliteBackend`: one SQLite table per tier (`durable_entries`, `session_entries`)

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::{SqliteBackend, SqliteTable};

use crate::Result;

/// Raw string store underneath one tier.
///
/// Methods take `&self`; implementations carry their own interior
/// mutability. Any method may fail, and the facade treats every failure as
/// recoverable.
pub trait Backend: Send + Sync {
    /// Read the raw value at `key`
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite `key`
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting an absent key succeeds
    fn delete(&self, key: &str) -> Result<()>;

    /// Every key in the store, including keys this crate did not write
    fn keys(&self) -> Result<Vec<String>>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}
