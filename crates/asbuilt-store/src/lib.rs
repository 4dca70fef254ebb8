//! Destination collections: DuckDB (persistent) and in-memory.

mod error;
mod memory;
pub use error::StoreError;
pub use memory::{MemoryStore, StoredAttachment};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

/// New `GLOBALID` in the braced upper-case form used by the polygon layer.
pub fn new_global_id() -> String {
    format!("{{{}}}", uuid::Uuid::new_v4().to_string().to_uppercase())
}
