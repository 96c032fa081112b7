//! Record types and store constructors shared by the integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use stow_store::{Identified, Metadata, SqliteStore};

/// Database counter for test isolation.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns a connection string for a fresh shared-cache in-memory database.
pub fn unique_memory_dsn() -> String {
    let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!(
        "file:stow-test-{}-{}?mode=memory&cache=shared",
        std::process::id(),
        n
    )
}

/// Opens a SQLite store on a fresh in-memory database.
pub fn sqlite_store() -> SqliteStore {
    SqliteStore::open(&unique_memory_dsn()).expect("failed to open in-memory store")
}

/// A record with embedded metadata and one opaque value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opaque {
    /// Identity.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// Payload value.
    pub opaque: String,
}

impl Opaque {
    /// Creates a record.
    pub fn new(id: &str, opaque: &str) -> Self {
        Self {
            metadata: Metadata::new(id),
            opaque: opaque.to_string(),
        }
    }
}

impl Identified for Opaque {
    fn id(&self) -> &str {
        self.metadata.id()
    }
}

/// Factory for [`Opaque`].
pub fn new_opaque() -> Opaque {
    Opaque::default()
}

/// Returns the opaque values of `records`, sorted.
pub fn sorted_values(records: &[Opaque]) -> Vec<String> {
    let mut values: Vec<String> = records.iter().map(|r| r.opaque.clone()).collect();
    values.sort();
    values
}
