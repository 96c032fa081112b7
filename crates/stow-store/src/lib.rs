//! # stow-store
//!
//! A generic object store: arbitrary serializable objects, identified by a
//! string ID, kept in named collections on top of SQLite used as a plain
//! key/payload table per collection.
//!
//! Collections need no schema and no setup. The first operation that touches
//! a collection creates its table and retries once.
//!
//! - **Record capabilities**: [`Identified`] extracts an object's ID,
//!   [`Factory`] makes the empty instance a payload is decoded onto
//! - **Contract**: [`Storer`] (object-safe, payload level) and [`StorerExt`]
//!   (typed `write` / `read` / `list`)
//! - **Backends**: [`SqliteStore`] and [`MemoryStore`]
//! - **Context**: cancellation and deadlines threaded through every call
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use stow_store::{Context, Identified, SqliteStore, Storer, StorerExt, StoreResult};
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! struct Widget {
//!     id: String,
//!     color: String,
//! }
//!
//! impl Identified for Widget {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! fn example() -> StoreResult<()> {
//!     let store = SqliteStore::open(":memory:")?;
//!     let ctx = Context::background();
//!
//!     let widget = Widget { id: "w1".into(), color: "red".into() };
//!     store.write(&ctx, "widgets", &widget)?;
//!
//!     let back = store.read(&ctx, "widgets", "w1", Widget::default)?;
//!     assert_eq!(back, Some(widget));
//!
//!     store.delete(&ctx, "widgets", "w1")?;
//!     assert!(store.list(&ctx, "widgets", Widget::default)?.is_empty());
//!
//!     store.close()
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod storer;

pub use config::{ProvisionPolicy, StoreConfig, StoreConfigBuilder};
pub use context::Context;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use record::{Document, Factory, Identified, Metadata};
pub use sqlite::SqliteStore;
pub use storer::{RawRecord, Storer, StorerExt};
