//! The backend contract.
//!
//! [`Storer`] is the object-safe interface every backend implements. It
//! moves encoded payloads; [`StorerExt`] layers the typed `write`, `read`,
//! and `list` operations on top of it for every backend, including
//! `dyn Storer`.
//!
//! Every backend must treat absence as a normal outcome:
//!
//! | operation | missing record | missing collection |
//! |-----------|----------------|--------------------|
//! | `read`    | `Ok(None)`     | `Ok(None)`         |
//! | `list`    | n/a            | `Ok(vec![])`       |
//! | `delete`  | `Ok(())`       | `Ok(())`           |

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use crate::record::{Factory, Identified};

/// A stored record as the backend sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record identifier.
    pub id: String,
    /// Encoded object.
    pub payload: String,
}

impl RawRecord {
    /// Creates a raw record.
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// A collection-oriented key/payload backend.
///
/// Collections are provisioned implicitly the first time any operation
/// touches them.
pub trait Storer: Send + Sync {
    /// Stores `payload` under `id`, replacing any previous payload.
    fn put_raw(&self, ctx: &Context, collection: &str, id: &str, payload: &str)
        -> StoreResult<()>;

    /// Returns the payload stored under `id`, if any.
    fn get_raw(&self, ctx: &Context, collection: &str, id: &str) -> StoreResult<Option<String>>;

    /// Returns every record in the collection, in no particular order.
    fn scan_raw(&self, ctx: &Context, collection: &str) -> StoreResult<Vec<RawRecord>>;

    /// Removes the record with `id` if it exists.
    fn delete(&self, ctx: &Context, collection: &str, id: &str) -> StoreResult<()>;

    /// Returns the names of all provisioned collections, sorted.
    fn collections(&self, ctx: &Context) -> StoreResult<Vec<String>>;

    /// Releases the backend. No operation is possible afterwards.
    fn close(self) -> StoreResult<()>
    where
        Self: Sized;
}

/// Typed operations available on every [`Storer`].
pub trait StorerExt: Storer {
    /// Persists `object` under its own ID.
    fn write<T>(&self, ctx: &Context, collection: &str, object: &T) -> StoreResult<()>
    where
        T: Identified + Serialize + ?Sized,
    {
        let payload = codec::encode(object).map_err(StoreError::Encode)?;
        self.put_raw(ctx, collection, object.id(), &payload)
    }

    /// Reads the record with `id`, decoding it onto an instance from `factory`.
    fn read<T, F>(
        &self,
        ctx: &Context,
        collection: &str,
        id: &str,
        factory: F,
    ) -> StoreResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Factory<T>,
    {
        let Some(payload) = self.get_raw(ctx, collection, id)? else {
            return Ok(None);
        };
        codec::decode(&payload, &factory)
            .map(Some)
            .map_err(|source| StoreError::decode(collection, id, source))
    }

    /// Reads every record in the collection.
    fn list<T, F>(&self, ctx: &Context, collection: &str, factory: F) -> StoreResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Factory<T>,
    {
        self.scan_raw(ctx, collection)?
            .into_iter()
            .map(|record| {
                codec::decode(&record.payload, &factory)
                    .map_err(|source| StoreError::decode(collection, record.id, source))
            })
            .collect()
    }
}

impl<S: Storer + ?Sized> StorerExt for S {}
