//! In-memory backend.
//!
//! Holds every collection in a map behind a read-write lock. It follows the
//! same contract as [`SqliteStore`](crate::SqliteStore), including
//! provisioning a collection on first touch, which makes it a drop-in
//! substitute for tests and short-lived processes.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::context::Context;
use crate::error::StoreResult;
use crate::storer::{RawRecord, Storer};

type Collection = BTreeMap<String, String>;

/// A [`Storer`] that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn provision<R>(&self, collection: &str, f: impl FnOnce(&mut Collection) -> R) -> R {
        let mut collections = self.collections.write();
        f(collections.entry(collection.to_string()).or_default())
    }

    fn with_collection<R>(&self, collection: &str, f: impl FnOnce(&Collection) -> R) -> R {
        {
            let collections = self.collections.read();
            if let Some(records) = collections.get(collection) {
                return f(records);
            }
        }
        self.provision(collection, |records| f(&*records))
    }
}

impl Storer for MemoryStore {
    fn put_raw(
        &self,
        ctx: &Context,
        collection: &str,
        id: &str,
        payload: &str,
    ) -> StoreResult<()> {
        ctx.check()?;
        self.provision(collection, |records| {
            records.insert(id.to_string(), payload.to_string());
        });
        Ok(())
    }

    fn get_raw(&self, ctx: &Context, collection: &str, id: &str) -> StoreResult<Option<String>> {
        ctx.check()?;
        Ok(self.with_collection(collection, |records| records.get(id).cloned()))
    }

    fn scan_raw(&self, ctx: &Context, collection: &str) -> StoreResult<Vec<RawRecord>> {
        ctx.check()?;
        Ok(self.with_collection(collection, |records| {
            records
                .iter()
                .map(|(id, payload)| RawRecord::new(id.clone(), payload.clone()))
                .collect()
        }))
    }

    fn delete(&self, ctx: &Context, collection: &str, id: &str) -> StoreResult<()> {
        ctx.check()?;
        self.provision(collection, |records| {
            records.remove(id);
        });
        Ok(())
    }

    fn collections(&self, ctx: &Context) -> StoreResult<Vec<String>> {
        ctx.check()?;
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn close(self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        let ctx = Context::background();

        store.put_raw(&ctx, "c", "a", "{}").unwrap();
        store.put_raw(&ctx, "c", "a", "{\"v\":1}").unwrap();
        assert_eq!(store.len("c"), 1);
        assert_eq!(
            store.get_raw(&ctx, "c", "a").unwrap().as_deref(),
            Some("{\"v\":1}")
        );

        store.delete(&ctx, "c", "a").unwrap();
        store.delete(&ctx, "c", "a").unwrap();
        assert_eq!(store.get_raw(&ctx, "c", "a").unwrap(), None);
    }

    #[test]
    fn test_touch_provisions() {
        let store = MemoryStore::new();
        let ctx = Context::background();

        assert!(store.scan_raw(&ctx, "x").unwrap().is_empty());
        assert_eq!(store.get_raw(&ctx, "y", "id").unwrap(), None);
        store.delete(&ctx, "z", "id").unwrap();
        assert_eq!(store.collections(&ctx).unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_respects_context() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            store.put_raw(&ctx, "c", "a", "{}"),
            Err(StoreError::Cancelled)
        ));
        assert_eq!(store.len("c"), 0);
    }
}
