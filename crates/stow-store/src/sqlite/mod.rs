//! SQLite backend with on-demand provisioning.
//!
//! Every statement goes through one of two helpers, [`SqliteStore::execute`]
//! for mutations and [`SqliteStore::query`] for reads. Both run the same
//! sequence:
//!
//! ```text
//!   Attempt ──ok──▶ Done
//!      │
//!    error
//!      ▼
//!   Provision ──error──▶ Fail (Provision)
//!      │
//!      ok
//!      ▼
//!    Retry ──ok──▶ Done
//!      │
//!    error
//!      ▼
//!    Fail (AfterProvision)
//! ```
//!
//! Provisioning is `CREATE TABLE IF NOT EXISTS`, so two callers racing on a
//! fresh collection both succeed. Whether a failed attempt provisions at all
//! is decided by the configured [`ProvisionPolicy`].

mod table;

pub use table::{quote_ident, TableSql};

use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags, Row, ToSql};
use tracing::{debug, warn};

use crate::config::{ProvisionPolicy, StoreConfig};
use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use crate::storer::{RawRecord, Storer};

const LIST_COLLECTIONS_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
     ORDER BY name";

/// Longest single wait on the connection lock between context checks.
const LOCK_POLL: Duration = Duration::from_millis(10);

/// An object store backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: StoreConfig,
}

impl SqliteStore {
    /// Opens a store with default settings.
    ///
    /// `conn` is a file path, `:memory:`, or a `file:` URI such as
    /// `file:objects?mode=memory&cache=shared`.
    pub fn open(conn: &str) -> StoreResult<Self> {
        Self::open_with_config(&StoreConfig::new(conn))
    }

    /// Opens a store with the given configuration.
    pub fn open_with_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let connect_err = |source| StoreError::Connect {
            conn: config.conn.clone(),
            source,
        };

        let conn = Connection::open_with_flags(&config.conn, OpenFlags::default())
            .map_err(connect_err)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(connect_err)?;

        debug!(conn = %config.conn, policy = ?config.provision_policy, "opened sqlite store");

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
        })
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the provisioning policy in effect.
    pub fn provision_policy(&self) -> ProvisionPolicy {
        self.config.provision_policy
    }

    // =========================================================================
    // Statement helpers
    // =========================================================================

    /// Runs a mutating statement against `collection`, provisioning it if
    /// needed. Returns the number of rows changed.
    fn execute(
        &self,
        ctx: &Context,
        collection: &str,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> StoreResult<usize> {
        self.provisioned(ctx, collection, |conn| {
            conn.prepare_cached(sql)?.execute(params)
        })
    }

    /// Runs a query against `collection`, provisioning it if needed, and maps
    /// every row. The cursor is released before returning.
    fn query<T>(
        &self,
        ctx: &Context,
        collection: &str,
        sql: &str,
        params: &[&dyn ToSql],
        map: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        self.provisioned(ctx, collection, |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params, &map)?;
            rows.collect()
        })
    }

    fn provisioned<R>(
        &self,
        ctx: &Context,
        collection: &str,
        op: impl Fn(&Connection) -> rusqlite::Result<R>,
    ) -> StoreResult<R> {
        self.with_connection(ctx, |conn| {
            let first = match op(conn) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            // An interrupted attempt is the caller's cancellation, not a
            // missing table.
            ctx.check()?;

            if !self.config.provision_policy.should_provision(&first) {
                return Err(StoreError::Engine(first));
            }

            debug!(collection, error = %first, "provisioning collection");
            conn.execute(&TableSql::new(collection).create(), [])
                .map_err(|source| StoreError::Provision {
                    collection: collection.to_string(),
                    source,
                })?;

            op(conn).map_err(|source| {
                warn!(collection, error = %source, "statement failed after provisioning");
                StoreError::AfterProvision {
                    collection: collection.to_string(),
                    source,
                }
            })
        })
    }

    /// Waits for the connection until `ctx` is done.
    fn lock(&self, ctx: &Context) -> StoreResult<MutexGuard<'_, Connection>> {
        loop {
            ctx.check()?;

            let slice = match ctx.deadline() {
                Some(deadline) => LOCK_POLL.min(deadline.saturating_duration_since(Instant::now())),
                None => LOCK_POLL,
            };
            if let Some(conn) = self.conn.try_lock_for(slice) {
                return Ok(conn);
            }
        }
    }

    /// Locks the connection and runs `f` with `ctx` watching it.
    ///
    /// Waiting for the lock and running `f` both stop once `ctx` is done.
    /// While `f` runs, the engine polls `ctx` every `progress_ops` steps and
    /// aborts the statement.
    fn with_connection<R>(
        &self,
        ctx: &Context,
        f: impl FnOnce(&Connection) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let conn = self.lock(ctx)?;
        // Done between taking the lock and installing the handler.
        ctx.check()?;

        let watch = ctx.clone();
        conn.progress_handler(self.config.progress_ops, Some(move || watch.is_done()));
        let result = f(&*conn);
        conn.progress_handler(0, None::<fn() -> bool>);

        match result {
            Err(err) if err.is_interrupted() => Err(ctx.err().unwrap_or(err)),
            other => other,
        }
    }
}

impl Storer for SqliteStore {
    fn put_raw(
        &self,
        ctx: &Context,
        collection: &str,
        id: &str,
        payload: &str,
    ) -> StoreResult<()> {
        let sql = TableSql::new(collection).upsert();
        self.execute(ctx, collection, &sql, &[&id, &payload])?;
        Ok(())
    }

    fn get_raw(&self, ctx: &Context, collection: &str, id: &str) -> StoreResult<Option<String>> {
        let sql = TableSql::new(collection).select_one();
        let payloads: Vec<String> = self.query(ctx, collection, &sql, &[&id], |row| row.get(0))?;
        Ok(payloads.into_iter().next())
    }

    fn scan_raw(&self, ctx: &Context, collection: &str) -> StoreResult<Vec<RawRecord>> {
        let sql = TableSql::new(collection).select_all();
        self.query(ctx, collection, &sql, &[], |row| {
            Ok(RawRecord {
                id: row.get(0)?,
                payload: row.get(1)?,
            })
        })
    }

    fn delete(&self, ctx: &Context, collection: &str, id: &str) -> StoreResult<()> {
        let sql = TableSql::new(collection).delete();
        self.execute(ctx, collection, &sql, &[&id])?;
        Ok(())
    }

    fn collections(&self, ctx: &Context) -> StoreResult<Vec<String>> {
        self.with_connection(ctx, |conn| {
            let mut stmt = conn.prepare_cached(LIST_COLLECTIONS_SQL)?;
            let names = stmt.query_map([], |row| row.get(0))?;
            Ok(names.collect::<rusqlite::Result<Vec<String>>>()?)
        })
    }

    fn close(self) -> StoreResult<()> {
        debug!(conn = %self.config.conn, "closing sqlite store");
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, err)| StoreError::Engine(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Document;
    use crate::storer::StorerExt;
    use serde::{Deserialize, Serialize};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use tempfile::TempDir;

    const LONG_QUERY: &str =
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c LIMIT 500000000) \
         SELECT count(*) FROM c";

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct Counter {
        id: String,
        count: u32,
    }

    fn memory_store() -> SqliteStore {
        SqliteStore::open(":memory:").unwrap()
    }

    fn doc(id: &str, val: &str) -> Document {
        Document::new(id).with_field("val", val)
    }

    #[test]
    fn test_open_bad_path() {
        let err = SqliteStore::open("/nonexistent/dir/for/stow/test.db").unwrap_err();
        assert!(matches!(err, StoreError::Connect { .. }), "{err}");
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = StoreConfig::builder().progress_ops(0).build();
        assert!(matches!(
            SqliteStore::open_with_config(&config),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_write_provisions_collection() {
        let store = memory_store();
        let ctx = Context::background();

        assert!(store.collections(&ctx).unwrap().is_empty());
        store.write(&ctx, "widgets", &doc("w1", "foo")).unwrap();
        assert_eq!(store.collections(&ctx).unwrap(), vec!["widgets".to_string()]);

        let got: Option<Document> = store.read(&ctx, "widgets", "w1", Document::default).unwrap();
        assert_eq!(got, Some(doc("w1", "foo")));
    }

    #[test]
    fn test_read_provisions_collection() {
        let store = memory_store();
        let ctx = Context::background();

        let got: Option<Document> = store.read(&ctx, "fresh", "nope", Document::default).unwrap();
        assert!(got.is_none());
        assert_eq!(store.collections(&ctx).unwrap(), vec!["fresh".to_string()]);
    }

    #[test]
    fn test_upsert_keeps_one_row() {
        let store = memory_store();
        let ctx = Context::background();

        store.write(&ctx, "widgets", &doc("id2", "bar")).unwrap();
        store.write(&ctx, "widgets", &doc("id2", "zig")).unwrap();

        let raw = store.scan_raw(&ctx, "widgets").unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].id, "id2");

        let got: Document = store
            .read(&ctx, "widgets", "id2", Document::default)
            .unwrap()
            .unwrap();
        assert_eq!(got.get("val"), Some(&serde_json::Value::from("zig")));
    }

    #[test]
    fn test_quoted_collection_names() {
        let store = memory_store();
        let ctx = Context::background();

        store.write(&ctx, "odd \"name\"", &doc("a", "1")).unwrap();
        store.write(&ctx, "select", &doc("b", "2")).unwrap();

        let odd: Vec<Document> = store.list(&ctx, "odd \"name\"", Document::default).unwrap();
        assert_eq!(odd, vec![doc("a", "1")]);
        assert_eq!(
            store.collections(&ctx).unwrap(),
            vec!["odd \"name\"".to_string(), "select".to_string()]
        );
    }

    #[test]
    fn test_decode_error() {
        let store = memory_store();
        let ctx = Context::background();

        let bad = Document::new("c1").with_field("count", "lots");
        store.write(&ctx, "counters", &bad).unwrap();

        let err = store
            .read(&ctx, "counters", "c1", Counter::default)
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref id, .. } if id == "c1"), "{err}");

        let err = store.list(&ctx, "counters", Counter::default).unwrap_err();
        assert_eq!(err.code(), "decode");
    }

    fn store_with_broken_table(policy: ProvisionPolicy) -> SqliteStore {
        let config = StoreConfig::builder().provision_policy(policy).build();
        let store = SqliteStore::open_with_config(&config).unwrap();
        store
            .with_connection(&Context::background(), |conn| {
                conn.execute_batch("CREATE TABLE broken (unrelated TEXT)")?;
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn test_any_failure_retries_once() {
        let store = store_with_broken_table(ProvisionPolicy::AnyFailure);
        let ctx = Context::background();

        let err = store.write(&ctx, "broken", &doc("x", "y")).unwrap_err();
        assert!(matches!(err, StoreError::AfterProvision { .. }), "{err}");
    }

    #[test]
    fn test_missing_table_only_skips_provisioning() {
        let store = store_with_broken_table(ProvisionPolicy::MissingTableOnly);
        let ctx = Context::background();

        let err = store.write(&ctx, "broken", &doc("x", "y")).unwrap_err();
        assert!(matches!(err, StoreError::Engine(_)), "{err}");

        // A genuinely missing table is still provisioned.
        store.write(&ctx, "fine", &doc("x", "y")).unwrap();
        assert_eq!(
            store.collections(&ctx).unwrap(),
            vec!["broken".to_string(), "fine".to_string()]
        );
    }

    #[test]
    fn test_provision_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ro.db");
        let ctx = Context::background();

        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        store.write(&ctx, "existing", &doc("a", "b")).unwrap();
        store.close().unwrap();

        let uri = format!("file:{}?mode=ro", path.display());
        let store = SqliteStore::open(&uri).unwrap();

        let got: Option<Document> = store.read(&ctx, "existing", "a", Document::default).unwrap();
        assert!(got.is_some());

        let err = store
            .read(&ctx, "missing", "a", Document::default)
            .unwrap_err();
        assert!(matches!(err, StoreError::Provision { .. }), "{err}");
    }

    #[test]
    fn test_cancelled_context() {
        let store = memory_store();
        let ctx = Context::background();
        ctx.cancel();

        let err = store.write(&ctx, "widgets", &doc("w1", "foo")).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));

        // Nothing was provisioned.
        assert!(store.collections(&Context::background()).unwrap().is_empty());
    }

    #[test]
    fn test_deadline_interrupts_running_statement() {
        let store = memory_store();
        let ctx = Context::background().with_timeout(Duration::from_millis(50));

        let result = store.with_connection(&ctx, |conn| {
            let n: i64 = conn.query_row(LONG_QUERY, [], |row| row.get(0))?;
            Ok(n)
        });
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)), "{result:?}");

        // The handler is removed once the call returns.
        let ctx = Context::background();
        store.write(&ctx, "widgets", &doc("w1", "foo")).unwrap();
    }

    #[test]
    fn test_cancel_interrupts_running_statement() {
        let store = memory_store();
        let ctx = Context::background();

        let canceller = ctx.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let result = store.provisioned(&ctx, "never", |conn| {
            conn.query_row(LONG_QUERY, [], |row| row.get::<_, i64>(0))
        });
        handle.join().unwrap();
        assert!(matches!(result, Err(StoreError::Cancelled)), "{result:?}");

        // The interrupted attempt did not provision.
        assert!(store.collections(&Context::background()).unwrap().is_empty());
    }

    #[test]
    fn test_deadline_while_waiting_for_connection() {
        let store = Arc::new(memory_store());
        let hold = Context::background();

        let (started_tx, started_rx) = mpsc::channel();
        let holder = {
            let store = Arc::clone(&store);
            let hold = hold.clone();
            thread::spawn(move || {
                store.with_connection(&hold, |conn| {
                    started_tx.send(()).unwrap();
                    let n: i64 = conn.query_row(LONG_QUERY, [], |row| row.get(0))?;
                    Ok(n)
                })
            })
        };
        started_rx.recv().unwrap();

        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let start = Instant::now();
        let err = store.write(&ctx, "widgets", &doc("w1", "foo")).unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, StoreError::DeadlineExceeded), "{err}");
        assert!(elapsed < Duration::from_millis(500), "waited {elapsed:?}");

        hold.cancel();
        let held = holder.join().unwrap();
        assert!(matches!(held, Err(StoreError::Cancelled)), "{held:?}");

        // The timed-out write never ran.
        assert!(store.collections(&Context::background()).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_while_waiting_for_connection() {
        let store = Arc::new(memory_store());
        let hold = Context::background();

        let (started_tx, started_rx) = mpsc::channel();
        let holder = {
            let store = Arc::clone(&store);
            let hold = hold.clone();
            thread::spawn(move || {
                store.with_connection(&hold, |conn| {
                    started_tx.send(()).unwrap();
                    let n: i64 = conn.query_row(LONG_QUERY, [], |row| row.get(0))?;
                    Ok(n)
                })
            })
        };
        started_rx.recv().unwrap();

        let ctx = Context::background();
        let canceller = ctx.clone();
        let cancel = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let start = Instant::now();
        let err = store.delete(&ctx, "widgets", "w1").unwrap_err();
        assert!(matches!(err, StoreError::Cancelled), "{err}");
        assert!(start.elapsed() < Duration::from_millis(500));

        cancel.join().unwrap();
        hold.cancel();
        assert!(holder.join().unwrap().is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("objects.db");
        let path = path.to_str().unwrap();
        let ctx = Context::background();

        let store = SqliteStore::open(path).unwrap();
        store.write(&ctx, "widgets", &doc("w1", "foo")).unwrap();
        store.close().unwrap();

        let store = SqliteStore::open(path).unwrap();
        let all: Vec<Document> = store.list(&ctx, "widgets", Document::default).unwrap();
        assert_eq!(all, vec![doc("w1", "foo")]);
    }
}
