//! Behavior every backend must show.
//!
//! Each check uses its own collection, so all of them can run against one
//! store. A failed expectation panics.

use stow_store::{Context, StoreError, Storer, StorerExt};

use crate::utils::{new_opaque, sorted_values, Opaque};

/// Runs every check against `store`.
pub fn run_all(store: &dyn Storer) {
    write_then_read(store);
    last_write_wins(store);
    read_missing(store);
    delete_then_read(store);
    delete_missing(store);
    list_fresh_collection(store);
    list_returns_all(store);
    repeated_write_is_idempotent(store);
    collections_are_independent(store);
    factory_fills_missing_fields(store);
    cancelled_context_fails(store);
}

/// A written object reads back equal.
pub fn write_then_read(store: &dyn Storer) {
    let ctx = Context::background();
    let record = Opaque::new("id1", "foo");

    store
        .write(&ctx, "writeThenRead", &record)
        .expect("write failed");
    let got: Option<Opaque> = store
        .read(&ctx, "writeThenRead", "id1", new_opaque)
        .expect("read failed");
    assert_eq!(got, Some(record));
}

/// Two writes with one ID leave one record holding the second payload.
pub fn last_write_wins(store: &dyn Storer) {
    let ctx = Context::background();

    store
        .write(&ctx, "lastWriteWins", &Opaque::new("id1", "foo"))
        .expect("write failed");
    store
        .write(&ctx, "lastWriteWins", &Opaque::new("id2", "bar"))
        .expect("write failed");
    store
        .write(&ctx, "lastWriteWins", &Opaque::new("id2", "zig"))
        .expect("write failed");

    let out1: Opaque = store
        .read(&ctx, "lastWriteWins", "id1", new_opaque)
        .expect("read failed")
        .expect("id1 missing");
    assert_eq!(out1.opaque, "foo");

    let out2: Opaque = store
        .read(&ctx, "lastWriteWins", "id2", new_opaque)
        .expect("read failed")
        .expect("id2 missing");
    assert_eq!(out2.opaque, "zig");

    let all: Vec<Opaque> = store
        .list(&ctx, "lastWriteWins", new_opaque)
        .expect("list failed");
    assert_eq!(all.len(), 2);
}

/// Reading from a never-used collection is not an error.
pub fn read_missing(store: &dyn Storer) {
    let ctx = Context::background();
    let got: Option<Opaque> = store
        .read(&ctx, "readMissing", "nope", new_opaque)
        .expect("read of missing record failed");
    assert_eq!(got, None);
}

/// A deleted record reads as absent.
pub fn delete_then_read(store: &dyn Storer) {
    let ctx = Context::background();

    store
        .write(&ctx, "deleteThenRead", &Opaque::new("id1", "foo"))
        .expect("write failed");
    store
        .delete(&ctx, "deleteThenRead", "id1")
        .expect("delete failed");

    let got: Option<Opaque> = store
        .read(&ctx, "deleteThenRead", "id1", new_opaque)
        .expect("read failed");
    assert_eq!(got, None);
}

/// Deleting a record that never existed succeeds, with or without its
/// collection.
pub fn delete_missing(store: &dyn Storer) {
    let ctx = Context::background();

    store
        .delete(&ctx, "deleteMissing", "ghost")
        .expect("delete in fresh collection failed");

    store
        .write(&ctx, "deleteMissing", &Opaque::new("id1", "foo"))
        .expect("write failed");
    store
        .delete(&ctx, "deleteMissing", "ghost")
        .expect("delete of missing record failed");

    let all: Vec<Opaque> = store
        .list(&ctx, "deleteMissing", new_opaque)
        .expect("list failed");
    assert_eq!(all, vec![Opaque::new("id1", "foo")]);
}

/// Listing a never-used collection yields nothing.
pub fn list_fresh_collection(store: &dyn Storer) {
    let ctx = Context::background();
    let all: Vec<Opaque> = store
        .list(&ctx, "listFresh", new_opaque)
        .expect("list of fresh collection failed");
    assert!(all.is_empty());
}

/// Listing returns every record, in any order.
pub fn list_returns_all(store: &dyn Storer) {
    let ctx = Context::background();

    store
        .write(&ctx, "listAll", &Opaque::new("id1", "foo"))
        .expect("write failed");
    store
        .write(&ctx, "listAll", &Opaque::new("id2", "bar"))
        .expect("write failed");

    let all: Vec<Opaque> = store.list(&ctx, "listAll", new_opaque).expect("list failed");
    assert_eq!(all.len(), 2);
    assert_eq!(sorted_values(&all), vec!["bar", "foo"]);
}

/// Writing an unchanged object twice stores the same state as writing it
/// once.
pub fn repeated_write_is_idempotent(store: &dyn Storer) {
    let ctx = Context::background();
    let record = Opaque::new("id1", "same");

    store.write(&ctx, "idemOnce", &record).expect("write failed");
    store.write(&ctx, "idemTwice", &record).expect("write failed");
    store.write(&ctx, "idemTwice", &record).expect("write failed");

    let once = store.scan_raw(&ctx, "idemOnce").expect("scan failed");
    let twice = store.scan_raw(&ctx, "idemTwice").expect("scan failed");
    assert_eq!(once, twice);
}

/// Records with the same ID in different collections do not interact.
pub fn collections_are_independent(store: &dyn Storer) {
    let ctx = Context::background();

    store
        .write(&ctx, "independentA", &Opaque::new("shared", "a"))
        .expect("write failed");
    store
        .write(&ctx, "independentB", &Opaque::new("shared", "b"))
        .expect("write failed");
    store
        .delete(&ctx, "independentA", "shared")
        .expect("delete failed");

    let b: Option<Opaque> = store
        .read(&ctx, "independentB", "shared", new_opaque)
        .expect("read failed");
    assert_eq!(b, Some(Opaque::new("shared", "b")));

    let names = store.collections(&ctx).expect("collections failed");
    assert!(names.contains(&"independentA".to_string()));
    assert!(names.contains(&"independentB".to_string()));
}

/// Fields missing from a stored payload keep the factory's values.
pub fn factory_fills_missing_fields(store: &dyn Storer) {
    let ctx = Context::background();

    store
        .put_raw(&ctx, "factoryDefaults", "p1", r#"{"id":"p1"}"#)
        .expect("put failed");

    let got: Option<Opaque> = store
        .read(&ctx, "factoryDefaults", "p1", || Opaque::new("", "unset"))
        .expect("read failed");
    assert_eq!(got, Some(Opaque::new("p1", "unset")));
}

/// A cancelled context stops the call before it reaches the backend.
pub fn cancelled_context_fails(store: &dyn Storer) {
    let ctx = Context::background();
    ctx.cancel();

    let err = store
        .write(&ctx, "cancelled", &Opaque::new("id1", "foo"))
        .expect_err("write with cancelled context succeeded");
    assert!(matches!(err, StoreError::Cancelled), "unexpected error: {err}");

    let err = store
        .read::<Opaque, _>(&ctx, "cancelled", "id1", new_opaque)
        .expect_err("read with cancelled context succeeded");
    assert!(matches!(err, StoreError::Cancelled), "unexpected error: {err}");
}
