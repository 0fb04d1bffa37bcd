//! Store Scope
//!
//! Walks the connection + session lifecycle against the in-memory store:
//! acquire on entry, statements in the body, staged work executed and
//! committed on a clean exit, rollback on failure, handles always closed.
//!
//! Run with: cargo run --example store_scope

use weir::testing::{MemoryStore, Record};
use weir::{with_scope, ScopeError, StoreConfig, StoreError, StoreScope, Value};

const SELECT_ALL: &str = "SELECT id, name FROM service";
const UPDATE_BY_ID: &str = "UPDATE service SET name = $1 WHERE id = $2";

fn config() -> StoreConfig {
    StoreConfig::new("localhost", 5432, "postgres", "postgres", "postgres")
}

/// Example 1: commit on success
///
/// The staged update runs at finalize, just before commit, so the second
/// read sees it.
fn example_commit_on_success(store: &MemoryStore) {
    println!("\n=== Example 1: Commit on Success ===");

    let rows = with_scope(
        || StoreScope::open(store, &config()),
        |scope| {
            let rows = scope.fetch_all(SELECT_ALL)?;
            scope.stage(
                UPDATE_BY_ID,
                vec![Value::text("updated value"), Value::Int(1)],
            );
            Ok(rows)
        },
    )
    .expect("scope");

    println!("  rows before the update: {:?}", rows);
    println!("  committed records now:  {:?}", store.records());
}

/// Example 2: rollback on failure
///
/// The body's update is rolled back, the handles close, and the caller
/// still sees the body's error.
fn example_rollback_on_failure(store: &MemoryStore) {
    println!("\n=== Example 2: Rollback on Failure ===");

    let result = with_scope(
        || StoreScope::open(store, &config()),
        |scope| {
            scope.execute(UPDATE_BY_ID, &[Value::text("doomed"), Value::Int(2)])?;
            Err::<(), _>(StoreError::Execute("bad value".to_string()))
        },
    );

    match result {
        Err(ScopeError::Body(err)) => println!("  body failed as expected: {}", err),
        other => println!("  unexpected result: {:?}", other),
    }
    println!("  committed records:      {:?}", store.records());
    println!("  open connections:       {}", store.open_connections());
}

fn main() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    let store = MemoryStore::seeded(vec![
        Record::new(1, "initial value"),
        Record::new(2, "second value"),
    ]);

    example_commit_on_success(&store);
    example_rollback_on_failure(&store);
}
