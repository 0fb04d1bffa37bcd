//! Test-support implementation of the store collaborator.
//!
//! [`MemoryStore`] backs the documented scenarios and the error-path tests
//! without a real database: one table of [`Record`]s, working-set
//! transaction semantics (commit publishes, rollback restores), and
//! injectable failures for every phase the scope machinery has to survive.
//!
//! # Example
//!
//! ```rust
//! use weir::testing::{MemoryStore, Record};
//! use weir::store::{Connection, Connector};
//! use weir::StoreConfig;
//!
//! let store = MemoryStore::seeded(vec![Record::new(1, "alpha")]);
//! let config = StoreConfig::new("localhost", 5432, "postgres", "postgres", "postgres");
//!
//! let mut conn = store.connect(&config).unwrap();
//! conn.commit().unwrap();
//! conn.close().unwrap();
//! ```

use std::sync::{Arc, Mutex};

use crate::config::StoreConfig;
use crate::store::{Connection, Connector, Row, Session, StoreError, Value};

/// One record of the in-memory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Row identifier.
    pub id: i64,
    /// Row payload.
    pub name: String,
}

impl Record {
    /// Build a record.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Record {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    committed: Vec<Record>,
    open_connections: usize,
    fail_connections: bool,
    fail_commits: bool,
    fail_session_close: bool,
    fail_connection_close: bool,
}

/// An in-memory store with one table and working-set transactions.
///
/// Each connection snapshots the committed records into a working set;
/// statements run against the working set, `commit` publishes it, and
/// `rollback` restores it from the committed records. The statement
/// dialect is the minimum the examples use: a `SELECT` fetch-all and a
/// parameterized single-row `UPDATE` taking `(name, id)`. Anything else is
/// rejected with [`StoreError::Execute`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// A store seeded with the given records.
    pub fn seeded(records: Vec<Record>) -> Self {
        let store = MemoryStore::new();
        store.state.lock().unwrap().committed = records;
        store
    }

    /// Snapshot of the committed records.
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().unwrap().committed.clone()
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.state.lock().unwrap().open_connections
    }

    /// Make subsequent connection attempts fail.
    pub fn fail_connections(&self, fail: bool) {
        self.state.lock().unwrap().fail_connections = fail;
    }

    /// Make subsequent commits fail.
    pub fn fail_commits(&self, fail: bool) {
        self.state.lock().unwrap().fail_commits = fail;
    }

    /// Make session closes fail.
    pub fn fail_session_close(&self, fail: bool) {
        self.state.lock().unwrap().fail_session_close = fail;
    }

    /// Make connection closes fail.
    pub fn fail_connection_close(&self, fail: bool) {
        self.state.lock().unwrap().fail_connection_close = fail;
    }
}

impl Connector for MemoryStore {
    type Conn = MemoryConnection;

    fn connect(&self, config: &StoreConfig) -> Result<MemoryConnection, StoreError> {
        if config.host.is_empty() {
            return Err(StoreError::Connect("empty host".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_connections {
            return Err(StoreError::Connect("connection refused (injected)".to_string()));
        }
        state.open_connections += 1;
        let working = state.committed.clone();
        Ok(MemoryConnection {
            state: self.state.clone(),
            working: Arc::new(Mutex::new(working)),
            open: true,
        })
    }
}

/// A connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<Mutex<StoreState>>,
    working: Arc<Mutex<Vec<Record>>>,
    open: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Execute("connection is closed".to_string()))
        }
    }
}

impl Connection for MemoryConnection {
    type Session = MemorySession;

    fn session(&mut self) -> Result<MemorySession, StoreError> {
        self.ensure_open()?;
        Ok(MemorySession {
            state: self.state.clone(),
            working: self.working.clone(),
            open: true,
        })
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_commits {
            return Err(StoreError::Execute("commit refused (injected)".to_string()));
        }
        state.committed = self.working.lock().unwrap().clone();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let state = self.state.lock().unwrap();
        *self.working.lock().unwrap() = state.committed.clone();
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let mut state = self.state.lock().unwrap();
        state.open_connections = state.open_connections.saturating_sub(1);
        if state.fail_connection_close {
            return Err(StoreError::Close(
                "connection close refused (injected)".to_string(),
            ));
        }
        Ok(())
    }
}

/// A session over a [`MemoryConnection`]'s working set.
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<Mutex<StoreState>>,
    working: Arc<Mutex<Vec<Record>>>,
    open: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Execute("session is closed".to_string()))
        }
    }
}

impl Session for MemorySession {
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let normalized = statement.trim_start().to_ascii_uppercase();
        if !normalized.starts_with("UPDATE") {
            return Err(StoreError::Execute(format!(
                "unsupported statement: {}",
                statement
            )));
        }
        let (name, id) = match params {
            [Value::Text(name), Value::Int(id)] => (name.clone(), *id),
            _ => {
                return Err(StoreError::Execute(
                    "update expects (name, id) parameters".to_string(),
                ))
            }
        };
        let mut working = self.working.lock().unwrap();
        let mut affected = 0;
        for record in working.iter_mut() {
            if record.id == id {
                record.name = name.clone();
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn fetch_all(&mut self, statement: &str) -> Result<Vec<Row>, StoreError> {
        self.ensure_open()?;
        let normalized = statement.trim_start().to_ascii_uppercase();
        if !normalized.starts_with("SELECT") {
            return Err(StoreError::Execute(format!(
                "unsupported statement: {}",
                statement
            )));
        }
        let working = self.working.lock().unwrap();
        Ok(working
            .iter()
            .map(|record| Row::new(vec![Value::Int(record.id), Value::text(record.name.as_str())]))
            .collect())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        if self.state.lock().unwrap().fail_session_close {
            return Err(StoreError::Close(
                "session close refused (injected)".to_string(),
            ));
        }
        Ok(())
    }
}
