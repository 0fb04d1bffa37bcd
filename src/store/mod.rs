//! The relational store collaborator and its scoped lifecycle.
//!
//! The store is deliberately abstract: the guard needs nothing beyond a
//! connection that can open a session, commit, roll back, and close, and a
//! session that supports parameterized execute and fetch-all. No query
//! language or schema is assumed.
//!
//! - [`Connector`] / [`Connection`] / [`Session`] - the collaborator traits
//! - [`Value`] / [`Row`] - statement parameters and result rows
//! - [`StoreError`] - connect / execute / close error kinds
//! - [`StoreScope`] - the connection + session lifecycle as a
//!   [`ScopedResource`](crate::scope::ScopedResource)
//!
//! An in-memory implementation of the traits lives in [`crate::testing`].

use std::fmt;

use crate::config::StoreConfig;

mod scope;

pub use scope::{Statement, StoreScope};

// ============================================================================
// Value and Row
// ============================================================================

/// A statement parameter or result cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A 64-bit integer.
    Int(i64),
    /// A text value.
    Text(String),
}

impl Value {
    /// Shorthand for a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// The integer inside, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Text(_) => None,
        }
    }

    /// The text inside, if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            Value::Int(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Text(value) => write!(f, "{}", value),
        }
    }
}

/// One result row: an ordered list of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    /// Build a row from its cells.
    pub fn new(cells: Vec<Value>) -> Self {
        Row { cells }
    }

    /// The cell at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }

    /// All cells in order.
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// StoreError
// ============================================================================

/// Error kinds of the store collaborator.
///
/// `Connect` aborts acquisition - the scope never begins. `Execute` covers
/// statement failures in the body and in finalize/compensate work. `Close`
/// covers teardown of a session or connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The connection could not be established.
    Connect(String),
    /// A statement, commit, or rollback failed.
    Execute(String),
    /// Closing a session or connection failed.
    Close(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connect(msg) => write!(f, "connect failed: {}", msg),
            StoreError::Execute(msg) => write!(f, "execute failed: {}", msg),
            StoreError::Close(msg) => write!(f, "close failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Opens connections to a store.
pub trait Connector {
    /// The connection type this connector produces.
    type Conn: Connection;

    /// Establish a connection with the given parameters.
    fn connect(&self, config: &StoreConfig) -> Result<Self::Conn, StoreError>;
}

/// An open connection: session factory plus transaction boundary.
pub trait Connection {
    /// The query-execution sub-handle this connection produces.
    type Session: Session;

    /// Open a session (cursor) on this connection.
    fn session(&mut self) -> Result<Self::Session, StoreError>;

    /// Make the work of the current transaction durable.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard the work of the current transaction.
    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Close the connection. Must tolerate repeated calls.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// A query-execution handle.
pub trait Session {
    /// Run a parameterized statement, returning the affected-row count.
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, StoreError>;

    /// Run a statement and collect every result row.
    fn fetch_all(&mut self, statement: &str) -> Result<Vec<Row>, StoreError>;

    /// Close the session. Must tolerate repeated calls.
    fn close(&mut self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_text(), None);
        assert_eq!(Value::text("a").as_text(), Some("a"));
        assert_eq!(Value::text("a").as_int(), None);
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::text("service").to_string(), "service");
    }

    #[test]
    fn row_access() {
        let row = Row::new(vec![Value::Int(1), Value::text("alpha")]);
        assert_eq!(row.len(), 2);
        assert!(!row.is_empty());
        assert_eq!(row.get(1), Some(&Value::text("alpha")));
        assert_eq!(row.get(2), None);
    }

    #[test]
    fn store_error_display() {
        assert_eq!(
            StoreError::Connect("refused".to_string()).to_string(),
            "connect failed: refused"
        );
        assert_eq!(
            StoreError::Execute("syntax".to_string()).to_string(),
            "execute failed: syntax"
        );
        assert_eq!(
            StoreError::Close("socket".to_string()).to_string(),
            "close failed: socket"
        );
    }
}
