//! The connection + session lifecycle as a scoped resource.

use std::fmt;

use crate::config::StoreConfig;
use crate::scope::ScopedResource;

use super::{Connection, Connector, Row, Session, StoreError, Value};

/// A parameterized statement staged for the finalize phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
    params: Vec<Value>,
}

impl Statement {
    /// Build a staged statement.
    pub fn new(text: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            text: text.into(),
            params,
        }
    }

    /// The statement text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The statement parameters.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// A connection and its session, owned for the duration of one scope.
///
/// [`open`](StoreScope::open) acquires both handles; either failure means
/// the scope never begins. Inside the scope the caller runs statements
/// directly ([`fetch_all`](StoreScope::fetch_all),
/// [`execute`](StoreScope::execute)) and may [`stage`](StoreScope::stage) a
/// unit of work for exit time.
///
/// As a [`ScopedResource`]:
///
/// - **finalize** drains the staged statements through the session, then
///   commits;
/// - **compensate** discards the staged statements and rolls back;
/// - **release** closes the session, then the connection - reverse order of
///   acquisition, both attempted even if the first close fails, guarded
///   against double-close.
///
/// # Example
///
/// ```rust
/// use weir::testing::{MemoryStore, Record};
/// use weir::{with_scope, StoreConfig, StoreScope, Value};
///
/// let store = MemoryStore::seeded(vec![Record::new(1, "initial value")]);
/// let config = StoreConfig::new("localhost", 5432, "postgres", "postgres", "postgres");
///
/// let rows = with_scope(
///     || StoreScope::open(&store, &config),
///     |scope| {
///         let rows = scope.fetch_all("SELECT id, name FROM service")?;
///         scope.stage(
///             "UPDATE service SET name = $1 WHERE id = $2",
///             vec![Value::text("updated value"), Value::Int(1)],
///         );
///         Ok(rows)
///     },
/// )
/// .unwrap();
///
/// assert_eq!(rows.len(), 1);
/// assert_eq!(store.records()[0].name, "updated value");
/// ```
pub struct StoreScope<C: Connection> {
    connection: C,
    session: Option<C::Session>,
    staged: Vec<Statement>,
    closed: bool,
}

impl<C: Connection> fmt::Debug for StoreScope<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreScope")
            .field("connection", &"<connection>")
            .field("session", &self.session.as_ref().map(|_| "<session>"))
            .field("staged", &self.staged)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<C: Connection> StoreScope<C> {
    /// Connect and open the session sub-handle.
    ///
    /// If the session cannot be opened, the freshly-established connection
    /// is closed (errors reported) before the acquisition error propagates.
    pub fn open<K>(connector: &K, config: &StoreConfig) -> Result<Self, StoreError>
    where
        K: Connector<Conn = C>,
    {
        let mut connection = connector.connect(config)?;
        let session = match connection.session() {
            Ok(session) => session,
            Err(err) => {
                if let Err(close_err) = connection.close() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "closing connection after failed session open: {:?}",
                        close_err
                    );
                    #[cfg(not(feature = "tracing"))]
                    eprintln!(
                        "closing connection after failed session open: {:?}",
                        close_err
                    );
                }
                return Err(err);
            }
        };
        Ok(StoreScope {
            connection,
            session: Some(session),
            staged: Vec::new(),
            closed: false,
        })
    }

    /// Run a statement and collect every result row.
    pub fn fetch_all(&mut self, statement: &str) -> Result<Vec<Row>, StoreError> {
        self.session_mut()?.fetch_all(statement)
    }

    /// Run a parameterized statement immediately.
    pub fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.session_mut()?.execute(statement, params)
    }

    /// Queue a parameterized statement to run at finalize, just before
    /// commit. Staged work is discarded if the scope fails.
    pub fn stage(&mut self, statement: impl Into<String>, params: Vec<Value>) {
        self.staged.push(Statement::new(statement, params));
    }

    /// The statements currently staged for finalize.
    pub fn staged(&self) -> &[Statement] {
        &self.staged
    }

    fn session_mut(&mut self) -> Result<&mut C::Session, StoreError> {
        self.session
            .as_mut()
            .ok_or_else(|| StoreError::Execute("session is closed".to_string()))
    }
}

impl<C: Connection> ScopedResource for StoreScope<C> {
    type Error = StoreError;

    fn finalize(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| StoreError::Execute("session is closed".to_string()))?;
        for statement in &staged {
            session.execute(statement.text(), statement.params())?;
        }
        self.connection.commit()
    }

    fn compensate(&mut self) -> Result<(), StoreError> {
        self.staged.clear();
        self.connection.rollback()
    }

    fn release(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Sub-handle before primary handle; attempt both closes.
        let session = match self.session.take() {
            Some(mut session) => session.close(),
            None => Ok(()),
        };
        let connection = self.connection.close();
        session?;
        connection
    }
}
