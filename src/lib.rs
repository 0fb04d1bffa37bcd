//! # Weir
//!
//! > *"A weir holds the stream while you work, and lets it go when you leave."*
//!
//! A Rust library for scoped resource management: acquire a resource on
//! entry to a scope, and guarantee its release on every exit path - normal
//! return, error return, or panic.
//!
//! ## Philosophy
//!
//! A scope is a promise: the resource is valid for exactly as long as the
//! scope lasts, and not an instant longer. **Weir** keeps that promise with
//! one abstraction exposed through two surfaces:
//!
//! - [`ScopeGuard`] - a direct-call guard for callers who want to drive the
//!   scope themselves (`enter` / `exit`), with a `Drop` backstop for early
//!   returns and panics.
//! - [`with_scope`] - a closure-based helper that runs a body inside the
//!   scope and handles the whole lifecycle.
//!
//! On a successful exit the guard runs the resource's pending *finalize*
//! action (commit-equivalent work); on a failed exit it runs the
//! *compensating* action (rollback-equivalent) instead. Release always
//! happens, and cleanup-phase errors never mask the error that ended the
//! scope.
//!
//! ## Quick Example
//!
//! ```rust
//! use weir::{with_scope, ScopedResource};
//!
//! struct Conn {
//!     open: bool,
//! }
//!
//! impl ScopedResource for Conn {
//!     type Error = String;
//!
//!     fn release(&mut self) -> Result<(), String> {
//!         self.open = false;
//!         Ok(())
//!     }
//! }
//!
//! let greeting = with_scope(
//!     || Ok::<_, String>(Conn { open: true }),
//!     |conn| {
//!         assert!(conn.open);
//!         Ok::<_, String>("hello".to_string())
//!     },
//! );
//!
//! assert_eq!(greeting.unwrap(), "hello");
//! ```
//!
//! The [`store`] module applies the same contract to a connection + session
//! lifecycle over an abstract relational store, and [`timer`] applies it to
//! wall-clock measurement of a scope.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod scope;
pub mod store;
pub mod testing;
pub mod timer;

// Re-exports
pub use config::StoreConfig;
pub use scope::{
    with_scope, with_scope2, with_scope_full, Outcome, Paired, ScopeError, ScopeGuard,
    ScopedResource,
};
pub use store::{StoreError, StoreScope, Value};
pub use timer::{timed, TimedScope};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::StoreConfig;
    pub use crate::scope::{
        with_scope, with_scope2, with_scope_full, Outcome, Paired, ScopeError, ScopeGuard,
        ScopedResource,
    };
    pub use crate::store::{Connection, Connector, Row, Session, StoreError, StoreScope, Value};
    pub use crate::timer::{timed, TimedScope};
}
