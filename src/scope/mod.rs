//! Scoped resource management - the acquire/use/release contract.
//!
//! A scope acquires a resource on entry and guarantees release on every
//! exit path. This module provides:
//!
//! - [`ScopedResource`] - trait describing what a guarded resource does at
//!   scope exit (finalize, compensate, release)
//! - [`ScopeGuard`] - direct-call guard with a `Drop` backstop
//! - [`with_scope`] - closure-based scope with swallow-and-log cleanup errors
//! - [`with_scope_full`] - closure-based scope with explicit cleanup errors
//! - [`Paired`] / [`with_scope2`] - two resources with LIFO release
//! - [`Outcome`] - how a scope exited
//! - [`ScopeError`] - error type identifying the failed phase
//!
//! # Exit semantics
//!
//! | Exit | finalize | compensate | release |
//! |------|----------|------------|---------|
//! | body succeeded | yes | only if finalize failed | yes |
//! | body failed | no | yes | yes |
//! | body panicked | no | yes | yes (then the panic resumes) |
//!
//! Release errors are reported, never raised over the error (or panic) that
//! ended the scope.
//!
//! # Example
//!
//! ```rust,ignore
//! use weir::prelude::*;
//!
//! let rows = with_scope(
//!     || StoreScope::open(&connector, &config),
//!     |scope| scope.fetch_all("SELECT id, name FROM service"),
//! )?;
//! ```

use std::fmt;

mod guard;

pub use guard::{with_scope, with_scope2, with_scope_full, Paired, ScopeGuard};

// ============================================================================
// Outcome
// ============================================================================

/// How a scope exited.
///
/// Passed to [`ScopeGuard::exit`] by callers of the direct API, and derived
/// from the body's result by [`with_scope`]. A `Success` exit runs the
/// resource's finalize action; a `Failure` exit runs the compensating
/// action. Release runs either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The scope body completed normally.
    Success,
    /// The scope body failed (error return, early drop, or panic).
    Failure,
}

// ============================================================================
// ScopedResource
// ============================================================================

/// A resource that lives exactly as long as a scope.
///
/// Implementors describe the three things a guard may do with the resource
/// at scope exit. `finalize` and `compensate` default to no-ops, so simple
/// resources only implement [`release`](ScopedResource::release).
///
/// # Contract
///
/// - `finalize` runs only on a `Success` exit, before release. A finalize
///   error converts the exit into the compensating path; it is reported,
///   not re-raised, by the default scope API.
/// - `compensate` runs on a `Failure` exit (or after a failed finalize),
///   before release. Best-effort: its errors are reported only.
/// - `release` runs on every exit. It must tolerate being called more than
///   once (idempotent or internally guarded), and on multi-handle resources
///   it must attempt every handle even if one close fails.
///
/// # Example
///
/// ```rust
/// use weir::ScopedResource;
///
/// struct Staged {
///     committed: bool,
///     open: bool,
/// }
///
/// impl ScopedResource for Staged {
///     type Error = String;
///
///     fn finalize(&mut self) -> Result<(), String> {
///         self.committed = true;
///         Ok(())
///     }
///
///     fn compensate(&mut self) -> Result<(), String> {
///         self.committed = false;
///         Ok(())
///     }
///
///     fn release(&mut self) -> Result<(), String> {
///         self.open = false;
///         Ok(())
///     }
/// }
/// ```
pub trait ScopedResource {
    /// The error type produced by exit-phase operations.
    type Error: fmt::Debug;

    /// Pending commit-equivalent work, run on a successful exit.
    fn finalize(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Rollback-equivalent work, run on a failed exit.
    fn compensate(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Unconditional teardown. Runs last, on every exit path.
    fn release(&mut self) -> Result<(), Self::Error>;
}

// ============================================================================
// ScopeError
// ============================================================================

/// Error type identifying which phase of a scope failed.
///
/// Each variant names one phase, so every state is valid and callers can
/// match on exactly what went wrong.
///
/// [`with_scope`] only ever returns `Acquire` or `Body` (cleanup-phase
/// errors are reported and swallowed); [`with_scope_full`] surfaces every
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError<E> {
    /// Acquisition failed - the scope never began.
    Acquire(E),
    /// The scope body failed; compensation ran.
    Body(E),
    /// The body succeeded but the finalize action failed; compensation ran.
    Finalize(E),
    /// The body and finalize succeeded but releasing a handle failed.
    Release(E),
    /// The body failed and release also failed.
    Both {
        /// The error from the scope body.
        body: E,
        /// The error from the release phase.
        release: E,
    },
}

impl<E> ScopeError<E> {
    /// Returns the acquisition error, if any.
    pub fn acquire_error(&self) -> Option<&E> {
        match self {
            ScopeError::Acquire(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the body error, if any.
    pub fn body_error(&self) -> Option<&E> {
        match self {
            ScopeError::Body(e) | ScopeError::Both { body: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Returns the finalize error, if any.
    pub fn finalize_error(&self) -> Option<&E> {
        match self {
            ScopeError::Finalize(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the release error, if any.
    pub fn release_error(&self) -> Option<&E> {
        match self {
            ScopeError::Release(e) | ScopeError::Both { release: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Maps the error type using the provided function.
    pub fn map<F, E2>(self, f: F) -> ScopeError<E2>
    where
        F: Fn(E) -> E2,
    {
        match self {
            ScopeError::Acquire(e) => ScopeError::Acquire(f(e)),
            ScopeError::Body(e) => ScopeError::Body(f(e)),
            ScopeError::Finalize(e) => ScopeError::Finalize(f(e)),
            ScopeError::Release(e) => ScopeError::Release(f(e)),
            ScopeError::Both { body, release } => ScopeError::Both {
                body: f(body),
                release: f(release),
            },
        }
    }
}

impl<E: fmt::Display> fmt::Display for ScopeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Acquire(e) => write!(f, "acquire failed: {}", e),
            ScopeError::Body(e) => write!(f, "{}", e),
            ScopeError::Finalize(e) => write!(f, "finalize failed: {}", e),
            ScopeError::Release(e) => write!(f, "release failed: {}", e),
            ScopeError::Both { body, release } => {
                write!(f, "{}; release also failed: {}", body, release)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ScopeError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScopeError::Acquire(e) => Some(e),
            ScopeError::Body(e) => Some(e),
            ScopeError::Finalize(e) => Some(e),
            ScopeError::Release(e) => Some(e),
            ScopeError::Both { body, .. } => Some(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_error_display() {
        let acquire: ScopeError<&str> = ScopeError::Acquire("refused");
        assert_eq!(format!("{}", acquire), "acquire failed: refused");

        let body: ScopeError<&str> = ScopeError::Body("bad value");
        assert_eq!(format!("{}", body), "bad value");

        let finalize: ScopeError<&str> = ScopeError::Finalize("commit lost");
        assert_eq!(format!("{}", finalize), "finalize failed: commit lost");

        let release: ScopeError<&str> = ScopeError::Release("close failed");
        assert_eq!(format!("{}", release), "release failed: close failed");

        let both: ScopeError<&str> = ScopeError::Both {
            body: "bad value",
            release: "close failed",
        };
        assert_eq!(
            format!("{}", both),
            "bad value; release also failed: close failed"
        );
    }

    #[test]
    fn scope_error_accessors() {
        let acquire: ScopeError<&str> = ScopeError::Acquire("e");
        assert_eq!(acquire.acquire_error(), Some(&"e"));
        assert_eq!(acquire.body_error(), None);
        assert_eq!(acquire.finalize_error(), None);
        assert_eq!(acquire.release_error(), None);

        let both: ScopeError<&str> = ScopeError::Both {
            body: "b",
            release: "r",
        };
        assert_eq!(both.body_error(), Some(&"b"));
        assert_eq!(both.release_error(), Some(&"r"));
        assert_eq!(both.acquire_error(), None);
    }

    #[test]
    fn scope_error_map() {
        let err: ScopeError<i32> = ScopeError::Body(42);
        assert_eq!(err.map(|e| e.to_string()), ScopeError::Body("42".to_string()));

        let both: ScopeError<i32> = ScopeError::Both {
            body: 1,
            release: 2,
        };
        assert_eq!(
            both.map(|e| e * 10),
            ScopeError::Both {
                body: 10,
                release: 20
            }
        );
    }
}
