//! Scope guards and the closure-based scope API.

use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use super::{Outcome, ScopeError, ScopedResource};

// ============================================================================
// Cleanup - errors collected while closing a scope
// ============================================================================

/// Errors collected while closing a scope. Compensation errors are reported
/// at the point they occur; finalize and release errors are carried out so
/// the caller decides whether to surface or report them.
struct Cleanup<E> {
    finalize: Option<E>,
    release: Option<E>,
}

impl<E> Cleanup<E> {
    fn none() -> Self {
        Cleanup {
            finalize: None,
            release: None,
        }
    }
}

impl<E: fmt::Debug> Cleanup<E> {
    /// Report collected cleanup errors without raising them.
    fn emit(&self) {
        if let Some(err) = &self.finalize {
            #[cfg(feature = "tracing")]
            tracing::warn!("scope finalize failed, compensating: {:?}", err);
            #[cfg(not(feature = "tracing"))]
            eprintln!("scope finalize failed, compensating: {:?}", err);
        }
        if let Some(err) = &self.release {
            #[cfg(feature = "tracing")]
            tracing::warn!("scope release failed: {:?}", err);
            #[cfg(not(feature = "tracing"))]
            eprintln!("scope release failed: {:?}", err);
        }
    }
}

// ============================================================================
// ScopeGuard - direct-call API
// ============================================================================

/// Sole owner of a resource for the duration of a scope.
///
/// `ScopeGuard` is the direct-call surface of the scope contract: the
/// caller enters the scope with a resource, works with it through
/// [`handle`](ScopeGuard::handle) / [`handle_mut`](ScopeGuard::handle_mut),
/// and exits with an explicit [`Outcome`]. If the guard is dropped without
/// an explicit exit - early return, `?`, or panic - the scope is treated as
/// a failure: the resource is compensated and released.
///
/// `exit` consumes the guard, so a scope cannot be exited twice and the
/// resource cannot be touched after exit. The release slot is emptied
/// before cleanup runs, which makes the `Drop` backstop a no-op afterwards;
/// the resource is released exactly once.
///
/// # Example
///
/// ```rust,ignore
/// let mut guard = ScopeGuard::enter(StoreScope::open(&connector, &config)?);
/// let rows = guard.handle_mut().fetch_all("SELECT id, name FROM service")?;
/// guard.exit(Outcome::Success);
/// ```
#[must_use = "a scope guard releases its resource on drop; hold it for the scope's duration"]
pub struct ScopeGuard<R: ScopedResource> {
    resource: Option<R>,
}

impl<R: ScopedResource> fmt::Debug for ScopeGuard<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("resource", &"<resource>")
            .finish()
    }
}

impl<R: ScopedResource> ScopeGuard<R> {
    /// Begin a scope over an already-acquired resource.
    pub fn enter(resource: R) -> Self {
        ScopeGuard {
            resource: Some(resource),
        }
    }

    /// Borrow the guarded resource.
    pub fn handle(&self) -> &R {
        self.resource
            .as_ref()
            .expect("resource present until exit consumes the guard")
    }

    /// Mutably borrow the guarded resource.
    pub fn handle_mut(&mut self) -> &mut R {
        self.resource
            .as_mut()
            .expect("resource present until exit consumes the guard")
    }

    /// End the scope with the given outcome.
    ///
    /// On [`Outcome::Success`] the resource's finalize action runs first; a
    /// finalize error is reported and converts the exit into the
    /// compensating path. On [`Outcome::Failure`] the compensating action
    /// runs. Release runs last in both cases, and its errors are reported,
    /// not raised.
    pub fn exit(mut self, outcome: Outcome) {
        let cleanup = self.finish(outcome);
        cleanup.emit();
    }

    /// Run the exit sequence once, collecting finalize/release errors.
    ///
    /// Empties the resource slot first so a second call (for instance from
    /// `Drop` after `exit`) is a no-op.
    fn finish(&mut self, outcome: Outcome) -> Cleanup<R::Error> {
        let mut resource = match self.resource.take() {
            Some(resource) => resource,
            None => return Cleanup::none(),
        };

        let mut cleanup = Cleanup::none();
        let outcome = match outcome {
            Outcome::Success => match resource.finalize() {
                Ok(()) => Outcome::Success,
                Err(err) => {
                    cleanup.finalize = Some(err);
                    Outcome::Failure
                }
            },
            Outcome::Failure => Outcome::Failure,
        };

        if outcome == Outcome::Failure {
            // Best-effort: compensation errors are reported, never raised.
            if let Err(err) = resource.compensate() {
                #[cfg(feature = "tracing")]
                tracing::warn!("scope compensation failed: {:?}", err);
                #[cfg(not(feature = "tracing"))]
                eprintln!("scope compensation failed: {:?}", err);
            }
        }

        if let Err(err) = resource.release() {
            cleanup.release = Some(err);
        }
        cleanup
    }
}

impl<R: ScopedResource> Drop for ScopeGuard<R> {
    fn drop(&mut self) {
        let cleanup = self.finish(Outcome::Failure);
        cleanup.emit();
    }
}

// ============================================================================
// with_scope - closure API
// ============================================================================

/// Run a body inside a scope, acquiring on entry and releasing on exit.
///
/// The closure-based surface of the scope contract, for call sites without
/// a guard variable to drive:
///
/// 1. **Acquire**: `acquire` runs first. An error aborts before the scope
///    begins and propagates as [`ScopeError::Acquire`].
/// 2. **Body**: runs with `&mut R`. An `Err` exits the scope as a failure
///    and propagates as [`ScopeError::Body`]. A panic is caught, cleanup
///    runs, then the panic resumes.
/// 3. **Exit**: finalize on success (errors reported and converted to the
///    compensating path - the body's value is still returned), compensate
///    on failure, release always. Cleanup errors never mask the body's
///    error or panic; use [`with_scope_full`] to observe them instead.
///
/// # Example
///
/// ```rust
/// use weir::{with_scope, ScopeError, ScopedResource};
///
/// struct Lease {
///     held: bool,
/// }
///
/// impl ScopedResource for Lease {
///     type Error = String;
///
///     fn release(&mut self) -> Result<(), String> {
///         self.held = false;
///         Ok(())
///     }
/// }
///
/// let err = with_scope(
///     || Ok::<_, String>(Lease { held: true }),
///     |_lease| Err::<(), String>("body failed".to_string()),
/// )
/// .unwrap_err();
///
/// assert_eq!(err, ScopeError::Body("body failed".to_string()));
/// ```
pub fn with_scope<R, T, A, F>(acquire: A, body: F) -> Result<T, ScopeError<R::Error>>
where
    R: ScopedResource,
    A: FnOnce() -> Result<R, R::Error>,
    F: FnOnce(&mut R) -> Result<T, R::Error>,
{
    let resource = acquire().map_err(ScopeError::Acquire)?;
    let mut guard = ScopeGuard::enter(resource);

    let body_result = catch_unwind(AssertUnwindSafe(|| body(guard.handle_mut())));
    match body_result {
        Ok(Ok(value)) => {
            guard.exit(Outcome::Success);
            Ok(value)
        }
        Ok(Err(err)) => {
            guard.exit(Outcome::Failure);
            Err(ScopeError::Body(err))
        }
        Err(payload) => {
            guard.exit(Outcome::Failure);
            resume_unwind(payload)
        }
    }
}

/// Like [`with_scope`], but cleanup errors are returned instead of swallowed.
///
/// Finalize and release failures surface as [`ScopeError::Finalize`],
/// [`ScopeError::Release`], or [`ScopeError::Both`]. The lifecycle is
/// otherwise identical, including the panic path.
///
/// # Example
///
/// ```rust,ignore
/// match with_scope_full(|| open(), |r| work(r)) {
///     Ok(value) => println!("done: {:?}", value),
///     Err(ScopeError::Finalize(e)) => println!("commit failed: {:?}", e),
///     Err(ScopeError::Both { body, release }) => {
///         println!("body failed: {:?}; close also failed: {:?}", body, release);
///     }
///     Err(e) => println!("failed: {}", e),
/// }
/// ```
pub fn with_scope_full<R, T, A, F>(acquire: A, body: F) -> Result<T, ScopeError<R::Error>>
where
    R: ScopedResource,
    A: FnOnce() -> Result<R, R::Error>,
    F: FnOnce(&mut R) -> Result<T, R::Error>,
{
    let resource = acquire().map_err(ScopeError::Acquire)?;
    let mut guard = ScopeGuard::enter(resource);

    let body_result = catch_unwind(AssertUnwindSafe(|| body(guard.handle_mut())));
    match body_result {
        Ok(Ok(value)) => {
            let cleanup = guard.finish(Outcome::Success);
            match (cleanup.finalize, cleanup.release) {
                (None, None) => Ok(value),
                (Some(finalize), release) => {
                    if let Some(err) = release {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("scope release failed: {:?}", err);
                        #[cfg(not(feature = "tracing"))]
                        eprintln!("scope release failed: {:?}", err);
                    }
                    Err(ScopeError::Finalize(finalize))
                }
                (None, Some(release)) => Err(ScopeError::Release(release)),
            }
        }
        Ok(Err(body_err)) => {
            let cleanup = guard.finish(Outcome::Failure);
            match cleanup.release {
                Some(release) => Err(ScopeError::Both {
                    body: body_err,
                    release,
                }),
                None => Err(ScopeError::Body(body_err)),
            }
        }
        Err(payload) => {
            let cleanup = guard.finish(Outcome::Failure);
            cleanup.emit();
            resume_unwind(payload)
        }
    }
}

// ============================================================================
// Paired - two resources, LIFO release
// ============================================================================

/// Two resources managed as one, released in reverse order of acquisition.
///
/// The second resource plays the sub-handle role: it is acquired last,
/// finalized first, and released first. Both closes are attempted even if
/// the first of them fails.
#[derive(Debug)]
pub struct Paired<A, B> {
    first: A,
    second: B,
}

impl<A, B> Paired<A, B>
where
    A: ScopedResource,
    B: ScopedResource<Error = A::Error>,
{
    /// Acquire both resources in order.
    ///
    /// If the second acquisition fails, the first resource is released
    /// (errors reported) and the second's error propagates - the scope
    /// never begins with a half-acquired pair.
    pub fn acquire<FA, FB>(first: FA, second: FB) -> Result<Self, A::Error>
    where
        FA: FnOnce() -> Result<A, A::Error>,
        FB: FnOnce() -> Result<B, A::Error>,
    {
        let mut first = first()?;
        match second() {
            Ok(second) => Ok(Paired { first, second }),
            Err(err) => {
                if let Err(release_err) = first.release() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "release failed while unwinding a partial acquisition: {:?}",
                        release_err
                    );
                    #[cfg(not(feature = "tracing"))]
                    eprintln!(
                        "release failed while unwinding a partial acquisition: {:?}",
                        release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Borrow both resources.
    pub fn parts(&self) -> (&A, &B) {
        (&self.first, &self.second)
    }

    /// Mutably borrow both resources.
    pub fn parts_mut(&mut self) -> (&mut A, &mut B) {
        (&mut self.first, &mut self.second)
    }
}

impl<A, B> ScopedResource for Paired<A, B>
where
    A: ScopedResource,
    B: ScopedResource<Error = A::Error>,
{
    type Error = A::Error;

    fn finalize(&mut self) -> Result<(), Self::Error> {
        self.second.finalize()?;
        self.first.finalize()
    }

    fn compensate(&mut self) -> Result<(), Self::Error> {
        let second = self.second.compensate();
        let first = self.first.compensate();
        second.and(first)
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        // Attempt both closes; surface the sub-handle's error first.
        let second = self.second.release();
        let first = self.first.release();
        second?;
        first
    }
}

/// Run a body over two resources with LIFO release.
///
/// Convenience over [`Paired`] with a flat two-parameter body.
///
/// # Example
///
/// ```rust,ignore
/// let copied = with_scope2(
///     || open_source(&path),
///     || open_sink(&dest),
///     |source, sink| copy(source, sink),
/// )?;
/// ```
pub fn with_scope2<A, B, T, FA, FB, F>(
    acquire_first: FA,
    acquire_second: FB,
    body: F,
) -> Result<T, ScopeError<A::Error>>
where
    A: ScopedResource,
    B: ScopedResource<Error = A::Error>,
    FA: FnOnce() -> Result<A, A::Error>,
    FB: FnOnce() -> Result<B, A::Error>,
    F: FnOnce(&mut A, &mut B) -> Result<T, A::Error>,
{
    with_scope(
        || Paired::acquire(acquire_first, acquire_second),
        |pair| {
            let (first, second) = pair.parts_mut();
            body(first, second)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test resource that records every exit-phase call in order.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_finalize: bool,
        fail_release: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Recorder {
                name,
                log: log.clone(),
                fail_finalize: false,
                fail_release: false,
            }
        }

        fn failing_finalize(mut self) -> Self {
            self.fail_finalize = true;
            self
        }

        fn failing_release(mut self) -> Self {
            self.fail_release = true;
            self
        }

        fn record(&self, phase: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", phase, self.name));
        }
    }

    impl ScopedResource for Recorder {
        type Error = String;

        fn finalize(&mut self) -> Result<(), String> {
            self.record("finalize");
            if self.fail_finalize {
                return Err(format!("{} finalize failed", self.name));
            }
            Ok(())
        }

        fn compensate(&mut self) -> Result<(), String> {
            self.record("compensate");
            Ok(())
        }

        fn release(&mut self) -> Result<(), String> {
            self.record("release");
            if self.fail_release {
                return Err(format!("{} release failed", self.name));
            }
            Ok(())
        }
    }

    fn events(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn success_finalizes_then_releases() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope(
            || Ok(Recorder::new("db", &log)),
            |_r| Ok::<_, String>(42),
        );

        assert_eq!(result, Ok(42));
        assert_eq!(events(&log), vec!["finalize:db", "release:db"]);
    }

    #[test]
    fn body_error_compensates_then_releases() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope(
            || Ok(Recorder::new("db", &log)),
            |_r| Err::<i32, String>("bad value".to_string()),
        );

        assert_eq!(result, Err(ScopeError::Body("bad value".to_string())));
        assert_eq!(events(&log), vec!["compensate:db", "release:db"]);
    }

    #[test]
    fn acquire_error_runs_nothing() {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope(
            || Err::<Recorder, String>("refused".to_string()),
            |_r| Ok::<_, String>(()),
        );

        assert_eq!(result, Err(ScopeError::Acquire("refused".to_string())));
        assert!(events(&log).is_empty());
    }

    #[test]
    fn finalize_failure_triggers_compensation_and_returns_body_value() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope(
            || Ok(Recorder::new("db", &log).failing_finalize()),
            |_r| Ok::<_, String>("value"),
        );

        // The finalize error is reported, not raised; the body's value
        // comes back and the compensating path ran before release.
        assert_eq!(result, Ok("value"));
        assert_eq!(
            events(&log),
            vec!["finalize:db", "compensate:db", "release:db"]
        );
    }

    #[test]
    fn release_failure_does_not_mask_body_result() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope(
            || Ok(Recorder::new("db", &log).failing_release()),
            |_r| Ok::<_, String>(7),
        );

        assert_eq!(result, Ok(7));
        assert_eq!(events(&log), vec!["finalize:db", "release:db"]);
    }

    #[test]
    fn panicking_body_compensates_releases_and_resumes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_scope = log.clone();

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            let _ = with_scope(
                || Ok(Recorder::new("db", &log_for_scope)),
                |_r| -> Result<(), String> { panic!("boom") },
            );
        }));

        assert!(panicked.is_err(), "the original panic must reach the caller");
        assert_eq!(events(&log), vec!["compensate:db", "release:db"]);
    }

    #[test]
    fn guard_drop_without_exit_takes_the_failure_path() {
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let _guard = ScopeGuard::enter(Recorder::new("db", &log));
        }

        assert_eq!(events(&log), vec!["compensate:db", "release:db"]);
    }

    #[test]
    fn explicit_exit_releases_exactly_once() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let guard = ScopeGuard::enter(Recorder::new("db", &log));
        guard.exit(Outcome::Success);
        // exit consumed the guard and emptied its slot; the Drop that ran
        // at the end of exit was a no-op.

        let releases = events(&log)
            .iter()
            .filter(|e| e.starts_with("release"))
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn with_scope_full_surfaces_finalize_error() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope_full(
            || Ok(Recorder::new("db", &log).failing_finalize()),
            |_r| Ok::<_, String>(1),
        );

        assert_eq!(
            result,
            Err(ScopeError::Finalize("db finalize failed".to_string()))
        );
        assert_eq!(
            events(&log),
            vec!["finalize:db", "compensate:db", "release:db"]
        );
    }

    #[test]
    fn with_scope_full_surfaces_release_error() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope_full(
            || Ok(Recorder::new("db", &log).failing_release()),
            |_r| Ok::<_, String>(1),
        );

        assert_eq!(
            result,
            Err(ScopeError::Release("db release failed".to_string()))
        );
    }

    #[test]
    fn with_scope_full_pairs_body_and_release_errors() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = with_scope_full(
            || Ok(Recorder::new("db", &log).failing_release()),
            |_r| Err::<i32, String>("bad value".to_string()),
        );

        assert_eq!(
            result,
            Err(ScopeError::Both {
                body: "bad value".to_string(),
                release: "db release failed".to_string(),
            })
        );
    }

    #[test]
    fn paired_releases_in_lifo_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let conn_log = log.clone();
        let cursor_log = log.clone();

        let result = with_scope2(
            move || Ok(Recorder::new("conn", &conn_log)),
            move || Ok(Recorder::new("cursor", &cursor_log)),
            |_conn, _cursor| Ok::<_, String>(()),
        );

        assert!(result.is_ok());
        assert_eq!(
            events(&log),
            vec![
                "finalize:cursor",
                "finalize:conn",
                "release:cursor",
                "release:conn"
            ]
        );
    }

    #[test]
    fn paired_releases_first_when_second_acquire_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let conn_log = log.clone();

        let result = with_scope2(
            move || Ok(Recorder::new("conn", &conn_log)),
            || Err::<Recorder, String>("cursor refused".to_string()),
            |_conn, _cursor| Ok::<_, String>(()),
        );

        assert_eq!(result, Err(ScopeError::Acquire("cursor refused".to_string())));
        assert_eq!(events(&log), vec!["release:conn"]);
    }

    #[test]
    fn paired_attempts_both_closes_when_one_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let conn_log = log.clone();
        let cursor_log = log.clone();

        let result = with_scope(
            move || {
                Paired::acquire(
                    move || Ok(Recorder::new("conn", &conn_log)),
                    move || Ok(Recorder::new("cursor", &cursor_log).failing_release()),
                )
            },
            |_pair| Ok::<_, String>(()),
        );

        // The cursor close failure is reported, not raised, and the
        // connection is still closed after it.
        assert_eq!(result, Ok(()));
        let recorded = events(&log);
        assert!(recorded.contains(&"release:cursor".to_string()));
        assert!(recorded.contains(&"release:conn".to_string()));
    }
}
