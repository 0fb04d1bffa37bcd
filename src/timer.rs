//! Wall-clock measurement of a scope.
//!
//! [`TimedScope`] measures the time between scope entry and scope exit and
//! reports it the moment the measurement ends - on every exit path,
//! including panics. Only the body is timed: the end mark is captured
//! first, then the report is emitted, with nothing in between.
//!
//! Two surfaces, same contract:
//!
//! - Direct: [`TimedScope::start`] then [`TimedScope::stop`], with a `Drop`
//!   backstop for early exits.
//! - Closure: [`timed`], which drives the timer through [`ScopeGuard`].

use std::time::{Duration, Instant};

use crate::scope::{Outcome, ScopeGuard, ScopedResource};

/// A running measurement of the enclosing scope.
///
/// The start mark is captured at construction (`start`), the end mark at
/// the first of `mark`, `stop`, or drop. Once marked, the measurement is
/// fixed; later readings return the same duration. `stop` consumes the
/// value, so a stopped timer cannot be restarted.
///
/// Marks are monotonic (`Instant`), so the measured duration is never
/// negative.
///
/// # Example
///
/// ```rust
/// use weir::TimedScope;
///
/// let timer = TimedScope::start("load");
/// let elapsed = timer.stop();
/// assert!(elapsed >= std::time::Duration::ZERO);
/// ```
#[derive(Debug)]
pub struct TimedScope {
    label: String,
    started: Instant,
    end: Option<Instant>,
    reported: bool,
}

impl TimedScope {
    /// Begin timing. The start mark is captured here.
    pub fn start(label: impl Into<String>) -> Self {
        TimedScope {
            label: label.into(),
            started: Instant::now(),
            end: None,
            reported: false,
        }
    }

    /// The label this measurement reports under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the end mark has been captured.
    pub fn is_stopped(&self) -> bool {
        self.end.is_some()
    }

    /// Current reading: time from the start mark to the end mark, or to
    /// now if the scope is still running.
    pub fn elapsed(&self) -> Duration {
        let end = self.end.unwrap_or_else(Instant::now);
        end.saturating_duration_since(self.started)
    }

    /// Capture the end mark. The first call fixes the measurement; later
    /// calls return the same duration.
    pub fn mark(&mut self) -> Duration {
        if self.end.is_none() {
            self.end = Some(Instant::now());
        }
        self.elapsed()
    }

    /// End the measurement: capture the end mark, report immediately, and
    /// return the measured duration.
    pub fn stop(mut self) -> Duration {
        let measured = self.mark();
        self.report();
        measured
    }

    /// Emit the measurement once.
    fn report(&mut self) {
        if self.reported {
            return;
        }
        self.reported = true;
        let elapsed = self.elapsed();
        #[cfg(feature = "tracing")]
        tracing::info!(scope = %self.label, ?elapsed, "scope finished");
        #[cfg(not(feature = "tracing"))]
        eprintln!("scope {:?} finished in {:?}", self.label, elapsed);
    }
}

impl Drop for TimedScope {
    fn drop(&mut self) {
        // Early return or panic: the measurement still gets reported.
        self.report();
    }
}

impl ScopedResource for TimedScope {
    type Error = std::convert::Infallible;

    fn release(&mut self) -> Result<(), Self::Error> {
        self.mark();
        self.report();
        Ok(())
    }
}

/// Time a body inside a scope and return its value with the measurement.
///
/// Driven through [`ScopeGuard`]: the end mark is captured as soon as the
/// body returns, before the guard exits, so only the body is measured. If
/// the body panics, the guard's failure path still reports the measurement
/// before the panic resumes.
///
/// # Example
///
/// ```rust
/// use weir::timed;
///
/// let (sum, elapsed) = timed("sum", || (1..=100).sum::<i32>());
/// assert_eq!(sum, 5050);
/// assert!(elapsed >= std::time::Duration::ZERO);
/// ```
pub fn timed<T, F>(label: impl Into<String>, body: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let mut guard = ScopeGuard::enter(TimedScope::start(label));
    let value = body();
    let measured = guard.handle_mut().mark();
    guard.exit(Outcome::Success);
    (value, measured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn stop_returns_a_measurement() {
        let timer = TimedScope::start("empty");
        let elapsed = timer.stop();
        // An empty scope measures small; a second is already generous.
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn mark_fixes_the_measurement() {
        let mut timer = TimedScope::start("fixed");
        let first = timer.mark();
        std::thread::sleep(Duration::from_millis(5));
        let second = timer.mark();
        assert_eq!(first, second);
        assert!(timer.is_stopped());
    }

    #[test]
    fn elapsed_is_monotonic_while_running() {
        let timer = TimedScope::start("running");
        let first = timer.elapsed();
        let second = timer.elapsed();
        assert!(second >= first);
    }

    #[test]
    fn timed_returns_the_body_value() {
        let (value, elapsed) = timed("double", || 21 * 2);
        assert_eq!(value, 42);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn timed_measurement_excludes_work_after_the_body() {
        let (_, elapsed) = timed("nap", || std::thread::sleep(Duration::from_millis(10)));
        assert!(elapsed >= Duration::from_millis(10));
    }

    #[test]
    fn panicking_body_still_resumes_to_the_caller() {
        let panicked = catch_unwind(AssertUnwindSafe(|| {
            let _ = timed("boom", || panic!("boom"));
        }));
        assert!(panicked.is_err());
    }

    #[test]
    fn label_is_preserved() {
        let timer = TimedScope::start("ingest");
        assert_eq!(timer.label(), "ingest");
        timer.stop();
    }

    #[cfg(feature = "tracing")]
    mod reporting {
        use super::super::*;
        use tracing_test::traced_test;

        #[traced_test]
        #[test]
        fn stop_reports_immediately() {
            TimedScope::start("traced").stop();
            assert!(logs_contain("scope finished"));
        }

        #[traced_test]
        #[test]
        fn drop_reports_unstopped_timers() {
            drop(TimedScope::start("dropped"));
            assert!(logs_contain("scope finished"));
        }
    }
}
