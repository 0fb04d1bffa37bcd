//! Timed Scopes
//!
//! Demonstrates the two surfaces of scope timing:
//! - the direct `TimedScope` value with its `Drop` backstop
//! - the `timed` closure helper driven through the generic guard
//!
//! Run with: cargo run --example timed_scopes

use std::time::Duration;

use weir::{timed, TimedScope};

/// Example 1: direct timer
///
/// Start, work, stop. The report is emitted the moment `stop` captures the
/// end mark.
fn example_direct_timer() {
    println!("\n=== Example 1: Direct Timer ===");

    let timer = TimedScope::start("nap");
    std::thread::sleep(Duration::from_millis(25));
    let elapsed = timer.stop();

    println!("  measured: {:?}", elapsed);
}

/// Example 2: closure timer
///
/// The body runs inside a scope guard; only the body is measured.
fn example_closure_timer() {
    println!("\n=== Example 2: Closure Timer ===");

    let (sum, elapsed) = timed("sum", || (1..=10_000u64).sum::<u64>());

    println!("  sum = {}, measured: {:?}", sum, elapsed);
}

/// Example 3: early exit still reports
///
/// An early `return` drops the timer, and the drop emits the report - the
/// measurement survives every exit path.
fn example_early_exit_still_reports() {
    println!("\n=== Example 3: Early Exit Still Reports ===");

    fn find_first_even(values: &[u32]) -> Option<u32> {
        let _timer = TimedScope::start("find_first_even");
        for &value in values {
            if value % 2 == 0 {
                return Some(value);
            }
        }
        None
    }

    let found = find_first_even(&[3, 5, 8, 9]);
    println!("  found: {:?}", found);
}

fn main() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    example_direct_timer();
    example_closure_timer();
    example_early_exit_still_reports();
}
