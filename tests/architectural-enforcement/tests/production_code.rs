//! Integration Test: Production Code Rules
//!
//! **Policy**: Production code in herald MUST NOT sleep or panic on errors.
//! **Exceptions**: test modules, deadline waits (`sleep_until`) and
//! `tokio::time::interval` ticks.

use architectural_enforcement::{find_violations, production_lines, report};

fn is_sleep(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

fn is_panicking_shortcut(code: &str) -> bool {
    code.contains(".unwrap()") || code.contains(".expect(")
}

/// Reconnect waits are deadlines owned by the channel task, never sleeps
#[test]
fn test_no_sleep_in_production_code() {
    report("No sleep in production code", &find_violations(is_sleep));
}

/// Errors propagate with `?`; transport and decode failures never panic
#[test]
fn test_no_unwrap_in_production_code() {
    report(
        "No unwrap()/expect() in production code",
        &find_violations(is_panicking_shortcut),
    );
}

/// Blocking thread sleeps would stall the runtime
#[test]
fn test_no_blocking_thread_sleep() {
    report(
        "No std::thread::sleep",
        &find_violations(|code| code.contains("thread::sleep")),
    );
}

#[test]
fn test_detectors() {
    let code = "async fn wait() {\n    tokio::time::sleep(d).await;\n    tokio::time::sleep_until(at).await;\n    let x = y.unwrap_or(0);\n    let z = w.unwrap();\n}\n";
    let lines = production_lines(code);

    let sleeps: Vec<_> = lines.iter().filter(|(_, l)| is_sleep(l)).map(|(n, _)| *n).collect();
    assert_eq!(sleeps, vec![2]);

    let unwraps: Vec<_> = lines
        .iter()
        .filter(|(_, l)| is_panicking_shortcut(l))
        .map(|(n, _)| *n)
        .collect();
    assert_eq!(unwraps, vec![5]);
}
