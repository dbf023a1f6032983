use crate::error::{CoreError, CoreResult};
use crate::exec::ProcessOutput;
use crate::model::TestMetrics;
use regex::Regex;
use std::ffi::OsString;
use std::sync::LazyLock;

pub const TOOL: &str = "pytest";
pub const INSTALL_HINT: &str = "pip install pytest";

/// all passed, some failed, nothing collected
const COMPLETED_EXIT_CODES: &[i32] = &[0, 1, 5];

static SUMMARY_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) (passed|failed)").expect("summary count regex")
});

pub fn args(targets: Vec<OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "--tb=short", "--color=no", "-p", "no:cacheprovider"]
        .iter()
        .map(OsString::from)
        .collect();
    args.extend(targets);
    args
}

pub fn metrics(output: &ProcessOutput) -> CoreResult<TestMetrics> {
    match output.exit_code {
        Some(code) if COMPLETED_EXIT_CODES.contains(&code) => {}
        Some(code) => {
            return Err(CoreError::ExecutionFailed(format!(
                "{TOOL} exited with code {code}{}",
                tail_suffix(output)
            )));
        }
        None => {
            return Err(CoreError::ExecutionFailed(format!(
                "{TOOL} terminated by signal{}",
                tail_suffix(output)
            )));
        }
    }
    let combined = output.combined();
    Ok(summary_counts(&combined).unwrap_or_else(|| marker_counts(&combined)))
}

/// Counts from the terminal summary line, e.g. `=== 1 failed, 3 passed in 0.20s ===`.
pub fn summary_counts(output: &str) -> Option<TestMetrics> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('=') && line.ends_with('=') && line.contains(" in "))?;
    let mut metrics = TestMetrics::default();
    let mut found = false;
    for caps in SUMMARY_COUNT.captures_iter(line) {
        let count: usize = caps[1].parse().unwrap_or(0);
        match &caps[2] {
            "passed" => metrics.passed = count,
            "failed" => metrics.failed = count,
            _ => continue,
        }
        found = true;
    }
    if !found && !line.contains("no tests ran") {
        return None;
    }
    metrics.total = metrics.passed + metrics.failed;
    Some(metrics)
}

/// Counts from verbose per-test lines, e.g. `tests/test_a.py::test_x PASSED [ 50%]`.
pub fn marker_counts(output: &str) -> TestMetrics {
    let mut metrics = TestMetrics::default();
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        let Some(test_id) = tokens.next() else {
            continue;
        };
        if !test_id.contains("::") {
            continue;
        }
        match tokens.next() {
            Some("PASSED") => metrics.passed += 1,
            Some("FAILED") => metrics.failed += 1,
            _ => {}
        }
    }
    metrics.total = metrics.passed + metrics.failed;
    metrics
}

fn tail_suffix(output: &ProcessOutput) -> String {
    let combined = output.combined();
    let tail: Vec<&str> = combined
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(3)
        .collect();
    if tail.is_empty() {
        String::new()
    } else {
        let lines: Vec<&str> = tail.into_iter().rev().collect();
        format!(": {}", lines.join(" | "))
    }
}
