use crate::error::{CoreError, CoreResult};
use crate::exec::ProcessOutput;
use crate::model::{AnalysisMetrics, SeveritySummary, Violation};
use std::ffi::OsString;

pub const TOOL: &str = "ruff";
pub const INSTALL_HINT: &str = "pip install ruff";

/// no violations, violations found
const COMPLETED_EXIT_CODES: &[i32] = &[0, 1];

pub fn args(targets: Vec<OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["check", "--output-format=json", "--no-cache", "--exit-zero"]
        .iter()
        .map(OsString::from)
        .collect();
    args.extend(targets);
    args
}

pub fn metrics(output: &ProcessOutput, cap: usize) -> CoreResult<AnalysisMetrics> {
    match output.exit_code {
        Some(code) if COMPLETED_EXIT_CODES.contains(&code) => {}
        other => {
            let stderr = output.stderr.trim();
            let status = match other {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(CoreError::ExecutionFailed(if stderr.is_empty() {
                format!("{TOOL} {status}")
            } else {
                format!("{TOOL} {status}: {stderr}")
            }));
        }
    }
    let violations = parse_violations(&output.stdout)?;
    let summary = summarize(&violations);
    let total_violations = violations.len();
    let mut violations = violations;
    violations.truncate(cap);
    Ok(AnalysisMetrics {
        total_violations,
        violations,
        summary,
    })
}

pub fn parse_violations(stdout: &str) -> CoreResult<Vec<Violation>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|err| CoreError::AnalysisParseError(err.to_string()))
}

/// Severity buckets over every violation; unknown or missing severities count as warnings.
pub fn summarize(violations: &[Violation]) -> SeveritySummary {
    let mut summary = SeveritySummary::default();
    for violation in violations {
        let severity = violation
            .severity
            .as_deref()
            .map(|value| value.trim().to_ascii_lowercase());
        match severity.as_deref() {
            Some("error") => summary.error += 1,
            Some("info") => summary.info += 1,
            _ => summary.warning += 1,
        }
    }
    summary
}
