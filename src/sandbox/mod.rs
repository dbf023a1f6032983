//! Running a repository's test suite and linter as child processes.
//!
//! Every run is bounded by a wall-clock limit and always yields a
//! [`ToolResult`]; failures are carried in the result rather than returned
//! as errors. Tools are started directly (no shell), with the repository as
//! working directory. The default pattern targets the repository root and
//! lets the tool discover files itself; custom patterns are expanded to
//! relative paths first.

use crate::config::Config;
use crate::error::CoreError;
use crate::exec::{CommandSpec, ExecError, ProcessExecutor, ProcessOutput};
use crate::indexer::scan::{self, ScanOptions};
use crate::model::{ToolMetrics, ToolProfile, ToolResult, ToolStatus};
use crate::util::truncate_chars;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub mod pytest;
pub mod ruff;

/// Upper bound on the bytes of expanded targets placed on one command line.
/// Larger expansions target the repository root instead.
pub const MAX_TARGET_BYTES: usize = 64 * 1024;

const REPO_ROOT_TARGET: &str = ".";

#[derive(Clone)]
pub struct ToolSandbox {
    executor: Arc<dyn ProcessExecutor>,
    pytest_program: String,
    ruff_program: String,
    test_pattern: String,
    analysis_pattern: String,
    test_timeout: Duration,
    analysis_timeout: Duration,
    violation_cap: usize,
    excerpt_chars: usize,
    ignore_dirs: Vec<String>,
}

impl ToolSandbox {
    pub fn new(config: &Config, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            executor,
            pytest_program: config.pytest_program.clone(),
            ruff_program: config.ruff_program.clone(),
            test_pattern: config.test_pattern.clone(),
            analysis_pattern: config.analysis_pattern.clone(),
            test_timeout: config.test_timeout(),
            analysis_timeout: config.analysis_timeout(),
            violation_cap: config.violation_cap,
            excerpt_chars: config.output_excerpt_chars,
            ignore_dirs: config.ignore_dirs.clone(),
        }
    }

    pub fn default_timeout(&self, profile: ToolProfile) -> Duration {
        match profile {
            ToolProfile::Test => self.test_timeout,
            ToolProfile::Analyze => self.analysis_timeout,
        }
    }

    /// Run the test suite under the configured limit.
    pub fn run_tests(&self, repo_path: &Path, pattern: Option<&str>) -> ToolResult {
        self.run(ToolProfile::Test, repo_path, &pattern_params("pattern", pattern), None)
    }

    /// Run the linter under the configured limit.
    pub fn analyze(&self, repo_path: &Path, file_pattern: Option<&str>) -> ToolResult {
        self.run(
            ToolProfile::Analyze,
            repo_path,
            &pattern_params("file_pattern", file_pattern),
            None,
        )
    }

    /// Run `profile` against `repo_path`. `params` may carry `pattern` or
    /// `file_pattern`; `timeout` falls back to the profile default.
    pub fn run(
        &self,
        profile: ToolProfile,
        repo_path: &Path,
        params: &Map<String, Value>,
        timeout: Option<Duration>,
    ) -> ToolResult {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout(profile));
        let tool = tool_name(profile);
        if !repo_path.is_dir() {
            return ToolResult::failed(&CoreError::NotFound(repo_path.display().to_string()));
        }

        let pattern = self.pattern_for(profile, params);
        let targets = match self.expand_targets(profile, repo_path, &pattern) {
            Ok(targets) => targets,
            Err(err) => return ToolResult::failed(&err),
        };
        let program = resolve_program(repo_path, self.program_for(profile));
        let args = match profile {
            ToolProfile::Test => pytest::args(targets),
            ToolProfile::Analyze => ruff::args(targets),
        };
        let spec = CommandSpec::new(program, timeout)
            .args(args)
            .current_dir(repo_path);
        tracing::info!(tool, repo = %repo_path.display(), pattern = %pattern, "running tool");

        let output = match self.executor.run(&spec) {
            Ok(output) => output,
            Err(err) => return self.exec_failure(profile, timeout, err),
        };
        self.evaluate(profile, &output)
    }

    fn evaluate(&self, profile: ToolProfile, output: &ProcessOutput) -> ToolResult {
        let (output_excerpt, truncated) = truncate_chars(&output.combined(), self.excerpt_chars);
        let metrics = match profile {
            ToolProfile::Test => pytest::metrics(output).map(ToolMetrics::Test),
            ToolProfile::Analyze => {
                ruff::metrics(output, self.violation_cap).map(ToolMetrics::Analysis)
            }
        };
        let duration_ms = output.duration.as_millis() as u64;
        match metrics {
            Ok(metrics) => {
                tracing::debug!(tool = tool_name(profile), exit_code = ?output.exit_code, duration_ms, "tool completed");
                ToolResult {
                    status: ToolStatus::Completed,
                    exit_code: output.exit_code,
                    output_excerpt,
                    truncated,
                    duration_ms,
                    metrics: Some(metrics),
                    error_kind: None,
                    message: None,
                }
            }
            Err(err) => {
                tracing::warn!(tool = tool_name(profile), "tool run failed: {err}");
                ToolResult {
                    status: ToolStatus::Error,
                    exit_code: output.exit_code,
                    output_excerpt,
                    truncated,
                    duration_ms,
                    metrics: None,
                    error_kind: Some(err.kind()),
                    message: Some(err.to_string()),
                }
            }
        }
    }

    fn exec_failure(&self, profile: ToolProfile, timeout: Duration, err: ExecError) -> ToolResult {
        let tool = tool_name(profile);
        match err {
            ExecError::NotFound { .. } => ToolResult::failed(&CoreError::ToolNotFound {
                tool: tool.to_string(),
                hint: install_hint(profile).to_string(),
            }),
            ExecError::TimedOut { stdout, stderr, .. } => {
                tracing::warn!(tool, limit_secs = timeout.as_secs(), "tool timed out");
                let partial = join_output(&stdout, &stderr);
                let (output_excerpt, truncated) = truncate_chars(&partial, self.excerpt_chars);
                ToolResult {
                    output_excerpt,
                    truncated,
                    duration_ms: timeout.as_millis() as u64,
                    ..ToolResult::failed(&CoreError::Timeout {
                        tool: tool.to_string(),
                        limit_secs: timeout.as_secs(),
                    })
                }
            }
            ExecError::Io { .. } => {
                ToolResult::failed(&CoreError::ExecutionFailed(format!("{tool}: {err}")))
            }
        }
    }

    fn pattern_for(&self, profile: ToolProfile, params: &Map<String, Value>) -> String {
        let (primary, secondary) = match profile {
            ToolProfile::Test => ("pattern", "file_pattern"),
            ToolProfile::Analyze => ("file_pattern", "pattern"),
        };
        let default = self.default_pattern(profile);
        [primary, secondary]
            .iter()
            .filter_map(|key| params.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    fn program_for(&self, profile: ToolProfile) -> &str {
        match profile {
            ToolProfile::Test => &self.pytest_program,
            ToolProfile::Analyze => &self.ruff_program,
        }
    }

    fn default_pattern(&self, profile: ToolProfile) -> &str {
        match profile {
            ToolProfile::Test => &self.test_pattern,
            ToolProfile::Analyze => &self.analysis_pattern,
        }
    }

    /// Relative paths matched by `pattern`. The repository root is targeted
    /// instead for the profile's default pattern, when nothing matches, and
    /// when the matches would overflow [`MAX_TARGET_BYTES`].
    fn expand_targets(
        &self,
        profile: ToolProfile,
        repo_path: &Path,
        pattern: &str,
    ) -> Result<Vec<OsString>, CoreError> {
        let root = || vec![OsString::from(REPO_ROOT_TARGET)];
        if pattern == self.default_pattern(profile) {
            return Ok(root());
        }
        let files = scan::expand_pattern(repo_path, pattern, &self.ignore_dirs, ScanOptions::default())
            .map_err(|err| CoreError::ExecutionFailed(format!("invalid file pattern {pattern:?}: {err}")))?;
        if files.is_empty() {
            tracing::debug!(pattern, "pattern matched nothing, targeting repository root");
            return Ok(root());
        }
        let bytes: usize = files.iter().map(|file| file.rel_path.len() + 1).sum();
        if bytes > MAX_TARGET_BYTES {
            tracing::debug!(pattern, matched = files.len(), bytes, "too many targets, targeting repository root");
            return Ok(root());
        }
        Ok(files.into_iter().map(|file| OsString::from(file.rel_path)).collect())
    }
}

impl std::fmt::Debug for ToolSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSandbox")
            .field("pytest_program", &self.pytest_program)
            .field("ruff_program", &self.ruff_program)
            .field("test_timeout", &self.test_timeout)
            .field("analysis_timeout", &self.analysis_timeout)
            .finish()
    }
}

pub fn tool_name(profile: ToolProfile) -> &'static str {
    match profile {
        ToolProfile::Test => pytest::TOOL,
        ToolProfile::Analyze => ruff::TOOL,
    }
}

pub fn install_hint(profile: ToolProfile) -> &'static str {
    match profile {
        ToolProfile::Test => pytest::INSTALL_HINT,
        ToolProfile::Analyze => ruff::INSTALL_HINT,
    }
}

/// Prefer an executable from the repository's own virtualenv.
/// Programs given as a path are used unchanged.
pub fn resolve_program(repo_root: &Path, program: &str) -> OsString {
    if program.contains('/') || program.contains('\\') {
        return OsString::from(program);
    }
    venv_candidates(repo_root, program)
        .into_iter()
        .find(|path| is_executable(path))
        .map(PathBuf::into_os_string)
        .unwrap_or_else(|| OsString::from(program))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn venv_candidates(repo_root: &Path, program: &str) -> [PathBuf; 4] {
    [
        repo_root.join(".venv").join("bin").join(program),
        repo_root.join("venv").join("bin").join(program),
        repo_root
            .join(".venv")
            .join("Scripts")
            .join(format!("{program}.exe")),
        repo_root
            .join("venv")
            .join("Scripts")
            .join(format!("{program}.exe")),
    ]
}

fn pattern_params(key: &str, pattern: Option<&str>) -> Map<String, Value> {
    let mut params = Map::new();
    if let Some(pattern) = pattern {
        params.insert(key.to_string(), Value::String(pattern.to_string()));
    }
    params
}

fn join_output(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venv_tool_wins_over_path_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        assert_eq!(resolve_program(root, "ruff"), OsString::from("ruff"));

        let bin = root.join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("ruff"), "").unwrap();
        make_executable(&bin.join("ruff"));
        assert_eq!(resolve_program(root, "ruff"), bin.join("ruff").into_os_string());
        assert_eq!(
            resolve_program(root, "/opt/tools/ruff"),
            OsString::from("/opt/tools/ruff")
        );
    }

    fn make_executable(path: &Path) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = path;
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_venv_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let scripts = root.join("venv").join("bin");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("pytest"), "#!/bin/sh\n").unwrap();
        assert_eq!(resolve_program(root, "pytest"), OsString::from("pytest"));

        make_executable(&scripts.join("pytest"));
        assert_eq!(resolve_program(root, "pytest"), scripts.join("pytest").into_os_string());
    }

    #[test]
    fn default_pattern_targets_repository_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("calc.py"), "x = 1\n").unwrap();
        let sandbox = ToolSandbox::new(&Config::default(), Arc::new(crate::exec::SystemExecutor));
        let default = Config::default().analysis_pattern;
        let targets = sandbox
            .expand_targets(ToolProfile::Analyze, dir.path(), &default)
            .unwrap();
        assert_eq!(targets, vec![OsString::from(".")]);
        let targets = sandbox
            .expand_targets(ToolProfile::Analyze, dir.path(), "*.py")
            .unwrap();
        assert_eq!(targets, vec![OsString::from("calc.py")]);
    }

    #[test]
    fn pattern_prefers_profile_key_then_default() {
        let sandbox = ToolSandbox::new(&Config::default(), Arc::new(crate::exec::SystemExecutor));
        let mut params = Map::new();
        assert_eq!(
            sandbox.pattern_for(ToolProfile::Test, &params),
            Config::default().test_pattern
        );
        params.insert("file_pattern".to_string(), Value::from("src/*.py"));
        assert_eq!(sandbox.pattern_for(ToolProfile::Analyze, &params), "src/*.py");
        assert_eq!(sandbox.pattern_for(ToolProfile::Test, &params), "src/*.py");
        params.insert("pattern".to_string(), Value::from("tests/test_a.py"));
        assert_eq!(sandbox.pattern_for(ToolProfile::Test, &params), "tests/test_a.py");
    }

    #[test]
    fn missing_repository_is_not_found() {
        let sandbox = ToolSandbox::new(&Config::default(), Arc::new(crate::exec::SystemExecutor));
        let result = sandbox.run_tests(Path::new("/definitely/not/here"), None);
        assert!(result.is_error());
        assert_eq!(result.error_kind, Some(crate::error::ErrorKind::NotFound));
    }
}
