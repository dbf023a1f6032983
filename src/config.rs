// Configuration for codenav components.
// Built explicitly and passed into each component; environment overrides are opt-in.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Component configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding cloned remote repositories (CODENAV_CACHE_ROOT)
    pub cache_root: PathBuf,

    /// Wall-clock limit for a shallow clone (CODENAV_CLONE_TIMEOUT_SECS)
    pub clone_timeout_secs: u64,

    /// Wall-clock limit for a test run (CODENAV_TEST_TIMEOUT_SECS)
    pub test_timeout_secs: u64,

    /// Wall-clock limit for a lint run (CODENAV_ANALYSIS_TIMEOUT_SECS)
    pub analysis_timeout_secs: u64,

    /// Default number of search matches (CODENAV_SEARCH_LIMIT)
    pub search_limit: usize,

    /// Maximum violations returned from an analysis (CODENAV_VIOLATION_CAP)
    pub violation_cap: usize,

    /// Characters of tool output kept in a result (CODENAV_OUTPUT_EXCERPT_CHARS)
    pub output_excerpt_chars: usize,

    /// Symbols shown when an index is rendered for display (CODENAV_SYMBOL_PREVIEW)
    pub symbol_preview: usize,

    pub source_extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub test_pattern: String,
    pub analysis_pattern: String,

    /// Executable names or paths (CODENAV_GIT, CODENAV_PYTEST, CODENAV_RUFF)
    pub git_program: String,
    pub pytest_program: String,
    pub ruff_program: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: env::temp_dir().join("codenav_repos"),
            clone_timeout_secs: 120,
            test_timeout_secs: 60,
            analysis_timeout_secs: 30,
            search_limit: 20,
            violation_cap: 50,
            output_excerpt_chars: 2000,
            symbol_preview: 100,
            source_extensions: vec!["py".to_string()],
            ignore_dirs: ["venv", ".venv", ".git", "__pycache__", "node_modules"]
                .iter()
                .map(|dir| dir.to_string())
                .collect(),
            test_pattern: "**/test*.py".to_string(),
            analysis_pattern: "**/*.py".to_string(),
            git_program: "git".to_string(),
            pytest_program: "pytest".to_string(),
            ruff_program: "ruff".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Overlay values produced by `lookup` onto the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("CODENAV_CACHE_ROOT") {
            if !val.trim().is_empty() {
                config.cache_root = PathBuf::from(val.trim());
            }
        }
        override_parsed(&lookup, "CODENAV_CLONE_TIMEOUT_SECS", &mut config.clone_timeout_secs);
        override_parsed(&lookup, "CODENAV_TEST_TIMEOUT_SECS", &mut config.test_timeout_secs);
        override_parsed(
            &lookup,
            "CODENAV_ANALYSIS_TIMEOUT_SECS",
            &mut config.analysis_timeout_secs,
        );
        override_parsed(&lookup, "CODENAV_SEARCH_LIMIT", &mut config.search_limit);
        override_parsed(&lookup, "CODENAV_VIOLATION_CAP", &mut config.violation_cap);
        override_parsed(
            &lookup,
            "CODENAV_OUTPUT_EXCERPT_CHARS",
            &mut config.output_excerpt_chars,
        );
        override_parsed(&lookup, "CODENAV_SYMBOL_PREVIEW", &mut config.symbol_preview);
        override_program(&lookup, "CODENAV_GIT", &mut config.git_program);
        override_program(&lookup, "CODENAV_PYTEST", &mut config.pytest_program);
        override_program(&lookup, "CODENAV_RUFF", &mut config.ruff_program);

        config
    }

    pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = cache_root.into();
        self
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    let Some(val) = lookup(key) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!(
            "invalid {} value: {}, using default: {}",
            key,
            val,
            slot
        ),
    }
}

fn override_program<F>(lookup: &F, key: &str, slot: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(key) {
        let trimmed = val.trim();
        if !trimmed.is_empty() {
            *slot = trimmed.to_string();
        }
    }
}
