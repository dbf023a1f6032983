use crate::error::{CoreError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Local,
    AlreadyCloned,
    Success,
}

/// A repository that is guaranteed to exist on disk at `local_path`.
#[derive(Debug, Clone, Serialize)]
pub struct RepoHandle {
    pub source_uri: String,
    pub local_path: PathBuf,
    pub status: RepoStatus,
}

#[derive(Debug, Serialize, Clone)]
pub struct RepoInfo {
    pub path: PathBuf,
    pub total_files: usize,
    pub file_types: std::collections::BTreeMap<String, usize>,
    pub size_mb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexResult {
    pub files_indexed: usize,
    pub symbols: Vec<SymbolRecord>,
    pub total_symbol_count: usize,
}

impl IndexResult {
    /// Copy with at most `limit` symbols; the tallies still describe the full set.
    pub fn preview(&self, limit: usize) -> IndexResult {
        IndexResult {
            files_indexed: self.files_indexed,
            symbols: self.symbols.iter().take(limit).cloned().collect(),
            total_symbol_count: self.total_symbol_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolProfile {
    Test,
    Analyze,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestMetrics {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeveritySummary {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationLocation {
    pub row: i64,
    pub column: i64,
}

/// One linter finding, as emitted by `ruff --output-format=json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub location: Option<ViolationLocation>,
    #[serde(default, alias = "level")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisMetrics {
    pub total_violations: usize,
    pub violations: Vec<Violation>,
    pub summary: SeveritySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolMetrics {
    Test(TestMetrics),
    Analysis(AnalysisMetrics),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub exit_code: Option<i32>,
    pub output_excerpt: String,
    pub truncated: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ToolMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolResult {
    pub fn failed(err: &CoreError) -> Self {
        ToolResult {
            status: ToolStatus::Error,
            exit_code: None,
            output_excerpt: String::new(),
            truncated: false,
            duration_ms: 0,
            metrics: None,
            error_kind: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}

/// Explicit, non-free-text dispatch input.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocation {
    #[serde(alias = "tool")]
    pub tool_name: String,
    pub repo_path: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}
