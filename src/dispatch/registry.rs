use crate::config::Config;
use crate::error::{CoreError, CoreResult, ErrorPayload};
use crate::exec::ProcessExecutor;
use crate::indexer::SourceIndexer;
use crate::model::{ToolMetrics, ToolProfile, ToolResult};
use crate::sandbox::ToolSandbox;
use crate::search::SymbolSearch;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const INDEX_REPO: &str = "index_repo";
pub const FIND_SYMBOLS: &str = "find_symbols";
pub const RUN_TESTS: &str = "run_tests";
pub const ANALYZE_CODE: &str = "analyze_code";

/// What a tool produced: a one-line summary, the structured value, and the
/// failure when the value describes one.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub summary: String,
    pub value: Value,
    pub error: Option<ErrorPayload>,
}

/// A named capability reachable through the explicit dispatch path.
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the `params` object.
    fn input_schema(&self) -> Value;
    fn execute(&self, repo_path: &Path, params: &Map<String, Value>) -> CoreResult<ToolOutput>;
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IndexParams {}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchParams {
    /// Case-insensitive substring of the symbol name.
    pub query: String,
    /// Maximum number of matches (default 20).
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TestParams {
    /// Glob selecting test files (default `**/test*.py`).
    pub pattern: Option<String>,
    /// Wall-clock limit in seconds (default 60).
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalyzeParams {
    /// Glob selecting files to lint (default `**/*.py`).
    pub file_pattern: Option<String>,
    /// Wall-clock limit in seconds (default 30).
    pub timeout_secs: Option<u64>,
}

pub fn schema_value<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut raw = serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = raw.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties").or_insert_with(|| json!({}));
    }
    raw
}

fn parse_params<T: DeserializeOwned>(tool: &str, params: &Map<String, Value>) -> CoreResult<T> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|err| CoreError::ExecutionFailed(format!("invalid params for {tool}: {err}")))
}

fn to_value<T: serde::Serialize>(value: &T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|err| CoreError::ExecutionFailed(err.to_string()))
}

pub struct IndexRepoTool {
    indexer: SourceIndexer,
    preview: usize,
}

impl IndexRepoTool {
    pub fn new(indexer: SourceIndexer, preview: usize) -> Self {
        Self { indexer, preview }
    }
}

impl Tool for IndexRepoTool {
    fn name(&self) -> &'static str {
        INDEX_REPO
    }

    fn description(&self) -> &'static str {
        "Parse every Python file in the repository and list its functions and classes."
    }

    fn input_schema(&self) -> Value {
        schema_value::<IndexParams>()
    }

    fn execute(&self, repo_path: &Path, params: &Map<String, Value>) -> CoreResult<ToolOutput> {
        let _: IndexParams = parse_params(INDEX_REPO, params)?;
        let index = self.indexer.index(repo_path)?;
        let summary = format!(
            "Indexed {} files, found {} symbols",
            index.files_indexed, index.total_symbol_count
        );
        Ok(ToolOutput {
            summary,
            value: to_value(&index.preview(self.preview))?,
            error: None,
        })
    }
}

pub struct FindSymbolsTool {
    search: SymbolSearch,
}

impl FindSymbolsTool {
    pub fn new(search: SymbolSearch) -> Self {
        Self { search }
    }
}

impl Tool for FindSymbolsTool {
    fn name(&self) -> &'static str {
        FIND_SYMBOLS
    }

    fn description(&self) -> &'static str {
        "Find functions and classes whose name contains the query, ignoring case."
    }

    fn input_schema(&self) -> Value {
        schema_value::<SearchParams>()
    }

    fn execute(&self, repo_path: &Path, params: &Map<String, Value>) -> CoreResult<ToolOutput> {
        let params: SearchParams = parse_params(FIND_SYMBOLS, params)?;
        let matches = self.search.search(&params.query, repo_path, params.limit)?;
        let summary = format!("Found {} symbols matching '{}'", matches.len(), params.query);
        Ok(ToolOutput {
            summary,
            value: to_value(&matches)?,
            error: None,
        })
    }
}

/// Test and analysis runs share one shape; only the profile differs.
pub struct SandboxTool {
    sandbox: ToolSandbox,
    profile: ToolProfile,
}

impl SandboxTool {
    pub fn tests(sandbox: ToolSandbox) -> Self {
        Self {
            sandbox,
            profile: ToolProfile::Test,
        }
    }

    pub fn analysis(sandbox: ToolSandbox) -> Self {
        Self {
            sandbox,
            profile: ToolProfile::Analyze,
        }
    }
}

impl Tool for SandboxTool {
    fn name(&self) -> &'static str {
        match self.profile {
            ToolProfile::Test => RUN_TESTS,
            ToolProfile::Analyze => ANALYZE_CODE,
        }
    }

    fn description(&self) -> &'static str {
        match self.profile {
            ToolProfile::Test => "Run the repository's pytest suite under a time limit.",
            ToolProfile::Analyze => "Lint the repository with ruff under a time limit.",
        }
    }

    fn input_schema(&self) -> Value {
        match self.profile {
            ToolProfile::Test => schema_value::<TestParams>(),
            ToolProfile::Analyze => schema_value::<AnalyzeParams>(),
        }
    }

    fn execute(&self, repo_path: &Path, params: &Map<String, Value>) -> CoreResult<ToolOutput> {
        let timeout_secs = match self.profile {
            ToolProfile::Test => parse_params::<TestParams>(RUN_TESTS, params)?.timeout_secs,
            ToolProfile::Analyze => {
                parse_params::<AnalyzeParams>(ANALYZE_CODE, params)?.timeout_secs
            }
        };
        let result = self.sandbox.run(
            self.profile,
            repo_path,
            params,
            timeout_secs.map(Duration::from_secs),
        );
        Ok(ToolOutput {
            summary: summarize_run(self.profile, &result),
            value: to_value(&result)?,
            error: result.error_kind.map(|kind| ErrorPayload {
                kind,
                message: result.message.clone().unwrap_or_default(),
            }),
        })
    }
}

fn summarize_run(profile: ToolProfile, result: &ToolResult) -> String {
    if let Some(message) = &result.message {
        return message.clone();
    }
    match (&result.metrics, profile) {
        (Some(ToolMetrics::Test(m)), _) => {
            format!("Tests: {} passed, {} failed ({} total)", m.passed, m.failed, m.total)
        }
        (Some(ToolMetrics::Analysis(m)), _) => format!(
            "Analysis: {} violations ({} error, {} warning, {} info)",
            m.total_violations, m.summary.error, m.summary.warning, m.summary.info
        ),
        (None, ToolProfile::Test) => "Tests finished".to_string(),
        (None, ToolProfile::Analyze) => "Analysis finished".to_string(),
    }
}

/// Tools in registration order, looked up by name. Unknown names fail closed.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four repository tools wired to `config`.
    pub fn standard(config: &Config, executor: Arc<dyn ProcessExecutor>) -> Self {
        let indexer = SourceIndexer::new(config);
        let search = SymbolSearch::new(indexer.clone(), config);
        let sandbox = ToolSandbox::new(config, executor);
        let mut registry = Self::new();
        registry.register(Box::new(IndexRepoTool::new(indexer, config.symbol_preview)));
        registry.register(Box::new(FindSymbolsTool::new(search)));
        registry.register(Box::new(SandboxTool::tests(sandbox.clone())));
        registry.register(Box::new(SandboxTool::analysis(sandbox)));
        registry
    }

    /// Adds `tool`, replacing any tool already registered under its name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|existing| existing.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> CoreResult<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| tool.as_ref())
            .ok_or_else(|| CoreError::UnknownTool(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|tool| tool.as_ref())
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
