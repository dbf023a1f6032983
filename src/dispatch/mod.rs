//! The single entry point over resolver, indexer, search and sandbox.
//!
//! Two paths exist. Free text resolves the repository, then classifies the
//! message by keyword. Explicit invocations name a registered tool and pass
//! the repository path through untouched. Both always return a
//! [`DispatchResponse`].

use crate::config::Config;
use crate::error::{CoreError, ErrorPayload};
use crate::exec::ProcessExecutor;
use crate::model::{RepoStatus, ToolInvocation};
use crate::repo::RepoResolver;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

pub mod intent;
pub mod registry;

pub use intent::Intent;
pub use registry::{Tool, ToolOutput, ToolRegistry};

pub const CLONED_MESSAGE: &str = "Successfully cloned repository! Now you can ask: \
'index this repo', 'find functions', 'run tests', or 'analyze code'";

pub const HELP_MESSAGE: &str = "No general assistant is configured. Try: \
'index this repo', 'find <symbol>', 'run tests', or 'analyze code'";

/// Answers free text that matches no tool intent.
pub trait GeneralResponder: Send + Sync {
    fn respond(&self, message: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolUsed {
    None,
    Clone,
    IndexRepo,
    FindSymbols,
    RunTests,
    AnalyzeCode,
    Llm,
}

impl ToolUsed {
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            registry::INDEX_REPO => Some(ToolUsed::IndexRepo),
            registry::FIND_SYMBOLS => Some(ToolUsed::FindSymbols),
            registry::RUN_TESTS => Some(ToolUsed::RunTests),
            registry::ANALYZE_CODE => Some(ToolUsed::AnalyzeCode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    pub tool_used: ToolUsed,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl DispatchResponse {
    fn message(tool_used: ToolUsed, message: impl Into<String>) -> Self {
        Self {
            tool_used,
            message: message.into(),
            result: None,
            error: None,
        }
    }

    fn failure(tool_used: ToolUsed, prefix: &str, err: &CoreError) -> Self {
        Self {
            tool_used,
            message: format!("{prefix}: {err}"),
            result: None,
            error: Some(err.to_payload()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Dispatcher {
    resolver: RepoResolver,
    registry: ToolRegistry,
    responder: Option<Arc<dyn GeneralResponder>>,
}

impl Dispatcher {
    pub fn new(config: &Config, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            resolver: RepoResolver::new(config, executor.clone()),
            registry: ToolRegistry::standard(config, executor),
            responder: None,
        }
    }

    pub fn from_parts(resolver: RepoResolver, registry: ToolRegistry) -> Self {
        Self {
            resolver,
            registry,
            responder: None,
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn GeneralResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn resolver(&self) -> &RepoResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn dispatch_free_text(&self, message: &str, repo_input: &str) -> DispatchResponse {
        let handle = match self.resolver.resolve(repo_input) {
            Ok(handle) => handle,
            Err(err) => return DispatchResponse::failure(ToolUsed::None, "Repository error", &err),
        };
        // A fresh clone is reported on its own; the action waits for the next request.
        if handle.status == RepoStatus::Success {
            return DispatchResponse::message(ToolUsed::Clone, CLONED_MESSAGE);
        }

        let Some(intent) = intent::classify(message) else {
            return self.general_response(message);
        };
        tracing::debug!(?intent, repo = %handle.local_path.display(), "classified request");
        let mut params = Map::new();
        if intent == Intent::Search {
            params.insert(
                "query".to_string(),
                Value::String(intent::search_query(message)),
            );
        }
        self.run_tool(intent.tool_name(), &handle.local_path, &params)
    }

    pub fn dispatch_explicit(&self, invocation: &ToolInvocation) -> DispatchResponse {
        self.run_tool(
            &invocation.tool_name,
            Path::new(&invocation.repo_path),
            &invocation.params,
        )
    }

    fn run_tool(&self, name: &str, repo_path: &Path, params: &Map<String, Value>) -> DispatchResponse {
        let tool = match self.registry.get(name) {
            Ok(tool) => tool,
            Err(err) => return DispatchResponse::failure(ToolUsed::None, "Tool error", &err),
        };
        let tool_used = ToolUsed::from_tool_name(tool.name()).unwrap_or(ToolUsed::None);
        match tool.execute(repo_path, params) {
            Ok(output) => DispatchResponse {
                tool_used,
                message: output.summary,
                result: Some(output.value),
                error: output.error,
            },
            Err(err) => {
                tracing::warn!(tool = name, "tool failed: {err}");
                DispatchResponse::failure(tool_used, name, &err)
            }
        }
    }

    fn general_response(&self, message: &str) -> DispatchResponse {
        let Some(responder) = &self.responder else {
            return DispatchResponse::message(ToolUsed::None, HELP_MESSAGE);
        };
        match responder.respond(message) {
            Ok(answer) => DispatchResponse::message(ToolUsed::Llm, answer),
            Err(err) => DispatchResponse {
                tool_used: ToolUsed::Llm,
                message: format!("Assistant error: {err}"),
                result: None,
                error: Some(ErrorPayload {
                    kind: crate::error::ErrorKind::ExecutionFailed,
                    message: err.to_string(),
                }),
            },
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("resolver", &self.resolver)
            .field("registry", &self.registry)
            .field("responder", &self.responder.is_some())
            .finish()
    }
}
