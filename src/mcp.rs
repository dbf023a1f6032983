use crate::dispatch::{DispatchResponse, Dispatcher};
use crate::model::ToolInvocation;
use anyhow::Result;
use serde_json::{Map, Value, json};
use std::io::{self, BufRead, Write};

const PROTOCOL_VERSION: &str = "2024-11-05";
const REPO_ARG: &str = "repo_path";

struct State {
    dispatcher: Dispatcher,
    default_repo: Option<String>,
}

/// Serve MCP over stdio until stdin closes.
pub fn serve(dispatcher: Dispatcher, default_repo: Option<String>) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_lines(stdin.lock(), stdout.lock(), dispatcher, default_repo)
}

/// One JSON-RPC message per line in, one response per line out.
pub fn serve_lines<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    dispatcher: Dispatcher,
    default_repo: Option<String>,
) -> Result<()> {
    let state = State {
        dispatcher,
        default_repo,
    };
    for line in reader.lines() {
        let line = match line {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("stdin error: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(value) => handle_message(value, &state),
            Err(err) => Some(jsonrpc_error(
                Value::Null,
                -32700,
                &format!("parse error: {err}"),
            )),
        };

        if let Some(payload) = response {
            writeln!(writer, "{}", serde_json::to_string(&payload)?)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn handle_message(message: Value, state: &State) -> Option<Value> {
    let id = message.get("id").cloned();
    let method = message.get("method").and_then(|value| value.as_str());

    let Some(method) = method else {
        return id.map(|id| jsonrpc_error(id, -32600, "invalid request"));
    };

    match method {
        "initialize" => {
            let id = id?;
            Some(jsonrpc_result(id, initialize_result(&message)))
        }
        "notifications/initialized" => None,
        "ping" => id.map(|id| jsonrpc_result(id, json!({}))),
        "tools/list" => {
            let id = id?;
            Some(jsonrpc_result(id, json!({ "tools": tool_specs(&state.dispatcher) })))
        }
        "tools/call" => {
            let id = id?;
            Some(handle_tool_call(id, &message, state))
        }
        _ => id.map(|id| jsonrpc_error(id, -32601, "method not found")),
    }
}

fn initialize_result(message: &Value) -> Value {
    let protocol = message
        .get("params")
        .and_then(|params| params.get("protocolVersion"))
        .cloned()
        .unwrap_or_else(|| Value::String(PROTOCOL_VERSION.to_string()));
    json!({
        "protocolVersion": protocol,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": "codenav",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": "Start with index_repo to list a repository's functions and classes, \
then find_symbols {query, limit} to narrow down. run_tests {pattern, timeout_secs} runs pytest, \
analyze_code {file_pattern, timeout_secs} runs ruff. Every tool takes repo_path, a local directory.",
    })
}

/// One MCP tool per registry entry; `repo_path` is merged into each params schema.
fn tool_specs(dispatcher: &Dispatcher) -> Vec<Value> {
    dispatcher
        .registry()
        .tools()
        .map(|tool| {
            let mut schema = tool.input_schema();
            if let Some(props) = schema.get_mut("properties").and_then(Value::as_object_mut) {
                props.insert(
                    REPO_ARG.to_string(),
                    json!({
                        "type": "string",
                        "description": "Local repository directory."
                    }),
                );
            }
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "inputSchema": schema,
            })
        })
        .collect()
}

fn handle_tool_call(id: Value, message: &Value, state: &State) -> Value {
    let params = match message.get("params") {
        Some(value) => value,
        None => return jsonrpc_error(id, -32602, "missing params"),
    };
    let tool_name = params
        .get("name")
        .and_then(|value| value.as_str())
        .unwrap_or("");
    if state.dispatcher.registry().get(tool_name).is_err() {
        return jsonrpc_error(id, -32601, &format!("unknown tool: {tool_name}"));
    }

    let mut arguments = match params.get("arguments").cloned() {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(_) => return jsonrpc_error(id, -32602, "arguments must be an object"),
    };
    let repo_path = match arguments.remove(REPO_ARG) {
        Some(Value::String(path)) => path,
        _ => match &state.default_repo {
            Some(path) => path.clone(),
            None => return jsonrpc_error(id, -32602, "missing repo_path"),
        },
    };

    let invocation = ToolInvocation {
        tool_name: tool_name.to_string(),
        repo_path,
        params: arguments,
    };
    let response = state.dispatcher.dispatch_explicit(&invocation);
    jsonrpc_result(id, call_result(&response))
}

fn call_result(response: &DispatchResponse) -> Value {
    let structured = match &response.result {
        Some(Value::Array(items)) => json!({ "items": items }),
        Some(value) => value.clone(),
        None => json!({}),
    };
    let text = match &response.result {
        Some(value) if response.error.is_none() => format!(
            "{}\n{}",
            response.message,
            serde_json::to_string_pretty(value).unwrap_or_default()
        ),
        _ => response.message.clone(),
    };
    let mut payload = json!({
        "content": [{ "type": "text", "text": text }],
        "isError": response.is_error(),
    });
    if response.result.is_some() {
        payload["structuredContent"] = structured;
    }
    payload
}

fn jsonrpc_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn jsonrpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
