use anyhow::{Context, Result, bail};
use clap::Parser;
use codenav::config::Config;
use codenav::dispatch::Dispatcher;
use codenav::exec::{ProcessExecutor, SystemExecutor};
use codenav::indexer::{SourceIndexer, scan::ScanOptions};
use codenav::model::{ToolInvocation, ToolProfile};
use codenav::repo::{self, RepoResolver};
use codenav::sandbox::ToolSandbox;
use codenav::search::SymbolSearch;
use codenav::{cli, mcp};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging() {
    // stdout carries results and MCP frames; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = cli::Args::parse();
    let config = Config::from_env();
    let executor: Arc<dyn ProcessExecutor> = Arc::new(SystemExecutor);

    match args.command {
        cli::Command::Index {
            repo,
            respect_gitignore,
            all,
        } => {
            let indexer =
                SourceIndexer::new(&config).with_scan_options(ScanOptions::new(!respect_gitignore));
            let index = indexer.index(&repo)?;
            if all {
                print_json(&index)
            } else {
                print_json(&index.preview(config.symbol_preview))
            }
        }
        cli::Command::Search { query, repo, limit } => {
            let search = SymbolSearch::new(SourceIndexer::new(&config), &config);
            print_json(&search.search(&query, &repo, limit)?)
        }
        cli::Command::Test {
            repo,
            pattern,
            timeout_secs,
        } => {
            let sandbox = ToolSandbox::new(&config, executor);
            let mut params = serde_json::Map::new();
            if let Some(pattern) = pattern {
                params.insert("pattern".to_string(), pattern.into());
            }
            let result = sandbox.run(
                ToolProfile::Test,
                &repo,
                &params,
                timeout_secs.map(Duration::from_secs),
            );
            print_json(&result)
        }
        cli::Command::Analyze {
            repo,
            file_pattern,
            timeout_secs,
        } => {
            let sandbox = ToolSandbox::new(&config, executor);
            let mut params = serde_json::Map::new();
            if let Some(file_pattern) = file_pattern {
                params.insert("file_pattern".to_string(), file_pattern.into());
            }
            let result = sandbox.run(
                ToolProfile::Analyze,
                &repo,
                &params,
                timeout_secs.map(Duration::from_secs),
            );
            print_json(&result)
        }
        cli::Command::Resolve { input } => {
            let resolver = RepoResolver::new(&config, executor);
            print_json(&resolver.resolve(&input)?)
        }
        cli::Command::Info { repo } => print_json(&repo::repo_info(&repo)?),
        cli::Command::Chat { message, repo } => {
            let dispatcher = Dispatcher::new(&config, executor);
            print_json(&dispatcher.dispatch_free_text(&message, &repo))
        }
        cli::Command::Tool { json, json_file } => {
            let raw = match (json, json_file) {
                (Some(raw), _) => raw,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?,
                (None, None) => bail!("tool requires --json or --json-file"),
            };
            let invocation: ToolInvocation =
                serde_json::from_str(&raw).context("parse tool invocation")?;
            let dispatcher = Dispatcher::new(&config, executor);
            print_json(&dispatcher.dispatch_explicit(&invocation))
        }
        cli::Command::McpServe { repo } => {
            let dispatcher = Dispatcher::new(&config, executor);
            mcp::serve(dispatcher, repo)
        }
    }
}
