use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codenav",
    version,
    about = "Index, search, test and lint Python repositories",
    after_help = r#"Examples:
  codenav resolve https://github.com/owner/project
  codenav index --repo .
  codenav search Calculator --repo . --limit 5
  codenav test --repo . --pattern 'tests/test_*.py'
  codenav analyze --repo . --file-pattern 'src/**/*.py'
  codenav chat "find parse_config" --repo https://github.com/owner/project
  codenav tool --json '{"tool_name":"find_symbols","repo_path":".","params":{"query":"calc"}}'
  codenav mcp-serve --repo .
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse every source file and list functions and classes.
    Index {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Skip files ignored by .gitignore and .ignore.
        #[arg(long)]
        respect_gitignore: bool,
        /// Print every symbol instead of the preview.
        #[arg(long)]
        all: bool,
    },
    /// Find symbols whose name contains QUERY, ignoring case.
    Search {
        query: String,
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run the pytest suite under a time limit.
    Test {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Glob selecting test files.
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Lint with ruff under a time limit.
    Analyze {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Glob selecting files to lint.
        #[arg(long)]
        file_pattern: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Turn a GitHub URL or local path into a local directory, cloning if needed.
    Resolve { input: String },
    /// File counts per extension and total size.
    Info {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Route a free-text request to a tool.
    Chat {
        message: String,
        /// GitHub URL or local path.
        #[arg(long, default_value = ".")]
        repo: String,
    },
    /// Run one explicit tool invocation given as JSON.
    Tool {
        #[arg(long, conflicts_with = "json_file")]
        json: Option<String>,
        #[arg(long)]
        json_file: Option<PathBuf>,
    },
    /// Run an MCP server over stdin/stdout.
    McpServe {
        /// Repository used when a call omits repo_path.
        #[arg(long)]
        repo: Option<String>,
    },
}
