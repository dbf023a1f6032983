//! Turning a repository reference into a local directory.
//!
//! Remote references are cloned shallowly into the cache root under
//! `<repo-name>_<cache-key>`. An existing directory with that name is reused
//! as-is: no fetch, no freshness check. Two concurrent first-time resolves of
//! the same URL are not serialised against each other.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::exec::{CommandSpec, ExecError, ProcessExecutor};
use crate::model::{RepoHandle, RepoInfo, RepoStatus};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const REMOTE_PREFIXES: &[&str] = &["https://github.com/", "http://github.com/", "git@github.com:"];

const CACHE_KEY_LEN: usize = 8;

#[derive(Clone)]
pub struct RepoResolver {
    cache_root: PathBuf,
    git_program: String,
    clone_timeout: Duration,
    executor: Arc<dyn ProcessExecutor>,
}

impl RepoResolver {
    pub fn new(config: &Config, executor: Arc<dyn ProcessExecutor>) -> Self {
        // git runs with the cache root as its working directory, so a
        // relative root would nest the clone one level deeper.
        let cache_root = std::path::absolute(&config.cache_root)
            .unwrap_or_else(|_| config.cache_root.clone());
        Self {
            cache_root,
            git_program: config.git_program.clone(),
            clone_timeout: config.clone_timeout(),
            executor,
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn resolve(&self, input: &str) -> CoreResult<RepoHandle> {
        let input = input.trim();
        if is_remote(input) {
            self.resolve_remote(input)
        } else {
            resolve_local(input)
        }
    }

    /// Directory a remote URL is (or would be) cloned into.
    pub fn clone_target(&self, url: &str) -> CoreResult<PathBuf> {
        Ok(self.cache_root.join(clone_dir_name(url)?))
    }

    fn resolve_remote(&self, url: &str) -> CoreResult<RepoHandle> {
        let target = self.clone_target(url)?;
        if target.is_dir() {
            tracing::debug!(url, path = %target.display(), "repository already cloned");
            return Ok(RepoHandle {
                source_uri: url.to_string(),
                local_path: target,
                status: RepoStatus::AlreadyCloned,
            });
        }
        if target.exists() {
            return Err(CoreError::CloneFailed(format!(
                "{} exists and is not a directory",
                target.display()
            )));
        }
        std::fs::create_dir_all(&self.cache_root).map_err(|err| {
            CoreError::CloneFailed(format!(
                "create cache root {}: {err}",
                self.cache_root.display()
            ))
        })?;

        let spec = CommandSpec::new(&self.git_program, self.clone_timeout)
            .args(["clone", "--depth", "1"])
            .arg(url)
            .arg(&target)
            .current_dir(&self.cache_root);
        tracing::info!(url, path = %target.display(), "cloning repository");

        let output = match self.executor.run(&spec) {
            Ok(output) => output,
            Err(ExecError::TimedOut { stderr, .. }) => {
                discard_partial(&target);
                tracing::warn!(url, limit_secs = self.clone_timeout.as_secs(), "clone timed out");
                return Err(CoreError::CloneTimeout {
                    limit_secs: self.clone_timeout.as_secs(),
                    stderr,
                });
            }
            Err(ExecError::NotFound { program }) => {
                discard_partial(&target);
                return Err(CoreError::CloneFailed(format!(
                    "{program} not found on PATH"
                )));
            }
            Err(err) => {
                discard_partial(&target);
                return Err(CoreError::CloneFailed(err.to_string()));
            }
        };

        if !output.success() {
            discard_partial(&target);
            let stderr = output.stderr.trim();
            let detail = if stderr.is_empty() {
                match output.exit_code {
                    Some(code) => format!("git exited with code {code}"),
                    None => "git terminated by signal".to_string(),
                }
            } else {
                stderr.to_string()
            };
            tracing::warn!(url, "clone failed: {detail}");
            return Err(CoreError::CloneFailed(detail));
        }
        if !target.is_dir() {
            return Err(CoreError::CloneFailed(format!(
                "clone reported success but {} is missing",
                target.display()
            )));
        }

        tracing::info!(url, path = %target.display(), "cloned repository");
        Ok(RepoHandle {
            source_uri: url.to_string(),
            local_path: target,
            status: RepoStatus::Success,
        })
    }
}

impl std::fmt::Debug for RepoResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoResolver")
            .field("cache_root", &self.cache_root)
            .field("git_program", &self.git_program)
            .field("clone_timeout", &self.clone_timeout)
            .finish()
    }
}

fn resolve_local(input: &str) -> CoreResult<RepoHandle> {
    let path = PathBuf::from(input);
    if input.is_empty() || !path.exists() {
        return Err(CoreError::NotFound(input.to_string()));
    }
    Ok(RepoHandle {
        source_uri: input.to_string(),
        local_path: path,
        status: RepoStatus::Local,
    })
}

fn discard_partial(target: &Path) {
    if !target.exists() {
        return;
    }
    if let Err(err) = std::fs::remove_dir_all(target) {
        tracing::warn!(path = %target.display(), "could not remove partial clone: {err}");
    }
}

pub fn is_remote(input: &str) -> bool {
    REMOTE_PREFIXES
        .iter()
        .any(|prefix| input.trim().starts_with(prefix))
}

/// Trim, drop trailing slashes and a trailing `.git`.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

/// Short deterministic token derived from the normalised URL.
pub fn cache_key(url: &str) -> String {
    let normalized = normalize_url(url);
    let digest = blake3::hash(normalized.as_bytes());
    digest.to_hex().as_str()[..CACHE_KEY_LEN].to_string()
}

pub fn repo_name(url: &str) -> CoreResult<String> {
    let normalized = normalize_url(url);
    if normalized.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidUrl(url.to_string()));
    }
    let remainder = REMOTE_PREFIXES
        .iter()
        .find_map(|prefix| normalized.strip_prefix(prefix))
        .ok_or_else(|| CoreError::InvalidUrl(url.to_string()))?;
    let segments: Vec<&str> = remainder.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(CoreError::InvalidUrl(url.to_string()));
    }
    let name = segments[segments.len() - 1];
    if name == "." || name == ".." {
        return Err(CoreError::InvalidUrl(url.to_string()));
    }
    Ok(name.to_string())
}

pub fn clone_dir_name(url: &str) -> CoreResult<String> {
    Ok(format!("{}_{}", repo_name(url)?, cache_key(url)))
}

/// File counts per extension and total size, excluding `.git`.
pub fn repo_info(path: &Path) -> CoreResult<RepoInfo> {
    if !path.exists() {
        return Err(CoreError::NotFound(path.display().to_string()));
    }
    let walker = WalkBuilder::new(path)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    let mut file_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_files = 0usize;
    let mut total_bytes = 0u64;
    for entry in walker.flatten() {
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_else(|| "no_extension".to_string());
        *file_types.entry(ext).or_insert(0) += 1;
        total_files += 1;
        total_bytes += entry.metadata().map(|meta| meta.len()).unwrap_or(0);
    }

    Ok(RepoInfo {
        path: path.to_path_buf(),
        total_files,
        file_types,
        size_mb: total_bytes as f64 / (1024.0 * 1024.0),
    })
}
