//! Source indexing: walk a tree, parse each recognised file, collect definitions.
//!
//! The symbol order is part of the contract: files in traversal order (see
//! [`scan::scan_sources`]), and symbols within a file in pre-order. Two calls
//! over an unchanged tree produce identical sequences. Files that cannot be
//! read or parsed are skipped without failing the call. Only the configured
//! ignore directories are excluded; `.gitignore` rules apply only when asked
//! for through [`SourceIndexer::with_scan_options`].

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::model::{IndexResult, SymbolRecord};
use std::path::Path;
use std::time::Instant;

pub mod extract;
pub mod python;
pub mod scan;

use extract::Grammar;

#[derive(Debug, Clone)]
pub struct SourceIndexer {
    grammar: Grammar,
    extensions: Vec<String>,
    ignore_dirs: Vec<String>,
    scan_options: scan::ScanOptions,
}

impl SourceIndexer {
    pub fn new(config: &Config) -> Self {
        Self::with_grammar(config, python::grammar())
    }

    /// Index with `grammar`. The configured extensions win when present.
    pub fn with_grammar(config: &Config, grammar: Grammar) -> Self {
        let extensions = if config.source_extensions.is_empty() {
            grammar.extensions.iter().map(|ext| ext.to_string()).collect()
        } else {
            config.source_extensions.clone()
        };
        Self {
            grammar,
            extensions,
            ignore_dirs: config.ignore_dirs.clone(),
            scan_options: scan::ScanOptions::new(true),
        }
    }

    pub fn with_scan_options(mut self, scan_options: scan::ScanOptions) -> Self {
        self.scan_options = scan_options;
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn index(&self, path: &Path) -> CoreResult<IndexResult> {
        if !path.exists() {
            return Err(CoreError::NotFound(path.display().to_string()));
        }
        let started = Instant::now();
        let mut parser = self.grammar.parser().map_err(|err| {
            CoreError::ExecutionFailed(format!("load {} grammar: {err}", self.grammar.name))
        })?;

        let files = scan::scan_sources(path, &self.extensions, &self.ignore_dirs, self.scan_options);
        let mut files_indexed = 0usize;
        let mut skipped = 0usize;
        let mut symbols = Vec::new();
        for file in &files {
            let source = match std::fs::read(&file.abs_path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::debug!(path = %file.rel_path, "skipping unreadable file: {err}");
                    skipped += 1;
                    continue;
                }
            };
            let extracted = match extract::extract_symbols(&mut parser, &self.grammar, &source) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(path = %file.rel_path, "skipping file: {err}");
                    skipped += 1;
                    continue;
                }
            };
            files_indexed += 1;
            symbols.extend(extracted.into_iter().map(|symbol| SymbolRecord {
                name: symbol.name,
                kind: symbol.kind,
                file_path: file.rel_path.clone(),
                line: symbol.line,
            }));
        }

        tracing::info!(
            root = %path.display(),
            files_indexed,
            skipped,
            symbols = symbols.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexed repository"
        );
        Ok(IndexResult {
            files_indexed,
            total_symbol_count: symbols.len(),
            symbols,
        })
    }
}
