use crate::config::Config;
use crate::error::CoreResult;
use crate::indexer::SourceIndexer;
use crate::model::SymbolRecord;
use std::path::Path;

/// Name search over a freshly built index. Nothing is cached between calls,
/// so every search re-reads the tree.
#[derive(Debug, Clone)]
pub struct SymbolSearch {
    indexer: SourceIndexer,
    default_limit: usize,
}

impl SymbolSearch {
    pub fn new(indexer: SourceIndexer, config: &Config) -> Self {
        Self {
            indexer,
            default_limit: config.search_limit,
        }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn search(
        &self,
        query: &str,
        path: &Path,
        limit: Option<usize>,
    ) -> CoreResult<Vec<SymbolRecord>> {
        let index = self.indexer.index(path)?;
        let limit = limit.unwrap_or(self.default_limit);
        let matches = filter_symbols(index.symbols, query, limit);
        tracing::debug!(query, matches = matches.len(), "symbol search");
        Ok(matches)
    }
}

/// First `limit` symbols, in index order, whose name contains `query` ignoring case.
pub fn filter_symbols(symbols: Vec<SymbolRecord>, query: &str, limit: usize) -> Vec<SymbolRecord> {
    let needle = query.to_lowercase();
    symbols
        .into_iter()
        .filter(|symbol| symbol.name.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}
