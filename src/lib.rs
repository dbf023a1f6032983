pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod indexer;
pub mod mcp;
pub mod model;
pub mod repo;
pub mod sandbox;
pub mod search;
pub mod util;
