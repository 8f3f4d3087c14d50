pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod resolve;
pub mod traversal;
pub mod intent;
pub mod context;
pub mod domain;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{KgragError, Result};
pub use graph::{Edge, EdgeRow, GraphStore, Node, SqliteGraphStore, StrategyKind, Subgraph};
pub use pipeline::{Pipeline, Retrieval};
pub use resolve::EntryNodeResolver;
pub use traversal::TraversalEngine;
