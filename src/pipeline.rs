//! Query-time retrieval: resolve entry nodes, classify the intent, traverse
//! and render the context text.

use std::time::Instant;

use serde::Serialize;

use crate::config::{ResolverConfig, TraversalLimits};
use crate::context::ContextFormatter;
use crate::domain::DomainConfig;
use crate::graph::{GraphStore, Node, Subgraph};
use crate::intent::IntentClassifier;
use crate::resolve::EntryNodeResolver;
use crate::traversal::TraversalEngine;
use crate::Result;

/// Everything produced for one query.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub query: String,
    pub intent: String,
    pub entry_nodes: Vec<Node>,
    pub subgraph: Subgraph,
    pub context: String,
}

pub struct Pipeline<S> {
    resolver: EntryNodeResolver<S>,
    classifier: IntentClassifier,
    engine: TraversalEngine<S>,
    formatter: ContextFormatter,
}

impl<S: GraphStore + Clone> Pipeline<S> {
    pub fn new(store: S, domain: DomainConfig, resolver: ResolverConfig, limits: TraversalLimits) -> Self {
        let DomainConfig {
            registry,
            classifier,
            formatter,
        } = domain;
        Self {
            resolver: EntryNodeResolver::from_config(store.clone(), resolver),
            classifier,
            engine: TraversalEngine::new(store, registry, limits),
            formatter,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        self.retrieve_as(query, None).await
    }

    /// Retrieve using `intent` when given instead of classifying the query.
    pub async fn retrieve_as(&self, query: &str, intent: Option<&str>) -> Result<Retrieval> {
        let start = Instant::now();

        let entry_nodes = self.resolver.resolve(query).await?;
        let intent = intent.unwrap_or_else(|| self.classifier.classify(query)).to_string();
        let subgraph = self.engine.traverse(&entry_nodes, &intent).await?;
        let context = self.formatter.format(&subgraph);

        log::info!(
            "Retrieved context for intent '{}' in {:?}: {} entry nodes, {} nodes, {} relationships",
            intent,
            start.elapsed(),
            entry_nodes.len(),
            subgraph.nodes.len(),
            subgraph.relationships.len()
        );

        Ok(Retrieval {
            query: query.to_string(),
            intent,
            entry_nodes,
            subgraph,
            context,
        })
    }
}
