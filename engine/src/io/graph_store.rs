//! Graph file load/save helpers with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::registry::NodeRegistry;
use crate::core::wire::{GraphDescription, build_tree};
use crate::tree::Tree;

/// JSON Schema every graph file must satisfy, bundled at compile time.
pub const GRAPH_SCHEMA: &str = include_str!("../../schemas/graph/v1.schema.json");

/// Read and schema-validate a graph description.
pub fn read_graph(path: &Path) -> Result<GraphDescription> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read graph {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse graph {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate graph {}", path.display()))?;
    let graph: GraphDescription = serde_json::from_value(value)
        .with_context(|| format!("deserialize graph {}", path.display()))?;
    debug!(path = %path.display(), nodes = graph.nodes.len(), edges = graph.edges.len(), "graph loaded");
    Ok(graph)
}

/// Read a graph file and build it into a tree.
pub fn load_tree(path: &Path, registry: &NodeRegistry) -> Result<Tree> {
    let graph = read_graph(path)?;
    build_tree(&graph, registry).with_context(|| format!("build graph {}", path.display()))
}

/// Write a graph description as pretty JSON with a trailing newline.
pub fn write_graph(path: &Path, graph: &GraphDescription) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(graph).context("serialize graph")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write graph {}", path.display()))
}

fn validate_schema(graph: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(GRAPH_SCHEMA).context("parse bundled graph schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(graph) {
        let messages = compiled
            .iter_errors(graph)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "graph schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
