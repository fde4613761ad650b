//! Graph builder: external node + edge lists to an in-memory tree.
//!
//! Port model:
//!
//! - `Root` exposes the output port `main`.
//! - Decisions take input `main` and expose outputs `TRUE` and `FALSE`.
//! - Actions take input `main`.
//! - Functions expose the multi-capacity output `Output`.
//! - Every dependency slot is an input port named after the slot.
//!
//! Input ports accept one edge each.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::BuildError;
use crate::core::invariants::{Violation, validate_invariants};
use crate::core::registry::{Args, NodeRegistry, RegistryError};
use crate::core::types::{ActionFlag, ActionFlags, Guid, NodeCategory, NodeId, Rect};
use crate::tree::{Link, Node, Port, Tree};

/// Input port name of decisions and actions.
pub const MAIN_PORT: &str = "main";
/// Output port name of functions.
pub const OUTPUT_PORT: &str = "Output";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default)]
    pub edges: Vec<EdgeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub args: serde_json::Map<String, serde_json::Value>,
    /// Action flags. Omitted means the kind's defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<ActionFlag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            args: serde_json::Map::new(),
            flags: None,
            title: None,
            position: None,
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    pub fn with_flags(mut self, flags: &[ActionFlag]) -> Self {
        self.flags = Some(flags.to_vec());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A typed edge from `output_id.output_port` into `input_id.input_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDescriptor {
    pub input_id: String,
    pub input_port: String,
    pub output_id: String,
    pub output_port: String,
}

impl EdgeDescriptor {
    pub fn new(
        output_id: impl Into<String>,
        output_port: impl Into<String>,
        input_id: impl Into<String>,
        input_port: impl Into<String>,
    ) -> Self {
        Self {
            input_id: input_id.into(),
            input_port: input_port.into(),
            output_id: output_id.into(),
            output_port: output_port.into(),
        }
    }
}

impl fmt::Display for EdgeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.output_id, self.output_port, self.input_id, self.input_port
        )
    }
}

/// Build a tree from `description`. Deterministic for a given input.
///
/// Node guids are the descriptor ids.
pub fn build_tree(
    description: &GraphDescription,
    registry: &NodeRegistry,
) -> Result<Tree, BuildError> {
    let ordered = root_first(description, registry)?;

    let mut nodes = Vec::with_capacity(ordered.len());
    let mut ids: HashMap<&str, NodeId> = HashMap::new();
    for descriptor in ordered {
        if ids.contains_key(descriptor.id.as_str()) {
            return Err(BuildError::DuplicateNode(descriptor.id.clone()));
        }
        ids.insert(&descriptor.id, NodeId(nodes.len()));
        nodes.push(instantiate(descriptor, registry)?);
    }

    for edge in &description.edges {
        connect(&mut nodes, &ids, edge)?;
    }

    for node in &nodes {
        if let Some(slot) = unresolved_slot(node) {
            return Err(BuildError::UnresolvedRequiredSlot {
                id: node.guid.to_string(),
                slot,
            });
        }
    }

    let tree = Tree::with_nodes(description.name.clone(), nodes);
    if let Some(violation) = validate_invariants(&tree).into_iter().next() {
        return Err(match violation {
            Violation::Cycle { guid } => BuildError::Cycle(guid.to_string()),
            Violation::SharedChild { guid, .. } => BuildError::SharedChild {
                id: guid.to_string(),
            },
            Violation::MissingLink { path, slot } => {
                BuildError::UnresolvedRequiredSlot { id: path, slot }
            }
        });
    }
    debug!(tree = %tree.name(), nodes = tree.len(), edges = description.edges.len(), "tree built");
    Ok(tree)
}

/// Descriptors with the single root moved to the front.
fn root_first<'a>(
    description: &'a GraphDescription,
    registry: &NodeRegistry,
) -> Result<Vec<&'a NodeDescriptor>, BuildError> {
    let is_root = |descriptor: &NodeDescriptor| {
        registry
            .get(&descriptor.kind)
            .is_some_and(|schema| schema.category() == NodeCategory::Root)
    };
    let roots: Vec<&NodeDescriptor> = description.nodes.iter().filter(|d| is_root(d)).collect();
    match roots.as_slice() {
        [] => Err(BuildError::MissingRoot),
        [root] => {
            let mut ordered = vec![*root];
            ordered.extend(description.nodes.iter().filter(|d| !is_root(d)));
            Ok(ordered)
        }
        many => Err(BuildError::MultipleRoots(
            many.iter().map(|d| d.id.clone()).collect(),
        )),
    }
}

fn instantiate(descriptor: &NodeDescriptor, registry: &NodeRegistry) -> Result<Node, BuildError> {
    let invalid = |message: String| BuildError::InvalidArgs {
        id: descriptor.id.clone(),
        message,
    };
    let mut node = registry
        .instantiate(&descriptor.kind, &Args::new(&descriptor.args))
        .map_err(|err| match err {
            RegistryError::UnknownKind(kind) => BuildError::UnknownKind {
                id: descriptor.id.clone(),
                kind,
            },
            RegistryError::InvalidArgs { source, .. } => invalid(source.to_string()),
            other => invalid(other.to_string()),
        })?
        .with_guid(Guid::new(descriptor.id.clone()));

    if let Some(names) = &descriptor.flags {
        if node.category() != NodeCategory::Action {
            return Err(invalid(format!(
                "flags only apply to actions, {} is a {}",
                descriptor.kind,
                node.category()
            )));
        }
        node = node.with_flags(ActionFlags::from_names(names));
    }
    if let Some(title) = &descriptor.title {
        node = node.with_title(title.clone());
    }
    if let Some(position) = descriptor.position {
        node = node.with_position(position);
    }
    Ok(node)
}

fn connect(
    nodes: &mut [Node],
    ids: &HashMap<&str, NodeId>,
    edge: &EdgeDescriptor,
) -> Result<(), BuildError> {
    let dangling = |reason: String| BuildError::DanglingEdge {
        edge: edge.to_string(),
        reason,
    };
    let lookup = |id: &str| {
        ids.get(id)
            .copied()
            .ok_or_else(|| dangling(format!("unknown node '{id}'")))
    };
    let output = lookup(&edge.output_id)?;
    let input = lookup(&edge.input_id)?;

    let port = match edge.output_port.as_str() {
        OUTPUT_PORT => None,
        name => Some(
            [Port::Child, Port::True, Port::False]
                .into_iter()
                .find(|port| port.name() == name)
                .ok_or_else(|| dangling(format!("unknown output port '{name}'")))?,
        ),
    };

    match port {
        Some(port) => {
            if !nodes[output.0].has_port(port) {
                return Err(dangling(format!(
                    "'{}' has no output port '{}'",
                    edge.output_id,
                    port.name()
                )));
            }
            let child = &nodes[input.0];
            if edge.input_port != MAIN_PORT
                || !matches!(
                    child.category(),
                    NodeCategory::Decision | NodeCategory::Action
                )
            {
                return Err(dangling(format!(
                    "'{}' has no input port '{}'",
                    edge.input_id, edge.input_port
                )));
            }
            if nodes[output.0].port_target(port).is_some() {
                return Err(BuildError::PortAlreadyConnected {
                    id: edge.output_id.clone(),
                    port: port.name().to_string(),
                });
            }
            let has_parent = nodes.iter().any(|node| {
                [Port::Child, Port::True, Port::False]
                    .into_iter()
                    .any(|p| node.port_target(p) == Some(input))
            });
            if has_parent {
                return Err(BuildError::PortAlreadyConnected {
                    id: edge.input_id.clone(),
                    port: MAIN_PORT.to_string(),
                });
            }
            nodes[output.0].set_link(Link::Port(port), Some(input));
        }
        None => {
            let Some(found) = nodes[output.0].output_type() else {
                return Err(dangling(format!(
                    "'{}' is not a function and has no port '{OUTPUT_PORT}'",
                    edge.output_id
                )));
            };
            let target = &nodes[input.0];
            let index = target.slot_index(&edge.input_port).ok_or_else(|| {
                dangling(format!(
                    "'{}' has no input port '{}'",
                    edge.input_id, edge.input_port
                ))
            })?;
            let slot = target.slots[index];
            if slot.target.is_some() {
                return Err(BuildError::PortAlreadyConnected {
                    id: edge.input_id.clone(),
                    port: edge.input_port.clone(),
                });
            }
            if slot.spec.value_type != found {
                return Err(BuildError::SlotTypeMismatch {
                    id: edge.input_id.clone(),
                    slot: edge.input_port.clone(),
                    function_id: edge.output_id.clone(),
                    expected: slot.spec.value_type,
                    found,
                });
            }
            nodes[input.0].set_link(Link::Slot(index), Some(output));
        }
    }
    Ok(())
}

/// First structural port or required slot left unset.
fn unresolved_slot(node: &Node) -> Option<String> {
    for port in [Port::Child, Port::True, Port::False] {
        if node.has_port(port) && node.port_target(port).is_none() {
            return Some(port.name().to_string());
        }
    }
    node.slot_specs()
        .find(|spec| spec.required && node.slot_target(spec.name).is_none())
        .map(|spec| spec.name.to_string())
}
