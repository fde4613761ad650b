//! Error taxonomy for the decision-tree core.
//!
//! Evaluation and construction errors propagate to the immediate caller.
//! Action faults are contained by the scheduler and reported, never re-thrown.

use thiserror::Error;

use crate::core::types::{Guid, NodeId, ValueType};

/// Errors raised while initialising, evaluating, cloning or editing a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("malformed tree: node {guid} has no {slot} set")]
    MalformedTree { guid: Guid, slot: String },
    #[error("type mismatch at node {guid}: expected {expected}, found {found}")]
    TypeMismatch {
        guid: Guid,
        expected: ValueType,
        found: ValueType,
    },
    #[error("node {guid} is a {found}, expected {expected}")]
    WrongCategory {
        guid: Guid,
        expected: String,
        found: String,
    },
    #[error("node {guid} has no port {port}")]
    UnknownPort { guid: Guid, port: String },
    #[error("cycle detected through node {guid}")]
    Cycle { guid: Guid },
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),
    #[error("tree '{name}' has not been initialised")]
    NotInitialised { name: String },
    #[error("tree '{name}' is already initialised")]
    AlreadyInitialised { name: String },
    #[error("function {guid} failed: {message}")]
    FunctionFailed { guid: Guid, message: String },
}

/// Errors raised while building a tree from a graph description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("graph has no Root node")]
    MissingRoot,
    #[error("graph has more than one Root node: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("node '{id}' has unknown kind '{kind}'")]
    UnknownKind { id: String, kind: String },
    #[error("node '{id}' has invalid args: {message}")]
    InvalidArgs { id: String, message: String },
    #[error("dangling edge ({edge}): {reason}")]
    DanglingEdge { edge: String, reason: String },
    #[error("port {port} of node '{id}' is already connected")]
    PortAlreadyConnected { id: String, port: String },
    #[error("slot {slot} of node '{id}' expects {expected}, but '{function_id}' outputs {found}")]
    SlotTypeMismatch {
        id: String,
        slot: String,
        function_id: String,
        expected: ValueType,
        found: ValueType,
    },
    #[error("required slot {slot} of node '{id}' is not connected")]
    UnresolvedRequiredSlot { id: String, slot: String },
    #[error("node '{id}' is owned by more than one parent")]
    SharedChild { id: String },
    #[error("cycle detected through node '{0}'")]
    Cycle(String),
}

/// A step function that raised, caught at the scheduler boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action {guid} ({title}) faulted: {message}")]
pub struct ActionFault {
    pub action: NodeId,
    pub guid: Guid,
    pub title: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_tree_names_guid_and_slot() {
        let err = TreeError::MalformedTree {
            guid: Guid::new("decide"),
            slot: "Condition".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed tree: node decide has no Condition set"
        );
    }

    #[test]
    fn multiple_roots_lists_ids() {
        let err = BuildError::MultipleRoots(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "graph has more than one Root node: a, b");
    }
}
