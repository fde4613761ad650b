//! Structural invariants of a tree reachable from its root.
//!
//! The graph builder rejects descriptions that break these; trees edited
//! through the API are checked on demand before an agent adopts them.

use std::collections::HashMap;
use std::fmt;

use crate::core::error::TreeError;
use crate::core::path::node_path;
use crate::core::types::{Guid, NodeId};
use crate::tree::{Port, Tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A structural port or required dependency slot is unset.
    MissingLink { path: String, slot: String },
    /// A decision or action has more than one structural parent.
    SharedChild { path: String, guid: Guid },
    /// A link leads back onto the path that reached it.
    Cycle { guid: Guid },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingLink { path, slot } => write!(f, "{path}: {slot} is not connected"),
            Violation::SharedChild { path, .. } => {
                write!(f, "{path}: owned by more than one parent")
            }
            Violation::Cycle { guid } => write!(f, "cycle through node {guid}"),
        }
    }
}

/// Check invariants over every node reachable from the root.
///
/// A cycle stops the check early, since nothing past it has a stable path.
pub fn validate_invariants(tree: &Tree) -> Vec<Violation> {
    let order = match tree.reachable() {
        Ok(order) => order,
        Err(TreeError::Cycle { guid }) => return vec![Violation::Cycle { guid }],
        Err(_) => return Vec::new(),
    };

    let mut violations = Vec::new();
    let mut parents: HashMap<NodeId, usize> = HashMap::new();
    for id in &order {
        let Ok(node) = tree.node(*id) else {
            continue;
        };
        let path = || node_path(tree, *id).unwrap_or_else(|| node.guid().to_string());

        for port in [Port::Child, Port::True, Port::False] {
            if !node.has_port(port) {
                continue;
            }
            match node.port_target(port) {
                Some(child) => *parents.entry(child).or_default() += 1,
                None => violations.push(Violation::MissingLink {
                    path: path(),
                    slot: port.name().to_string(),
                }),
            }
        }
        for spec in node.slot_specs() {
            if spec.required && node.slot_target(spec.name).is_none() {
                violations.push(Violation::MissingLink {
                    path: path(),
                    slot: spec.name.to_string(),
                });
            }
        }
    }

    for id in &order {
        if parents.get(id).copied().unwrap_or_default() > 1
            && let Ok(guid) = tree.guid(*id)
        {
            violations.push(Violation::SharedChild {
                path: node_path(tree, *id).unwrap_or_else(|| guid.to_string()),
                guid: guid.clone(),
            });
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;
    use crate::test_support::{condition_decision, constant, scripted_action};

    #[test]
    fn complete_tree_has_no_violations() {
        let mut tree = Tree::new("t");
        let (idle, _) = scripted_action("idle", 1);
        let idle = tree.insert(idle).expect("insert");
        tree.attach(tree.root(), Port::Child, idle).expect("attach");
        assert!(validate_invariants(&tree).is_empty());
    }

    #[test]
    fn reports_missing_branches_and_condition() {
        let mut tree = Tree::new("t");
        let decision = tree.insert(condition_decision()).expect("decision");
        tree.attach(tree.root(), Port::Child, decision).expect("attach");

        let slots: Vec<String> = validate_invariants(&tree)
            .into_iter()
            .filter_map(|violation| match violation {
                Violation::MissingLink { slot, .. } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots, vec!["TRUE", "FALSE", "Condition"]);
    }

    #[test]
    fn reports_shared_structural_child() {
        let mut tree = Tree::new("t");
        let decision = tree.insert(condition_decision()).expect("decision");
        let condition = tree.insert(constant(Value::Bool(true))).expect("c");
        let (leaf, _) = scripted_action("leaf", 1);
        let leaf = tree.insert(leaf).expect("leaf");
        tree.attach(tree.root(), Port::Child, decision).expect("root");
        tree.attach(decision, Port::True, leaf).expect("t");
        tree.attach(decision, Port::False, leaf).expect("f");
        tree.connect(decision, "Condition", condition).expect("c");

        let violations = validate_invariants(&tree);
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], Violation::SharedChild { .. }));
    }

    #[test]
    fn reports_cycle() {
        let mut tree = Tree::new("t");
        let decision = tree.insert(condition_decision()).expect("decision");
        tree.attach(tree.root(), Port::Child, decision).expect("root");
        tree.attach(decision, Port::True, decision).expect("loop");
        assert!(matches!(
            validate_invariants(&tree).as_slice(),
            [Violation::Cycle { .. }]
        ));
    }
}
