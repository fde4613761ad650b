//! Single-path evaluation: root to action, and lazy function invocation.

use tracing::trace;

use crate::core::behavior::ActionStep;
use crate::core::error::TreeError;
use crate::core::types::{Guid, NodeCategory, NodeId, Value, ValueType};
use crate::tree::{Node, NodeKind, Port, Tree, wrong_category};

/// Follow decisions from `start` until an action is reached.
///
/// Each decision evaluates its rule exactly once. Both branches of every
/// traversed decision must be set, so a missing branch fails regardless of
/// which way the condition points.
pub fn make_decision(tree: &Tree, start: NodeId) -> Result<NodeId, TreeError> {
    let mut current = start;
    // A well-formed path visits each node at most once.
    for _ in 0..=tree.len() {
        let node = tree.node(current)?;
        match &node.kind {
            NodeKind::Action { .. } => {
                trace!(tree = %tree.name(), action = %node.guid, "action selected");
                return Ok(current);
            }
            NodeKind::Root { child } => {
                current = child.ok_or_else(|| missing(node, Port::Child.name()))?;
            }
            NodeKind::Decision {
                true_node,
                false_node,
                rule,
            } => {
                let on_true = true_node.ok_or_else(|| missing(node, Port::True.name()))?;
                let on_false = false_node.ok_or_else(|| missing(node, Port::False.name()))?;
                let take_true = rule.branch(&Inputs::new(tree, current, 0))?;
                trace!(decision = %node.guid, take_true, "branch chosen");
                current = if take_true { on_true } else { on_false };
            }
            NodeKind::Function { .. } => {
                return Err(TreeError::WrongCategory {
                    guid: node.guid.clone(),
                    expected: "decision or action".to_string(),
                    found: NodeCategory::Function.to_string(),
                });
            }
        }
    }
    Err(TreeError::Cycle {
        guid: tree.guid(current)?.clone(),
    })
}

/// Invoke a function node. `depth` bounds dependency recursion.
pub fn invoke(tree: &Tree, id: NodeId, depth: usize) -> Result<Value, TreeError> {
    let node = tree.node(id)?;
    if depth > tree.len() {
        return Err(TreeError::Cycle {
            guid: node.guid.clone(),
        });
    }
    match &node.kind {
        NodeKind::Function { output, behavior } => {
            let value = behavior.invoke(&Inputs::new(tree, id, depth))?;
            if value.value_type() != *output {
                return Err(TreeError::TypeMismatch {
                    guid: node.guid.clone(),
                    expected: *output,
                    found: value.value_type(),
                });
            }
            Ok(value)
        }
        _ => Err(wrong_category(node, NodeCategory::Function)),
    }
}

/// Start a fresh step sequence for an action node.
pub fn start_action(tree: &Tree, id: NodeId) -> anyhow::Result<Box<dyn ActionStep>> {
    let node = tree.node(id)?;
    match &node.kind {
        NodeKind::Action { behavior, .. } => behavior.execute(&Inputs::new(tree, id, 0)),
        _ => Err(wrong_category(node, NodeCategory::Action).into()),
    }
}

fn missing(node: &Node, slot: &str) -> TreeError {
    TreeError::MalformedTree {
        guid: node.guid.clone(),
        slot: slot.to_string(),
    }
}

/// Read access to a node's dependency slots during evaluation.
///
/// Values are computed on demand, so a gate can skip an input it does not
/// need.
pub struct Inputs<'a> {
    tree: &'a Tree,
    node: NodeId,
    depth: usize,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(tree: &'a Tree, node: NodeId, depth: usize) -> Self {
        Self { tree, node, depth }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn guid(&self) -> &'a Guid {
        &self.tree.nodes[self.node.0].guid
    }

    /// Whether `slot` is wired to a function.
    pub fn is_connected(&self, slot: &str) -> bool {
        self.tree.nodes[self.node.0].slot_target(slot).is_some()
    }

    /// Evaluate a required slot.
    pub fn value(&self, slot: &str) -> Result<Value, TreeError> {
        self.optional(slot)?.ok_or_else(|| TreeError::MalformedTree {
            guid: self.guid().clone(),
            slot: slot.to_string(),
        })
    }

    /// Evaluate a slot that may be left unconnected.
    pub fn optional(&self, slot: &str) -> Result<Option<Value>, TreeError> {
        let node = &self.tree.nodes[self.node.0];
        let index = node.slot_index(slot).ok_or_else(|| TreeError::UnknownPort {
            guid: node.guid.clone(),
            port: slot.to_string(),
        })?;
        match node.slots[index].target {
            Some(target) => invoke(self.tree, target, self.depth + 1).map(Some),
            None => Ok(None),
        }
    }

    pub fn bool(&self, slot: &str) -> Result<bool, TreeError> {
        let value = self.value(slot)?;
        value.as_bool().ok_or_else(|| self.mismatch(ValueType::Bool, &value))
    }

    pub fn number(&self, slot: &str) -> Result<f64, TreeError> {
        let value = self.value(slot)?;
        value
            .as_number()
            .ok_or_else(|| self.mismatch(ValueType::Number, &value))
    }

    pub fn text(&self, slot: &str) -> Result<String, TreeError> {
        match self.value(slot)? {
            Value::Text(text) => Ok(text),
            other => Err(self.mismatch(ValueType::Text, &other)),
        }
    }

    fn mismatch(&self, expected: ValueType, found: &Value) -> TreeError {
        TreeError::TypeMismatch {
            guid: self.guid().clone(),
            expected,
            found: found.value_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        Switch, condition_decision, constant, scripted_action, switch_condition,
    };

    fn decision_tree(switch: &Switch) -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new("t");
        let decision = tree.insert(condition_decision()).expect("decision");
        let condition = tree.insert(switch_condition(switch)).expect("condition");
        let (on_true, _) = scripted_action("attack", 1);
        let (on_false, _) = scripted_action("wander", 1);
        let on_true = tree.insert(on_true).expect("true");
        let on_false = tree.insert(on_false).expect("false");
        tree.attach(tree.root(), Port::Child, decision).expect("root");
        tree.attach(decision, Port::True, on_true).expect("true");
        tree.attach(decision, Port::False, on_false).expect("false");
        tree.connect(decision, "Condition", condition).expect("condition");
        tree.initialise(&()).expect("init");
        (tree, on_true, on_false)
    }

    #[test]
    fn decision_follows_condition() {
        let switch = Switch::new(true);
        let (tree, on_true, on_false) = decision_tree(&switch);
        assert_eq!(tree.run().expect("run"), on_true);
        switch.set(false);
        assert_eq!(tree.run().expect("run"), on_false);
    }

    #[test]
    fn condition_is_evaluated_once_per_run() {
        let switch = Switch::new(true);
        let (tree, _, _) = decision_tree(&switch);
        tree.run().expect("run");
        tree.run().expect("run");
        assert_eq!(switch.reads(), 2);
    }

    #[test]
    fn missing_condition_is_malformed() {
        let switch = Switch::new(true);
        let (mut tree, _, _) = decision_tree(&switch);
        let decision = tree.children(tree.root()).expect("children")[0];
        tree.disconnect(decision, "Condition").expect("disconnect");

        let err = tree.run().expect_err("malformed");
        assert_eq!(
            err,
            TreeError::MalformedTree {
                guid: tree.guid(decision).expect("guid").clone(),
                slot: "Condition".to_string(),
            }
        );
    }

    #[test]
    fn missing_root_child_is_malformed() {
        let mut tree = Tree::new("t");
        tree.initialise(&()).expect("init");
        assert!(matches!(
            tree.run(),
            Err(TreeError::MalformedTree { slot, .. }) if slot == "main"
        ));
    }

    #[test]
    fn missing_untaken_branch_is_still_malformed() {
        let switch = Switch::new(true);
        let (mut tree, _, _) = decision_tree(&switch);
        let decision = tree.children(tree.root()).expect("children")[0];
        tree.detach(decision, Port::False).expect("detach");
        assert!(matches!(
            tree.run(),
            Err(TreeError::MalformedTree { slot, .. }) if slot == "FALSE"
        ));
    }

    #[test]
    fn invoke_rejects_non_functions() {
        let mut tree = Tree::new("t");
        let function = tree.insert(constant(Value::Bool(true))).expect("insert");
        assert_eq!(tree.invoke(function).expect("invoke"), Value::Bool(true));
        let err = tree.invoke(tree.root()).expect_err("root is not a function");
        assert!(matches!(err, TreeError::WrongCategory { .. }));
    }

    #[test]
    fn cyclic_decision_path_is_reported() {
        let mut tree = Tree::new("t");
        let first = tree.insert(condition_decision()).expect("first");
        let second = tree.insert(condition_decision()).expect("second");
        let condition = tree.insert(constant(Value::Bool(true))).expect("c");
        tree.attach(tree.root(), Port::Child, first).expect("root");
        tree.attach(first, Port::True, second).expect("t");
        tree.attach(first, Port::False, second).expect("f");
        tree.attach(second, Port::True, first).expect("t");
        tree.attach(second, Port::False, first).expect("f");
        tree.connect(first, "Condition", condition).expect("c1");
        tree.connect(second, "Condition", condition).expect("c2");
        tree.initialised = true;

        assert!(matches!(tree.run(), Err(TreeError::Cycle { .. })));
    }
}
