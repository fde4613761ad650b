//! Display metadata: titles, descriptions and function summaries.
//!
//! Nothing here affects evaluation. Descriptions are regenerated on demand
//! from the current links, so they follow edits without caching.

use crate::core::error::TreeError;
use crate::core::types::{NodeCategory, NodeId, ValueType};
use crate::tree::{Node, NodeKind, Port, Tree, wrong_category};

const ROOT_DESCRIPTION: &str = "Entry point of the tree. Evaluation starts here.";

/// Title shown for a node: the explicit override, else the kind name split
/// on camel-case boundaries.
pub fn title(node: &Node) -> String {
    match &node.title {
        Some(title) => title.clone(),
        None => split_camel_case(&node.kind_name),
    }
}

/// Full natural-language description of a node.
pub fn describe(tree: &Tree, id: NodeId) -> Result<String, TreeError> {
    let node = tree.node(id)?;
    let ctx = DescribeContext::new(tree, id, 0);
    match &node.kind {
        NodeKind::Root { .. } => Ok(ROOT_DESCRIPTION.to_string()),
        NodeKind::Decision { rule, .. } => rule.describe(&ctx),
        NodeKind::Action { behavior, .. } => behavior.describe(&ctx),
        NodeKind::Function { output, behavior } => {
            let summary = behavior.summary(&ctx)?;
            Ok(match output {
                ValueType::Bool => format!("Returns true if {summary}."),
                _ => format!("Returns {summary}."),
            })
        }
    }
}

/// Read access to a node's neighbourhood while describing it.
pub struct DescribeContext<'a> {
    tree: &'a Tree,
    node: NodeId,
    depth: usize,
}

impl<'a> DescribeContext<'a> {
    fn new(tree: &'a Tree, node: NodeId, depth: usize) -> Self {
        Self { tree, node, depth }
    }

    fn current(&self) -> &'a Node {
        &self.tree.nodes[self.node.0]
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Title of the node being described.
    pub fn title(&self) -> String {
        title(self.current())
    }

    /// Title set by the author, if any.
    pub fn explicit_title(&self) -> Option<&'a str> {
        self.current().title.as_deref()
    }

    /// Title of the structural child behind `port`.
    pub fn port_title(&self, port: Port) -> Result<String, TreeError> {
        let node = self.current();
        let target = node
            .port_target(port)
            .ok_or_else(|| missing(node, port.name()))?;
        self.tree.title(target)
    }

    /// Summary phrase of the function wired into `slot`.
    pub fn summary(&self, slot: &str) -> Result<String, TreeError> {
        let node = self.current();
        let index = node.slot_index(slot).ok_or_else(|| TreeError::UnknownPort {
            guid: node.guid.clone(),
            port: slot.to_string(),
        })?;
        let target = node.slots[index].target.ok_or_else(|| missing(node, slot))?;
        if self.depth > self.tree.len() {
            return Err(TreeError::Cycle {
                guid: node.guid.clone(),
            });
        }
        let function = self.tree.node(target)?;
        match &function.kind {
            NodeKind::Function { behavior, .. } => {
                behavior.summary(&DescribeContext::new(self.tree, target, self.depth + 1))
            }
            _ => Err(wrong_category(function, NodeCategory::Function)),
        }
    }

    /// Like [`DescribeContext::summary`], but `None` when the slot is empty.
    pub fn optional_summary(&self, slot: &str) -> Result<Option<String>, TreeError> {
        if self.current().slot_target(slot).is_none() {
            return Ok(None);
        }
        self.summary(slot).map(Some)
    }
}

fn missing(node: &Node, slot: &str) -> TreeError {
    TreeError::MalformedTree {
        guid: node.guid.clone(),
        slot: slot.to_string(),
    }
}

/// `ConditionDecision` -> `Condition Decision`, `HTTPRequest` -> `HTTP Request`.
pub fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in chars.iter().enumerate() {
        if index > 0 && ch.is_uppercase() {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push(' ');
            }
        }
        out.push(*ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;
    use crate::test_support::{and_gate, condition_decision, constant, scripted_action};

    #[test]
    fn splits_camel_case_kind_names() {
        assert_eq!(split_camel_case("ConditionDecision"), "Condition Decision");
        assert_eq!(split_camel_case("HTTPRequest"), "HTTP Request");
        assert_eq!(split_camel_case("Log"), "Log");
        assert_eq!(split_camel_case("Wait2Ticks"), "Wait2 Ticks");
    }

    #[test]
    fn explicit_title_overrides_kind() {
        let node = condition_decision().with_title("Hungry?");
        assert_eq!(title(&node), "Hungry?");
        assert_eq!(title(&condition_decision()), "Condition Decision");
    }

    #[test]
    fn condition_decision_reads_as_sentence() {
        let mut tree = Tree::new("t");
        let decision = tree.insert(condition_decision()).expect("decision");
        let gate = tree.insert(and_gate()).expect("gate");
        let a = tree
            .insert(constant(Value::Bool(true)).with_title("it is hungry"))
            .expect("a");
        let b = tree
            .insert(constant(Value::Bool(true)).with_title("food is near"))
            .expect("b");
        let (eat, _) = scripted_action("Eat", 1);
        let (roam, _) = scripted_action("Roam", 1);
        let eat = tree.insert(eat).expect("eat");
        let roam = tree.insert(roam).expect("roam");
        tree.attach(decision, Port::True, eat).expect("t");
        tree.attach(decision, Port::False, roam).expect("f");
        tree.connect(decision, "Condition", gate).expect("c");
        tree.connect(gate, "A", a).expect("a");
        tree.connect(gate, "B", b).expect("b");

        assert_eq!(
            tree.describe(decision).expect("describe"),
            "The agent will Eat if it is hungry and food is near. Otherwise the agent will Roam."
        );
        assert_eq!(
            tree.describe(gate).expect("describe"),
            "Returns true if it is hungry and food is near."
        );
    }

    #[test]
    fn describing_unwired_decision_is_malformed() {
        let mut tree = Tree::new("t");
        let decision = tree.insert(condition_decision()).expect("decision");
        assert!(matches!(
            tree.describe(decision),
            Err(TreeError::MalformedTree { .. })
        ));
    }

    #[test]
    fn root_has_fixed_description() {
        let tree = Tree::new("t");
        assert_eq!(tree.describe(tree.root()).expect("root"), ROOT_DESCRIPTION);
    }
}
