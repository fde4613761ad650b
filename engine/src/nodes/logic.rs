//! Boolean gates and constants.
//!
//! Gates read their inputs lazily: `And` skips `B` when `A` is false and
//! `Or` skips `B` when `A` is true.

use crate::core::behavior::{FunctionNode, NodeBehavior};
use crate::core::describe::DescribeContext;
use crate::core::error::TreeError;
use crate::core::evaluator::Inputs;
use crate::core::registry::NodeSchema;
use crate::core::types::{NodeCategory, Value, ValueType};
use crate::tree::SlotSpec;

const BINARY: &[SlotSpec] = &[
    SlotSpec::required("A", ValueType::Bool),
    SlotSpec::required("B", ValueType::Bool),
];
const UNARY: &[SlotSpec] = &[SlotSpec::required("A", ValueType::Bool)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    And,
    Or,
    Not,
}

impl Gate {
    pub fn kind(self) -> &'static str {
        match self {
            Gate::And => "And",
            Gate::Or => "Or",
            Gate::Not => "Not",
        }
    }

    pub fn slots(self) -> &'static [SlotSpec] {
        match self {
            Gate::Not => UNARY,
            Gate::And | Gate::Or => BINARY,
        }
    }
}

impl FunctionNode for Gate {
    fn invoke(&self, inputs: &Inputs<'_>) -> Result<Value, TreeError> {
        let result = match self {
            Gate::And => inputs.bool("A")? && inputs.bool("B")?,
            Gate::Or => inputs.bool("A")? || inputs.bool("B")?,
            Gate::Not => !inputs.bool("A")?,
        };
        Ok(Value::Bool(result))
    }

    fn summary(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        if let Some(title) = ctx.explicit_title() {
            return Ok(title.to_string());
        }
        Ok(match self {
            Gate::And => format!("{} and {}", ctx.summary("A")?, ctx.summary("B")?),
            Gate::Or => format!("{} or {}", ctx.summary("A")?, ctx.summary("B")?),
            Gate::Not => format!("not {}", ctx.summary("A")?),
        })
    }

    fn box_clone(&self) -> Box<dyn FunctionNode> {
        Box::new(*self)
    }
}

/// Fixed value; its output type follows the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Value,
}

impl FunctionNode for Constant {
    fn invoke(&self, _inputs: &Inputs<'_>) -> Result<Value, TreeError> {
        Ok(self.value.clone())
    }

    fn summary(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok(match ctx.explicit_title() {
            Some(title) => title.to_string(),
            None => match &self.value {
                Value::Text(text) => format!("\"{text}\""),
                other => other.to_string(),
            },
        })
    }

    fn box_clone(&self) -> Box<dyn FunctionNode> {
        Box::new(self.clone())
    }
}

pub fn gate(gate: Gate) -> NodeBehavior {
    NodeBehavior::Function {
        output: ValueType::Bool,
        behavior: Box::new(gate),
    }
}

pub fn constant(value: Value) -> NodeBehavior {
    NodeBehavior::Function {
        output: value.value_type(),
        behavior: Box::new(Constant { value }),
    }
}

pub fn schemas() -> Vec<NodeSchema> {
    let mut schemas: Vec<NodeSchema> = [Gate::And, Gate::Or, Gate::Not]
        .into_iter()
        .map(|kind| {
            NodeSchema::new(kind.kind(), NodeCategory::Function, move |_| Ok(gate(kind)))
                .with_slots(kind.slots())
                .with_output(ValueType::Bool)
        })
        .collect();
    schemas.push(NodeSchema::new(
        "Constant",
        NodeCategory::Function,
        |args| Ok(constant(args.value("value")?)),
    ));
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Switch, switch_condition};
    use crate::tree::{Node, Tree};

    fn gate_tree(kind: Gate, a: &Switch, b: &Switch) -> (Tree, crate::core::types::NodeId) {
        let mut tree = Tree::new("gates");
        let node = tree
            .insert(Node::new(kind.kind(), gate(kind)).with_slots(kind.slots()))
            .expect("gate");
        let a_node = tree.insert(switch_condition(a)).expect("a");
        tree.connect(node, "A", a_node).expect("a");
        if kind != Gate::Not {
            let b_node = tree.insert(switch_condition(b)).expect("b");
            tree.connect(node, "B", b_node).expect("b");
        }
        (tree, node)
    }

    #[test]
    fn and_short_circuits_on_false() {
        let a = Switch::new(false);
        let b = Switch::new(true);
        let (tree, node) = gate_tree(Gate::And, &a, &b);
        assert_eq!(tree.invoke(node).expect("invoke"), Value::Bool(false));
        assert_eq!(b.reads(), 0);
    }

    #[test]
    fn or_short_circuits_on_true() {
        let a = Switch::new(true);
        let b = Switch::new(false);
        let (tree, node) = gate_tree(Gate::Or, &a, &b);
        assert_eq!(tree.invoke(node).expect("invoke"), Value::Bool(true));
        assert_eq!(b.reads(), 0);

        a.set(false);
        b.set(true);
        assert_eq!(tree.invoke(node).expect("invoke"), Value::Bool(true));
        assert_eq!(b.reads(), 1);
    }

    #[test]
    fn not_negates() {
        let a = Switch::new(true);
        let (tree, node) = gate_tree(Gate::Not, &a, &Switch::new(false));
        assert_eq!(tree.invoke(node).expect("invoke"), Value::Bool(false));
    }

    #[test]
    fn unwired_gate_input_is_malformed() {
        let mut tree = Tree::new("gates");
        let node = tree
            .insert(Node::new("And", gate(Gate::And)).with_slots(Gate::And.slots()))
            .expect("gate");
        assert!(matches!(
            tree.invoke(node),
            Err(TreeError::MalformedTree { slot, .. }) if slot == "A"
        ));
    }
}
