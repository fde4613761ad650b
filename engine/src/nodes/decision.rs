//! `ConditionDecision`: branch on a boolean function.

use crate::core::behavior::{DecisionRule, NodeBehavior};
use crate::core::describe::DescribeContext;
use crate::core::error::TreeError;
use crate::core::evaluator::Inputs;
use crate::core::registry::NodeSchema;
use crate::core::types::{NodeCategory, ValueType};
use crate::tree::{Node, Port, SlotSpec};

pub const CONDITION: &str = "Condition";

pub const SLOTS: &[SlotSpec] = &[SlotSpec::required(CONDITION, ValueType::Bool)];

#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionDecision;

impl DecisionRule for ConditionDecision {
    fn branch(&self, inputs: &Inputs<'_>) -> Result<bool, TreeError> {
        inputs.bool(CONDITION)
    }

    fn describe(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        let on_true = ctx.port_title(Port::True)?;
        let on_false = ctx.port_title(Port::False)?;
        let condition = ctx.summary(CONDITION)?;
        Ok(format!(
            "The agent will {on_true} if {condition}. Otherwise the agent will {on_false}."
        ))
    }

    fn box_clone(&self) -> Box<dyn DecisionRule> {
        Box::new(*self)
    }
}

/// A detached `ConditionDecision` with its `Condition` slot declared.
pub fn node() -> Node {
    Node::new(
        "ConditionDecision",
        NodeBehavior::Decision(Box::new(ConditionDecision)),
    )
    .with_slots(SLOTS)
}

pub fn schema() -> NodeSchema {
    NodeSchema::new("ConditionDecision", NodeCategory::Decision, |_| {
        Ok(NodeBehavior::Decision(Box::new(ConditionDecision)))
    })
    .with_slots(SLOTS)
}
