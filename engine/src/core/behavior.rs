//! Behavior seams implemented by concrete node kinds.
//!
//! The tree arena owns structure; these traits own what a node *does*. Every
//! implementation must be cloneable (`box_clone`) so a tree definition can be
//! instantiated once per agent.

use std::any::Any;

use crate::core::describe::DescribeContext;
use crate::core::error::TreeError;
use crate::core::evaluator::Inputs;
use crate::core::types::{Value, ValueType};

/// Result of resuming an action's step sequence once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Yield back to the scheduler; resume on the next tick.
    Continue,
    /// The sequence is exhausted.
    Done,
}

/// A resumable, finite step sequence produced by [`ActionNode::execute`].
///
/// Returning an error is treated as an action fault: the scheduler marks the
/// action finished, reports the fault and keeps going.
pub trait ActionStep: Send {
    fn step(&mut self) -> anyhow::Result<Step>;
}

impl<F> ActionStep for F
where
    F: FnMut() -> anyhow::Result<Step> + Send,
{
    fn step(&mut self) -> anyhow::Result<Step> {
        self()
    }
}

/// Box a closure as a step sequence.
pub fn step_fn<F>(step: F) -> Box<dyn ActionStep>
where
    F: FnMut() -> anyhow::Result<Step> + Send + 'static,
{
    Box::new(step)
}

/// Chooses between the TRUE and FALSE branch of a decision node.
pub trait DecisionRule: Send {
    /// Return `true` to follow the TRUE branch.
    ///
    /// Called once per evaluation; implementations must not cache results
    /// across ticks.
    fn branch(&self, inputs: &Inputs<'_>) -> Result<bool, TreeError>;

    fn initialise(&mut self, _metadata: &dyn Any) {}

    fn describe(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError>;

    fn box_clone(&self) -> Box<dyn DecisionRule>;
}

/// Side-evaluation node returning a typed value.
pub trait FunctionNode: Send {
    fn invoke(&self, inputs: &Inputs<'_>) -> Result<Value, TreeError>;

    fn initialise(&mut self, _metadata: &dyn Any) {}

    /// Short phrase used inside other nodes' descriptions. Not the full
    /// description.
    fn summary(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError>;

    fn box_clone(&self) -> Box<dyn FunctionNode>;
}

/// Terminal node selected by the evaluator and run by the scheduler.
pub trait ActionNode: Send {
    /// Start a fresh step sequence. Dependency slots are readable through
    /// `inputs`.
    fn execute(&self, inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>>;

    fn initialise(&mut self, _metadata: &dyn Any) {}

    fn describe(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok(format!("Performs {}.", ctx.title().to_lowercase()))
    }

    fn box_clone(&self) -> Box<dyn ActionNode>;
}

/// Behavior half of a node, as produced by a registry factory.
pub enum NodeBehavior {
    Root,
    Decision(Box<dyn DecisionRule>),
    Function {
        output: ValueType,
        behavior: Box<dyn FunctionNode>,
    },
    Action(Box<dyn ActionNode>),
}

impl Clone for NodeBehavior {
    fn clone(&self) -> Self {
        match self {
            NodeBehavior::Root => NodeBehavior::Root,
            NodeBehavior::Decision(rule) => NodeBehavior::Decision(rule.box_clone()),
            NodeBehavior::Function { output, behavior } => NodeBehavior::Function {
                output: *output,
                behavior: behavior.box_clone(),
            },
            NodeBehavior::Action(action) => NodeBehavior::Action(action.box_clone()),
        }
    }
}
