//! Functions reading the agent's blackboard.
//!
//! The blackboard handle is captured from initialise metadata. Without one,
//! readers fall back to their default.

use std::any::Any;

use crate::blackboard::Blackboard;
use crate::core::behavior::{FunctionNode, NodeBehavior};
use crate::core::describe::DescribeContext;
use crate::core::error::TreeError;
use crate::core::evaluator::Inputs;
use crate::core::registry::{ArgError, NodeSchema};
use crate::core::types::{NodeCategory, Value, ValueType};

#[derive(Debug, Clone)]
pub struct BlackboardRead {
    key: String,
    output: ValueType,
    default: Value,
    board: Option<Blackboard>,
}

impl BlackboardRead {
    pub fn flag(key: impl Into<String>, default: bool) -> Self {
        Self {
            key: key.into(),
            output: ValueType::Bool,
            default: Value::Bool(default),
            board: None,
        }
    }

    pub fn number(key: impl Into<String>, default: f64) -> Self {
        Self {
            key: key.into(),
            output: ValueType::Number,
            default: Value::Number(default),
            board: None,
        }
    }

    pub fn into_behavior(self) -> NodeBehavior {
        NodeBehavior::Function {
            output: self.output,
            behavior: Box::new(self),
        }
    }
}

impl FunctionNode for BlackboardRead {
    fn invoke(&self, inputs: &Inputs<'_>) -> Result<Value, TreeError> {
        let Some(value) = self.board.as_ref().and_then(|board| board.get(&self.key)) else {
            return Ok(self.default.clone());
        };
        if value.value_type() != self.output {
            return Err(TreeError::FunctionFailed {
                guid: inputs.guid().clone(),
                message: format!(
                    "blackboard key '{}' holds a {}, expected {}",
                    self.key,
                    value.value_type(),
                    self.output
                ),
            });
        }
        Ok(value)
    }

    fn initialise(&mut self, metadata: &dyn Any) {
        self.board = metadata.downcast_ref::<Blackboard>().cloned();
    }

    fn summary(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        if let Some(title) = ctx.explicit_title() {
            return Ok(title.to_string());
        }
        Ok(match self.output {
            ValueType::Bool => format!("'{}' is set", self.key),
            _ => format!("the value of '{}'", self.key),
        })
    }

    fn box_clone(&self) -> Box<dyn FunctionNode> {
        Box::new(Self {
            board: None,
            ..self.clone()
        })
    }
}

pub fn schemas() -> Vec<NodeSchema> {
    vec![
        NodeSchema::new("BlackboardFlag", NodeCategory::Function, |args| {
            let default = match args.optional_value("default")? {
                Some(Value::Bool(value)) => value,
                Some(_) => {
                    return Err(ArgError::Invalid {
                        key: "default".to_string(),
                        expected: "a bool".to_string(),
                    });
                }
                None => false,
            };
            Ok(BlackboardRead::flag(args.str("key")?, default).into_behavior())
        })
        .with_output(ValueType::Bool),
        NodeSchema::new("BlackboardNumber", NodeCategory::Function, |args| {
            let default = match args.optional_value("default")? {
                Some(Value::Number(value)) => value,
                Some(_) => {
                    return Err(ArgError::Invalid {
                        key: "default".to_string(),
                        expected: "a number".to_string(),
                    });
                }
                None => 0.0,
            };
            Ok(BlackboardRead::number(args.str("key")?, default).into_behavior())
        })
        .with_output(ValueType::Number),
    ]
}
