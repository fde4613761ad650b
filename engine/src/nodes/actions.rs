//! Sample actions: logging, waiting and blackboard writes.

use std::any::Any;

use anyhow::anyhow;
use tracing::info;

use crate::blackboard::Blackboard;
use crate::core::behavior::{ActionNode, ActionStep, NodeBehavior, Step, step_fn};
use crate::core::describe::DescribeContext;
use crate::core::error::TreeError;
use crate::core::evaluator::Inputs;
use crate::core::registry::NodeSchema;
use crate::core::types::{NodeCategory, Value, ValueType};
use crate::tree::SlotSpec;

pub const MESSAGE: &str = "Message";

const LOG_SLOTS: &[SlotSpec] = &[SlotSpec::optional(MESSAGE, ValueType::Text)];

/// Log a fixed text, or the `Message` input when connected.
#[derive(Debug, Clone)]
pub struct Log {
    pub text: String,
}

impl ActionNode for Log {
    fn execute(&self, inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>> {
        let text = if inputs.is_connected(MESSAGE) {
            inputs.text(MESSAGE)?
        } else {
            self.text.clone()
        };
        let guid = inputs.guid().clone();
        Ok(step_fn(move || {
            info!(action = %guid, "{text}");
            Ok(Step::Done)
        }))
    }

    fn describe(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok(match ctx.optional_summary(MESSAGE)? {
            Some(summary) => format!("Logs {summary}."),
            None => format!("Logs \"{}\".", self.text),
        })
    }

    fn box_clone(&self) -> Box<dyn ActionNode> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
enum Metadata {
    Board(Blackboard),
    Text(String),
    #[default]
    Opaque,
}

/// Log whatever metadata the tree was initialised with.
#[derive(Debug, Clone, Default)]
pub struct LogMetadata {
    metadata: Metadata,
}

impl LogMetadata {
    fn render(&self) -> String {
        match &self.metadata {
            Metadata::Board(board) => {
                let entries: Vec<String> = board
                    .snapshot()
                    .into_iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                format!("blackboard {{{}}}", entries.join(", "))
            }
            Metadata::Text(text) => text.clone(),
            Metadata::Opaque => "<opaque metadata>".to_string(),
        }
    }
}

impl ActionNode for LogMetadata {
    fn execute(&self, inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>> {
        let guid = inputs.guid().clone();
        let this = self.clone();
        Ok(step_fn(move || {
            info!(action = %guid, metadata = %this.render(), "agent metadata");
            Ok(Step::Done)
        }))
    }

    fn initialise(&mut self, metadata: &dyn Any) {
        self.metadata = if let Some(board) = metadata.downcast_ref::<Blackboard>() {
            Metadata::Board(board.clone())
        } else if let Some(text) = metadata.downcast_ref::<String>() {
            Metadata::Text(text.clone())
        } else if let Some(text) = metadata.downcast_ref::<&str>() {
            Metadata::Text((*text).to_string())
        } else {
            Metadata::Opaque
        };
    }

    fn describe(&self, _ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok("Logs the metadata the agent was initialised with.".to_string())
    }

    fn box_clone(&self) -> Box<dyn ActionNode> {
        Box::new(Self::default())
    }
}

/// Occupy the scheduler for a number of ticks.
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    pub steps: u64,
}

impl ActionNode for Wait {
    fn execute(&self, _inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>> {
        let mut left = self.steps;
        Ok(step_fn(move || {
            if left <= 1 {
                return Ok(Step::Done);
            }
            left -= 1;
            Ok(Step::Continue)
        }))
    }

    fn describe(&self, _ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok(match self.steps {
            1 => "Waits for 1 tick.".to_string(),
            steps => format!("Waits for {steps} ticks."),
        })
    }

    fn box_clone(&self) -> Box<dyn ActionNode> {
        Box::new(*self)
    }
}

/// Write a value to the blackboard captured at initialise.
#[derive(Debug, Clone)]
pub struct SetBlackboard {
    pub key: String,
    pub value: Value,
    board: Option<Blackboard>,
}

impl SetBlackboard {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            board: None,
        }
    }
}

impl ActionNode for SetBlackboard {
    fn execute(&self, _inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>> {
        let board = self
            .board
            .clone()
            .ok_or_else(|| anyhow!("no blackboard to write '{}' to", self.key))?;
        let key = self.key.clone();
        let value = self.value.clone();
        Ok(step_fn(move || {
            board.set(key.clone(), value.clone());
            Ok(Step::Done)
        }))
    }

    fn initialise(&mut self, metadata: &dyn Any) {
        self.board = metadata.downcast_ref::<Blackboard>().cloned();
    }

    fn describe(&self, _ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok(format!("Sets '{}' to {}.", self.key, self.value))
    }

    fn box_clone(&self) -> Box<dyn ActionNode> {
        Box::new(Self::new(self.key.clone(), self.value.clone()))
    }
}

pub fn schemas() -> Vec<NodeSchema> {
    vec![
        NodeSchema::new("Log", NodeCategory::Action, |args| {
            Ok(NodeBehavior::Action(Box::new(Log {
                text: args.optional_str("text")?.unwrap_or_default().to_string(),
            })))
        })
        .with_slots(LOG_SLOTS),
        NodeSchema::new("LogMetadata", NodeCategory::Action, |_| {
            Ok(NodeBehavior::Action(Box::new(LogMetadata::default())))
        }),
        NodeSchema::new("Wait", NodeCategory::Action, |args| {
            Ok(NodeBehavior::Action(Box::new(Wait {
                steps: args.u64("steps")?,
            })))
        }),
        NodeSchema::new("SetBlackboard", NodeCategory::Action, |args| {
            Ok(NodeBehavior::Action(Box::new(SetBlackboard::new(
                args.str("key")?,
                args.value("value")?,
            ))))
        }),
    ]
}
