//! Shared value types for the decision-tree core.
//!
//! These types carry no behavior of their own and never touch I/O. They are
//! the vocabulary used by the tree arena, the evaluator and the scheduler.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Stable node identity.
///
/// Trees built from a graph description keep the descriptor ids; nodes created
/// through the API or by cloning get a fresh uuid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a node inside one tree's arena.
///
/// Ids are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime state of a node, driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    #[default]
    Idle,
    Running,
    Finished,
    Interrupted,
}

bitflags! {
    /// Scheduling flags carried by every action node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionFlags: u8 {
        /// May run alongside the action admitted just before it.
        const SYNC = 1 << 0;
        /// Admission clears every active action.
        const INTERRUPTOR = 1 << 1;
        /// New admissions may proceed while this action is active.
        const INTERRUPTABLE = 1 << 2;
    }
}

impl Default for ActionFlags {
    fn default() -> Self {
        Self::INTERRUPTABLE
    }
}

impl ActionFlags {
    pub fn is_sync(self) -> bool {
        self.contains(Self::SYNC)
    }

    pub fn is_interruptor(self) -> bool {
        self.contains(Self::INTERRUPTOR)
    }

    pub fn is_interruptable(self) -> bool {
        self.contains(Self::INTERRUPTABLE)
    }

    pub fn from_names(names: &[ActionFlag]) -> Self {
        names
            .iter()
            .fold(Self::empty(), |flags, name| flags | Self::from(*name))
    }

    /// Flag names in declaration order, as written in graph files.
    pub fn names(self) -> Vec<ActionFlag> {
        [
            ActionFlag::Sync,
            ActionFlag::Interruptor,
            ActionFlag::Interruptable,
        ]
        .into_iter()
        .filter(|name| self.contains(Self::from(*name)))
        .collect()
    }
}

/// Serialized name of a single action flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionFlag {
    Sync,
    Interruptor,
    Interruptable,
}

impl From<ActionFlag> for ActionFlags {
    fn from(flag: ActionFlag) -> Self {
        match flag {
            ActionFlag::Sync => ActionFlags::SYNC,
            ActionFlag::Interruptor => ActionFlags::INTERRUPTOR,
            ActionFlag::Interruptable => ActionFlags::INTERRUPTABLE,
        }
    }
}

/// Value produced by a function node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::Text(_) => ValueType::Text,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Parse a command-line literal: `true`/`false`, a number, or plain text.
    pub fn from_literal(raw: &str) -> Self {
        match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => raw
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
        }
    }
}

/// Declared type of a function output or a dependency slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Number,
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::Text => "text",
        };
        f.write_str(name)
    }
}

/// Editor placement of a node. Passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

/// Coarse node taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Root,
    Decision,
    Action,
    Function,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeCategory::Root => "root",
            NodeCategory::Decision => "decision",
            NodeCategory::Action => "action",
            NodeCategory::Function => "function",
        };
        f.write_str(name)
    }
}
