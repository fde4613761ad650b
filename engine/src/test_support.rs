//! Test-only helpers for constructing nodes, trees and graph files.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tempfile::TempDir;

use crate::core::behavior::{ActionNode, ActionStep, FunctionNode, NodeBehavior, Step, step_fn};
use crate::core::describe::DescribeContext;
use crate::core::error::TreeError;
use crate::core::evaluator::Inputs;
use crate::core::types::{ActionFlag, Value, ValueType};
use crate::core::wire::{EdgeDescriptor, GraphDescription, MAIN_PORT, NodeDescriptor, OUTPUT_PORT};
use crate::io::graph_store::write_graph;
use crate::nodes::decision;
use crate::nodes::logic::{self, Gate};
use crate::tree::Node;

/// Names of scripted actions, one entry per executed step.
pub type ActionLog = Arc<Mutex<Vec<String>>>;

/// Externally controlled boolean that counts how often it is read.
#[derive(Debug, Clone)]
pub struct Switch {
    value: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl Switch {
    pub fn new(value: bool) -> Self {
        Self {
            value: Arc::new(AtomicBool::new(value)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FunctionNode for Switch {
    fn invoke(&self, _inputs: &Inputs<'_>) -> Result<Value, TreeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Bool(self.value.load(Ordering::SeqCst)))
    }

    fn summary(&self, ctx: &DescribeContext<'_>) -> Result<String, TreeError> {
        Ok(ctx
            .explicit_title()
            .unwrap_or("the switch is on")
            .to_string())
    }

    fn box_clone(&self) -> Box<dyn FunctionNode> {
        Box::new(self.clone())
    }
}

/// Boolean function backed by `switch`. Clones of the node share the switch.
pub fn switch_condition(switch: &Switch) -> Node {
    Node::new(
        "Switch",
        NodeBehavior::Function {
            output: ValueType::Bool,
            behavior: Box::new(switch.clone()),
        },
    )
}

pub fn condition_decision() -> Node {
    decision::node()
}

pub fn and_gate() -> Node {
    Node::new(Gate::And.kind(), logic::gate(Gate::And)).with_slots(Gate::And.slots())
}

pub fn constant(value: Value) -> Node {
    Node::new("Constant", logic::constant(value))
}

#[derive(Clone)]
struct Scripted {
    name: String,
    steps: usize,
    log: ActionLog,
}

impl ActionNode for Scripted {
    fn execute(&self, _inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>> {
        let Scripted { name, steps, log } = self.clone();
        let mut taken = 0;
        Ok(step_fn(move || {
            taken += 1;
            log.lock()
                .map_err(|_| anyhow!("action log poisoned"))?
                .push(name.clone());
            Ok(if taken >= steps {
                Step::Done
            } else {
                Step::Continue
            })
        }))
    }

    fn box_clone(&self) -> Box<dyn ActionNode> {
        Box::new(self.clone())
    }
}

/// Action titled `name` that finishes on its `steps`-th step, logging each.
pub fn scripted_action(name: &str, steps: usize) -> (Node, ActionLog) {
    let log = ActionLog::default();
    let behavior = Scripted {
        name: name.to_string(),
        steps,
        log: Arc::clone(&log),
    };
    let node = Node::new("Scripted", NodeBehavior::Action(Box::new(behavior))).with_title(name);
    (node, log)
}

#[derive(Clone)]
struct Failing {
    name: String,
}

impl ActionNode for Failing {
    fn execute(&self, _inputs: &Inputs<'_>) -> anyhow::Result<Box<dyn ActionStep>> {
        let name = self.name.clone();
        Ok(step_fn(move || Err(anyhow!("{name} failed"))))
    }

    fn box_clone(&self) -> Box<dyn ActionNode> {
        Box::new(self.clone())
    }
}

/// Action whose first step returns an error.
pub fn failing_action(name: &str) -> Node {
    Node::new(
        "Failing",
        NodeBehavior::Action(Box::new(Failing {
            name: name.to_string(),
        })),
    )
    .with_title(name)
}

/// A forager: flee on threat, else eat when hungry, else wander.
pub fn sample_graph() -> GraphDescription {
    GraphDescription {
        name: "forager".to_string(),
        nodes: vec![
            NodeDescriptor::new("root", "Root"),
            NodeDescriptor::new("danger", "ConditionDecision").with_title("Danger?"),
            NodeDescriptor::new("threat", "BlackboardFlag")
                .with_arg("key", "threat")
                .with_title("a threat is near"),
            NodeDescriptor::new("flee", "Log")
                .with_arg("text", "Run!")
                .with_flags(&[ActionFlag::Interruptor])
                .with_title("Flee"),
            NodeDescriptor::new("decide", "ConditionDecision").with_title("Hungry?"),
            NodeDescriptor::new("hungry", "BlackboardFlag")
                .with_arg("key", "hungry")
                .with_title("it is hungry"),
            NodeDescriptor::new("eat", "SetBlackboard")
                .with_arg("key", "hungry")
                .with_arg("value", false)
                .with_title("Eat"),
            NodeDescriptor::new("wander", "Wait")
                .with_arg("steps", 2)
                .with_title("Wander"),
        ],
        edges: vec![
            EdgeDescriptor::new("root", MAIN_PORT, "danger", MAIN_PORT),
            EdgeDescriptor::new("threat", OUTPUT_PORT, "danger", "Condition"),
            EdgeDescriptor::new("danger", "TRUE", "flee", MAIN_PORT),
            EdgeDescriptor::new("danger", "FALSE", "decide", MAIN_PORT),
            EdgeDescriptor::new("hungry", OUTPUT_PORT, "decide", "Condition"),
            EdgeDescriptor::new("decide", "TRUE", "eat", MAIN_PORT),
            EdgeDescriptor::new("decide", "FALSE", "wander", MAIN_PORT),
        ],
    }
}

/// Write `graph` to `graph.json` inside a fresh temp dir.
pub fn graph_file(graph: &GraphDescription) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.json");
    write_graph(&path, graph).expect("write graph");
    (dir, path)
}
