//! Node kind registry: explicit per-kind schema and constructor.
//!
//! Graph descriptions name node kinds by string. The registry maps each kind
//! to its category, its dependency slots and a factory that turns descriptor
//! args into a behavior.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::behavior::NodeBehavior;
use crate::core::types::{ActionFlags, NodeCategory, Value, ValueType};
use crate::tree::{Node, SlotSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("missing arg '{0}'")]
    Missing(String),
    #[error("arg '{key}' must be {expected}")]
    Invalid { key: String, expected: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("node kind '{0}' is already registered")]
    DuplicateKind(String),
    #[error("unknown node kind '{0}'")]
    UnknownKind(String),
    #[error("invalid args for {kind}: {source}")]
    InvalidArgs {
        kind: String,
        #[source]
        source: ArgError,
    },
    #[error("{kind} factory produced a {found} node, schema declares {expected}")]
    CategoryMismatch {
        kind: String,
        expected: NodeCategory,
        found: NodeCategory,
    },
}

/// Constructor args of a node descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    map: &'a serde_json::Map<String, serde_json::Value>,
}

impl<'a> Args<'a> {
    pub fn new(map: &'a serde_json::Map<String, serde_json::Value>) -> Self {
        Self { map }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    fn required(&self, key: &str) -> Result<&'a serde_json::Value, ArgError> {
        self.map
            .get(key)
            .ok_or_else(|| ArgError::Missing(key.to_string()))
    }

    pub fn str(&self, key: &str) -> Result<&'a str, ArgError> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| invalid(key, "a string"))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>, ArgError> {
        if self.contains(key) {
            self.str(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn u64(&self, key: &str) -> Result<u64, ArgError> {
        self.required(key)?
            .as_u64()
            .ok_or_else(|| invalid(key, "a non-negative integer"))
    }

    /// A scalar arg as a typed [`Value`].
    pub fn value(&self, key: &str) -> Result<Value, ArgError> {
        scalar(key, self.required(key)?)
    }

    pub fn optional_value(&self, key: &str) -> Result<Option<Value>, ArgError> {
        match self.map.get(key) {
            Some(raw) => scalar(key, raw).map(Some),
            None => Ok(None),
        }
    }
}

fn scalar(key: &str, raw: &serde_json::Value) -> Result<Value, ArgError> {
    match raw {
        serde_json::Value::Bool(value) => Ok(Value::Bool(*value)),
        serde_json::Value::Number(number) => number
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| invalid(key, "a finite number")),
        serde_json::Value::String(text) => Ok(Value::Text(text.clone())),
        _ => Err(invalid(key, "a bool, number or string")),
    }
}

fn invalid(key: &str, expected: &str) -> ArgError {
    ArgError::Invalid {
        key: key.to_string(),
        expected: expected.to_string(),
    }
}

type Factory = Arc<dyn Fn(&Args<'_>) -> Result<NodeBehavior, ArgError> + Send + Sync>;

/// Everything the builder needs to know about one node kind.
#[derive(Clone)]
pub struct NodeSchema {
    kind: String,
    category: NodeCategory,
    slots: Vec<SlotSpec>,
    output: Option<ValueType>,
    default_flags: ActionFlags,
    factory: Factory,
}

impl NodeSchema {
    pub fn new<F>(kind: impl Into<String>, category: NodeCategory, factory: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<NodeBehavior, ArgError> + Send + Sync + 'static,
    {
        Self {
            kind: kind.into(),
            category,
            slots: Vec::new(),
            output: None,
            default_flags: ActionFlags::default(),
            factory: Arc::new(factory),
        }
    }

    pub fn with_slots(mut self, slots: &[SlotSpec]) -> Self {
        self.slots = slots.to_vec();
        self
    }

    /// Declared output type. Left unset for kinds typed by their args.
    pub fn with_output(mut self, output: ValueType) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_default_flags(mut self, flags: ActionFlags) -> Self {
        self.default_flags = flags;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    pub fn output(&self) -> Option<ValueType> {
        self.output
    }

    pub fn default_flags(&self) -> ActionFlags {
        self.default_flags
    }

    /// Build a detached node of this kind.
    pub fn instantiate(&self, args: &Args<'_>) -> Result<Node, RegistryError> {
        let behavior = (self.factory)(args).map_err(|source| RegistryError::InvalidArgs {
            kind: self.kind.clone(),
            source,
        })?;
        let node = Node::new(self.kind.clone(), behavior)
            .with_slots(&self.slots)
            .with_flags(self.default_flags);
        if node.category() != self.category {
            return Err(RegistryError::CategoryMismatch {
                kind: self.kind.clone(),
                expected: self.category,
                found: node.category(),
            });
        }
        Ok(node)
    }
}

impl fmt::Debug for NodeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSchema")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("slots", &self.slots)
            .field("output", &self.output)
            .field("default_flags", &self.default_flags)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    schemas: BTreeMap<String, NodeSchema>,
}

impl NodeRegistry {
    /// An empty registry. Graphs still need a `Root` kind to build.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in node library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for schema in crate::nodes::builtin_schemas() {
            registry.schemas.insert(schema.kind.clone(), schema);
        }
        registry
    }

    pub fn register(&mut self, schema: NodeSchema) -> Result<(), RegistryError> {
        if self.schemas.contains_key(&schema.kind) {
            return Err(RegistryError::DuplicateKind(schema.kind));
        }
        self.schemas.insert(schema.kind.clone(), schema);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&NodeSchema> {
        self.schemas.get(kind)
    }

    /// Registered kinds, sorted by name.
    pub fn kinds(&self) -> impl Iterator<Item = &NodeSchema> {
        self.schemas.values()
    }

    pub fn instantiate(&self, kind: &str, args: &Args<'_>) -> Result<Node, RegistryError> {
        self.get(kind)
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))?
            .instantiate(args)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    #[test]
    fn builtins_cover_the_node_library() {
        let registry = NodeRegistry::with_builtins();
        let kinds: Vec<&str> = registry.kinds().map(NodeSchema::kind).collect();
        for kind in [
            "Root",
            "ConditionDecision",
            "And",
            "Or",
            "Not",
            "Constant",
            "BlackboardFlag",
            "BlackboardNumber",
            "Log",
            "LogMetadata",
            "Wait",
            "SetBlackboard",
        ] {
            assert!(kinds.contains(&kind), "missing {kind}");
        }
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut registry = NodeRegistry::with_builtins();
        let schema = registry.get("And").expect("and").clone();
        assert_eq!(
            registry.register(schema),
            Err(RegistryError::DuplicateKind("And".to_string()))
        );
    }

    #[test]
    fn instantiate_applies_schema_slots_and_flags() {
        let registry = NodeRegistry::with_builtins();
        let map = args(json!({}));
        let node = registry
            .instantiate("ConditionDecision", &Args::new(&map))
            .expect("instantiate");
        let slots: Vec<&str> = node.slot_specs().map(|spec| spec.name).collect();
        assert_eq!(slots, vec!["Condition"]);
        assert_eq!(node.category(), NodeCategory::Decision);

        let map = args(json!({ "steps": 2 }));
        let wait = registry.instantiate("Wait", &Args::new(&map)).expect("wait");
        assert_eq!(wait.flags(), Some(ActionFlags::INTERRUPTABLE));
    }

    #[test]
    fn bad_args_are_reported() {
        let registry = NodeRegistry::with_builtins();
        let map = args(json!({ "steps": "soon" }));
        let err = registry
            .instantiate("Wait", &Args::new(&map))
            .expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "invalid args for Wait: arg 'steps' must be a non-negative integer"
        );

        let map = args(json!({}));
        assert!(matches!(
            registry.instantiate("Teleport", &Args::new(&map)),
            Err(RegistryError::UnknownKind(_))
        ));
    }

    #[test]
    fn category_mismatch_is_caught() {
        let schema = NodeSchema::new("Liar", NodeCategory::Action, |_| Ok(NodeBehavior::Root));
        let map = args(json!({}));
        assert!(matches!(
            schema.instantiate(&Args::new(&map)),
            Err(RegistryError::CategoryMismatch { .. })
        ));
    }
}
