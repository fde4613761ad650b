//! Arena-backed decision tree.
//!
//! Every node of a tree lives in one `Vec<Node>` and is addressed by
//! [`NodeId`]. Structural children (`Root.Child`, `Decision.TRUE/FALSE`) and
//! dependency slots (e.g. `ConditionDecision.Condition`) are plain ids into
//! the arena, so aliasing a function from several slots is explicit.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::core::behavior::{ActionNode, DecisionRule, FunctionNode, NodeBehavior};
use crate::core::clone::clone_tree;
use crate::core::describe;
use crate::core::error::TreeError;
use crate::core::evaluator;
use crate::core::types::{
    ActionFlags, Guid, NodeCategory, NodeId, Rect, RunningState, Value, ValueType,
};

/// Named, typed dependency slot declared by a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub value_type: ValueType,
    pub required: bool,
}

impl SlotSpec {
    pub const fn required(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) spec: SlotSpec,
    pub(crate) target: Option<NodeId>,
}

/// Structural output port of a root or decision node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    Child,
    True,
    False,
}

impl Port {
    /// Port name as written in graph files.
    pub fn name(self) -> &'static str {
        match self {
            Port::Child => "main",
            Port::True => "TRUE",
            Port::False => "FALSE",
        }
    }
}

/// An outgoing reference from one node to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    Port(Port),
    Slot(usize),
}

pub(crate) enum NodeKind {
    Root {
        child: Option<NodeId>,
    },
    Decision {
        true_node: Option<NodeId>,
        false_node: Option<NodeId>,
        rule: Box<dyn DecisionRule>,
    },
    Function {
        output: ValueType,
        behavior: Box<dyn FunctionNode>,
    },
    Action {
        flags: ActionFlags,
        behavior: Box<dyn ActionNode>,
    },
}

impl Clone for NodeKind {
    fn clone(&self) -> Self {
        match self {
            NodeKind::Root { child } => NodeKind::Root { child: *child },
            NodeKind::Decision {
                true_node,
                false_node,
                rule,
            } => NodeKind::Decision {
                true_node: *true_node,
                false_node: *false_node,
                rule: rule.box_clone(),
            },
            NodeKind::Function { output, behavior } => NodeKind::Function {
                output: *output,
                behavior: behavior.box_clone(),
            },
            NodeKind::Action { flags, behavior } => NodeKind::Action {
                flags: *flags,
                behavior: behavior.box_clone(),
            },
        }
    }
}

/// A single node: identity, display metadata, runtime state and behavior.
#[derive(Clone)]
pub struct Node {
    pub(crate) guid: Guid,
    pub(crate) kind_name: String,
    pub(crate) title: Option<String>,
    pub(crate) position: Rect,
    pub(crate) state: RunningState,
    pub(crate) kind: NodeKind,
    pub(crate) slots: Vec<Slot>,
}

impl Node {
    /// Create a detached node with a fresh guid and default action flags.
    pub fn new(kind_name: impl Into<String>, behavior: NodeBehavior) -> Self {
        let kind = match behavior {
            NodeBehavior::Root => NodeKind::Root { child: None },
            NodeBehavior::Decision(rule) => NodeKind::Decision {
                true_node: None,
                false_node: None,
                rule,
            },
            NodeBehavior::Function { output, behavior } => NodeKind::Function { output, behavior },
            NodeBehavior::Action(behavior) => NodeKind::Action {
                flags: ActionFlags::default(),
                behavior,
            },
        };
        Self {
            guid: Guid::generate(),
            kind_name: kind_name.into(),
            title: None,
            position: Rect::default(),
            state: RunningState::Idle,
            kind,
            slots: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new("Root", NodeBehavior::Root)
    }

    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = guid;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_position(mut self, position: Rect) -> Self {
        self.position = position;
        self
    }

    pub fn with_slots(mut self, slots: &[SlotSpec]) -> Self {
        self.slots = slots
            .iter()
            .map(|spec| Slot {
                spec: *spec,
                target: None,
            })
            .collect();
        self
    }

    /// Replace the action flags. Ignored for non-action nodes.
    pub fn with_flags(mut self, new_flags: ActionFlags) -> Self {
        if let NodeKind::Action { flags, .. } = &mut self.kind {
            *flags = new_flags;
        }
        self
    }

    pub fn guid(&self) -> &Guid {
        &self.guid
    }

    pub fn kind_name(&self) -> &str {
        &self.kind_name
    }

    pub fn position(&self) -> Rect {
        self.position
    }

    pub fn state(&self) -> RunningState {
        self.state
    }

    pub fn category(&self) -> NodeCategory {
        match self.kind {
            NodeKind::Root { .. } => NodeCategory::Root,
            NodeKind::Decision { .. } => NodeCategory::Decision,
            NodeKind::Function { .. } => NodeCategory::Function,
            NodeKind::Action { .. } => NodeCategory::Action,
        }
    }

    pub fn flags(&self) -> Option<ActionFlags> {
        match self.kind {
            NodeKind::Action { flags, .. } => Some(flags),
            _ => None,
        }
    }

    pub fn output_type(&self) -> Option<ValueType> {
        match self.kind {
            NodeKind::Function { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn slot_specs(&self) -> impl Iterator<Item = &SlotSpec> {
        self.slots.iter().map(|slot| &slot.spec)
    }

    pub fn slot_target(&self, name: &str) -> Option<NodeId> {
        self.slot_index(name)
            .and_then(|index| self.slots[index].target)
    }

    pub fn has_port(&self, port: Port) -> bool {
        matches!(
            (&self.kind, port),
            (NodeKind::Root { .. }, Port::Child)
                | (NodeKind::Decision { .. }, Port::True | Port::False)
        )
    }

    pub fn port_target(&self, port: Port) -> Option<NodeId> {
        match (&self.kind, port) {
            (NodeKind::Root { child }, Port::Child) => *child,
            (NodeKind::Decision { true_node, .. }, Port::True) => *true_node,
            (NodeKind::Decision { false_node, .. }, Port::False) => *false_node,
            _ => None,
        }
    }

    pub(crate) fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.spec.name == name)
    }

    /// Outgoing links in display order: structural ports first, then slots.
    pub(crate) fn links(&self) -> Vec<(Link, NodeId)> {
        let mut links = Vec::new();
        for port in [Port::Child, Port::True, Port::False] {
            if let Some(target) = self.port_target(port) {
                links.push((Link::Port(port), target));
            }
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(target) = slot.target {
                links.push((Link::Slot(index), target));
            }
        }
        links
    }

    pub(crate) fn set_link(&mut self, link: Link, target: Option<NodeId>) {
        match (link, &mut self.kind) {
            (Link::Port(Port::Child), NodeKind::Root { child }) => *child = target,
            (Link::Port(Port::True), NodeKind::Decision { true_node, .. }) => *true_node = target,
            (Link::Port(Port::False), NodeKind::Decision { false_node, .. }) => {
                *false_node = target;
            }
            (Link::Slot(index), _) => {
                if let Some(slot) = self.slots.get_mut(index) {
                    slot.target = target;
                }
            }
            _ => {}
        }
    }

    pub(crate) fn clear_links(&mut self) {
        for (link, _) in self.links() {
            self.set_link(link, None);
        }
    }

    fn initialise(&mut self, metadata: &dyn Any) {
        match &mut self.kind {
            NodeKind::Root { .. } => {}
            NodeKind::Decision { rule, .. } => rule.initialise(metadata),
            NodeKind::Function { behavior, .. } => behavior.initialise(metadata),
            NodeKind::Action { behavior, .. } => behavior.initialise(metadata),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("guid", &self.guid)
            .field("kind", &self.kind_name)
            .field("category", &self.category())
            .field("state", &self.state)
            .field("links", &self.links())
            .finish()
    }
}

/// Notification delivered to tree observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// An authored field (title, position, flags, links) changed.
    Changed { guid: Guid },
    /// The scheduler moved the node to a new running state.
    State { guid: Guid, state: RunningState },
}

type Observer = Box<dyn FnMut(&NodeEvent) + Send>;

/// One decision-tree instance.
pub struct Tree {
    pub(crate) name: String,
    pub(crate) root: NodeId,
    pub(crate) nodes: Vec<Node>,
    pub(crate) initialised: bool,
    observers: Vec<Observer>,
}

impl Tree {
    /// Create an empty tree holding only a root node.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_nodes(name.into(), vec![Node::root()])
    }

    /// Create a tree around an existing root node.
    pub fn from_root(name: impl Into<String>, root: Node) -> Result<Self, TreeError> {
        if root.category() != NodeCategory::Root {
            return Err(wrong_category(&root, NodeCategory::Root));
        }
        Ok(Self::with_nodes(name.into(), vec![root]))
    }

    pub(crate) fn with_nodes(name: String, nodes: Vec<Node>) -> Self {
        Self {
            name,
            root: NodeId(0),
            nodes,
            initialised: false,
            observers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id.0).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id))
    }

    pub fn guid(&self, id: NodeId) -> Result<&Guid, TreeError> {
        self.node(id).map(Node::guid)
    }

    pub fn find(&self, guid: &Guid) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| &node.guid == guid)
            .map(NodeId)
    }

    pub fn state(&self, id: NodeId) -> Result<RunningState, TreeError> {
        self.node(id).map(Node::state)
    }

    pub fn flags(&self, id: NodeId) -> Result<ActionFlags, TreeError> {
        let node = self.node(id)?;
        node.flags()
            .ok_or_else(|| wrong_category(node, NodeCategory::Action))
    }

    /// Add a detached node to the arena. A tree has exactly one root.
    pub fn insert(&mut self, mut node: Node) -> Result<NodeId, TreeError> {
        if node.category() == NodeCategory::Root {
            return Err(TreeError::WrongCategory {
                guid: node.guid.clone(),
                expected: "non-root node".to_string(),
                found: NodeCategory::Root.to_string(),
            });
        }
        node.clear_links();
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    /// Set a structural child. `child` must be a decision or an action.
    pub fn attach(&mut self, parent: NodeId, port: Port, child: NodeId) -> Result<(), TreeError> {
        let child_node = self.node(child)?;
        if !matches!(
            child_node.category(),
            NodeCategory::Decision | NodeCategory::Action
        ) {
            return Err(TreeError::WrongCategory {
                guid: child_node.guid.clone(),
                expected: "decision or action".to_string(),
                found: child_node.category().to_string(),
            });
        }
        let parent_node = self.node_mut(parent)?;
        if !parent_node.has_port(port) {
            return Err(TreeError::UnknownPort {
                guid: parent_node.guid.clone(),
                port: port.name().to_string(),
            });
        }
        parent_node.set_link(Link::Port(port), Some(child));
        let guid = parent_node.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    pub fn detach(&mut self, parent: NodeId, port: Port) -> Result<(), TreeError> {
        let parent_node = self.node_mut(parent)?;
        parent_node.set_link(Link::Port(port), None);
        let guid = parent_node.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    /// Wire `function`'s output into the dependency slot `slot` of `node`.
    pub fn connect(&mut self, node: NodeId, slot: &str, function: NodeId) -> Result<(), TreeError> {
        let function_node = self.node(function)?;
        let output = function_node
            .output_type()
            .ok_or_else(|| wrong_category(function_node, NodeCategory::Function))?;
        let target = self.node_mut(node)?;
        let index = target.slot_index(slot).ok_or_else(|| TreeError::UnknownPort {
            guid: target.guid.clone(),
            port: slot.to_string(),
        })?;
        let expected = target.slots[index].spec.value_type;
        if expected != output {
            return Err(TreeError::TypeMismatch {
                guid: target.guid.clone(),
                expected,
                found: output,
            });
        }
        target.set_link(Link::Slot(index), Some(function));
        let guid = target.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    pub fn disconnect(&mut self, node: NodeId, slot: &str) -> Result<(), TreeError> {
        let target = self.node_mut(node)?;
        let index = target.slot_index(slot).ok_or_else(|| TreeError::UnknownPort {
            guid: target.guid.clone(),
            port: slot.to_string(),
        })?;
        target.set_link(Link::Slot(index), None);
        let guid = target.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    /// Structural parent of `child`, if any.
    pub fn parent_of(&self, child: NodeId) -> Option<NodeId> {
        self.ids().find(|id| {
            [Port::Child, Port::True, Port::False]
                .into_iter()
                .any(|port| self.nodes[id.0].port_target(port) == Some(child))
        })
    }

    /// Structural and dependency children, in display order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let node = self.node(id)?;
        Ok(node.links().into_iter().map(|(_, target)| target).collect())
    }

    /// Visit every node reachable from the root, once per reference.
    ///
    /// Aliased nodes are visited once for each parent referencing them. A
    /// link back onto the current path is skipped.
    pub fn traverse<F: FnMut(NodeId, &Node)>(&self, mut visitor: F) {
        let mut path = Vec::new();
        self.traverse_inner(self.root, &mut path, &mut visitor);
    }

    fn traverse_inner<F: FnMut(NodeId, &Node)>(
        &self,
        id: NodeId,
        path: &mut Vec<NodeId>,
        visitor: &mut F,
    ) {
        if path.contains(&id) {
            return;
        }
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        visitor(id, node);
        path.push(id);
        for (_, child) in node.links() {
            self.traverse_inner(child, path, visitor);
        }
        path.pop();
    }

    /// Unique nodes reachable from the root in pre-order.
    ///
    /// Fails with [`TreeError::Cycle`] if any link leads back onto the path.
    pub fn reachable(&self) -> Result<Vec<NodeId>, TreeError> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        self.reachable_inner(self.root, &mut path, &mut seen, &mut order)?;
        Ok(order)
    }

    fn reachable_inner(
        &self,
        id: NodeId,
        path: &mut Vec<NodeId>,
        seen: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), TreeError> {
        let node = self.node(id)?;
        if path.contains(&id) {
            return Err(TreeError::Cycle {
                guid: node.guid.clone(),
            });
        }
        if !seen.insert(id) {
            return Ok(());
        }
        order.push(id);
        path.push(id);
        for (_, child) in node.links() {
            self.reachable_inner(child, path, seen, order)?;
        }
        path.pop();
        Ok(())
    }

    /// Hand `metadata` to every reachable node, top-down, once per node.
    ///
    /// Must be called exactly once per tree instance, before [`Tree::run`].
    pub fn initialise(&mut self, metadata: &dyn Any) -> Result<(), TreeError> {
        if self.initialised {
            return Err(TreeError::AlreadyInitialised {
                name: self.name.clone(),
            });
        }
        let order = self.reachable()?;
        for id in &order {
            self.nodes[id.0].initialise(metadata);
        }
        self.initialised = true;
        debug!(tree = %self.name, nodes = order.len(), "tree initialised");
        Ok(())
    }

    /// Walk from the root to the selected action.
    pub fn run(&self) -> Result<NodeId, TreeError> {
        if !self.initialised {
            return Err(TreeError::NotInitialised {
                name: self.name.clone(),
            });
        }
        evaluator::make_decision(self, self.root)
    }

    /// Evaluate a function node on its own.
    pub fn invoke(&self, function: NodeId) -> Result<Value, TreeError> {
        evaluator::invoke(self, function, 0)
    }

    /// Deep copy with fresh guids and independent runtime state.
    ///
    /// The copy must be initialised before it runs. Observers are not copied.
    pub fn clone_tree(&self, name: Option<&str>) -> Result<Tree, TreeError> {
        clone_tree(self, name)
    }

    pub fn title(&self, id: NodeId) -> Result<String, TreeError> {
        self.node(id).map(describe::title)
    }

    pub fn describe(&self, id: NodeId) -> Result<String, TreeError> {
        describe::describe(self, id)
    }

    pub fn set_title(&mut self, id: NodeId, title: impl Into<String>) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.title = Some(title.into());
        let guid = node.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, position: Rect) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.position = position;
        let guid = node.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    pub fn set_flags(&mut self, id: NodeId, new_flags: ActionFlags) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if node.category() != NodeCategory::Action {
            return Err(wrong_category(node, NodeCategory::Action));
        }
        if let NodeKind::Action { flags, .. } = &mut node.kind {
            *flags = new_flags;
        }
        let guid = node.guid.clone();
        self.emit(&NodeEvent::Changed { guid });
        Ok(())
    }

    pub(crate) fn set_state(&mut self, id: NodeId, state: RunningState) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        if node.state == state {
            return;
        }
        node.state = state;
        let guid = node.guid.clone();
        self.emit(&NodeEvent::State { guid, state });
    }

    /// Register an observer scoped to this tree instance.
    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&NodeEvent) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: &NodeEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("initialised", &self.initialised)
            .field("nodes", &self.nodes)
            .finish()
    }
}

pub(crate) fn wrong_category(node: &Node, expected: NodeCategory) -> TreeError {
    TreeError::WrongCategory {
        guid: node.guid.clone(),
        expected: expected.to_string(),
        found: node.category().to_string(),
    }
}
