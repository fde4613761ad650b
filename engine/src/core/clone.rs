//! Deep cloning of a tree instance.
//!
//! Every link is followed and copied once per reference. A function feeding
//! two slots (a diamond) therefore becomes two independent copies in the
//! clone; aliasing is not preserved.

use tracing::debug;

use crate::core::error::TreeError;
use crate::core::types::{Guid, NodeId, RunningState};
use crate::tree::{Node, Tree};

/// Clone the part of `source` reachable from its root.
///
/// Nodes get fresh guids, `Idle` state and no observers. The clone is not
/// initialised.
pub fn clone_tree(source: &Tree, name: Option<&str>) -> Result<Tree, TreeError> {
    // Copying follows links blindly, so reject cycles up front.
    source.reachable()?;

    let mut nodes = Vec::with_capacity(source.len());
    copy_subtree(source, source.root(), &mut nodes);
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} (clone)", source.name()));
    debug!(source = %source.name(), clone = %name, nodes = nodes.len(), "tree cloned");
    Ok(Tree::with_nodes(name, nodes))
}

fn copy_subtree(source: &Tree, id: NodeId, nodes: &mut Vec<Node>) -> NodeId {
    let original = &source.nodes[id.0];
    let mut copy = original.clone();
    copy.guid = Guid::generate();
    copy.state = RunningState::Idle;
    copy.clear_links();

    let new_id = NodeId(nodes.len());
    nodes.push(copy);
    for (link, child) in original.links() {
        let child_copy = copy_subtree(source, child, nodes);
        nodes[new_id.0].set_link(link, Some(child_copy));
    }
    new_id
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::core::types::Value;
    use crate::test_support::{
        Switch, and_gate, condition_decision, constant, scripted_action, switch_condition,
    };
    use crate::tree::Port;

    #[test]
    fn clone_has_disjoint_guids_and_same_shape() {
        let switch = Switch::new(true);
        let mut tree = Tree::new("template");
        let decision = tree.insert(condition_decision()).expect("decision");
        let condition = tree.insert(switch_condition(&switch)).expect("condition");
        let (yes, _) = scripted_action("yes", 1);
        let (no, _) = scripted_action("no", 1);
        let yes = tree.insert(yes).expect("yes");
        let no = tree.insert(no).expect("no");
        tree.attach(tree.root(), Port::Child, decision).expect("root");
        tree.attach(decision, Port::True, yes).expect("t");
        tree.attach(decision, Port::False, no).expect("f");
        tree.connect(decision, "Condition", condition).expect("c");

        let mut copy = tree.clone_tree(Some("agent-1")).expect("clone");
        assert_eq!(copy.name(), "agent-1");
        assert_eq!(copy.len(), tree.len());
        assert!(!copy.is_initialised());

        let original: HashSet<Guid> = tree
            .ids()
            .map(|id| tree.guid(id).expect("guid").clone())
            .collect();
        assert!(
            copy.ids()
                .all(|id| !original.contains(copy.guid(id).expect("guid")))
        );

        tree.initialise(&()).expect("init");
        copy.initialise(&()).expect("init");
        for value in [true, false, true] {
            switch.set(value);
            let picked = tree.title(tree.run().expect("run")).expect("title");
            let copied = copy.title(copy.run().expect("run")).expect("title");
            assert_eq!(picked, copied);
        }
    }

    #[test]
    fn shared_dependency_is_duplicated_in_clone() {
        let mut tree = Tree::new("diamond");
        let decision = tree.insert(condition_decision()).expect("decision");
        let gate = tree.insert(and_gate()).expect("gate");
        let shared = tree.insert(constant(Value::Bool(true))).expect("shared");
        let (leaf, _) = scripted_action("leaf", 1);
        let leaf = tree.insert(leaf).expect("leaf");
        tree.attach(tree.root(), Port::Child, decision).expect("root");
        tree.attach(decision, Port::True, leaf).expect("t");
        tree.connect(decision, "Condition", gate).expect("c");
        tree.connect(gate, "A", shared).expect("a");
        tree.connect(gate, "B", shared).expect("b");
        let (other, _) = scripted_action("other", 1);
        let other = tree.insert(other).expect("other");
        tree.attach(decision, Port::False, other).expect("f");

        let copy = tree.clone_tree(None).expect("clone");
        assert_eq!(copy.name(), "diamond (clone)");
        assert_eq!(copy.len(), tree.len() + 1);

        let copied_gate = copy
            .ids()
            .find(|id| copy.node(*id).expect("node").kind_name() == "And")
            .expect("gate copied");
        let gate_node = copy.node(copied_gate).expect("node");
        assert_ne!(gate_node.slot_target("A"), gate_node.slot_target("B"));
    }

    #[test]
    fn clone_skips_unreachable_nodes() {
        let mut tree = Tree::new("loose");
        let (leaf, _) = scripted_action("leaf", 1);
        let leaf = tree.insert(leaf).expect("leaf");
        tree.attach(tree.root(), Port::Child, leaf).expect("root");
        tree.insert(constant(Value::Bool(false))).expect("loose");

        let copy = tree.clone_tree(None).expect("clone");
        assert_eq!(copy.len(), 2);
    }
}
