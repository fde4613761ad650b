//! Helpers for rendering deterministic node paths.

use crate::core::types::NodeId;
use crate::tree::Tree;

/// Return the `/`-separated guid path to `target`, rooted at the tree root.
///
/// Structural links are searched before dependency slots, so the first path
/// found is the one a reader would follow in the editor.
pub fn node_path(tree: &Tree, target: NodeId) -> Option<String> {
    let mut path = Vec::new();
    if node_path_inner(tree, tree.root(), target, &mut path) {
        let segments: Vec<String> = path
            .iter()
            .filter_map(|id| tree.guid(*id).ok().map(ToString::to_string))
            .collect();
        return Some(segments.join("/"));
    }
    None
}

fn node_path_inner(tree: &Tree, id: NodeId, target: NodeId, path: &mut Vec<NodeId>) -> bool {
    if path.contains(&id) {
        return false;
    }
    path.push(id);
    if id == target {
        return true;
    }
    for child in tree.children(id).unwrap_or_default() {
        if node_path_inner(tree, child, target, path) {
            return true;
        }
    }
    path.pop();
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Guid, Value};
    use crate::test_support::{condition_decision, constant};
    use crate::tree::Port;

    #[test]
    fn node_path_returns_root_for_root_id() {
        let tree = Tree::new("t");
        let root_guid = tree.guid(tree.root()).expect("guid").to_string();
        assert_eq!(node_path(&tree, tree.root()), Some(root_guid));
    }

    #[test]
    fn node_path_walks_through_dependency_slots() {
        let mut tree = Tree::new("t");
        let decision = tree
            .insert(condition_decision().with_guid(Guid::new("decide")))
            .expect("decision");
        let flag = tree
            .insert(constant(Value::Bool(true)).with_guid(Guid::new("flag")))
            .expect("flag");
        let loose = tree.insert(constant(Value::Bool(true))).expect("loose");
        tree.attach(tree.root(), Port::Child, decision).expect("attach");
        tree.connect(decision, "Condition", flag).expect("connect");

        let root_guid = tree.guid(tree.root()).expect("guid").to_string();
        assert_eq!(
            node_path(&tree, flag),
            Some(format!("{root_guid}/decide/flag"))
        );
        assert_eq!(node_path(&tree, loose), None);
    }
}
