//! Built-in node library.
//!
//! Hosts add their own kinds through [`NodeRegistry::register`]; the kinds
//! here cover the usual decision, gate, blackboard and logging needs.
//!
//! [`NodeRegistry::register`]: crate::core::registry::NodeRegistry::register

pub mod actions;
pub mod blackboard;
pub mod decision;
pub mod logic;

use crate::core::behavior::NodeBehavior;
use crate::core::registry::NodeSchema;
use crate::core::types::NodeCategory;

/// Schemas registered by [`crate::core::registry::NodeRegistry::with_builtins`].
pub fn builtin_schemas() -> Vec<NodeSchema> {
    let mut schemas = vec![NodeSchema::new("Root", NodeCategory::Root, |_| {
        Ok(NodeBehavior::Root)
    })];
    schemas.push(decision::schema());
    schemas.extend(logic::schemas());
    schemas.extend(blackboard::schemas());
    schemas.extend(actions::schemas());
    schemas
}
