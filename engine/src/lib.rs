//! Decision-tree behavior engine for autonomous agents.
//!
//! A small graph of typed nodes (root, binary decisions, typed functions and
//! leaf actions) is evaluated once per think tick to select an action. An
//! action scheduler then arbitrates between ordinary, sync-combinable and
//! interrupting actions and drives each admitted action's step sequence.
//!
//! - **[`core`]**: Pure, deterministic logic (tree evaluation, cloning,
//!   scheduling, graph building). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (graph files, config, wall clock).
//! - **[`nodes`]**: The built-in node library.
//!
//! [`agent::Agent`] ties a tree instance, a [`blackboard::Blackboard`] and a
//! scheduler together into the think loop used by the `engine run` command.

pub mod agent;
pub mod blackboard;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod nodes;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
