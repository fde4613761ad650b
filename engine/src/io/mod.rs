//! I/O helpers for engine commands.

pub mod clock;
pub mod config;
pub mod graph_store;
