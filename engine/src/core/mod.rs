//! Deterministic, pure logic of the decision-tree engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! trees and return deterministic outputs suitable for tests. Time enters
//! only through the scheduler's [`scheduler::Clock`].

pub mod behavior;
pub mod clone;
pub mod describe;
pub mod error;
pub mod evaluator;
pub mod invariants;
pub mod path;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod wire;
