//! Stable exit codes for engine CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid graph file, config or arguments.
pub const INVALID: i32 = 1;
/// `engine run` stopped because the tree failed to evaluate.
pub const EVALUATION_FAILED: i32 = 2;
/// `engine run` completed but at least one action faulted.
pub const ACTION_FAULTED: i32 = 3;
