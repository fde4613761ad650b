//! Shared key/value store handed to trees as initialise metadata.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::types::Value;

/// Cloneable handle to one agent's blackboard. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store `value`, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Blackboard {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let board = Blackboard::new();
        for (key, value) in iter {
            board.set(key, value);
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let board = Blackboard::new();
        let other = board.clone();
        assert_eq!(board.set("hungry", Value::Bool(true)), None);
        assert_eq!(other.get("hungry"), Some(Value::Bool(true)));
        assert_eq!(
            other.set("hungry", Value::Bool(false)),
            Some(Value::Bool(true))
        );
        assert_eq!(board.len(), 1);
        assert_eq!(board.remove("hungry"), Some(Value::Bool(false)));
        assert!(other.is_empty());
    }

    #[test]
    fn collects_from_pairs() {
        let board: Blackboard = [("a", Value::Number(1.0)), ("b", Value::Bool(true))]
            .into_iter()
            .collect();
        let keys: Vec<String> = board.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
