//! Thread-safe in-memory key/value store used as the application cache.

use parking_lot::RwLock;
use std::collections::HashMap;

/// A concurrent-safe map of string keys to cloneable values.
#[derive(Debug)]
pub struct Store<T> {
    data: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Store<T> {
    /// Creates a store seeded with `data`.
    #[must_use]
    pub fn new(data: HashMap<String, T>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: T) {
        self.data.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.data.write().remove(key)
    }

    pub fn remove_all(&self) {
        self.data.write().clear();
    }

    /// Returns a snapshot of every entry.
    pub fn get_all(&self) -> HashMap<String, T> {
        self.data.read().clone()
    }
}

impl<T: Clone> Default for Store<T> {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = Store::default();
        assert!(!store.has("a"));

        store.set("a", 1);
        store.set("b", 2);
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get_all().len(), 2);

        assert_eq!(store.remove("a"), Some(1));
        assert!(store.get("a").is_none());

        store.remove_all();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_stores_are_independent() {
        let first: Store<String> = Store::default();
        let second: Store<String> = Store::default();
        first.set("key", "value".to_string());
        assert!(!second.has("key"));
    }
}
