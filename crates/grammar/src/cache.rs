//! Bounded parse cache: a global least-recently-used map keyed by the raw
//! attribute string, plus a per-node override so a node whose attribute has
//! not changed skips even the string hash. Mutated from the main flow only;
//! node entries are invalidated when the attribute value changes or the node
//! is removed.

use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

const MAX_CACHE_SIZE: usize = 500;

pub struct ParserCache<K, T> {
    global: HashMap<String, Rc<T>>,
    order: Vec<String>, // LRU order, least recent first
    per_node: HashMap<K, (String, Rc<T>)>,
    capacity: usize,
}

impl<K: Eq + Hash + Copy, T> ParserCache<K, T> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            global: HashMap::new(),
            order: Vec::new(),
            per_node: HashMap::new(),
            capacity,
        }
    }

    pub fn get(&mut self, key: &str, node: Option<K>) -> Option<Rc<T>> {
        if let Some(node) = node {
            if let Some((cached_key, value)) = self.per_node.get(&node) {
                if cached_key == key {
                    return Some(Rc::clone(value));
                }
            }
        }
        let value = self.global.get(key)?;
        let value = Rc::clone(value);
        self.touch(key);
        Some(value)
    }

    pub fn set(&mut self, key: &str, value: Rc<T>, node: Option<K>) {
        if !self.global.contains_key(key) && self.global.len() >= self.capacity {
            if !self.order.is_empty() {
                let oldest = self.order.remove(0);
                self.global.remove(&oldest);
            }
        }
        self.global.insert(key.to_string(), Rc::clone(&value));
        self.touch(key);
        if let Some(node) = node {
            self.per_node.insert(node, (key.to_string(), value));
        }
    }

    pub fn invalidate_node(&mut self, node: K) {
        self.per_node.remove(&node);
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push(key.to_string());
    }
}

impl<K: Eq + Hash + Copy, T> Default for ParserCache<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_and_returns_shared_values() {
        let mut cache: ParserCache<u32, String> = ParserCache::new();
        cache.set("a", Rc::new("parsed".to_string()), None);
        let hit = cache.get("a", None).unwrap();
        assert_eq!(*hit, "parsed");
        assert!(cache.get("b", None).is_none());
    }

    #[test]
    fn per_node_entry_wins_when_key_matches() {
        let mut cache: ParserCache<u32, String> = ParserCache::new();
        cache.set("a", Rc::new("v1".to_string()), Some(7));
        assert_eq!(*cache.get("a", Some(7)).unwrap(), "v1");

        // a different attribute string on the same node bypasses the stale entry
        assert!(cache.get("changed", Some(7)).is_none());

        cache.invalidate_node(7);
        assert_eq!(*cache.get("a", Some(7)).unwrap(), "v1"); // global still holds it
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let mut cache: ParserCache<u32, u32> = ParserCache::with_capacity(2);
        cache.set("a", Rc::new(1), None);
        cache.set("b", Rc::new(2), None);
        cache.get("a", None); // refresh "a"
        cache.set("c", Rc::new(3), None); // evicts "b"
        assert!(cache.get("a", None).is_some());
        assert!(cache.get("b", None).is_none());
        assert!(cache.get("c", None).is_some());
        assert_eq!(cache.len(), 2);
    }
}
