// Query result cache keyed by document and variables.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;

use crate::document::Operation;

/// How a query consults the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Always ask the server; the result still refreshes the cache.
    #[default]
    NetworkOnly,
    /// Serve a cached result when one exists, otherwise ask the server.
    CacheFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    document: String,
    variables: String,
}

impl CacheKey {
    fn of(operation: &Operation) -> Self {
        Self {
            document: operation.document().to_string(),
            variables: operation.variables().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    operation_name: Option<String>,
    data: Value,
}

/// In-memory store of successful query results.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().expect("query cache mutex poisoned")
    }

    pub fn get(&self, operation: &Operation) -> Option<Value> {
        self.entries()
            .get(&CacheKey::of(operation))
            .map(|entry| entry.data.clone())
    }

    pub fn put(&self, operation: &Operation, data: Value) {
        let entry = CacheEntry {
            operation_name: operation.name().map(str::to_string),
            data,
        };
        self.entries().insert(CacheKey::of(operation), entry);
    }

    /// Drop every result of the operation named `name`, whatever its
    /// variables. Returns how many entries went.
    pub fn evict_operation(&self, name: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.operation_name.as_deref() != Some(name));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(operation = name, evicted, "evicted cached results");
        }
        evicted
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GET_JOB: &str = "query GetJob($id: ID!) { job(id: $id) { id title } }";

    fn job(id: &str) -> Operation {
        Operation::parse(GET_JOB, json!({ "id": id })).unwrap()
    }

    #[test]
    fn results_are_keyed_by_variables() {
        let cache = QueryCache::new();
        cache.put(&job("1"), json!({ "job": { "id": "1" } }));

        assert_eq!(cache.get(&job("1")), Some(json!({ "job": { "id": "1" } })));
        assert_eq!(cache.get(&job("2")), None);
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = QueryCache::new();
        cache.put(&job("1"), json!({ "job": { "title": "old" } }));
        cache.put(&job("1"), json!({ "job": { "title": "new" } }));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&job("1")), Some(json!({ "job": { "title": "new" } })));
    }

    #[test]
    fn evict_by_operation_name() {
        let cache = QueryCache::new();
        cache.put(&job("1"), json!({}));
        cache.put(&job("2"), json!({}));
        let me = Operation::parse("query GetMe { me { id } }", Value::Null).unwrap();
        cache.put(&me, json!({ "me": { "id": "u" } }));

        assert_eq!(cache.evict_operation("GetJob"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&me).is_some());
        assert_eq!(cache.evict_operation("GetJob"), 0);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = QueryCache::new();
        cache.put(&job("1"), json!({}));
        cache.clear();
        assert!(cache.is_empty());
    }
}
