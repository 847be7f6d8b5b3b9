//! Run-scoped shared key/value state.
//!
//! A [`RunState`] is created when a run starts and dropped when it ends; every
//! node invocation in that run receives a handle to the same store through its
//! context. Mutation is explicit (`save` / `update` / `remove`) and never
//! ambient, so cross-node data flow stays visible at call sites.
//!
//! Fan-in rounds and the shared store: branch nodes racing each other on the
//! same key mid-round is the classic way to corrupt an aggregation. The
//! supported pattern is for branches to put their contribution in their
//! emitted payload and leave the store alone; the aggregator, which runs
//! exactly once per round, performs any cross-cutting mutation.

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Shared key/value store scoped to a single run.
///
/// Cloning is cheap; all clones address the same underlying map. Values are
/// JSON so node-private types never leak across node boundaries.
///
/// # Examples
///
/// ```
/// use flowmesh::state::RunState;
/// use serde_json::json;
///
/// let state = RunState::new();
/// state.save("attempts", json!(1));
/// state.update("attempts", |v| {
///     json!(v.and_then(|v| v.as_u64()).unwrap_or(0) + 1)
/// });
/// assert_eq!(state.read("attempts"), Some(json!(2)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RunState {
    entries: Arc<Mutex<FxHashMap<String, Value>>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value by key.
    pub fn read(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .expect("run state lock poisoned")
            .get(key)
            .cloned()
    }

    /// Store a value, replacing any previous value under the key.
    pub fn save(&self, key: impl Into<String>, value: Value) {
        self.entries
            .lock()
            .expect("run state lock poisoned")
            .insert(key.into(), value);
    }

    /// Read-modify-write under the store's lock.
    ///
    /// The closure receives the current value (if any) and returns the new
    /// one. No other reader or writer can interleave, so counters and
    /// accumulators built this way are race-free.
    pub fn update(&self, key: impl Into<String>, f: impl FnOnce(Option<Value>) -> Value) {
        let mut guard = self.entries.lock().expect("run state lock poisoned");
        let key = key.into();
        let current = guard.get(&key).cloned();
        guard.insert(key, f(current));
    }

    /// Remove a key, returning its value if present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .expect("run state lock poisoned")
            .remove(key)
    }

    /// Clone of the full map, for inspection after a run.
    pub fn snapshot(&self) -> FxHashMap<String, Value> {
        self.entries
            .lock()
            .expect("run state lock poisoned")
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .expect("run state lock poisoned")
            .is_empty()
    }
}
