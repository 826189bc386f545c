//! Shared mutable map primitive: named collections of `key → JSON value`.
//!
//! DESIGN
//! ======
//! Each participant holds an optimistic local copy of every collection.
//! Local writes go through [`Storage::mutate`], which applies them at once
//! and queues exactly one `storage:mutate` frame per call, so everything a
//! single mutation does is replicated atomically. Remote frames are applied
//! with [`Storage::apply_remote`] and never re-queued.
//!
//! There is no merge function: whichever write a participant applies last
//! for a key is what that participant sees (last-writer-wins per key).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::{Data, Frame, STORAGE_MUTATE};

// =============================================================================
// TYPES
// =============================================================================

/// One key-level change inside a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MapOp {
    Set { key: String, value: Value },
    Delete { key: String },
}

/// Key/value collection interface used by the shape adapter.
pub trait SharedMap {
    /// Replace the value stored under `key`.
    fn set(&mut self, key: &str, value: Value);

    /// Latest locally-applied value for `key`.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Remove `key`. Absent keys are ignored.
    fn delete(&mut self, key: &str);

    /// Snapshot of the current keys.
    fn keys(&self) -> Vec<String>;

    /// Iterate `(key, value)` pairs.
    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &Value)> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A collection's local optimistic copy plus the ops not yet queued.
#[derive(Debug, Clone, Default)]
pub struct LiveMap {
    entries: HashMap<String, Value>,
    pending: Vec<MapOp>,
}

impl LiveMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, op: MapOp) {
        match op {
            MapOp::Set { key, value } => {
                self.entries.insert(key, value);
            }
            MapOp::Delete { key } => {
                self.entries.remove(&key);
            }
        }
    }
}

impl SharedMap for LiveMap {
    fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_owned(), value.clone());
        self.pending
            .push(MapOp::Set { key: key.to_owned(), value });
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn delete(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.pending.push(MapOp::Delete { key: key.to_owned() });
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &Value)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k.as_str(), v)))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Full content of every collection, as shipped to a joining participant.
pub type StorageSnapshot = HashMap<String, HashMap<String, Value>>;

/// All shared collections of one room, as seen by one participant.
#[derive(Debug, Default)]
pub struct Storage {
    collections: HashMap<String, LiveMap>,
    outbox: Vec<Frame>,
    revision: u64,
}

impl Storage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a collection by name. `None` if nothing was ever written to it.
    #[must_use]
    pub fn get(&self, collection: &str) -> Option<&LiveMap> {
        self.collections.get(collection)
    }

    /// Run one mutation call against `collection`.
    ///
    /// Changes are visible to subsequent reads immediately. If the closure
    /// changed anything, one frame carrying all of its ops is queued.
    pub fn mutate<R>(&mut self, collection: &str, f: impl FnOnce(&mut LiveMap) -> R) -> R {
        let map = self.collections.entry(collection.to_owned()).or_default();
        let out = f(map);
        let ops = std::mem::take(&mut map.pending);
        if !ops.is_empty() {
            self.revision += 1;
            self.outbox.push(mutation_frame(collection, &ops));
        }
        out
    }

    /// Apply ops received from another participant.
    pub fn apply_remote(&mut self, collection: &str, ops: Vec<MapOp>) {
        if ops.is_empty() {
            return;
        }
        let map = self.collections.entry(collection.to_owned()).or_default();
        for op in ops {
            map.apply(op);
        }
        self.revision += 1;
    }

    /// Replace every collection with a snapshot.
    pub fn load_snapshot(&mut self, snapshot: StorageSnapshot) {
        self.collections = snapshot
            .into_iter()
            .map(|(name, entries)| (name, LiveMap { entries, pending: Vec::new() }))
            .collect();
        self.revision += 1;
    }

    /// Copy out every collection.
    #[must_use]
    pub fn snapshot(&self) -> StorageSnapshot {
        self.collections
            .iter()
            .map(|(name, map)| (name.clone(), map.entries.clone()))
            .collect()
    }

    /// Take the frames queued by local mutations, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outbox)
    }

    /// Increments on every content change, local or remote.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

fn mutation_frame(collection: &str, ops: &[MapOp]) -> Frame {
    let mut data = Data::new();
    data.insert("collection".into(), serde_json::json!(collection));
    data.insert("ops".into(), serde_json::json!(ops));
    Frame::new(STORAGE_MUTATE, data)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
