//! Presence channel — per-participant ephemeral state (cursor, chat draft).
//!
//! DESIGN
//! ======
//! Each participant writes only its own record and reads everyone else's.
//! Single writer per record means no conflicts and no locking. Updates are
//! partial: fields absent from a [`PresencePatch`] are left alone, while a
//! field explicitly set to `null` overwrites.
//!
//! Remote records are created when a peer joins, patched as its updates
//! arrive and dropped when it leaves. Nothing here is persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::frame::{ConnectionId, Data, Frame, PRESENCE_UPDATE};
use crate::surface::Point;

// =============================================================================
// TYPES
// =============================================================================

/// One participant's presence record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub cursor: Option<Point>,
    pub message: Option<String>,
}

/// Partial presence update. Outer `None` = leave unchanged, `Some(None)` =
/// overwrite with null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresencePatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "explicit_null")]
    pub cursor: Option<Option<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "explicit_null")]
    pub message: Option<Option<String>>,
}

// A present-but-null field must decode as `Some(None)`, not `None`.
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PresencePatch {
    #[must_use]
    pub fn cursor(cursor: Option<Point>) -> Self {
        Self { cursor: Some(cursor), ..Self::default() }
    }

    #[must_use]
    pub fn message(message: Option<String>) -> Self {
        Self { message: Some(message), ..Self::default() }
    }

    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = Some(message);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor.is_none() && self.message.is_none()
    }
}

impl Presence {
    /// Merge the fields present in `patch`.
    pub fn apply(&mut self, patch: &PresencePatch) {
        if let Some(cursor) = patch.cursor {
            self.cursor = cursor;
        }
        if let Some(message) = &patch.message {
            self.message.clone_from(message);
        }
    }
}

/// A remote participant's presence as seen locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Other {
    pub connection_id: ConnectionId,
    pub presence: Presence,
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Own presence record plus read-only copies of everyone else's.
#[derive(Debug, Default)]
pub struct PresenceChannel {
    me: Presence,
    others: BTreeMap<ConnectionId, Presence>,
    outbox: Vec<Frame>,
}

impl PresenceChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current own presence.
    #[must_use]
    pub fn me(&self) -> &Presence {
        &self.me
    }

    /// Merge `patch` into the own record and queue it for broadcast.
    pub fn update(&mut self, patch: PresencePatch) {
        if patch.is_empty() {
            return;
        }
        self.me.apply(&patch);
        let mut data = Data::new();
        data.insert("patch".into(), serde_json::json!(patch));
        self.outbox.push(Frame::new(PRESENCE_UPDATE, data));
    }

    /// Snapshot of every other participant, ordered by connection id.
    #[must_use]
    pub fn others(&self) -> Vec<Other> {
        self.others
            .iter()
            .map(|(id, presence)| Other { connection_id: *id, presence: presence.clone() })
            .collect()
    }

    /// Presence of one peer, if connected.
    #[must_use]
    pub fn other(&self, connection_id: ConnectionId) -> Option<&Presence> {
        self.others.get(&connection_id)
    }

    /// Apply a peer's patch. Unknown peers are created with defaults first.
    pub fn apply_remote(&mut self, from: ConnectionId, patch: &PresencePatch) {
        self.others.entry(from).or_default().apply(patch);
    }

    /// Register a peer with a full record.
    pub fn insert_peer(&mut self, connection_id: ConnectionId, presence: Presence) {
        self.others.insert(connection_id, presence);
    }

    /// Forget a peer.
    pub fn remove_peer(&mut self, connection_id: ConnectionId) -> Option<Presence> {
        self.others.remove(&connection_id)
    }

    /// Replace every peer record.
    pub fn load_snapshot(&mut self, others: impl IntoIterator<Item = (ConnectionId, Presence)>) {
        self.others = others.into_iter().collect();
    }

    /// Take the frames queued by own updates, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
