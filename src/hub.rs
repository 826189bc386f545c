//! Hub — in-process replication between the participants of a room.
//!
//! DESIGN
//! ======
//! The hub stands in for the network transport and storage service. Each
//! room keeps an authoritative copy of its shared storage and of every
//! participant's presence, plus one bounded outbound queue (and backlog) per
//! participant.
//! Participants publish frames; the hub applies them to the room copy and
//! forwards them to every other participant in arrival order.
//!
//! A joining participant receives the current storage and peer presence as
//! a snapshot, so it converges without replaying history. Room storage
//! outlives its participants for as long as the hub lives.
//!
//! TRADE-OFFS
//! ==========
//! Forwarding never waits on a slow participant while the room is locked.
//! Ephemeral frames (`presence:update`, `event:broadcast`) are best-effort:
//! a full queue drops them. Storage mutations and join/leave notices must
//! arrive for replicas to converge, so a full queue parks them in a
//! per-participant backlog instead. A drain task hands the backlog over in
//! order as the queue frees up, and later lossless frames queue behind it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::frame::{
    ConnectionId, Data, ErrorCode, EVENT_BROADCAST, Frame, PRESENCE_JOINED, PRESENCE_LEFT, PRESENCE_UPDATE,
    PayloadError, STORAGE_MUTATE,
};
use crate::presence::{Presence, PresencePatch};
use crate::store::{MapOp, Storage, StorageSnapshot};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("connection {0} is not in the room")]
    NotConnected(ConnectionId),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl ErrorCode for HubError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "E_ROOM_NOT_FOUND",
            Self::NotConnected(_) => "E_NOT_CONNECTED",
            Self::Payload(e) => e.error_code(),
        }
    }
}

/// One participant's outbound side.
struct Client {
    tx: mpsc::Sender<Frame>,
    /// Lossless frames waiting for queue space, oldest first.
    backlog: VecDeque<Frame>,
}

/// Per-room live state.
#[derive(Default)]
struct RoomState {
    storage: Storage,
    presence: BTreeMap<ConnectionId, Presence>,
    clients: HashMap<ConnectionId, Client>,
}

/// What a participant receives on join.
#[derive(Debug, Clone)]
pub struct JoinSnapshot {
    pub connection_id: ConnectionId,
    pub storage: StorageSnapshot,
    /// Presence of everyone already in the room.
    pub others: Vec<(ConnectionId, Presence)>,
}

/// Shared handle to all rooms. Clone is cheap; all clones see the same rooms.
#[derive(Clone, Default)]
pub struct Hub {
    rooms: Arc<RwLock<HashMap<String, RoomState>>>,
    next_id: Arc<AtomicU64>,
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // JOIN / PART
    // =========================================================================

    /// Join `room_id`, creating the room on first use. Frames from peers
    /// will be delivered to `tx`.
    pub async fn join(&self, room_id: &str, tx: mpsc::Sender<Frame>) -> JoinSnapshot {
        let connection_id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_default();

        let snapshot = JoinSnapshot {
            connection_id,
            storage: room.storage.snapshot(),
            others: room
                .presence
                .iter()
                .map(|(id, p)| (*id, p.clone()))
                .collect(),
        };

        room.clients
            .insert(connection_id, Client { tx, backlog: VecDeque::new() });
        room.presence.insert(connection_id, Presence::default());

        let joined = Frame::new(PRESENCE_JOINED, Data::new())
            .with_room_id(room_id)
            .with_from(connection_id)
            .with_data("presence", serde_json::json!(Presence::default()));
        self.relay(room_id, room, &joined, Some(connection_id));

        info!(room_id, %connection_id, participants = room.clients.len(), "participant joined room");
        snapshot
    }

    /// Leave a room and tell the remaining participants.
    pub async fn part(&self, room_id: &str, connection_id: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        if room.clients.remove(&connection_id).is_none() {
            return;
        }
        room.presence.remove(&connection_id);

        let left = Frame::new(PRESENCE_LEFT, Data::new())
            .with_room_id(room_id)
            .with_from(connection_id);
        self.relay(room_id, room, &left, None);

        info!(room_id, %connection_id, remaining = room.clients.len(), "participant left room");
    }

    // =========================================================================
    // PUBLISH
    // =========================================================================

    /// Apply a participant's frame to the room and relay it to the others.
    ///
    /// # Errors
    ///
    /// Returns `RoomNotFound`/`NotConnected` for unknown senders and
    /// `Payload` for frames that cannot be applied; such frames are not
    /// relayed.
    pub async fn publish(&self, room_id: &str, from: ConnectionId, mut frame: Frame) -> Result<(), HubError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| HubError::RoomNotFound(room_id.to_owned()))?;
        if !room.clients.contains_key(&from) {
            return Err(HubError::NotConnected(from));
        }

        frame.from = Some(from);
        frame.room_id = Some(room_id.to_owned());

        match (frame.prefix(), frame.syscall.as_str()) {
            ("storage", STORAGE_MUTATE) => {
                let collection: String = frame.field("collection")?;
                let ops: Vec<MapOp> = frame.field("ops")?;
                room.storage.apply_remote(&collection, ops);
            }
            ("presence", PRESENCE_UPDATE) => {
                let patch: PresencePatch = frame.field("patch")?;
                room.presence.entry(from).or_default().apply(&patch);
            }
            ("event", EVENT_BROADCAST) => {}
            (_, other) => return Err(PayloadError::UnknownSyscall(other.to_owned()).into()),
        }

        debug!(room_id, %from, syscall = %frame.syscall, "relaying frame");
        self.relay(room_id, room, &frame, Some(from));
        Ok(())
    }

    /// Broadcast into `room` and start a drain task for every participant
    /// whose backlog just became non-empty.
    fn relay(&self, room_id: &str, room: &mut RoomState, frame: &Frame, exclude: Option<ConnectionId>) {
        for connection_id in broadcast(room, frame, exclude) {
            tokio::spawn(self.clone().drain_backlog(room_id.to_owned(), connection_id));
        }
    }

    /// Hand a participant's backlog over one frame at a time as its queue
    /// frees up. Ends when the backlog is empty or the participant is gone.
    async fn drain_backlog(self, room_id: String, connection_id: ConnectionId) {
        loop {
            let tx = {
                let rooms = self.rooms.read().await;
                let Some(client) = rooms
                    .get(&room_id)
                    .and_then(|room| room.clients.get(&connection_id))
                else {
                    return;
                };
                client.tx.clone()
            };
            let Ok(permit) = tx.reserve().await else {
                debug!(%connection_id, "participant queue closed; backlog discarded");
                return;
            };

            let mut rooms = self.rooms.write().await;
            let Some(client) = rooms
                .get_mut(&room_id)
                .and_then(|room| room.clients.get_mut(&connection_id))
            else {
                return;
            };
            let Some(frame) = client.backlog.pop_front() else {
                return;
            };
            permit.send(frame);
            if client.backlog.is_empty() {
                debug!(%connection_id, "participant backlog drained");
                return;
            }
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Number of participants currently in a room.
    pub async fn participant_count(&self, room_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map_or(0, |room| room.clients.len())
    }

    /// The room's authoritative storage.
    pub async fn storage_snapshot(&self, room_id: &str) -> Option<StorageSnapshot> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|room| room.storage.snapshot())
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Frames every participant must eventually receive for replicas to converge.
fn is_lossless(frame: &Frame) -> bool {
    matches!(frame.syscall.as_str(), STORAGE_MUTATE | PRESENCE_JOINED | PRESENCE_LEFT)
}

/// Send a frame to every client in the room, optionally excluding one.
/// Returns the clients whose backlog went from empty to non-empty.
fn broadcast(room: &mut RoomState, frame: &Frame, exclude: Option<ConnectionId>) -> Vec<ConnectionId> {
    let lossless = is_lossless(frame);
    let mut stalled = Vec::new();
    for (connection_id, client) in &mut room.clients {
        if exclude == Some(*connection_id) {
            continue;
        }
        if lossless && !client.backlog.is_empty() {
            client.backlog.push_back(frame.clone());
            continue;
        }
        match client.tx.try_send(frame.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) if lossless => {
                debug!(%connection_id, syscall = %frame.syscall, "participant queue full; frame backlogged");
                client.backlog.push_back(frame);
                stalled.push(*connection_id);
            }
            Err(TrySendError::Full(_)) => {
                warn!(%connection_id, syscall = %frame.syscall, "participant queue full; frame dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%connection_id, "participant queue closed");
            }
        }
    }
    stalled
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
