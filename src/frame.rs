//! Frame — the replication envelope exchanged between participants.
//!
//! ARCHITECTURE
//! ============
//! Every replicated mutation or ephemeral message travels as a Frame. A
//! participant queues frames locally, the hub relays them to every other
//! participant in the room, and receivers route on the syscall prefix
//! (`storage:`, `presence:`, `event:`).
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`.
//! - Fire-and-forget: there are no replies, acknowledgements or retries.
//! - `from` is stamped by the hub with the sender's connection id; a
//!   sender never needs to fill it in.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// SYSCALLS
// =============================================================================

/// One atomic mutation call on a shared collection.
pub const STORAGE_MUTATE: &str = "storage:mutate";

/// Owner merged fields into its presence record.
pub const PRESENCE_UPDATE: &str = "presence:update";

/// A participant connected with default presence.
pub const PRESENCE_JOINED: &str = "presence:joined";

/// A participant disconnected.
pub const PRESENCE_LEFT: &str = "presence:left";

/// Fire-and-forget ephemeral event.
pub const EVENT_BROADCAST: &str = "event:broadcast";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Ephemeral per-connection participant id, assigned by the hub on join.
/// Not stable across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The replication envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub from: Option<ConnectionId>,
    pub syscall: String,
    pub data: Data,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code for structured log fields.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;
}

/// A received frame whose payload does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("missing field `{field}` in {syscall}")]
    MissingField { syscall: String, field: &'static str },
    #[error("invalid field `{field}` in {syscall}: {source}")]
    InvalidField {
        syscall: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("frame has no sender: {0}")]
    MissingSender(String),
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
}

impl ErrorCode for PayloadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "E_MISSING_FIELD",
            Self::InvalidField { .. } => "E_INVALID_FIELD",
            Self::MissingSender(_) => "E_MISSING_SENDER",
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
        }
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a frame for `syscall`.
    pub fn new(syscall: impl Into<String>, data: Data) -> Self {
        Self { id: Uuid::new_v4(), ts: now_ms(), room_id: None, from: None, syscall: syscall.into(), data }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: ConnectionId) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ROUTING / ACCESS
// =============================================================================

impl Frame {
    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Decode a required data field into `T`.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if absent, `InvalidField` if it does not decode.
    pub fn field<T: DeserializeOwned>(&self, field: &'static str) -> Result<T, PayloadError> {
        let value = self
            .data
            .get(field)
            .ok_or_else(|| PayloadError::MissingField { syscall: self.syscall.clone(), field })?;
        serde_json::from_value(value.clone())
            .map_err(|source| PayloadError::InvalidField { syscall: self.syscall.clone(), field, source })
    }

    /// The sender's connection id.
    ///
    /// # Errors
    ///
    /// Returns `MissingSender` if the hub did not stamp the frame.
    pub fn sender(&self) -> Result<ConnectionId, PayloadError> {
        self.from
            .ok_or_else(|| PayloadError::MissingSender(self.syscall.clone()))
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
