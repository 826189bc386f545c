//! Ephemeral reactions: emission, remote delivery and periodic sweep.
//!
//! DESIGN
//! ======
//! Reactions never touch the shared map. Locally emitted ones and ones
//! received from peers land in the same display buffer, each stamped with
//! the receiver's own clock. A sweep tick drops everything older than the
//! TTL, so an entry stays visible between TTL and TTL + sweep interval.
//!
//! Emission and sweep are separate ticks with separate periods; the caller
//! drives each one from its own timer. Methods take an explicit `now` (ms)
//! so the timing is testable without a clock.

use serde::{Deserialize, Serialize};

use crate::frame::{Data, EVENT_BROADCAST, Frame};
use crate::interaction::CursorState;
use crate::surface::Point;

/// One reaction in the display buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionEvent {
    pub point: Point,
    pub value: String,
    /// Local receive/creation instant in ms. Doubles as the display key.
    pub timestamp: i64,
}

/// What goes over the wire for one emitted reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub x: f64,
    pub y: f64,
    pub value: String,
}

impl ReactionPayload {
    /// Wrap the payload in a broadcast frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let mut data = Data::new();
        data.insert("event".into(), serde_json::json!(self));
        Frame::new(EVENT_BROADCAST, data)
    }
}

/// Display buffer for reactions.
#[derive(Debug, Clone)]
pub struct ReactionBuffer {
    events: Vec<ReactionEvent>,
    ttl_ms: i64,
}

impl ReactionBuffer {
    #[must_use]
    pub fn new(ttl_ms: i64) -> Self {
        Self { events: Vec::new(), ttl_ms }
    }

    /// Emission tick. If the cursor is emitting a reaction and there is a
    /// cursor position, append one event and return the payload to
    /// broadcast.
    pub fn emit_tick(&mut self, state: &CursorState, cursor: Option<Point>, now: i64) -> Option<ReactionPayload> {
        let value = state.reaction()?;
        let point = cursor?;
        self.events
            .push(ReactionEvent { point, value: value.to_owned(), timestamp: now });
        Some(ReactionPayload { x: point.x, y: point.y, value: value.to_owned() })
    }

    /// A peer's reaction arrived. Stamped with the local `now`.
    pub fn receive(&mut self, payload: ReactionPayload, now: i64) {
        self.events.push(ReactionEvent {
            point: Point::new(payload.x, payload.y),
            value: payload.value,
            timestamp: now,
        });
    }

    /// Sweep tick. Keeps only events no older than the TTL; returns how
    /// many were dropped.
    pub fn sweep(&mut self, now: i64) -> usize {
        let before = self.events.len();
        let ttl = self.ttl_ms;
        self.events.retain(|e| now - e.timestamp <= ttl);
        before - self.events.len()
    }

    #[must_use]
    pub fn events(&self) -> &[ReactionEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
#[path = "reactions_test.rs"]
mod tests;
