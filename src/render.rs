//! Render bridge — turns presence, cursor state and reactions into the
//! overlay list the host draws on top of the shape surface.
//!
//! Shapes themselves reach the renderer through [`crate::shapes::materialize`];
//! this module only covers the live overlay layer.

use crate::consts::{CHAT_PLACEHOLDER, CURSOR_COLORS, REACTION_PALETTE};
use crate::frame::ConnectionId;
use crate::interaction::CursorState;
use crate::presence::{Other, Presence};
use crate::reactions::ReactionEvent;
use crate::surface::Point;

/// One thing to draw on the overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// A peer's pointer, with its chat message when it has one.
    PeerCursor { connection_id: ConnectionId, point: Point, color: &'static str, message: Option<String> },
    /// The local chat box next to the own cursor.
    ChatBubble { point: Point, previous_message: Option<String>, draft: String, placeholder: Option<&'static str> },
    /// The reaction picker.
    ReactionPicker { palette: &'static [&'static str] },
    /// One flying reaction. `key` identifies it across frames.
    Reaction { key: i64, point: Point, value: String, age_ms: i64 },
}

/// Stable colour for a peer's cursor.
#[must_use]
pub fn cursor_color(connection_id: ConnectionId) -> &'static str {
    let len = u64::try_from(CURSOR_COLORS.len()).unwrap_or(1);
    let idx = usize::try_from(connection_id.0 % len).unwrap_or(0);
    CURSOR_COLORS[idx]
}

/// Build the overlay list, back to front: reactions, peer cursors, own
/// chat box, picker.
#[must_use]
pub fn overlays(
    me: &Presence,
    state: &CursorState,
    others: &[Other],
    reactions: &[ReactionEvent],
    now: i64,
) -> Vec<Overlay> {
    let mut out = Vec::with_capacity(reactions.len() + others.len() + 2);

    for reaction in reactions {
        out.push(Overlay::Reaction {
            key: reaction.timestamp,
            point: reaction.point,
            value: reaction.value.clone(),
            age_ms: (now - reaction.timestamp).max(0),
        });
    }

    for other in others {
        let Some(point) = other.presence.cursor else {
            continue;
        };
        let message = other
            .presence
            .message
            .clone()
            .filter(|m| !m.is_empty());
        out.push(Overlay::PeerCursor {
            connection_id: other.connection_id,
            point,
            color: cursor_color(other.connection_id),
            message,
        });
    }

    if let (Some(point), CursorState::Chat { previous_message, message }) = (me.cursor, state) {
        out.push(Overlay::ChatBubble {
            point,
            previous_message: previous_message.clone(),
            draft: message.clone(),
            placeholder: (previous_message.is_none() && message.is_empty()).then_some(CHAT_PLACEHOLDER),
        });
    }

    if matches!(state, CursorState::ReactionSelector) {
        out.push(Overlay::ReactionPicker { palette: &REACTION_PALETTE });
    }

    out
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
