//! Interaction state machine for the local participant's cursor.
//!
//! This module owns the local cursor mode (hidden, chatting, picking a
//! reaction, emitting reactions) and the transitions between them. Every
//! handler takes one input, updates the state in place, and returns the
//! [`Effect`]s the session must carry out. Handlers never touch presence
//! or the network themselves.
//!
//! The `≠ Chat` guards read [`Interaction::mode`], which every transition
//! updates before returning. A second handler running for the same keypress
//! therefore sees the mode left by the first one and cannot fire the same
//! transition twice.
//!
//! This state is local only and never replicated.

use crate::presence::PresencePatch;
use crate::surface::Point;

/// A keyboard key as reported by the host (e.g. `"/"`, `"Escape"`, `"e"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

/// The local cursor state, as rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CursorState {
    /// No overlay next to the cursor.
    #[default]
    Hidden,
    /// Chat box open next to the cursor.
    Chat {
        /// Last submitted message, shown above the draft.
        previous_message: Option<String>,
        /// Current draft.
        message: String,
    },
    /// Reaction picker open.
    ReactionSelector,
    /// Emitting `value` from the cursor on every emission tick.
    Reaction {
        value: String,
        /// Set by pointer press and, as observed, by pointer release too.
        /// Never cleared until the reaction session ends.
        is_pressed: bool,
    },
}

/// Discriminant of [`CursorState`] used by transition guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Hidden,
    Chat,
    ReactionSelector,
    Reaction,
}

impl CursorState {
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            Self::Hidden => Mode::Hidden,
            Self::Chat { .. } => Mode::Chat,
            Self::ReactionSelector => Mode::ReactionSelector,
            Self::Reaction { .. } => Mode::Reaction,
        }
    }

    /// Reaction being emitted, if any.
    #[must_use]
    pub fn reaction(&self) -> Option<&str> {
        match self {
            Self::Reaction { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Side effects requested by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Merge the patch into own presence.
    Presence(PresencePatch),
    /// Suppress the host's default handling of the input event.
    PreventDefault,
}

/// Single owner of the cursor state. All handlers go through it.
#[derive(Debug, Default)]
pub struct Interaction {
    state: CursorState,
    mode: Mode,
}

impl Interaction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Mode as of the last transition.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn transition(&mut self, next: CursorState) {
        self.mode = next.mode();
        self.state = next;
    }

    // --- Pointer ---

    /// Pointer moved inside the canvas. The cursor is frozen while the
    /// reaction picker is open, unless there is no cursor yet.
    pub fn on_pointer_move(&mut self, at: Point, has_cursor: bool) -> Vec<Effect> {
        if has_cursor && self.mode == Mode::ReactionSelector {
            return Vec::new();
        }
        vec![Effect::Presence(PresencePatch::cursor(Some(at)))]
    }

    /// Pointer left the canvas: hide everything and clear own presence.
    pub fn on_pointer_leave(&mut self) -> Vec<Effect> {
        self.transition(CursorState::Hidden);
        vec![Effect::Presence(PresencePatch::cursor(None).with_message(None))]
    }

    pub fn on_pointer_down(&mut self, at: Point) -> Vec<Effect> {
        self.press();
        vec![Effect::Presence(PresencePatch::cursor(Some(at)))]
    }

    /// Pointer released. Sets `is_pressed` exactly like a press does.
    pub fn on_pointer_up(&mut self) -> Vec<Effect> {
        self.press();
        Vec::new()
    }

    fn press(&mut self) {
        if let CursorState::Reaction { is_pressed, .. } = &mut self.state {
            *is_pressed = true;
        }
    }

    // --- Keyboard ---

    pub fn on_key_down(&self, key: &Key) -> Vec<Effect> {
        if key.is("/") && self.mode != Mode::Chat {
            return vec![Effect::PreventDefault];
        }
        Vec::new()
    }

    pub fn on_key_up(&mut self, key: &Key) -> Vec<Effect> {
        if key.is("/") && self.mode != Mode::Chat {
            self.transition(CursorState::Chat { previous_message: None, message: String::new() });
            Vec::new()
        } else if key.is("Escape") {
            self.transition(CursorState::Hidden);
            vec![Effect::Presence(PresencePatch::message(Some(String::new())))]
        } else if key.is("e") && self.mode != Mode::Chat {
            self.transition(CursorState::ReactionSelector);
            Vec::new()
        } else {
            Vec::new()
        }
    }

    // --- Reaction picker ---

    /// Reaction chosen in the picker. Ignored unless the picker is open.
    pub fn select_reaction(&mut self, value: impl Into<String>) -> Vec<Effect> {
        if self.mode != Mode::ReactionSelector {
            return Vec::new();
        }
        self.transition(CursorState::Reaction { value: value.into(), is_pressed: false });
        Vec::new()
    }

    // --- Chat box ---

    /// Draft changed. Ignored unless the chat box is open.
    pub fn chat_input(&mut self, text: impl Into<String>) -> Vec<Effect> {
        if self.mode != Mode::Chat {
            return Vec::new();
        }
        let text = text.into();
        self.transition(CursorState::Chat { previous_message: None, message: text.clone() });
        vec![Effect::Presence(PresencePatch::message(Some(text)))]
    }

    /// Enter pressed in the chat box: the draft becomes the previous message.
    pub fn chat_submit(&mut self) -> Vec<Effect> {
        let CursorState::Chat { message, .. } = &mut self.state else {
            return Vec::new();
        };
        let submitted = std::mem::take(message);
        self.transition(CursorState::Chat { previous_message: Some(submitted), message: String::new() });
        Vec::new()
    }
}

#[cfg(test)]
#[path = "interaction_test.rs"]
mod tests;
