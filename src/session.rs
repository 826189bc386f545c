//! Session — one participant of a room.
//!
//! ARCHITECTURE
//! ============
//! A session owns every piece of local state: the cursor state machine, the
//! local copy of shared storage, the presence channel, the reaction buffer,
//! the render surface and the drawing tool. Three kinds of stimulus drive it:
//!
//! - local input (`handle_input`)
//! - frames relayed by the hub (`handle_frame`)
//! - the emission and sweep ticks (`emission_tick`, `sweep_tick`)
//!
//! After each stimulus the surface is re-materialized if storage changed,
//! and anything the session wants replicated waits in its outbox until the
//! caller drains it.
//!
//! DESIGN
//! ======
//! All methods are synchronous and take an explicit `now` (ms), so the
//! whole participant is testable without a runtime. [`run`] wraps a session
//! in the async loop that connects it to a [`Hub`].

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::consts::SHAPES_COLLECTION;
use crate::draw::{self, DrawGesture, DrawStart, DrawTool};
use crate::frame::{
    ConnectionId, ErrorCode, EVENT_BROADCAST, Frame, PRESENCE_JOINED, PRESENCE_LEFT, PRESENCE_UPDATE,
    PayloadError, STORAGE_MUTATE, now_ms,
};
use crate::hub::{Hub, JoinSnapshot};
use crate::interaction::{CursorState, Effect, Interaction, Key};
use crate::presence::{Presence, PresenceChannel, PresencePatch};
use crate::reactions::{ReactionBuffer, ReactionPayload};
use crate::render::{self, Overlay};
use crate::shapes::{self, ObjectId, Shape};
use crate::store::{MapOp, SharedMap, Storage};
use crate::surface::{Point, RenderSurface};

// =============================================================================
// TYPES
// =============================================================================

/// One local input event, as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer moved inside the canvas region.
    PointerMove(Point),
    /// Pointer left the canvas region.
    PointerLeave,
    PointerDown(Point),
    PointerUp,
    KeyDown(Key),
    KeyUp(Key),
    /// A reaction was chosen in the picker.
    ReactionPicked(String),
    /// The chat draft changed.
    ChatInput(String),
    /// Enter pressed in the chat box.
    ChatSubmit,
    /// Toolbar tool selection.
    SelectTool(DrawTool),
    /// Pointer pressed on the drawing surface.
    CanvasDown(Point),
    /// Pointer dragged on the drawing surface.
    CanvasMove(Point),
    /// Pointer released on the drawing surface.
    CanvasUp,
    /// The render engine finished moving/resizing/restyling a shape.
    ObjectModified(Shape),
    /// Toolbar delete: remove the active object.
    DeleteActive,
    /// Toolbar reset: remove every shape.
    ResetCanvas,
    /// Host window resized.
    Resize { width: f64, height: f64 },
}

/// All local state of one participant.
pub struct Session<S: RenderSurface> {
    connection_id: ConnectionId,
    room_id: String,
    interaction: Interaction,
    storage: Storage,
    presence: PresenceChannel,
    reactions: ReactionBuffer,
    surface: S,
    tool: DrawTool,
    gesture: Option<DrawGesture>,
    active_object: Option<ObjectId>,
    /// Storage revision the surface was last materialized from.
    materialized: Option<u64>,
    events: Vec<Frame>,
}

impl<S: RenderSurface> Session<S> {
    /// Build a session from the hub's join snapshot and render it once.
    pub fn new(room_id: impl Into<String>, snapshot: JoinSnapshot, surface: S, reaction_ttl_ms: i64) -> Self {
        let mut storage = Storage::new();
        storage.load_snapshot(snapshot.storage);
        let mut presence = PresenceChannel::new();
        presence.load_snapshot(snapshot.others);

        let mut session = Self {
            connection_id: snapshot.connection_id,
            room_id: room_id.into(),
            interaction: Interaction::new(),
            storage,
            presence,
            reactions: ReactionBuffer::new(reaction_ttl_ms),
            surface,
            tool: DrawTool::default(),
            gesture: None,
            active_object: None,
            materialized: None,
            events: Vec::new(),
        };
        session.refresh();
        session
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn state(&self) -> &CursorState {
        self.interaction.state()
    }

    #[must_use]
    pub fn presence(&self) -> &PresenceChannel {
        &self.presence
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn reactions(&self) -> &ReactionBuffer {
        &self.reactions
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn tool(&self) -> DrawTool {
        self.tool
    }

    #[must_use]
    pub fn active_object(&self) -> Option<&str> {
        self.active_object.as_deref()
    }

    /// Current overlay layer.
    #[must_use]
    pub fn overlays(&self, now: i64) -> Vec<Overlay> {
        render::overlays(
            self.presence.me(),
            self.interaction.state(),
            &self.presence.others(),
            self.reactions.events(),
            now,
        )
    }

    // =========================================================================
    // LOCAL INPUT
    // =========================================================================

    /// Apply one local input. Returns whether the host should suppress the
    /// event's default handling.
    pub fn handle_input(&mut self, event: InputEvent, now: i64) -> bool {
        debug!(connection_id = %self.connection_id, ?event, now, "input");
        let effects = match event {
            InputEvent::PointerMove(at) => {
                let has_cursor = self.presence.me().cursor.is_some();
                self.interaction.on_pointer_move(at, has_cursor)
            }
            InputEvent::PointerLeave => self.interaction.on_pointer_leave(),
            InputEvent::PointerDown(at) => self.interaction.on_pointer_down(at),
            InputEvent::PointerUp => self.interaction.on_pointer_up(),
            InputEvent::KeyDown(key) => self.interaction.on_key_down(&key),
            InputEvent::KeyUp(key) => self.interaction.on_key_up(&key),
            InputEvent::ReactionPicked(value) => self.interaction.select_reaction(value),
            InputEvent::ChatInput(text) => self.interaction.chat_input(text),
            InputEvent::ChatSubmit => self.interaction.chat_submit(),
            InputEvent::SelectTool(tool) => {
                self.tool = tool;
                Vec::new()
            }
            InputEvent::CanvasDown(at) => {
                self.canvas_down(at);
                Vec::new()
            }
            InputEvent::CanvasMove(at) => {
                self.canvas_move(at);
                Vec::new()
            }
            InputEvent::CanvasUp => {
                self.canvas_up();
                Vec::new()
            }
            InputEvent::ObjectModified(shape) => {
                self.surface.add_or_update(shape.clone());
                self.upsert(&shape);
                Vec::new()
            }
            InputEvent::DeleteActive => {
                self.delete_active();
                Vec::new()
            }
            InputEvent::ResetCanvas => {
                self.reset_canvas();
                Vec::new()
            }
            InputEvent::Resize { width, height } => {
                self.surface.resize(width, height);
                Vec::new()
            }
        };

        let prevent_default = self.apply_effects(effects);
        self.refresh();
        prevent_default
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> bool {
        let mut prevent_default = false;
        for effect in effects {
            match effect {
                Effect::Presence(patch) => self.presence.update(patch),
                Effect::PreventDefault => prevent_default = true,
            }
        }
        prevent_default
    }

    // --- Drawing ---

    fn canvas_down(&mut self, at: Point) {
        match draw::begin(self.tool, at) {
            DrawStart::Nothing => {}
            DrawStart::Placed(shape) => {
                self.surface.add_or_update(shape.clone());
                self.upsert(&shape);
                self.active_object = Some(shape.object_id);
                self.tool = DrawTool::Select;
            }
            DrawStart::Dragging(gesture) => {
                self.surface.add_or_update(gesture.shape.clone());
                self.gesture = Some(gesture);
            }
        }
    }

    fn canvas_move(&mut self, at: Point) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        gesture.extend(at);
        let shape = gesture.shape.clone();
        self.surface.add_or_update(shape.clone());
        self.upsert(&shape);
    }

    fn canvas_up(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        self.upsert(&gesture.shape);
        self.active_object = Some(gesture.id().clone());
        self.tool = DrawTool::Select;
    }

    fn upsert(&mut self, shape: &Shape) {
        self.storage
            .mutate(SHAPES_COLLECTION, |map| shapes::upsert(map, Some(shape)));
    }

    // --- Toolbar ---

    fn delete_active(&mut self) {
        let Some(id) = self.active_object.take() else {
            return;
        };
        self.storage
            .mutate(SHAPES_COLLECTION, |map| shapes::delete_one(map, &id));
        self.surface.remove(&id);
    }

    fn reset_canvas(&mut self) {
        let cleared = self
            .storage
            .mutate(SHAPES_COLLECTION, shapes::delete_all);
        if cleared {
            self.surface.clear();
            self.active_object = None;
            self.gesture = None;
            info!(connection_id = %self.connection_id, room_id = %self.room_id, "canvas reset");
        }
    }

    // =========================================================================
    // REMOTE FRAMES
    // =========================================================================

    /// Apply a frame relayed by the hub. Malformed frames are logged and
    /// dropped.
    pub fn handle_frame(&mut self, frame: Frame, now: i64) {
        if let Err(e) = self.apply_frame(&frame, now) {
            warn!(
                connection_id = %self.connection_id,
                code = e.error_code(),
                error = %e,
                syscall = %frame.syscall,
                "dropping malformed frame"
            );
            return;
        }
        self.refresh();
    }

    fn apply_frame(&mut self, frame: &Frame, now: i64) -> Result<(), PayloadError> {
        debug!(connection_id = %self.connection_id, syscall = %frame.syscall, from = ?frame.from, "frame");
        match frame.prefix() {
            "storage" => self.apply_storage(frame),
            "presence" => self.apply_presence(frame),
            "event" => self.apply_event(frame, now),
            _ => Err(PayloadError::UnknownSyscall(frame.syscall.clone())),
        }
    }

    fn apply_storage(&mut self, frame: &Frame) -> Result<(), PayloadError> {
        if frame.syscall != STORAGE_MUTATE {
            return Err(PayloadError::UnknownSyscall(frame.syscall.clone()));
        }
        let collection: String = frame.field("collection")?;
        let ops: Vec<MapOp> = frame.field("ops")?;
        self.storage.apply_remote(&collection, ops);
        Ok(())
    }

    fn apply_presence(&mut self, frame: &Frame) -> Result<(), PayloadError> {
        let from = frame.sender()?;
        match frame.syscall.as_str() {
            PRESENCE_UPDATE => {
                let patch: PresencePatch = frame.field("patch")?;
                self.presence.apply_remote(from, &patch);
            }
            PRESENCE_JOINED => {
                let presence: Presence = frame.field("presence")?;
                // An update relayed ahead of the join notice already created the record.
                if self.presence.other(from).is_none() {
                    self.presence.insert_peer(from, presence);
                }
            }
            PRESENCE_LEFT => {
                self.presence.remove_peer(from);
            }
            other => return Err(PayloadError::UnknownSyscall(other.to_owned())),
        }
        Ok(())
    }

    fn apply_event(&mut self, frame: &Frame, now: i64) -> Result<(), PayloadError> {
        if frame.syscall != EVENT_BROADCAST {
            return Err(PayloadError::UnknownSyscall(frame.syscall.clone()));
        }
        let payload: ReactionPayload = frame.field("event")?;
        self.reactions.receive(payload, now);
        Ok(())
    }

    // =========================================================================
    // TICKS
    // =========================================================================

    /// Emission tick: emit one reaction if in reaction mode with a cursor.
    pub fn emission_tick(&mut self, now: i64) {
        let cursor = self.presence.me().cursor;
        if let Some(payload) = self
            .reactions
            .emit_tick(self.interaction.state(), cursor, now)
        {
            self.events.push(payload.to_frame());
        }
    }

    /// Sweep tick: drop expired reactions. Returns how many were dropped.
    pub fn sweep_tick(&mut self, now: i64) -> usize {
        let dropped = self.reactions.sweep(now);
        if dropped > 0 {
            debug!(connection_id = %self.connection_id, dropped, remaining = self.reactions.len(), "swept reactions");
        }
        dropped
    }

    // =========================================================================
    // OUTBOX / RENDER
    // =========================================================================

    /// Take every frame waiting to be published: storage mutations first,
    /// then presence updates, then ephemeral events.
    pub fn drain_outbox(&mut self) -> Vec<Frame> {
        let mut frames = self.storage.drain_outbox();
        frames.extend(self.presence.drain_outbox());
        frames.append(&mut self.events);
        frames
    }

    /// Re-materialize the surface if storage changed since the last pass.
    fn refresh(&mut self) {
        let revision = self.storage.revision();
        if self.materialized == Some(revision) {
            return;
        }
        let records = self
            .storage
            .get(SHAPES_COLLECTION)
            .map(SharedMap::entries)
            .into_iter()
            .flatten();
        let stats = shapes::materialize(records, &mut self.surface);
        self.materialized = Some(revision);

        if let Some(id) = &self.active_object
            && self.surface.object(id).is_none()
        {
            self.active_object = None;
        }
        if stats.changed() {
            debug!(connection_id = %self.connection_id, revision, ?stats, "materialized");
        }
    }
}

// =============================================================================
// RUN LOOP
// =============================================================================

/// Join `room_id` on `hub` and drive one participant until `input` closes.
///
/// Local input, relayed frames and the two reaction ticks are handled in a
/// single `select!` loop; queued frames are published after every step.
/// Returns the final session state after parting the room.
pub async fn run<S: RenderSurface>(
    hub: Hub,
    room_id: String,
    surface: S,
    config: SessionConfig,
    mut input: mpsc::Receiver<InputEvent>,
) -> Session<S> {
    let (tx, mut inbound) = mpsc::channel::<Frame>(config.channel_capacity);
    let snapshot = hub.join(&room_id, tx).await;
    let mut session = Session::new(room_id.clone(), snapshot, surface, config.reaction_ttl_ms);
    let connection_id = session.connection_id();
    info!(%connection_id, %room_id, "session started");

    let start = Instant::now();
    let epoch = now_ms();
    let clock = || epoch + i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX - epoch);

    let mut emit = interval_at(start + config.emit_interval, config.emit_interval);
    emit.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sweep = interval_at(start + config.sweep_interval, config.sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = input.recv() => {
                let Some(event) = event else { break };
                session.handle_input(event, clock());
            }
            Some(frame) = inbound.recv() => {
                session.handle_frame(frame, clock());
            }
            _ = emit.tick() => {
                session.emission_tick(clock());
            }
            _ = sweep.tick() => {
                session.sweep_tick(clock());
            }
        }

        for frame in session.drain_outbox() {
            if let Err(e) = hub.publish(&room_id, connection_id, frame).await {
                warn!(%connection_id, code = e.error_code(), error = %e, "publish failed");
            }
        }
    }

    hub.part(&room_id, connection_id).await;
    info!(%connection_id, %room_id, "session ended");
    session
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
