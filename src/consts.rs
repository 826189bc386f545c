//! Shared constants for the live canvas.

// ── Reactions ───────────────────────────────────────────────────

/// Period of the reaction emission tick, in milliseconds.
pub const EMIT_INTERVAL_MS: u64 = 100;

/// Period of the reaction sweep tick, in milliseconds.
pub const SWEEP_INTERVAL_MS: u64 = 1000;

/// Age after which a displayed reaction becomes eligible for removal.
pub const REACTION_TTL_MS: i64 = 4000;

/// Emoji offered by the reaction picker, in display order.
pub const REACTION_PALETTE: [&str; 6] = ["👍", "🔥", "😍", "👀", "😱", "🙁"];

// ── Presence ────────────────────────────────────────────────────

/// Cursor colours, indexed by `connection_id % len`.
pub const CURSOR_COLORS: [&str; 5] = ["#DC2626", "#D97706", "#059669", "#7C3AED", "#DB2777"];

/// Placeholder shown in an empty chat bubble.
pub const CHAT_PLACEHOLDER: &str = "Say something…";

// ── Storage ─────────────────────────────────────────────────────

/// Name of the shared collection holding canvas shapes.
pub const SHAPES_COLLECTION: &str = "canvasObjects";

// ── Transport ───────────────────────────────────────────────────

/// Bounded capacity of each participant's inbound frame queue.
pub const CHANNEL_CAPACITY: usize = 256;

// ── Drawing ─────────────────────────────────────────────────────

/// Width and height given to a freshly placed text shape.
pub const TEXT_DEFAULT_SIZE: (f64, f64) = (120.0, 24.0);
