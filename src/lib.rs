//! Livecanvas — real-time collaborative canvas sync engine.
//!
//! ARCHITECTURE
//! ============
//! Every participant of a room holds local copies of three replicated
//! layers and redraws from them:
//!
//! | Layer      | Module       | Replication                          |
//! |------------|--------------|--------------------------------------|
//! | Shapes     | [`shapes`]   | shared map, last writer wins per key |
//! | Presence   | [`presence`] | one record per participant, owner-written |
//! | Reactions  | [`reactions`]| fire-and-forget broadcast, TTL buffer |
//!
//! Local input goes through the cursor state machine in [`interaction`] and
//! the drawing tools in [`draw`]; [`session`] glues everything for one
//! participant and [`hub`] relays [`frame::Frame`]s between participants.
//! [`render`] turns presence, cursor state and reactions into overlays,
//! while [`shapes::materialize`] keeps a [`surface::RenderSurface`] in sync
//! with the shared map.

pub mod config;
pub mod consts;
pub mod draw;
pub mod frame;
pub mod hub;
pub mod interaction;
pub mod presence;
pub mod reactions;
pub mod render;
pub mod session;
pub mod shapes;
pub mod store;
pub mod surface;
