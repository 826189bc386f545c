//! Demo: a handful of scripted participants sharing one room.

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use livecanvas::config::{SessionConfig, env_parse};
use livecanvas::consts::REACTION_PALETTE;
use livecanvas::draw::DrawTool;
use livecanvas::hub::Hub;
use livecanvas::interaction::Key;
use livecanvas::session::{self, InputEvent};
use livecanvas::surface::{MemorySurface, Point};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = SessionConfig::from_env();
    let room = std::env::var("LIVECANVAS_ROOM").unwrap_or_else(|_| "lobby".into());
    let participants: usize = env_parse("LIVECANVAS_PARTICIPANTS", 3);
    let demo_ms: u64 = env_parse("LIVECANVAS_DEMO_MS", 3000);

    info!(%room, participants, demo_ms, ?config, "livecanvas demo starting");

    let hub = Hub::new();
    let mut inputs = Vec::with_capacity(participants);
    let mut tasks = Vec::with_capacity(participants);
    for _ in 0..participants {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let surface = MemorySurface::new(1280.0, 720.0);
        tasks.push(tokio::spawn(session::run(hub.clone(), room.clone(), surface, config, rx)));
        inputs.push(tx);
    }

    for (seat, tx) in inputs.iter().enumerate() {
        for event in script(seat) {
            if tx.send(event).await.is_err() {
                warn!(seat, "participant stopped early");
                break;
            }
        }
    }

    tokio::time::sleep(Duration::from_millis(demo_ms)).await;
    drop(inputs);

    for task in tasks {
        match task.await {
            Ok(session) => info!(
                connection_id = %session.connection_id(),
                shapes = session.surface().len(),
                peers = session.presence().others().len(),
                reactions = session.reactions().len(),
                "participant finished"
            ),
            Err(e) => error!(error = %e, "participant task failed"),
        }
    }

    let stored = hub
        .storage_snapshot(&room)
        .await
        .map_or(0, |s| s.values().map(std::collections::HashMap::len).sum::<usize>());
    info!(%room, stored, "livecanvas demo finished");
}

/// Scripted input for one seat. Seats rotate through drawing, chatting and
/// reacting.
fn script(seat: usize) -> Vec<InputEvent> {
    let mut rng = rand::rng();
    let at = Point::new(rng.random_range(0.0..1200.0), rng.random_range(0.0..650.0));
    let mut events = vec![InputEvent::PointerMove(at)];

    match seat % 3 {
        0 => {
            let tool = if rng.random_bool(0.5) { DrawTool::Rectangle } else { DrawTool::Circle };
            let to = Point::new(at.x + rng.random_range(20.0..80.0), at.y + rng.random_range(20.0..80.0));
            events.extend([
                InputEvent::SelectTool(tool),
                InputEvent::CanvasDown(at),
                InputEvent::CanvasMove(to),
                InputEvent::CanvasUp,
            ]);
        }
        1 => {
            events.extend([
                InputEvent::KeyDown(Key::new("/")),
                InputEvent::KeyUp(Key::new("/")),
                InputEvent::ChatInput(format!("hello from seat {seat}")),
                InputEvent::ChatSubmit,
            ]);
        }
        _ => {
            let value = REACTION_PALETTE[rng.random_range(0..REACTION_PALETTE.len())];
            events.extend([
                InputEvent::KeyUp(Key::new("e")),
                InputEvent::ReactionPicked(value.to_owned()),
                InputEvent::PointerDown(at),
            ]);
        }
    }
    events
}
