use super::*;
use crate::consts::SHAPES_COLLECTION;
use crate::reactions::ReactionPayload;
use crate::surface::Point;
use tokio::time::{Duration, timeout};

async fn assert_channel_has_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("channel closed")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<Frame>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

fn set_frame(key: &str, value: serde_json::Value) -> Frame {
    Frame::new(STORAGE_MUTATE, Data::new())
        .with_data("collection", SHAPES_COLLECTION)
        .with_data("ops", serde_json::json!([MapOp::Set { key: key.into(), value }]))
}

#[tokio::test]
async fn join_assigns_sequential_ids() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);

    let a = hub.join("room", tx_a).await;
    let b = hub.join("room", tx_b).await;

    assert_eq!(a.connection_id, ConnectionId(0));
    assert_eq!(b.connection_id, ConnectionId(1));
    assert_eq!(hub.participant_count("room").await, 2);
}

#[tokio::test]
async fn join_announces_to_existing_participants_only() {
    let hub = Hub::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);

    let a = hub.join("room", tx_a).await;
    assert!(a.others.is_empty());

    let b = hub.join("room", tx_b).await;
    assert_eq!(b.others, vec![(a.connection_id, Presence::default())]);

    let joined = assert_channel_has_frame(&mut rx_a).await;
    assert_eq!(joined.syscall, PRESENCE_JOINED);
    assert_eq!(joined.from, Some(b.connection_id));
    assert_channel_empty(&mut rx_b).await;
}

#[tokio::test]
async fn publish_relays_to_everyone_but_sender() {
    let hub = Hub::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let (tx_c, mut rx_c) = mpsc::channel(8);

    let a = hub.join("room", tx_a).await;
    let _b = hub.join("room", tx_b).await;
    let _c = hub.join("room", tx_c).await;
    // Drain join announcements.
    while rx_a.try_recv().is_ok() {}
    while rx_b.try_recv().is_ok() {}

    let event = ReactionPayload { x: 1.0, y: 2.0, value: "👍".into() }.to_frame();
    hub.publish("room", a.connection_id, event)
        .await
        .expect("publish should succeed");

    let recv_b = assert_channel_has_frame(&mut rx_b).await;
    let recv_c = assert_channel_has_frame(&mut rx_c).await;
    assert_eq!(recv_b.syscall, EVENT_BROADCAST);
    assert_eq!(recv_b.from, Some(a.connection_id));
    assert_eq!(recv_c.room_id.as_deref(), Some("room"));
    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn storage_survives_and_reaches_late_joiner() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let a = hub.join("room", tx_a).await;

    hub.publish("room", a.connection_id, set_frame("s1", serde_json::json!({"objectId": "s1"})))
        .await
        .expect("publish should succeed");
    hub.part("room", a.connection_id).await;
    assert_eq!(hub.participant_count("room").await, 0);

    let (tx_b, _rx_b) = mpsc::channel(8);
    let b = hub.join("room", tx_b).await;
    assert!(b.storage[SHAPES_COLLECTION].contains_key("s1"));
}

#[tokio::test]
async fn presence_updates_reach_late_joiner_snapshot() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let a = hub.join("room", tx_a).await;

    let patch = PresencePatch::cursor(Some(Point::new(3.0, 4.0)));
    let frame = Frame::new(PRESENCE_UPDATE, Data::new()).with_data("patch", serde_json::json!(patch));
    hub.publish("room", a.connection_id, frame)
        .await
        .expect("publish should succeed");

    let (tx_b, _rx_b) = mpsc::channel(8);
    let b = hub.join("room", tx_b).await;
    assert_eq!(b.others[0].1.cursor, Some(Point::new(3.0, 4.0)));
}

#[tokio::test]
async fn part_notifies_remaining_participants() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let a = hub.join("room", tx_a).await;
    let _b = hub.join("room", tx_b).await;

    hub.part("room", a.connection_id).await;

    let left = assert_channel_has_frame(&mut rx_b).await;
    assert_eq!(left.syscall, PRESENCE_LEFT);
    assert_eq!(left.from, Some(a.connection_id));
}

#[tokio::test]
async fn malformed_frame_is_rejected_and_not_relayed() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let a = hub.join("room", tx_a).await;
    let _b = hub.join("room", tx_b).await;

    let bad = Frame::new(STORAGE_MUTATE, Data::new()).with_data("collection", SHAPES_COLLECTION);
    let err = hub
        .publish("room", a.connection_id, bad)
        .await
        .expect_err("missing ops should fail");
    assert_eq!(err.error_code(), "E_MISSING_FIELD");

    let unknown = Frame::new("board:join", Data::new());
    let err = hub
        .publish("room", a.connection_id, unknown)
        .await
        .expect_err("unknown syscall should fail");
    assert_eq!(err.error_code(), "E_UNKNOWN_SYSCALL");

    assert_channel_empty(&mut rx_b).await;
}

#[tokio::test]
async fn publish_from_stranger_fails() {
    let hub = Hub::new();
    let event = ReactionPayload { x: 0.0, y: 0.0, value: "👀".into() }.to_frame();

    let err = hub
        .publish("nowhere", ConnectionId(9), event.clone())
        .await
        .expect_err("unknown room");
    assert_eq!(err.error_code(), "E_ROOM_NOT_FOUND");

    let (tx, _rx) = mpsc::channel(8);
    hub.join("room", tx).await;
    let err = hub
        .publish("room", ConnectionId(9), event)
        .await
        .expect_err("unknown connection");
    assert!(matches!(err, HubError::NotConnected(ConnectionId(9))));
}

#[tokio::test]
async fn full_queue_drops_frame_without_blocking() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(1);
    let a = hub.join("room", tx_a).await;
    let _b = hub.join("room", tx_b).await;

    for _ in 0..3 {
        let event = ReactionPayload { x: 0.0, y: 0.0, value: "🔥".into() }.to_frame();
        hub.publish("room", a.connection_id, event)
            .await
            .expect("publish should not block");
    }

    assert_channel_has_frame(&mut rx_b).await;
    assert_channel_empty(&mut rx_b).await;
}

#[tokio::test]
async fn full_queue_backlogs_storage_until_drained() {
    let hub = Hub::new();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(1);
    let a = hub.join("room", tx_a).await;
    let _b = hub.join("room", tx_b).await;

    for key in ["k1", "k2"] {
        hub.publish("room", a.connection_id, set_frame(key, serde_json::json!({"objectId": key})))
            .await
            .expect("publish should not block");
    }
    // Ephemeral frames are still dropped while the storage backlog waits.
    let event = ReactionPayload { x: 0.0, y: 0.0, value: "🔥".into() }.to_frame();
    hub.publish("room", a.connection_id, event)
        .await
        .expect("publish should not block");

    let mut replica = Storage::new();
    for _ in 0..2 {
        let frame = assert_channel_has_frame(&mut rx_b).await;
        assert_eq!(frame.syscall, STORAGE_MUTATE);
        let collection: String = frame.field("collection").expect("collection");
        let ops: Vec<MapOp> = frame.field("ops").expect("ops");
        replica.apply_remote(&collection, ops);
    }
    assert_channel_empty(&mut rx_b).await;

    let room = hub.storage_snapshot("room").await.expect("room exists");
    assert_eq!(replica.snapshot(), room);
    assert_eq!(room[SHAPES_COLLECTION].len(), 2);
}
