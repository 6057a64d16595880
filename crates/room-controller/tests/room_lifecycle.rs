//! End-to-end lifecycle tests for the registry/room/peer tree against the
//! mock engine.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use rc_test_utils::{
    audio_rtp_parameters, device_rtp_capabilities, dtls_parameters, init_tracing,
    video_rtp_parameters, MockEngine, MockEngineBuilder,
};
use room_controller::actors::events::ControlEvent;
use room_controller::actors::metrics::ActorMetrics;
use room_controller::engine::{MediaKind, TransportDirection};
use room_controller::{Config, RcError, RegistryHandle, RoomOptions, WebRtcTransportOptions};
use std::sync::Arc;
use tokio::sync::mpsc;

fn setup() -> (
    RegistryHandle,
    mpsc::Receiver<ControlEvent>,
    Arc<MockEngine>,
) {
    init_tracing();
    let engine = MockEngineBuilder::new().build();
    let (registry, events) = RegistryHandle::new(
        engine.clone(),
        Arc::new(Config::default()),
        ActorMetrics::new(),
    );
    (registry, events, engine)
}

fn setup_with(engine: Arc<MockEngine>) -> (RegistryHandle, mpsc::Receiver<ControlEvent>) {
    init_tracing();
    RegistryHandle::new(engine, Arc::new(Config::default()), ActorMetrics::new())
}

#[tokio::test]
async fn duplicate_create_room_leaves_state_unchanged() {
    let (registry, _events, engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();

    let err = registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::Conflict(_)));

    // The duplicate never reached the engine
    assert_eq!(engine.routers().len(), 1);
    assert_eq!(registry.get_all_rooms().await.unwrap().len(), 1);

    registry.cancel();
}

#[tokio::test]
async fn failed_router_creation_registers_nothing() {
    let engine = MockEngineBuilder::new().fail_router_creation().build();
    let (registry, _events) = setup_with(engine.clone());

    let err = registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::Engine(_)));

    assert!(registry.find_room("r1".to_string()).await.is_none());
    assert_eq!(registry.status().await.unwrap().room_count, 0);

    // Same id works once the engine recovers
    engine.set_fail_router_creation(false);
    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();

    registry.cancel();
}

#[tokio::test]
async fn closed_room_disappears_and_second_close_fails() {
    let (registry, _events, _engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry.close_room("r1".to_string()).await.unwrap();

    assert!(registry.get_room_info("r1".to_string()).await.is_none());
    let err = registry.close_room("r1".to_string()).await.unwrap_err();
    assert!(matches!(err, RcError::RoomNotFound(_)));

    registry.cancel();
}

#[tokio::test]
async fn strict_and_safe_lookups_disagree_only_in_shape() {
    let (registry, _events, _engine) = setup();

    // Missing room: strict errors, safe returns None
    let err = registry
        .add_peer("ghost".to_string(), "p1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::RoomNotFound(_)));
    assert!(registry.find_room("ghost".to_string()).await.is_none());
    assert!(registry
        .get_peer_info("ghost".to_string(), "p1".to_string())
        .await
        .is_none());

    // Existing room, missing peer
    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    assert!(registry
        .get_peer_info("r1".to_string(), "p1".to_string())
        .await
        .is_none());

    registry.cancel();
}

#[tokio::test]
async fn transport_connect_reaches_engine() {
    let (registry, _events, engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();

    let transport = registry
        .create_transport(
            "r1".to_string(),
            "p1".to_string(),
            TransportDirection::Send,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(transport.direction, TransportDirection::Send);

    registry
        .connect_transport(
            "r1".to_string(),
            "p1".to_string(),
            transport.transport_id.clone(),
            dtls_parameters(),
        )
        .await
        .unwrap();

    let mock_transport = &engine.routers()[0].transports()[0];
    assert!(mock_transport.is_connected());

    // Unknown transport id on the strict path
    let err = registry
        .connect_transport(
            "r1".to_string(),
            "p1".to_string(),
            "ghost".to_string(),
            dtls_parameters(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::TransportNotFound(_)));

    registry.cancel();
}

#[tokio::test]
async fn produce_failure_registers_nothing() {
    let engine = MockEngineBuilder::new().build();
    let (registry, _events) = setup_with(engine.clone());

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();
    let transport = registry
        .create_transport(
            "r1".to_string(),
            "p1".to_string(),
            TransportDirection::Send,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();

    engine.set_fail_produce(true);
    let err = registry
        .create_producer(
            "r1".to_string(),
            "p1".to_string(),
            transport.transport_id,
            MediaKind::Audio,
            audio_rtp_parameters(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::Engine(_)));

    let info = registry
        .get_peer_info("r1".to_string(), "p1".to_string())
        .await
        .unwrap();
    assert!(info.producers.is_empty());

    registry.cancel();
}

#[tokio::test]
async fn resume_failure_rolls_back_consumer() {
    let engine = MockEngineBuilder::new().build();
    let (registry, _events) = setup_with(engine.clone());

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p2".to_string())
        .await
        .unwrap();

    let send = registry
        .create_transport(
            "r1".to_string(),
            "p1".to_string(),
            TransportDirection::Send,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    let recv = registry
        .create_transport(
            "r1".to_string(),
            "p2".to_string(),
            TransportDirection::Recv,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    let producer = registry
        .create_producer(
            "r1".to_string(),
            "p1".to_string(),
            send.transport_id,
            MediaKind::Video,
            video_rtp_parameters(),
        )
        .await
        .unwrap();

    engine.set_fail_resume(true);
    let err = registry
        .create_consumer(
            "r1".to_string(),
            "p2".to_string(),
            recv.transport_id,
            producer.producer_id,
            device_rtp_capabilities(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::Engine(_)));

    // Nothing registered on the consuming peer
    let info = registry
        .get_peer_info("r1".to_string(), "p2".to_string())
        .await
        .unwrap();
    assert!(info.consumers.is_empty());

    // The half-created engine consumer was closed during rollback
    let consumers: Vec<_> = engine.routers()[0]
        .transports()
        .iter()
        .flat_map(|t| t.consumers())
        .collect();
    assert_eq!(consumers.len(), 1);
    assert!(consumers[0].is_closed());

    registry.cancel();
}

#[tokio::test]
async fn full_lifecycle_ends_empty() {
    let (registry, _events, engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "alice".to_string())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "bob".to_string())
        .await
        .unwrap();

    let alice_send = registry
        .create_transport(
            "r1".to_string(),
            "alice".to_string(),
            TransportDirection::Send,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    let bob_recv = registry
        .create_transport(
            "r1".to_string(),
            "bob".to_string(),
            TransportDirection::Recv,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();

    registry
        .connect_transport(
            "r1".to_string(),
            "alice".to_string(),
            alice_send.transport_id.clone(),
            dtls_parameters(),
        )
        .await
        .unwrap();
    registry
        .connect_transport(
            "r1".to_string(),
            "bob".to_string(),
            bob_recv.transport_id.clone(),
            dtls_parameters(),
        )
        .await
        .unwrap();

    let producer = registry
        .create_producer(
            "r1".to_string(),
            "alice".to_string(),
            alice_send.transport_id.clone(),
            MediaKind::Audio,
            audio_rtp_parameters(),
        )
        .await
        .unwrap();

    // Bob consumes Alice's producer
    let consumer = registry
        .create_consumer(
            "r1".to_string(),
            "bob".to_string(),
            bob_recv.transport_id.clone(),
            producer.producer_id.clone(),
            device_rtp_capabilities(),
        )
        .await
        .unwrap()
        .expect("capabilities are compatible");
    assert_eq!(consumer.producer_id, producer.producer_id);
    assert_eq!(consumer.kind, MediaKind::Audio);

    // Snapshots reflect the tree
    let room = registry.get_room_info("r1".to_string()).await.unwrap();
    assert_eq!(room.peers.len(), 2);
    let bob = registry
        .get_peer_info("r1".to_string(), "bob".to_string())
        .await
        .unwrap();
    assert_eq!(bob.consumers.len(), 1);

    // Tear down piece by piece
    registry
        .close_consumer(
            "r1".to_string(),
            "bob".to_string(),
            consumer.consumer_id.clone(),
        )
        .await
        .unwrap();
    registry
        .close_producer(
            "r1".to_string(),
            "alice".to_string(),
            producer.producer_id.clone(),
        )
        .await
        .unwrap();
    registry
        .remove_peer("r1".to_string(), "bob".to_string())
        .await
        .unwrap();
    registry
        .remove_peer("r1".to_string(), "alice".to_string())
        .await
        .unwrap();
    registry.close_room("r1".to_string()).await.unwrap();

    assert!(registry.get_all_rooms().await.unwrap().is_empty());
    assert!(engine.routers()[0].is_closed());

    registry.cancel();
}

#[tokio::test]
async fn get_all_rooms_projects_the_full_tree() {
    let (registry, _events, _engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();
    let transport = registry
        .create_transport(
            "r1".to_string(),
            "p1".to_string(),
            TransportDirection::Send,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    registry
        .create_producer(
            "r1".to_string(),
            "p1".to_string(),
            transport.transport_id.clone(),
            MediaKind::Audio,
            audio_rtp_parameters(),
        )
        .await
        .unwrap();

    // Exactly one room with one peer with one audio producer
    let rooms = registry.get_all_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, "r1");
    assert_eq!(rooms[0].peers.len(), 1);

    let peer = &rooms[0].peers[0];
    assert_eq!(peer.peer_id, "p1");
    assert_eq!(peer.transports.len(), 1);
    assert_eq!(peer.producers.len(), 1);
    assert_eq!(peer.producers[0].kind, MediaKind::Audio);
    assert_eq!(peer.producers[0].transport_id, transport.transport_id);
    assert!(peer.consumers.is_empty());

    registry.cancel();
}

#[tokio::test]
async fn removed_peer_vanishes_from_projections_despite_engine_close_failures() {
    let (registry, _events, engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();

    let send = registry
        .create_transport(
            "r1".to_string(),
            "p1".to_string(),
            TransportDirection::Send,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    let recv = registry
        .create_transport(
            "r1".to_string(),
            "p1".to_string(),
            TransportDirection::Recv,
            WebRtcTransportOptions::default(),
        )
        .await
        .unwrap();
    let producer = registry
        .create_producer(
            "r1".to_string(),
            "p1".to_string(),
            send.transport_id.clone(),
            MediaKind::Audio,
            audio_rtp_parameters(),
        )
        .await
        .unwrap();
    let consumer = registry
        .create_consumer(
            "r1".to_string(),
            "p1".to_string(),
            recv.transport_id.clone(),
            producer.producer_id.clone(),
            device_rtp_capabilities(),
        )
        .await
        .unwrap()
        .unwrap();

    // All projections answer while the peer is alive
    assert!(registry
        .get_transport_info("r1".to_string(), "p1".to_string(), send.transport_id.clone())
        .await
        .is_some());
    assert!(registry
        .get_producer_info(
            "r1".to_string(),
            "p1".to_string(),
            producer.producer_id.clone()
        )
        .await
        .is_some());
    assert!(registry
        .get_consumer_info(
            "r1".to_string(),
            "p1".to_string(),
            consumer.consumer_id.clone()
        )
        .await
        .is_some());

    // Every engine close now fails; the local cascade must still win
    engine.set_fail_close(true);
    registry
        .remove_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();

    assert!(registry
        .get_transport_info("r1".to_string(), "p1".to_string(), send.transport_id)
        .await
        .is_none());
    assert!(registry
        .get_transport_info("r1".to_string(), "p1".to_string(), recv.transport_id)
        .await
        .is_none());
    assert!(registry
        .get_producer_info("r1".to_string(), "p1".to_string(), producer.producer_id)
        .await
        .is_none());
    assert!(registry
        .get_consumer_info("r1".to_string(), "p1".to_string(), consumer.consumer_id)
        .await
        .is_none());

    let room = registry.get_room_info("r1".to_string()).await.unwrap();
    assert!(room.peers.is_empty());

    registry.cancel();
}

#[tokio::test]
async fn shutdown_drains_every_room() {
    let (registry, _events, engine) = setup();

    registry
        .create_room("r1".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .create_room("r2".to_string(), RoomOptions::default())
        .await
        .unwrap();
    registry
        .add_peer("r1".to_string(), "p1".to_string())
        .await
        .unwrap();

    registry.shutdown().await.unwrap();

    for router in engine.routers() {
        assert!(router.is_closed());
    }
}
