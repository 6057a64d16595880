//! `RegistryActor` - singleton actor owning every room.
//!
//! The registry is the entry point to the actor tree. It:
//! - Creates rooms, acquiring a router capability from the engine first
//! - Serializes room creation, so duplicate ids and capacity checks race
//!   with nothing
//! - Forwards room events onto the external control channel, tagged with
//!   the room id
//! - Drives graceful shutdown, draining every room before stopping
//!
//! The handle also carries the cross-level convenience operations (peer and
//! resource commands addressed by room and peer id); those chain through
//! the room and peer handles without occupying the registry mailbox beyond
//! the initial lookup.

use crate::config::{Config, RoomOptions, WebRtcTransportOptions};
use crate::engine::{
    DtlsParameters, MediaEngine, MediaKind, RtpCapabilities, RtpParameters, TransportDirection,
};
use crate::errors::RcError;

use super::events::{spawn_room_forwarder, ControlEvent};
use super::messages::{
    ConsumerInfo, PeerInfo, ProducerInfo, RegistryMessage, RegistryStatus, RoomInfo,
    TransportInfo,
};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use super::room::{RoomActor, RoomActorHandle};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the registry mailbox.
const REGISTRY_CHANNEL_BUFFER: usize = 1000;

/// Buffer size for the external control event channel.
const CONTROL_EVENT_BUFFER: usize = 1024;

/// Buffer size for each room's event channel.
const ROOM_EVENT_BUFFER: usize = 512;

/// Maximum time to wait for a room actor to finish during teardown.
const ROOM_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between room health checks.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to the `RegistryActor`.
#[derive(Clone, Debug)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryMessage>,
    cancel_token: CancellationToken,
}

impl RegistryHandle {
    /// Spawn the registry actor.
    ///
    /// Returns the handle and the external control event channel. Every
    /// lifecycle event in the tree surfaces on that channel, tagged with
    /// the full address of its origin.
    #[must_use]
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        config: Arc<Config>,
        metrics: Arc<ActorMetrics>,
    ) -> (Self, mpsc::Receiver<ControlEvent>) {
        let (sender, receiver) = mpsc::channel(REGISTRY_CHANNEL_BUFFER);
        let (events, events_rx) = mpsc::channel(CONTROL_EVENT_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = RegistryActor {
            engine,
            receiver,
            cancel_token: cancel_token.clone(),
            rooms: HashMap::new(),
            accepting_new: true,
            config,
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Registry, "registry"),
            events,
        };

        tokio::spawn(actor.run());

        (
            Self {
                sender,
                cancel_token,
            },
            events_rx,
        )
    }

    /// Create a new room.
    pub async fn create_room(
        &self,
        room_id: String,
        options: RoomOptions,
    ) -> Result<RoomInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::CreateRoom {
                room_id,
                options,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Close a room, tearing down everything it owns.
    pub async fn close_room(&self, room_id: String) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::CloseRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Strict room lookup.
    pub async fn get_room(&self, room_id: String) -> Result<RoomActorHandle, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::GetRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Safe room lookup. Channel failures degrade to `None`.
    pub async fn find_room(&self, room_id: String) -> Option<RoomActorHandle> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::FindRoom {
                room_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok().flatten()
    }

    /// Snapshots of every live room. A room that fails to answer is
    /// omitted; the projection itself never carries a domain error.
    pub async fn get_all_rooms(&self) -> Result<Vec<RoomInfo>, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::GetAllRooms { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))
    }

    /// Current registry status.
    pub async fn status(&self) -> Result<RegistryStatus, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))
    }

    /// Gracefully shut the registry down, draining every room.
    pub async fn shutdown(&self) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::Shutdown { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    // ------------------------------------------------------------------
    // Cross-level convenience operations
    // ------------------------------------------------------------------

    /// The RTP capability set of a room's router.
    pub async fn get_router_rtp_capabilities(
        &self,
        room_id: String,
    ) -> Result<RtpCapabilities, RcError> {
        let room = self.get_room(room_id).await?;
        room.rtp_capabilities().await
    }

    /// Add a peer to a room.
    pub async fn add_peer(&self, room_id: String, peer_id: String) -> Result<PeerInfo, RcError> {
        let room = self.get_room(room_id).await?;
        room.add_peer(peer_id).await
    }

    /// Remove a peer, tearing down everything it owns.
    pub async fn remove_peer(&self, room_id: String, peer_id: String) -> Result<(), RcError> {
        let room = self.get_room(room_id).await?;
        room.remove_peer(peer_id).await
    }

    /// Create a transport for a peer.
    pub async fn create_transport(
        &self,
        room_id: String,
        peer_id: String,
        direction: TransportDirection,
        options: WebRtcTransportOptions,
    ) -> Result<TransportInfo, RcError> {
        let room = self.get_room(room_id).await?;
        let peer = room.get_peer(peer_id).await?;
        peer.create_transport(direction, options).await
    }

    /// Forward DTLS parameters to a peer's transport.
    pub async fn connect_transport(
        &self,
        room_id: String,
        peer_id: String,
        transport_id: String,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), RcError> {
        let room = self.get_room(room_id).await?;
        let peer = room.get_peer(peer_id).await?;
        peer.connect_transport(transport_id, dtls_parameters).await
    }

    /// Start producing media for a peer.
    pub async fn create_producer(
        &self,
        room_id: String,
        peer_id: String,
        transport_id: String,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerInfo, RcError> {
        let room = self.get_room(room_id).await?;
        let peer = room.get_peer(peer_id).await?;
        peer.create_producer(transport_id, kind, rtp_parameters)
            .await
    }

    /// Consume a producer on behalf of a peer. Returns `Ok(None)` when the
    /// capabilities are incompatible with the producer.
    pub async fn create_consumer(
        &self,
        room_id: String,
        peer_id: String,
        transport_id: String,
        producer_id: String,
        rtp_capabilities: RtpCapabilities,
    ) -> Result<Option<ConsumerInfo>, RcError> {
        let room = self.get_room(room_id).await?;
        let peer = room.get_peer(peer_id).await?;
        peer.create_consumer(transport_id, producer_id, rtp_capabilities)
            .await
    }

    /// Explicitly close a peer's producer.
    pub async fn close_producer(
        &self,
        room_id: String,
        peer_id: String,
        producer_id: String,
    ) -> Result<(), RcError> {
        let room = self.get_room(room_id).await?;
        let peer = room.get_peer(peer_id).await?;
        peer.close_producer(producer_id).await
    }

    /// Explicitly close a peer's consumer.
    pub async fn close_consumer(
        &self,
        room_id: String,
        peer_id: String,
        consumer_id: String,
    ) -> Result<(), RcError> {
        let room = self.get_room(room_id).await?;
        let peer = room.get_peer(peer_id).await?;
        peer.close_consumer(consumer_id).await
    }

    /// Safe room snapshot. Any break in the chain degrades to `None`.
    pub async fn get_room_info(&self, room_id: String) -> Option<RoomInfo> {
        let room = self.find_room(room_id).await?;
        room.info().await.ok()
    }

    /// Safe peer snapshot. Any break in the chain degrades to `None`.
    pub async fn get_peer_info(&self, room_id: String, peer_id: String) -> Option<PeerInfo> {
        let room = self.find_room(room_id).await?;
        let peer = room.find_peer(peer_id).await?;
        peer.snapshot().await.ok()
    }

    /// Safe transport snapshot. Any break in the chain degrades to `None`.
    pub async fn get_transport_info(
        &self,
        room_id: String,
        peer_id: String,
        transport_id: String,
    ) -> Option<TransportInfo> {
        let room = self.find_room(room_id).await?;
        let peer = room.find_peer(peer_id).await?;
        peer.find_transport(transport_id).await
    }

    /// Safe producer snapshot. Any break in the chain degrades to `None`.
    pub async fn get_producer_info(
        &self,
        room_id: String,
        peer_id: String,
        producer_id: String,
    ) -> Option<ProducerInfo> {
        let room = self.find_room(room_id).await?;
        let peer = room.find_peer(peer_id).await?;
        peer.find_producer(producer_id).await
    }

    /// Safe consumer snapshot. Any break in the chain degrades to `None`.
    pub async fn get_consumer_info(
        &self,
        room_id: String,
        peer_id: String,
        consumer_id: String,
    ) -> Option<ConsumerInfo> {
        let room = self.find_room(room_id).await?;
        let peer = room.find_peer(peer_id).await?;
        peer.find_consumer(consumer_id).await
    }

    /// Cancel the registry actor and, through child tokens, the whole tree.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the registry is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// A room tracked by the registry.
struct ManagedRoom {
    handle: RoomActorHandle,
    task_handle: JoinHandle<()>,
    /// Task relaying the room's events onto the control channel.
    forwarder: JoinHandle<()>,
}

/// The `RegistryActor` implementation.
struct RegistryActor {
    /// The media engine routers are acquired from.
    engine: Arc<dyn MediaEngine>,
    /// Message receiver.
    receiver: mpsc::Receiver<RegistryMessage>,
    /// Root cancellation token for the tree.
    cancel_token: CancellationToken,
    /// Rooms, by room id.
    rooms: HashMap<String, ManagedRoom>,
    /// False once draining; no new rooms are accepted.
    accepting_new: bool,
    /// Shared configuration.
    config: Arc<Config>,
    /// Shared metrics.
    metrics: Arc<ActorMetrics>,
    /// Mailbox monitor.
    mailbox: MailboxMonitor,
    /// External control event channel.
    events: mpsc::Sender<ControlEvent>,
}

impl RegistryActor {
    /// Run the actor message loop.
    #[instrument(skip_all, name = "rc.actor.registry")]
    async fn run(mut self) {
        debug!(
            target: "rc.actor.registry",
            max_rooms = self.config.max_rooms,
            "RegistryActor started"
        );

        let mut health_interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        health_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Handle cancellation
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "rc.actor.registry",
                        "RegistryActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                // Periodic room health check
                _ = health_interval.tick() => {
                    self.check_room_health();
                }

                // Handle messages
                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.record_enqueue();
                            let should_exit = self.handle_message(message).await;
                            self.mailbox.record_dequeue();
                            self.metrics.record_message_processed();

                            if should_exit {
                                break;
                            }
                        }
                        None => {
                            debug!(
                                target: "rc.actor.registry",
                                "RegistryActor channel closed, exiting"
                            );
                            self.graceful_shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "rc.actor.registry",
            messages_processed = self.mailbox.messages_processed(),
            "RegistryActor stopped"
        );
    }

    /// Handle a single message. Returns true if the actor should exit.
    async fn handle_message(&mut self, message: RegistryMessage) -> bool {
        match message {
            RegistryMessage::CreateRoom {
                room_id,
                options,
                respond_to,
            } => {
                let result = self.handle_create_room(room_id, options).await;
                let _ = respond_to.send(result);
                false
            }

            RegistryMessage::CloseRoom {
                room_id,
                respond_to,
            } => {
                let result = self.handle_close_room(&room_id).await;
                let _ = respond_to.send(result);
                false
            }

            RegistryMessage::GetRoom {
                room_id,
                respond_to,
            } => {
                let result = self
                    .rooms
                    .get(&room_id)
                    .map(|managed| managed.handle.clone())
                    .ok_or(RcError::RoomNotFound(room_id));
                let _ = respond_to.send(result);
                false
            }

            RegistryMessage::FindRoom {
                room_id,
                respond_to,
            } => {
                let handle = self
                    .rooms
                    .get(&room_id)
                    .map(|managed| managed.handle.clone());
                let _ = respond_to.send(handle);
                false
            }

            RegistryMessage::GetAllRooms { respond_to } => {
                let handles: Vec<RoomActorHandle> = self
                    .rooms
                    .values()
                    .map(|managed| managed.handle.clone())
                    .collect();

                let mut infos = Vec::with_capacity(handles.len());
                for handle in handles {
                    match handle.info().await {
                        Ok(info) => infos.push(info),
                        Err(e) => {
                            warn!(
                                target: "rc.actor.registry",
                                room_id = %handle.room_id(),
                                error = %e,
                                "Room snapshot failed, omitting from projection"
                            );
                        }
                    }
                }
                let _ = respond_to.send(infos);
                false
            }

            RegistryMessage::GetStatus { respond_to } => {
                let status = RegistryStatus {
                    room_count: self.rooms.len(),
                    peer_count: self.metrics.peer_count(),
                    is_draining: !self.accepting_new,
                    mailbox_depth: self.mailbox.current_depth(),
                };
                let _ = respond_to.send(status);
                false
            }

            RegistryMessage::Shutdown { respond_to } => {
                self.graceful_shutdown().await;
                let _ = respond_to.send(Ok(()));
                true
            }
        }
    }

    /// Handle room creation.
    ///
    /// Router acquisition happens inside the registry's message handling,
    /// so two racing creates for the same id cannot both acquire a router.
    /// An engine failure registers nothing.
    async fn handle_create_room(
        &mut self,
        room_id: String,
        options: RoomOptions,
    ) -> Result<RoomInfo, RcError> {
        if !self.accepting_new {
            return Err(RcError::Draining);
        }

        if self.rooms.contains_key(&room_id) {
            return Err(RcError::Conflict("Room already exists".to_string()));
        }

        if self.rooms.len() >= self.config.max_rooms as usize {
            return Err(RcError::CapacityExceeded(format!(
                "registry is at max rooms ({})",
                self.config.max_rooms
            )));
        }

        let router = self
            .engine
            .create_router(self.config.router_options(&options))
            .await?;

        let (room_events, room_events_rx) = mpsc::channel(ROOM_EVENT_BUFFER);
        let forwarder =
            spawn_room_forwarder(room_id.clone(), room_events_rx, self.events.clone());

        let (handle, task_handle) = RoomActor::spawn(
            room_id.clone(),
            router,
            self.cancel_token.child_token(),
            Arc::clone(&self.config),
            Arc::clone(&self.metrics),
            room_events,
        );

        let info = match handle.info().await {
            Ok(info) => info,
            Err(e) => {
                // Fresh actor is unresponsive; register nothing.
                handle.cancel();
                return Err(e);
            }
        };

        self.rooms.insert(
            room_id.clone(),
            ManagedRoom {
                handle,
                task_handle,
                forwarder,
            },
        );
        self.metrics.room_created();

        info!(
            target: "rc.actor.registry",
            room_id = %room_id,
            room_count = self.rooms.len(),
            "Room created"
        );

        self.emit(ControlEvent::RoomCreated {
            room_id,
            info: info.clone(),
        })
        .await;

        Ok(info)
    }

    /// Handle room closure. The `RoomClosed` event reaches the control
    /// channel through the forwarder; this method only drives teardown.
    async fn handle_close_room(&mut self, room_id: &str) -> Result<(), RcError> {
        let managed = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RcError::RoomNotFound(room_id.to_string()))?;

        self.shutdown_room(room_id, managed).await;
        self.metrics.room_removed();

        info!(
            target: "rc.actor.registry",
            room_id = %room_id,
            room_count = self.rooms.len(),
            "Room closed"
        );

        Ok(())
    }

    /// Drive one room's teardown to completion: close, cancel, then wait
    /// for the actor and its forwarder so every room event is flushed onto
    /// the control channel before the caller proceeds.
    async fn shutdown_room(&self, room_id: &str, managed: ManagedRoom) {
        if let Err(e) = managed.handle.close().await {
            warn!(
                target: "rc.actor.registry",
                room_id = %room_id,
                error = %e,
                "Room close request failed, cancelling"
            );
        }
        managed.handle.cancel();

        if tokio::time::timeout(ROOM_JOIN_TIMEOUT, managed.task_handle)
            .await
            .is_err()
        {
            warn!(
                target: "rc.actor.registry",
                room_id = %room_id,
                "Room actor did not stop within timeout"
            );
        }
        if tokio::time::timeout(ROOM_JOIN_TIMEOUT, managed.forwarder)
            .await
            .is_err()
        {
            warn!(
                target: "rc.actor.registry",
                room_id = %room_id,
                "Room event forwarder did not stop within timeout"
            );
        }
    }

    /// Remove rooms whose actor task has stopped unexpectedly.
    fn check_room_health(&mut self) {
        let dead: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(room_id, _)| room_id.clone())
            .collect();

        for room_id in dead {
            warn!(
                target: "rc.actor.registry",
                room_id = %room_id,
                "Room actor stopped unexpectedly, removing"
            );
            if let Some(managed) = self.rooms.remove(&room_id) {
                managed.handle.cancel();
                self.metrics.room_removed();
                self.metrics.record_panic(ActorType::Room);
            }
        }
    }

    /// Drain every room, then stop accepting work.
    async fn graceful_shutdown(&mut self) {
        if !self.accepting_new && self.rooms.is_empty() {
            return;
        }
        self.accepting_new = false;

        info!(
            target: "rc.actor.registry",
            room_count = self.rooms.len(),
            "Registry draining"
        );

        let room_ids: Vec<String> = self.rooms.keys().cloned().collect();
        for room_id in room_ids {
            if let Some(managed) = self.rooms.remove(&room_id) {
                self.shutdown_room(&room_id, managed).await;
                self.metrics.room_removed();
            }
        }
    }

    /// Emit an event on the external control channel.
    async fn emit(&self, event: ControlEvent) {
        if self.events.send(event).await.is_err() {
            debug!(
                target: "rc.actor.registry",
                "Control event channel closed, dropping event"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    // Use the externally linked crate so types line up with rc-test-utils,
    // which is compiled against the non-test build of this crate.
    use room_controller::actors::metrics::ActorMetrics;
    use room_controller::{Config, ControlEvent, RcError, RegistryHandle, RoomOptions};

    fn setup() -> (RegistryHandle, mpsc::Receiver<ControlEvent>) {
        let engine = rc_test_utils::MockEngineBuilder::new().build();
        RegistryHandle::new(engine, Arc::new(Config::default()), ActorMetrics::new())
    }

    #[tokio::test]
    async fn test_create_room_returns_empty_snapshot() {
        let (registry, _events) = setup();

        let info = registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap();
        assert_eq!(info.room_id, "r1");
        assert!(info.peers.is_empty());

        registry.cancel();
    }

    #[tokio::test]
    async fn test_duplicate_room_is_conflict() {
        let (registry, _events) = setup();

        registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap();
        let err = registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RcError::Conflict(_)));

        registry.cancel();
    }

    #[tokio::test]
    async fn test_get_vs_find_room() {
        let (registry, _events) = setup();

        registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap();

        assert!(registry.get_room("r1".to_string()).await.is_ok());
        assert!(registry.find_room("r1".to_string()).await.is_some());

        let err = registry.get_room("r2".to_string()).await.unwrap_err();
        assert!(matches!(err, RcError::RoomNotFound(_)));
        assert!(registry.find_room("r2".to_string()).await.is_none());

        registry.cancel();
    }

    #[tokio::test]
    async fn test_close_missing_room() {
        let (registry, _events) = setup();

        let err = registry.close_room("nope".to_string()).await.unwrap_err();
        assert!(matches!(err, RcError::RoomNotFound(_)));

        registry.cancel();
    }

    #[tokio::test]
    async fn test_room_capacity_limit() {
        let engine = rc_test_utils::MockEngineBuilder::new().build();
        let config = Arc::new(Config {
            max_rooms: 1,
            ..Config::default()
        });
        let (registry, _events) = RegistryHandle::new(engine, config, ActorMetrics::new());

        registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap();
        let err = registry
            .create_room("r2".to_string(), RoomOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RcError::CapacityExceeded(_)));

        registry.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_drains_rooms_and_rejects_new_work() {
        let (registry, _events) = setup();

        registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap();
        registry.shutdown().await.unwrap();

        // Actor exited; further requests fail at the channel
        let result = registry
            .create_room("r2".to_string(), RoomOptions::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_status_reports_counts() {
        let (registry, _events) = setup();

        registry
            .create_room("r1".to_string(), RoomOptions::default())
            .await
            .unwrap();
        registry.add_peer("r1".to_string(), "p1".to_string()).await.unwrap();

        let status = registry.status().await.unwrap();
        assert_eq!(status.room_count, 1);
        assert_eq!(status.peer_count, 1);
        assert!(!status.is_draining);

        registry.cancel();
    }
}
