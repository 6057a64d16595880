//! `RoomActor` - per-room actor owning a router capability and peer actors.
//!
//! Each `RoomActor`:
//! - Holds the router capability acquired for it at creation time
//! - Admits and removes peers, serialized through its mailbox
//! - Forwards peer events onto its own channel, tagged with the peer id
//! - Releases the router last during teardown, after every peer is gone
//!
//! # Lifecycle
//!
//! 1. Spawned by the registry after router acquisition succeeds
//! 2. Runs until closed explicitly or cancelled via the registry's child token
//! 3. Teardown closes peers first, then the router, then emits `Closed`

use crate::config::Config;
use crate::engine::{Router, RtpCapabilities};
use crate::errors::RcError;

use super::events::{spawn_peer_forwarder, RoomEvent};
use super::messages::{PeerInfo, RoomInfo, RoomMessage};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use super::peer::{PeerActor, PeerActorHandle};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the room mailbox.
const ROOM_CHANNEL_BUFFER: usize = 500;

/// Buffer size for each peer's event channel.
const PEER_EVENT_BUFFER: usize = 256;

/// Maximum time to wait for a peer actor to finish during teardown.
const PEER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a `RoomActor`.
#[derive(Clone, Debug)]
pub struct RoomActorHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    room_id: String,
}

impl RoomActorHandle {
    /// Get the room ID.
    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Add a peer to the room.
    pub async fn add_peer(&self, peer_id: String) -> Result<PeerInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::AddPeer {
                peer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Remove a peer, tearing down everything it owns.
    pub async fn remove_peer(&self, peer_id: String) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::RemovePeer {
                peer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Strict peer lookup.
    pub async fn get_peer(&self, peer_id: String) -> Result<PeerActorHandle, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetPeer {
                peer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Safe peer lookup. Channel failures degrade to `None`.
    pub async fn find_peer(&self, peer_id: String) -> Option<PeerActorHandle> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::FindPeer {
                peer_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok().flatten()
    }

    /// The router's negotiated RTP capability set.
    pub async fn rtp_capabilities(&self) -> Result<RtpCapabilities, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::RtpCapabilities { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Point-in-time snapshot of the room and its peers.
    pub async fn info(&self) -> Result<RoomInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetInfo { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))
    }

    /// Close the room, tearing down every peer and releasing the router.
    pub async fn close(&self) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Close { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Cancel the room actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// A peer tracked by the room.
struct ManagedPeer {
    handle: PeerActorHandle,
    task_handle: JoinHandle<()>,
    /// Task relaying the peer's events onto the room's channel.
    forwarder: JoinHandle<()>,
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    /// Room ID.
    room_id: String,
    /// Message receiver.
    receiver: mpsc::Receiver<RoomMessage>,
    /// Cancellation token (child of the registry's token).
    cancel_token: CancellationToken,
    /// Router capability. Released (taken) during teardown.
    router: Option<Arc<dyn Router>>,
    /// Peers in the room, by peer id.
    peers: HashMap<String, ManagedPeer>,
    /// Room creation timestamp (unix seconds).
    created_at: i64,
    /// Whether the room has been torn down.
    is_closed: bool,
    /// Shared configuration.
    config: Arc<Config>,
    /// Shared metrics.
    metrics: Arc<ActorMetrics>,
    /// Mailbox monitor.
    mailbox: MailboxMonitor,
    /// Event channel to the registry's forwarder.
    events: mpsc::Sender<RoomEvent>,
}

impl RoomActor {
    /// Spawn a new room actor holding `router`.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        room_id: String,
        router: Arc<dyn Router>,
        cancel_token: CancellationToken,
        config: Arc<Config>,
        metrics: Arc<ActorMetrics>,
        events: mpsc::Sender<RoomEvent>,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);

        let actor = Self {
            room_id: room_id.clone(),
            receiver,
            cancel_token: cancel_token.clone(),
            router: Some(router),
            peers: HashMap::new(),
            created_at: chrono::Utc::now().timestamp(),
            is_closed: false,
            config,
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Room, &room_id),
            events,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomActorHandle {
            sender,
            cancel_token,
            room_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "rc.actor.room", fields(room_id = %self.room_id))]
    async fn run(mut self) {
        debug!(
            target: "rc.actor.room",
            room_id = %self.room_id,
            "RoomActor started"
        );

        loop {
            tokio::select! {
                // Handle cancellation
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "rc.actor.room",
                        room_id = %self.room_id,
                        "RoomActor received cancellation signal"
                    );
                    self.teardown().await;
                    break;
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
                                target: "rc.actor.room",
                                room_id = %self.room_id,
                                "RoomActor channel closed, exiting"
                            );
                            self.teardown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "rc.actor.room",
            room_id = %self.room_id,
            messages_processed = self.mailbox.messages_processed(),
            "RoomActor stopped"
        );
    }

    /// Handle a single message. Returns true if the actor should exit.
    async fn handle_message(&mut self, message: RoomMessage) -> bool {
        match message {
            RoomMessage::AddPeer {
                peer_id,
                respond_to,
            } => {
                let result = self.handle_add_peer(peer_id).await;
                let _ = respond_to.send(result);
                false
            }

            RoomMessage::RemovePeer {
                peer_id,
                respond_to,
            } => {
                let result = self.handle_remove_peer(&peer_id).await;
                let _ = respond_to.send(result);
                false
            }

            RoomMessage::GetPeer {
                peer_id,
                respond_to,
            } => {
                let result = self
                    .peers
                    .get(&peer_id)
                    .map(|managed| managed.handle.clone())
                    .ok_or(RcError::PeerNotFound(peer_id));
                let _ = respond_to.send(result);
                false
            }

            RoomMessage::FindPeer {
                peer_id,
                respond_to,
            } => {
                let handle = self.peers.get(&peer_id).map(|managed| managed.handle.clone());
                let _ = respond_to.send(handle);
                false
            }

            RoomMessage::RtpCapabilities { respond_to } => {
                let result = self
                    .router
                    .as_ref()
                    .map(|router| router.rtp_capabilities())
                    .ok_or_else(|| {
                        RcError::NotInitialized(format!(
                            "room {} no longer holds a router",
                            self.room_id
                        ))
                    });
                let _ = respond_to.send(result);
                false
            }

            RoomMessage::GetInfo { respond_to } => {
                let info = self.build_info().await;
                let _ = respond_to.send(info);
                false
            }

            RoomMessage::Close { respond_to } => {
                self.teardown().await;
                let _ = respond_to.send(Ok(()));
                true
            }
        }
    }

    /// Handle peer admission.
    async fn handle_add_peer(&mut self, peer_id: String) -> Result<PeerInfo, RcError> {
        if self.is_closed {
            return Err(RcError::NotInitialized(format!(
                "room {} is closed",
                self.room_id
            )));
        }

        if self.peers.contains_key(&peer_id) {
            return Err(RcError::Conflict("Peer already exists".to_string()));
        }

        if self.peers.len() >= self.config.max_peers_per_room as usize {
            return Err(RcError::CapacityExceeded(format!(
                "room {} is at max peers ({})",
                self.room_id, self.config.max_peers_per_room
            )));
        }

        let router = self.router.clone().ok_or_else(|| {
            RcError::NotInitialized(format!("room {} no longer holds a router", self.room_id))
        })?;

        let (peer_events, peer_events_rx) = mpsc::channel(PEER_EVENT_BUFFER);
        let forwarder =
            spawn_peer_forwarder(peer_id.clone(), peer_events_rx, self.events.clone());

        let (handle, task_handle) = PeerActor::spawn(
            peer_id.clone(),
            self.room_id.clone(),
            router,
            self.cancel_token.child_token(),
            Arc::clone(&self.config),
            Arc::clone(&self.metrics),
            peer_events,
        );

        self.peers.insert(
            peer_id.clone(),
            ManagedPeer {
                handle,
                task_handle,
                forwarder,
            },
        );
        self.metrics.peer_added();

        info!(
            target: "rc.actor.room",
            room_id = %self.room_id,
            peer_id = %peer_id,
            peer_count = self.peers.len(),
            "Peer added"
        );

        let info = PeerInfo {
            peer_id: peer_id.clone(),
            transports: vec![],
            producers: vec![],
            consumers: vec![],
        };

        self.emit(RoomEvent::PeerAdded {
            peer_id,
            info: info.clone(),
        })
        .await;

        Ok(info)
    }

    /// Handle peer removal. The peer's `Closed` event reaches the room
    /// channel through the forwarder; this method only drives teardown.
    async fn handle_remove_peer(&mut self, peer_id: &str) -> Result<(), RcError> {
        let managed = self
            .peers
            .remove(peer_id)
            .ok_or_else(|| RcError::PeerNotFound(peer_id.to_string()))?;

        self.shutdown_peer(peer_id, managed).await;
        self.metrics.peer_removed();

        info!(
            target: "rc.actor.room",
            room_id = %self.room_id,
            peer_id = %peer_id,
            peer_count = self.peers.len(),
            "Peer removed"
        );

        Ok(())
    }

    /// Drive one peer's teardown to completion: close, cancel, then wait
    /// for the actor and its forwarder so every peer event is flushed onto
    /// the room channel before the caller proceeds.
    async fn shutdown_peer(&self, peer_id: &str, managed: ManagedPeer) {
        if let Err(e) = managed.handle.close().await {
            warn!(
                target: "rc.actor.room",
                room_id = %self.room_id,
                peer_id = %peer_id,
                error = %e,
                "Peer close request failed, cancelling"
            );
        }
        managed.handle.cancel();

        if tokio::time::timeout(PEER_JOIN_TIMEOUT, managed.task_handle)
            .await
            .is_err()
        {
            warn!(
                target: "rc.actor.room",
                room_id = %self.room_id,
                peer_id = %peer_id,
                "Peer actor did not stop within timeout"
            );
        }
        if tokio::time::timeout(PEER_JOIN_TIMEOUT, managed.forwarder)
            .await
            .is_err()
        {
            warn!(
                target: "rc.actor.room",
                room_id = %self.room_id,
                peer_id = %peer_id,
                "Peer event forwarder did not stop within timeout"
            );
        }
    }

    /// Build a point-in-time snapshot of the room and its peers.
    async fn build_info(&self) -> RoomInfo {
        let mut peers = Vec::with_capacity(self.peers.len());
        for managed in self.peers.values() {
            match managed.handle.snapshot().await {
                Ok(info) => peers.push(info),
                Err(e) => {
                    warn!(
                        target: "rc.actor.room",
                        room_id = %self.room_id,
                        peer_id = managed.handle.peer_id(),
                        error = %e,
                        "Peer snapshot failed, omitting from room info"
                    );
                }
            }
        }

        RoomInfo {
            room_id: self.room_id.clone(),
            created_at: self.created_at,
            peers,
        }
    }

    /// Tear down the room: every peer first, then the router, then emit
    /// `Closed`. Engine failures are logged and teardown continues.
    async fn teardown(&mut self) {
        if self.is_closed {
            return;
        }
        self.is_closed = true;

        debug!(
            target: "rc.actor.room",
            room_id = %self.room_id,
            peer_count = self.peers.len(),
            "Tearing down room"
        );

        let peer_ids: Vec<String> = self.peers.keys().cloned().collect();
        for peer_id in peer_ids {
            if let Some(managed) = self.peers.remove(&peer_id) {
                self.shutdown_peer(&peer_id, managed).await;
                self.metrics.peer_removed();
            }
        }

        if let Some(router) = self.router.take() {
            if let Err(e) = router.close().await {
                warn!(
                    target: "rc.actor.room",
                    room_id = %self.room_id,
                    error = %e,
                    "Engine close failed for router, dropping local state anyway"
                );
            }
        }

        self.emit(RoomEvent::Closed).await;
    }

    /// Emit an event to the registry's forwarder.
    async fn emit(&self, event: RoomEvent) {
        if self.events.send(event).await.is_err() {
            debug!(
                target: "rc.actor.room",
                room_id = %self.room_id,
                "Event channel closed, dropping event"
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
    use room_controller::actors::room::{RoomActor, RoomActorHandle};
    use room_controller::engine::MediaEngine;
    use room_controller::{Config, RcError, RoomEvent, RoomOptions};

    async fn spawn_room() -> (RoomActorHandle, JoinHandle<()>, mpsc::Receiver<RoomEvent>) {
        let config = Arc::new(Config::default());
        let engine = rc_test_utils::MockEngineBuilder::new().build();
        let router = engine
            .create_router(config.router_options(&RoomOptions::default()))
            .await
            .unwrap();
        let (events, events_rx) = mpsc::channel(64);

        let (handle, task) = RoomActor::spawn(
            "r1".to_string(),
            router,
            CancellationToken::new(),
            config,
            ActorMetrics::new(),
            events,
        );
        (handle, task, events_rx)
    }

    #[tokio::test]
    async fn test_add_peer_and_duplicate() {
        let (room, _task, _events) = spawn_room().await;

        let info = room.add_peer("p1".to_string()).await.unwrap();
        assert_eq!(info.peer_id, "p1");
        assert!(info.transports.is_empty());

        let err = room.add_peer("p1".to_string()).await.unwrap_err();
        assert!(matches!(err, RcError::Conflict(_)));

        room.cancel();
    }

    #[tokio::test]
    async fn test_remove_missing_peer() {
        let (room, _task, _events) = spawn_room().await;

        let err = room.remove_peer("nope".to_string()).await.unwrap_err();
        assert!(matches!(err, RcError::PeerNotFound(_)));

        room.cancel();
    }

    #[tokio::test]
    async fn test_get_vs_find_peer() {
        let (room, _task, _events) = spawn_room().await;

        room.add_peer("p1".to_string()).await.unwrap();

        assert!(room.get_peer("p1".to_string()).await.is_ok());
        assert!(room.find_peer("p1".to_string()).await.is_some());

        let err = room.get_peer("p2".to_string()).await.unwrap_err();
        assert!(matches!(err, RcError::PeerNotFound(_)));
        assert!(room.find_peer("p2".to_string()).await.is_none());

        room.cancel();
    }

    #[tokio::test]
    async fn test_rtp_capabilities_available_while_open() {
        let (room, _task, _events) = spawn_room().await;

        let caps = room.rtp_capabilities().await.unwrap();
        assert!(caps.0.is_object());

        room.cancel();
    }

    #[tokio::test]
    async fn test_close_emits_peer_closed_then_room_closed() {
        let (room, task, mut events) = spawn_room().await;

        room.add_peer("p1".to_string()).await.unwrap();
        room.close().await.unwrap();

        let mut saw_peer_closed = false;
        let mut saw_room_closed = false;
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::PeerClosed { ref peer_id } if peer_id == "p1" => {
                    assert!(!saw_room_closed, "PeerClosed must precede Closed");
                    saw_peer_closed = true;
                }
                RoomEvent::Closed => {
                    saw_room_closed = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_peer_closed);
        assert!(saw_room_closed);

        let result = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_peer_capacity_limit() {
        let config = Arc::new(Config {
            max_peers_per_room: 1,
            ..Config::default()
        });
        let engine = rc_test_utils::MockEngineBuilder::new().build();
        let router = engine
            .create_router(config.router_options(&RoomOptions::default()))
            .await
            .unwrap();
        let (events, _events_rx) = mpsc::channel(64);

        let (room, _task) = RoomActor::spawn(
            "r1".to_string(),
            router,
            CancellationToken::new(),
            config,
            ActorMetrics::new(),
            events,
        );

        room.add_peer("p1".to_string()).await.unwrap();
        let err = room.add_peer("p2".to_string()).await.unwrap_err();
        assert!(matches!(err, RcError::CapacityExceeded(_)));

        room.cancel();
    }
}
