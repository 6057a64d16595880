//! `PeerActor` - per-peer actor owning transports, producers, and consumers.
//!
//! Each `PeerActor`:
//! - Owns the engine objects created on behalf of one peer
//! - Serializes all operations on those objects through its mailbox
//! - Watches every engine object's close token and mirrors engine-initiated
//!   closure into its own maps
//! - Emits lifecycle events on the channel its room gave it at spawn time
//!
//! # Lifecycle
//!
//! 1. Created when the room accepts an `AddPeer` request
//! 2. Runs until closed explicitly or cancelled via the room's child token
//! 3. Teardown closes consumers first, then producers, then transports
//!
//! # Close dedup
//!
//! A resource can be closed twice: explicitly through the control surface
//! and implicitly by the engine. Whichever path runs first removes the
//! resource from the owning map and emits the closed event; the other path
//! finds nothing and does nothing.

use crate::config::{Config, WebRtcTransportOptions};
use crate::engine::{
    Consumer, DtlsParameters, MediaKind, Producer, Router, RtpCapabilities, RtpParameters,
    Transport, TransportDirection,
};
use crate::errors::RcError;

use super::events::PeerEvent;
use super::messages::{
    ConsumerInfo, PeerInfo, PeerMessage, ProducerInfo, ResourceKind, TransportInfo,
};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the peer mailbox.
const PEER_CHANNEL_BUFFER: usize = 200;

/// Handle to a `PeerActor`.
#[derive(Clone, Debug)]
pub struct PeerActorHandle {
    sender: mpsc::Sender<PeerMessage>,
    cancel_token: CancellationToken,
    peer_id: String,
}

impl PeerActorHandle {
    /// Get the peer ID.
    #[must_use]
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Create a transport for this peer.
    pub async fn create_transport(
        &self,
        direction: TransportDirection,
        options: WebRtcTransportOptions,
    ) -> Result<TransportInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::CreateTransport {
                direction,
                options,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Forward DTLS parameters to one of this peer's transports.
    pub async fn connect_transport(
        &self,
        transport_id: String,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::ConnectTransport {
                transport_id,
                dtls_parameters,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Start producing media over one of this peer's transports.
    pub async fn create_producer(
        &self,
        transport_id: String,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::CreateProducer {
                transport_id,
                kind,
                rtp_parameters,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Consume a producer over one of this peer's transports.
    ///
    /// Returns `Ok(None)` when the router reports the capabilities as
    /// incompatible with the producer.
    pub async fn create_consumer(
        &self,
        transport_id: String,
        producer_id: String,
        rtp_capabilities: RtpCapabilities,
    ) -> Result<Option<ConsumerInfo>, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::CreateConsumer {
                transport_id,
                producer_id,
                rtp_capabilities,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Explicitly close one of this peer's producers.
    pub async fn close_producer(&self, producer_id: String) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::CloseProducer {
                producer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Explicitly close one of this peer's consumers.
    pub async fn close_consumer(&self, consumer_id: String) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::CloseConsumer {
                consumer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Strict transport lookup.
    pub async fn get_transport(&self, transport_id: String) -> Result<TransportInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::GetTransport {
                transport_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Safe transport lookup. Channel failures degrade to `None`.
    pub async fn find_transport(&self, transport_id: String) -> Option<TransportInfo> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::FindTransport {
                transport_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok().flatten()
    }

    /// Strict producer lookup.
    pub async fn get_producer(&self, producer_id: String) -> Result<ProducerInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::GetProducer {
                producer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Safe producer lookup. Channel failures degrade to `None`.
    pub async fn find_producer(&self, producer_id: String) -> Option<ProducerInfo> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::FindProducer {
                producer_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok().flatten()
    }

    /// Strict consumer lookup.
    pub async fn get_consumer(&self, consumer_id: String) -> Result<ConsumerInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::GetConsumer {
                consumer_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Safe consumer lookup. Channel failures degrade to `None`.
    pub async fn find_consumer(&self, consumer_id: String) -> Option<ConsumerInfo> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::FindConsumer {
                consumer_id,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok().flatten()
    }

    /// Point-in-time snapshot of the peer's resources.
    pub async fn snapshot(&self) -> Result<PeerInfo, RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::GetSnapshot { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))
    }

    /// Close the peer, tearing down everything it owns.
    pub async fn close(&self) -> Result<(), RcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PeerMessage::Close { respond_to: tx })
            .await
            .map_err(|e| RcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Cancel the peer actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// A transport tracked by the peer.
struct ManagedTransport {
    handle: Arc<dyn Transport>,
    direction: TransportDirection,
    /// Task watching the engine-side close token.
    watcher: JoinHandle<()>,
}

/// A producer tracked by the peer.
struct ManagedProducer {
    handle: Arc<dyn Producer>,
    transport_id: String,
    watcher: JoinHandle<()>,
}

/// A consumer tracked by the peer.
struct ManagedConsumer {
    handle: Arc<dyn Consumer>,
    transport_id: String,
    watcher: JoinHandle<()>,
}

/// The `PeerActor` implementation.
pub struct PeerActor {
    /// Peer ID.
    peer_id: String,
    /// Room ID (for logging only).
    room_id: String,
    /// Message receiver.
    receiver: mpsc::Receiver<PeerMessage>,
    /// Sender side of own mailbox, cloned into close watchers.
    self_sender: mpsc::Sender<PeerMessage>,
    /// Cancellation token (child of the room's token).
    cancel_token: CancellationToken,
    /// The room's router capability.
    router: Arc<dyn Router>,
    /// Shared configuration.
    config: Arc<Config>,
    /// Transports owned by this peer, by transport id.
    transports: HashMap<String, ManagedTransport>,
    /// Producers owned by this peer, by producer id.
    producers: HashMap<String, ManagedProducer>,
    /// Consumers owned by this peer, by consumer id.
    consumers: HashMap<String, ManagedConsumer>,
    /// Whether the peer has been torn down.
    is_closed: bool,
    /// Shared metrics.
    metrics: Arc<ActorMetrics>,
    /// Mailbox monitor.
    mailbox: MailboxMonitor,
    /// Event channel to the room's forwarder.
    events: mpsc::Sender<PeerEvent>,
}

impl PeerActor {
    /// Spawn a new peer actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        peer_id: String,
        room_id: String,
        router: Arc<dyn Router>,
        cancel_token: CancellationToken,
        config: Arc<Config>,
        metrics: Arc<ActorMetrics>,
        events: mpsc::Sender<PeerEvent>,
    ) -> (PeerActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(PEER_CHANNEL_BUFFER);

        let actor = Self {
            peer_id: peer_id.clone(),
            room_id,
            receiver,
            self_sender: sender.clone(),
            cancel_token: cancel_token.clone(),
            router,
            config,
            transports: HashMap::new(),
            producers: HashMap::new(),
            consumers: HashMap::new(),
            is_closed: false,
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Peer, &peer_id),
            events,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = PeerActorHandle {
            sender,
            cancel_token,
            peer_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(
        skip_all,
        name = "rc.actor.peer",
        fields(peer_id = %self.peer_id, room_id = %self.room_id)
    )]
    async fn run(mut self) {
        debug!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            room_id = %self.room_id,
            "PeerActor started"
        );

        loop {
            tokio::select! {
                // Handle cancellation
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "rc.actor.peer",
                        peer_id = %self.peer_id,
                        "PeerActor received cancellation signal"
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
                                target: "rc.actor.peer",
                                peer_id = %self.peer_id,
                                "PeerActor channel closed, exiting"
                            );
                            self.teardown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            room_id = %self.room_id,
            messages_processed = self.mailbox.messages_processed(),
            "PeerActor stopped"
        );
    }

    /// Handle a single message. Returns true if the actor should exit.
    async fn handle_message(&mut self, message: PeerMessage) -> bool {
        match message {
            PeerMessage::CreateTransport {
                direction,
                options,
                respond_to,
            } => {
                let result = self.handle_create_transport(direction, options).await;
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::ConnectTransport {
                transport_id,
                dtls_parameters,
                respond_to,
            } => {
                let result = self
                    .handle_connect_transport(&transport_id, dtls_parameters)
                    .await;
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::CreateProducer {
                transport_id,
                kind,
                rtp_parameters,
                respond_to,
            } => {
                let result = self
                    .handle_create_producer(&transport_id, kind, rtp_parameters)
                    .await;
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::CreateConsumer {
                transport_id,
                producer_id,
                rtp_capabilities,
                respond_to,
            } => {
                let result = self
                    .handle_create_consumer(&transport_id, &producer_id, &rtp_capabilities)
                    .await;
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::CloseProducer {
                producer_id,
                respond_to,
            } => {
                let result = self.handle_close_producer(&producer_id).await;
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::CloseConsumer {
                consumer_id,
                respond_to,
            } => {
                let result = self.handle_close_consumer(&consumer_id).await;
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::GetTransport {
                transport_id,
                respond_to,
            } => {
                let result = self
                    .transport_info(&transport_id)
                    .ok_or(RcError::TransportNotFound(transport_id));
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::FindTransport {
                transport_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.transport_info(&transport_id));
                false
            }

            PeerMessage::GetProducer {
                producer_id,
                respond_to,
            } => {
                let result = self
                    .producer_info(&producer_id)
                    .ok_or(RcError::ProducerNotFound(producer_id));
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::FindProducer {
                producer_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.producer_info(&producer_id));
                false
            }

            PeerMessage::GetConsumer {
                consumer_id,
                respond_to,
            } => {
                let result = self
                    .consumer_info(&consumer_id)
                    .ok_or(RcError::ConsumerNotFound(consumer_id));
                let _ = respond_to.send(result);
                false
            }

            PeerMessage::FindConsumer {
                consumer_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.consumer_info(&consumer_id));
                false
            }

            PeerMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
                false
            }

            PeerMessage::Close { respond_to } => {
                self.teardown().await;
                let _ = respond_to.send(Ok(()));
                true
            }

            PeerMessage::EngineClosed { kind, id } => {
                self.handle_engine_closed(kind, &id).await;
                false
            }
        }
    }

    /// Spawn a task that mirrors engine-side closure into this actor's
    /// mailbox. The send fails only when the actor is already gone, in which
    /// case there is no bookkeeping left to fix.
    fn spawn_close_watcher(
        &self,
        kind: ResourceKind,
        id: String,
        closed: CancellationToken,
    ) -> JoinHandle<()> {
        let sender = self.self_sender.clone();
        tokio::spawn(async move {
            closed.cancelled().await;
            let _ = sender.send(PeerMessage::EngineClosed { kind, id }).await;
        })
    }

    /// Handle transport creation.
    async fn handle_create_transport(
        &mut self,
        direction: TransportDirection,
        options: WebRtcTransportOptions,
    ) -> Result<TransportInfo, RcError> {
        let settings = self.config.transport_settings(&options);
        let transport = self.router.create_transport(direction, settings).await?;

        let transport_id = transport.id().to_string();
        let info = TransportInfo {
            transport_id: transport_id.clone(),
            direction,
            parameters: transport.remote_parameters(),
        };

        let watcher = self.spawn_close_watcher(
            ResourceKind::Transport,
            transport_id.clone(),
            transport.closed(),
        );

        self.transports.insert(
            transport_id.clone(),
            ManagedTransport {
                handle: transport,
                direction,
                watcher,
            },
        );
        self.metrics.resource_created();

        debug!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            transport_id = %transport_id,
            direction = direction.as_str(),
            "Transport created"
        );

        self.emit(PeerEvent::TransportCreated {
            transport_id,
            direction,
            info: info.clone(),
        })
        .await;

        Ok(info)
    }

    /// Handle a transport connect request.
    async fn handle_connect_transport(
        &mut self,
        transport_id: &str,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), RcError> {
        let transport = self
            .transports
            .get(transport_id)
            .ok_or_else(|| RcError::TransportNotFound(transport_id.to_string()))?;

        transport.handle.connect(dtls_parameters).await?;

        debug!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            transport_id = %transport_id,
            "Transport connected"
        );

        Ok(())
    }

    /// Handle producer creation.
    async fn handle_create_producer(
        &mut self,
        transport_id: &str,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerInfo, RcError> {
        let transport = self
            .transports
            .get(transport_id)
            .ok_or_else(|| RcError::TransportNotFound(transport_id.to_string()))?;

        let producer = transport.handle.produce(kind, rtp_parameters).await?;

        let producer_id = producer.id().to_string();
        let info = ProducerInfo {
            producer_id: producer_id.clone(),
            transport_id: transport_id.to_string(),
            kind,
        };

        let watcher = self.spawn_close_watcher(
            ResourceKind::Producer,
            producer_id.clone(),
            producer.closed(),
        );

        self.producers.insert(
            producer_id.clone(),
            ManagedProducer {
                handle: producer,
                transport_id: transport_id.to_string(),
                watcher,
            },
        );
        self.metrics.resource_created();

        debug!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            producer_id = %producer_id,
            transport_id = %transport_id,
            kind = kind.as_str(),
            "Producer created"
        );

        self.emit(PeerEvent::ProducerCreated {
            producer_id,
            transport_id: transport_id.to_string(),
            kind,
            info: info.clone(),
        })
        .await;

        Ok(info)
    }

    /// Handle consumer creation.
    ///
    /// Incompatible capabilities produce `Ok(None)` with nothing registered
    /// and no event. The consumer is created paused and resumed only after
    /// it is registered; a resume failure rolls the registration back.
    async fn handle_create_consumer(
        &mut self,
        transport_id: &str,
        producer_id: &str,
        rtp_capabilities: &RtpCapabilities,
    ) -> Result<Option<ConsumerInfo>, RcError> {
        let transport = self
            .transports
            .get(transport_id)
            .ok_or_else(|| RcError::TransportNotFound(transport_id.to_string()))?;

        if !self.router.can_consume(producer_id, rtp_capabilities) {
            debug!(
                target: "rc.actor.peer",
                peer_id = %self.peer_id,
                producer_id = %producer_id,
                "Capabilities incompatible with producer, no consumer created"
            );
            return Ok(None);
        }

        let consumer = transport
            .handle
            .consume(producer_id, rtp_capabilities)
            .await?;

        let consumer_id = consumer.id().to_string();
        let info = ConsumerInfo {
            consumer_id: consumer_id.clone(),
            producer_id: consumer.producer_id().to_string(),
            transport_id: transport_id.to_string(),
            kind: consumer.kind(),
            rtp_parameters: consumer.rtp_parameters(),
        };

        let watcher = self.spawn_close_watcher(
            ResourceKind::Consumer,
            consumer_id.clone(),
            consumer.closed(),
        );

        self.consumers.insert(
            consumer_id.clone(),
            ManagedConsumer {
                handle: consumer.clone(),
                transport_id: transport_id.to_string(),
                watcher,
            },
        );

        // Consumer was created paused; resume it now that it is registered.
        if let Err(e) = consumer.resume().await {
            warn!(
                target: "rc.actor.peer",
                peer_id = %self.peer_id,
                consumer_id = %consumer_id,
                error = %e,
                "Consumer resume failed, rolling back"
            );
            if let Some(managed) = self.consumers.remove(&consumer_id) {
                managed.watcher.abort();
                if let Err(close_err) = managed.handle.close().await {
                    warn!(
                        target: "rc.actor.peer",
                        peer_id = %self.peer_id,
                        consumer_id = %consumer_id,
                        error = %close_err,
                        "Failed to close consumer during rollback"
                    );
                }
            }
            return Err(e.into());
        }

        self.metrics.resource_created();

        debug!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            consumer_id = %consumer_id,
            producer_id = %producer_id,
            transport_id = %transport_id,
            "Consumer created and resumed"
        );

        self.emit(PeerEvent::ConsumerCreated {
            consumer_id,
            transport_id: transport_id.to_string(),
            producer_id: producer_id.to_string(),
            info: info.clone(),
        })
        .await;

        Ok(Some(info))
    }

    /// Handle explicit producer closure.
    async fn handle_close_producer(&mut self, producer_id: &str) -> Result<(), RcError> {
        let managed = self
            .producers
            .remove(producer_id)
            .ok_or_else(|| RcError::ProducerNotFound(producer_id.to_string()))?;

        managed.watcher.abort();
        if let Err(e) = managed.handle.close().await {
            warn!(
                target: "rc.actor.peer",
                peer_id = %self.peer_id,
                producer_id = %producer_id,
                error = %e,
                "Engine close failed for producer, dropping local state anyway"
            );
        }
        self.metrics.resource_closed();

        self.emit(PeerEvent::ProducerClosed {
            producer_id: producer_id.to_string(),
        })
        .await;

        Ok(())
    }

    /// Handle explicit consumer closure.
    async fn handle_close_consumer(&mut self, consumer_id: &str) -> Result<(), RcError> {
        let managed = self
            .consumers
            .remove(consumer_id)
            .ok_or_else(|| RcError::ConsumerNotFound(consumer_id.to_string()))?;

        managed.watcher.abort();
        if let Err(e) = managed.handle.close().await {
            warn!(
                target: "rc.actor.peer",
                peer_id = %self.peer_id,
                consumer_id = %consumer_id,
                error = %e,
                "Engine close failed for consumer, dropping local state anyway"
            );
        }
        self.metrics.resource_closed();

        self.emit(PeerEvent::ConsumerClosed {
            consumer_id: consumer_id.to_string(),
        })
        .await;

        Ok(())
    }

    /// Handle an engine-initiated closure. A no-op when the resource was
    /// already removed by an explicit close.
    async fn handle_engine_closed(&mut self, kind: ResourceKind, id: &str) {
        let removed = match kind {
            ResourceKind::Transport => self.transports.remove(id).map(|managed| {
                managed.watcher.abort();
                PeerEvent::TransportClosed {
                    transport_id: id.to_string(),
                }
            }),
            ResourceKind::Producer => self.producers.remove(id).map(|managed| {
                managed.watcher.abort();
                PeerEvent::ProducerClosed {
                    producer_id: id.to_string(),
                }
            }),
            ResourceKind::Consumer => self.consumers.remove(id).map(|managed| {
                managed.watcher.abort();
                PeerEvent::ConsumerClosed {
                    consumer_id: id.to_string(),
                }
            }),
        };

        match removed {
            Some(event) => {
                debug!(
                    target: "rc.actor.peer",
                    peer_id = %self.peer_id,
                    kind = kind.as_str(),
                    id = %id,
                    "Engine closed resource"
                );
                self.metrics.resource_closed();
                self.emit(event).await;
            }
            None => {
                debug!(
                    target: "rc.actor.peer",
                    peer_id = %self.peer_id,
                    kind = kind.as_str(),
                    id = %id,
                    "Engine close for already-removed resource, ignoring"
                );
            }
        }
    }

    /// Build a point-in-time snapshot of the peer's resources.
    fn snapshot(&self) -> PeerInfo {
        PeerInfo {
            peer_id: self.peer_id.clone(),
            transports: self
                .transports
                .values()
                .map(|managed| TransportInfo {
                    transport_id: managed.handle.id().to_string(),
                    direction: managed.direction,
                    parameters: managed.handle.remote_parameters(),
                })
                .collect(),
            producers: self
                .producers
                .values()
                .map(|managed| ProducerInfo {
                    producer_id: managed.handle.id().to_string(),
                    transport_id: managed.transport_id.clone(),
                    kind: managed.handle.kind(),
                })
                .collect(),
            consumers: self
                .consumers
                .values()
                .map(|managed| ConsumerInfo {
                    consumer_id: managed.handle.id().to_string(),
                    producer_id: managed.handle.producer_id().to_string(),
                    transport_id: managed.transport_id.clone(),
                    kind: managed.handle.kind(),
                    rtp_parameters: managed.handle.rtp_parameters(),
                })
                .collect(),
        }
    }

    fn transport_info(&self, transport_id: &str) -> Option<TransportInfo> {
        self.transports.get(transport_id).map(|managed| TransportInfo {
            transport_id: managed.handle.id().to_string(),
            direction: managed.direction,
            parameters: managed.handle.remote_parameters(),
        })
    }

    fn producer_info(&self, producer_id: &str) -> Option<ProducerInfo> {
        self.producers.get(producer_id).map(|managed| ProducerInfo {
            producer_id: managed.handle.id().to_string(),
            transport_id: managed.transport_id.clone(),
            kind: managed.handle.kind(),
        })
    }

    fn consumer_info(&self, consumer_id: &str) -> Option<ConsumerInfo> {
        self.consumers.get(consumer_id).map(|managed| ConsumerInfo {
            consumer_id: managed.handle.id().to_string(),
            producer_id: managed.handle.producer_id().to_string(),
            transport_id: managed.transport_id.clone(),
            kind: managed.handle.kind(),
            rtp_parameters: managed.handle.rtp_parameters(),
        })
    }

    /// Tear down everything the peer owns: consumers first, then producers,
    /// then transports. Engine failures are logged and teardown continues.
    async fn teardown(&mut self) {
        if self.is_closed {
            return;
        }
        self.is_closed = true;

        debug!(
            target: "rc.actor.peer",
            peer_id = %self.peer_id,
            room_id = %self.room_id,
            transports = self.transports.len(),
            producers = self.producers.len(),
            consumers = self.consumers.len(),
            "Tearing down peer"
        );

        let consumer_ids: Vec<String> = self.consumers.keys().cloned().collect();
        for consumer_id in consumer_ids {
            if let Some(managed) = self.consumers.remove(&consumer_id) {
                managed.watcher.abort();
                if let Err(e) = managed.handle.close().await {
                    warn!(
                        target: "rc.actor.peer",
                        peer_id = %self.peer_id,
                        consumer_id = %consumer_id,
                        error = %e,
                        "Engine close failed for consumer during teardown"
                    );
                }
                self.metrics.resource_closed();
                self.emit(PeerEvent::ConsumerClosed { consumer_id }).await;
            }
        }

        let producer_ids: Vec<String> = self.producers.keys().cloned().collect();
        for producer_id in producer_ids {
            if let Some(managed) = self.producers.remove(&producer_id) {
                managed.watcher.abort();
                if let Err(e) = managed.handle.close().await {
                    warn!(
                        target: "rc.actor.peer",
                        peer_id = %self.peer_id,
                        producer_id = %producer_id,
                        error = %e,
                        "Engine close failed for producer during teardown"
                    );
                }
                self.metrics.resource_closed();
                self.emit(PeerEvent::ProducerClosed { producer_id }).await;
            }
        }

        let transport_ids: Vec<String> = self.transports.keys().cloned().collect();
        for transport_id in transport_ids {
            if let Some(managed) = self.transports.remove(&transport_id) {
                managed.watcher.abort();
                if let Err(e) = managed.handle.close().await {
                    warn!(
                        target: "rc.actor.peer",
                        peer_id = %self.peer_id,
                        transport_id = %transport_id,
                        error = %e,
                        "Engine close failed for transport during teardown"
                    );
                }
                self.metrics.resource_closed();
                self.emit(PeerEvent::TransportClosed { transport_id }).await;
            }
        }

        self.emit(PeerEvent::Closed).await;
    }

    /// Emit an event to the room's forwarder. A closed channel means the
    /// room is gone; nothing to do but log.
    async fn emit(&self, event: PeerEvent) {
        if self.events.send(event).await.is_err() {
            debug!(
                target: "rc.actor.peer",
                peer_id = %self.peer_id,
                "Event channel closed, dropping event"
            );
        }
    }
}
