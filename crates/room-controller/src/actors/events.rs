//! Lifecycle events emitted by the actor tree.
//!
//! Every actor emits events on a plain `mpsc` channel it was given at spawn
//! time. Parents subscribe to each child through a dedicated channel and run
//! a small forwarder task that tags the child's events with the child's
//! identity before re-emitting them on the parent's own channel. The
//! registry's channel is the external surface: every event that reaches it
//! carries the full address of its origin.
//!
//! A child's `Closed` event becomes the parent's `PeerClosed` / `RoomClosed`
//! during forwarding; parents never synthesize those variants themselves, so
//! each closure is announced exactly once regardless of who initiated it.

use crate::actors::messages::{ConsumerInfo, PeerInfo, ProducerInfo, RoomInfo, TransportInfo};
use crate::engine::{MediaKind, TransportDirection};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Events emitted by a `PeerActor` about its own resources.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PeerEvent {
    /// A transport was created.
    #[serde(rename_all = "camelCase")]
    TransportCreated {
        transport_id: String,
        direction: TransportDirection,
        info: TransportInfo,
    },

    /// A transport was closed (explicitly or by the engine).
    #[serde(rename_all = "camelCase")]
    TransportClosed { transport_id: String },

    /// A producer was created.
    #[serde(rename_all = "camelCase")]
    ProducerCreated {
        producer_id: String,
        transport_id: String,
        kind: MediaKind,
        info: ProducerInfo,
    },

    /// A producer was closed (explicitly or by the engine).
    #[serde(rename_all = "camelCase")]
    ProducerClosed { producer_id: String },

    /// A consumer was created and resumed.
    #[serde(rename_all = "camelCase")]
    ConsumerCreated {
        consumer_id: String,
        transport_id: String,
        producer_id: String,
        info: ConsumerInfo,
    },

    /// A consumer was closed (explicitly or by the engine).
    #[serde(rename_all = "camelCase")]
    ConsumerClosed { consumer_id: String },

    /// The peer finished tearing down. Emitted last; the room forwarder
    /// rewrites it as `RoomEvent::PeerClosed`.
    Closed,
}

/// Events emitted by a `RoomActor`: its own lifecycle plus tagged peer
/// events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RoomEvent {
    /// A peer joined the room.
    #[serde(rename_all = "camelCase")]
    PeerAdded { peer_id: String, info: PeerInfo },

    /// A peer finished tearing down.
    #[serde(rename_all = "camelCase")]
    PeerClosed { peer_id: String },

    #[serde(rename_all = "camelCase")]
    TransportCreated {
        peer_id: String,
        transport_id: String,
        direction: TransportDirection,
        info: TransportInfo,
    },

    #[serde(rename_all = "camelCase")]
    TransportClosed { peer_id: String, transport_id: String },

    #[serde(rename_all = "camelCase")]
    ProducerCreated {
        peer_id: String,
        producer_id: String,
        transport_id: String,
        kind: MediaKind,
        info: ProducerInfo,
    },

    #[serde(rename_all = "camelCase")]
    ProducerClosed { peer_id: String, producer_id: String },

    #[serde(rename_all = "camelCase")]
    ConsumerCreated {
        peer_id: String,
        consumer_id: String,
        transport_id: String,
        producer_id: String,
        info: ConsumerInfo,
    },

    #[serde(rename_all = "camelCase")]
    ConsumerClosed { peer_id: String, consumer_id: String },

    /// The room finished tearing down. Emitted last; the registry forwarder
    /// rewrites it as `ControlEvent::RoomClosed`.
    Closed,
}

impl RoomEvent {
    /// Tag a peer's event with the peer's identity.
    #[must_use]
    pub fn from_peer(peer_id: &str, event: PeerEvent) -> Self {
        let peer_id = peer_id.to_string();
        match event {
            PeerEvent::TransportCreated {
                transport_id,
                direction,
                info,
            } => RoomEvent::TransportCreated {
                peer_id,
                transport_id,
                direction,
                info,
            },
            PeerEvent::TransportClosed { transport_id } => RoomEvent::TransportClosed {
                peer_id,
                transport_id,
            },
            PeerEvent::ProducerCreated {
                producer_id,
                transport_id,
                kind,
                info,
            } => RoomEvent::ProducerCreated {
                peer_id,
                producer_id,
                transport_id,
                kind,
                info,
            },
            PeerEvent::ProducerClosed { producer_id } => RoomEvent::ProducerClosed {
                peer_id,
                producer_id,
            },
            PeerEvent::ConsumerCreated {
                consumer_id,
                transport_id,
                producer_id,
                info,
            } => RoomEvent::ConsumerCreated {
                peer_id,
                consumer_id,
                transport_id,
                producer_id,
                info,
            },
            PeerEvent::ConsumerClosed { consumer_id } => RoomEvent::ConsumerClosed {
                peer_id,
                consumer_id,
            },
            PeerEvent::Closed => RoomEvent::PeerClosed { peer_id },
        }
    }
}

/// Events on the registry's external channel. Fully addressed: every event
/// names the room (and peer, where applicable) it originated from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ControlEvent {
    /// A room was created.
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: String, info: RoomInfo },

    /// A room finished tearing down.
    #[serde(rename_all = "camelCase")]
    RoomClosed { room_id: String },

    #[serde(rename_all = "camelCase")]
    PeerAdded {
        room_id: String,
        peer_id: String,
        info: PeerInfo,
    },

    #[serde(rename_all = "camelCase")]
    PeerClosed { room_id: String, peer_id: String },

    #[serde(rename_all = "camelCase")]
    TransportCreated {
        room_id: String,
        peer_id: String,
        transport_id: String,
        direction: TransportDirection,
        info: TransportInfo,
    },

    #[serde(rename_all = "camelCase")]
    TransportClosed {
        room_id: String,
        peer_id: String,
        transport_id: String,
    },

    #[serde(rename_all = "camelCase")]
    ProducerCreated {
        room_id: String,
        peer_id: String,
        producer_id: String,
        transport_id: String,
        kind: MediaKind,
        info: ProducerInfo,
    },

    #[serde(rename_all = "camelCase")]
    ProducerClosed {
        room_id: String,
        peer_id: String,
        producer_id: String,
    },

    #[serde(rename_all = "camelCase")]
    ConsumerCreated {
        room_id: String,
        peer_id: String,
        consumer_id: String,
        transport_id: String,
        producer_id: String,
        info: ConsumerInfo,
    },

    #[serde(rename_all = "camelCase")]
    ConsumerClosed {
        room_id: String,
        peer_id: String,
        consumer_id: String,
    },
}

impl ControlEvent {
    /// Tag a room's event with the room's identity.
    #[must_use]
    pub fn from_room(room_id: &str, event: RoomEvent) -> Self {
        let room_id = room_id.to_string();
        match event {
            RoomEvent::PeerAdded { peer_id, info } => ControlEvent::PeerAdded {
                room_id,
                peer_id,
                info,
            },
            RoomEvent::PeerClosed { peer_id } => ControlEvent::PeerClosed { room_id, peer_id },
            RoomEvent::TransportCreated {
                peer_id,
                transport_id,
                direction,
                info,
            } => ControlEvent::TransportCreated {
                room_id,
                peer_id,
                transport_id,
                direction,
                info,
            },
            RoomEvent::TransportClosed {
                peer_id,
                transport_id,
            } => ControlEvent::TransportClosed {
                room_id,
                peer_id,
                transport_id,
            },
            RoomEvent::ProducerCreated {
                peer_id,
                producer_id,
                transport_id,
                kind,
                info,
            } => ControlEvent::ProducerCreated {
                room_id,
                peer_id,
                producer_id,
                transport_id,
                kind,
                info,
            },
            RoomEvent::ProducerClosed {
                peer_id,
                producer_id,
            } => ControlEvent::ProducerClosed {
                room_id,
                peer_id,
                producer_id,
            },
            RoomEvent::ConsumerCreated {
                peer_id,
                consumer_id,
                transport_id,
                producer_id,
                info,
            } => ControlEvent::ConsumerCreated {
                room_id,
                peer_id,
                consumer_id,
                transport_id,
                producer_id,
                info,
            },
            RoomEvent::ConsumerClosed {
                peer_id,
                consumer_id,
            } => ControlEvent::ConsumerClosed {
                room_id,
                peer_id,
                consumer_id,
            },
            RoomEvent::Closed => ControlEvent::RoomClosed { room_id },
        }
    }
}

/// Spawn a forwarder relaying a room's events onto the registry channel,
/// tagged with the room id. Exits when the room drops its sender.
pub(crate) fn spawn_room_forwarder(
    room_id: String,
    mut rx: mpsc::Receiver<RoomEvent>,
    out: mpsc::Sender<ControlEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if out
                .send(ControlEvent::from_room(&room_id, event))
                .await
                .is_err()
            {
                debug!(
                    target: "rc.actor.registry",
                    room_id = %room_id,
                    "Event channel closed, stopping room event forwarder"
                );
                break;
            }
        }
    })
}

/// Spawn a forwarder relaying a peer's events onto the room channel, tagged
/// with the peer id. Exits when the peer drops its sender.
pub(crate) fn spawn_peer_forwarder(
    peer_id: String,
    mut rx: mpsc::Receiver<PeerEvent>,
    out: mpsc::Sender<RoomEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if out
                .send(RoomEvent::from_peer(&peer_id, event))
                .await
                .is_err()
            {
                debug!(
                    target: "rc.actor.room",
                    peer_id = %peer_id,
                    "Event channel closed, stopping peer event forwarder"
                );
                break;
            }
        }
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_closed_becomes_room_peer_closed() {
        let event = RoomEvent::from_peer("p1", PeerEvent::Closed);
        assert!(matches!(
            event,
            RoomEvent::PeerClosed { ref peer_id } if peer_id == "p1"
        ));
    }

    #[test]
    fn test_room_closed_becomes_control_room_closed() {
        let event = ControlEvent::from_room("r1", RoomEvent::Closed);
        assert!(matches!(
            event,
            ControlEvent::RoomClosed { ref room_id } if room_id == "r1"
        ));
    }

    #[test]
    fn test_tagging_preserves_resource_identity() {
        let peer_event = PeerEvent::ConsumerClosed {
            consumer_id: "c1".to_string(),
        };
        let room_event = RoomEvent::from_peer("p1", peer_event);
        let control_event = ControlEvent::from_room("r1", room_event);

        match control_event {
            ControlEvent::ConsumerClosed {
                room_id,
                peer_id,
                consumer_id,
            } => {
                assert_eq!(room_id, "r1");
                assert_eq!(peer_id, "p1");
                assert_eq!(consumer_id, "c1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_serialized_events_are_tagged() {
        let event = ControlEvent::PeerClosed {
            room_id: "r1".to_string(),
            peer_id: "p1".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "peerClosed");
        assert_eq!(value["roomId"], "r1");
        assert_eq!(value["peerId"], "p1");
    }

    #[tokio::test]
    async fn test_peer_forwarder_tags_and_relays() {
        let (peer_tx, peer_rx) = mpsc::channel(8);
        let (room_tx, mut room_rx) = mpsc::channel(8);

        let forwarder = spawn_peer_forwarder("p1".to_string(), peer_rx, room_tx);

        peer_tx
            .send(PeerEvent::TransportClosed {
                transport_id: "t1".to_string(),
            })
            .await
            .unwrap();
        peer_tx.send(PeerEvent::Closed).await.unwrap();
        drop(peer_tx);

        let first = room_rx.recv().await.unwrap();
        assert!(matches!(
            first,
            RoomEvent::TransportClosed { ref peer_id, ref transport_id }
                if peer_id == "p1" && transport_id == "t1"
        ));

        let second = room_rx.recv().await.unwrap();
        assert!(matches!(second, RoomEvent::PeerClosed { ref peer_id } if peer_id == "p1"));

        // Sender dropped, forwarder exits
        forwarder.await.unwrap();
        assert!(room_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_room_forwarder_exits_when_output_closes() {
        let (room_tx, room_rx) = mpsc::channel(8);
        let (control_tx, control_rx) = mpsc::channel(8);

        let forwarder = spawn_room_forwarder("r1".to_string(), room_rx, control_tx);

        drop(control_rx);
        room_tx.send(RoomEvent::Closed).await.unwrap();

        forwarder.await.unwrap();
    }
}
