//! Message types for actor communication.
//!
//! All inter-actor communication uses strongly-typed message passing via
//! `tokio::sync::mpsc`. Request-reply patterns use `tokio::sync::oneshot`.
//!
//! Strict lookups (`Get*`) answer with `Err(RcError::*NotFound)` for missing
//! ids; safe lookups (`Find*`) answer with `None`. Both read the same map.

use crate::config::{RoomOptions, WebRtcTransportOptions};
use crate::engine::{
    DtlsParameters, MediaKind, RtpCapabilities, RtpParameters, TransportDirection,
    TransportParameters,
};
use crate::errors::RcError;

use super::peer::PeerActorHandle;
use super::room::RoomActorHandle;

use serde::Serialize;
use tokio::sync::oneshot;

/// Messages sent to the `RegistryActor`.
#[derive(Debug)]
pub enum RegistryMessage {
    /// Create a new room with the given id and options.
    CreateRoom {
        room_id: String,
        options: RoomOptions,
        /// Response channel for the room snapshot or error.
        respond_to: oneshot::Sender<Result<RoomInfo, RcError>>,
    },

    /// Close a room, cascading through all of its peers.
    CloseRoom {
        room_id: String,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },

    /// Strict lookup of a room actor handle.
    GetRoom {
        room_id: String,
        respond_to: oneshot::Sender<Result<RoomActorHandle, RcError>>,
    },

    /// Safe lookup of a room actor handle.
    FindRoom {
        room_id: String,
        respond_to: oneshot::Sender<Option<RoomActorHandle>>,
    },

    /// Snapshots of every live room. Rooms that fail to answer are
    /// omitted rather than failing the whole projection.
    GetAllRooms {
        respond_to: oneshot::Sender<Vec<RoomInfo>>,
    },

    /// Current registry status (for health checks).
    GetStatus {
        respond_to: oneshot::Sender<RegistryStatus>,
    },

    /// Initiate graceful shutdown.
    Shutdown {
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },
}

/// Messages sent to a `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// Add a peer to this room.
    AddPeer {
        peer_id: String,
        /// Response channel for the peer snapshot or error.
        respond_to: oneshot::Sender<Result<PeerInfo, RcError>>,
    },

    /// Remove a peer, cascading through all of its resources.
    RemovePeer {
        peer_id: String,
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },

    /// Strict lookup of a peer actor handle.
    GetPeer {
        peer_id: String,
        respond_to: oneshot::Sender<Result<PeerActorHandle, RcError>>,
    },

    /// Safe lookup of a peer actor handle.
    FindPeer {
        peer_id: String,
        respond_to: oneshot::Sender<Option<PeerActorHandle>>,
    },

    /// The router's negotiated RTP capability set.
    RtpCapabilities {
        respond_to: oneshot::Sender<Result<RtpCapabilities, RcError>>,
    },

    /// Point-in-time snapshot of the room and its peers.
    GetInfo {
        respond_to: oneshot::Sender<RoomInfo>,
    },

    /// Close the room: all peers first, then the router.
    Close {
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },
}

/// Messages sent to a `PeerActor`.
#[derive(Debug)]
pub enum PeerMessage {
    /// Create a transport on the room's router.
    CreateTransport {
        direction: TransportDirection,
        options: WebRtcTransportOptions,
        respond_to: oneshot::Sender<Result<TransportInfo, RcError>>,
    },

    /// Forward DTLS parameters to an existing transport.
    ConnectTransport {
        transport_id: String,
        dtls_parameters: DtlsParameters,
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },

    /// Start producing media over an existing transport.
    CreateProducer {
        transport_id: String,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
        respond_to: oneshot::Sender<Result<ProducerInfo, RcError>>,
    },

    /// Consume a producer over an existing transport. Answers `Ok(None)`
    /// when the router reports the capabilities as incompatible.
    CreateConsumer {
        transport_id: String,
        producer_id: String,
        rtp_capabilities: RtpCapabilities,
        respond_to: oneshot::Sender<Result<Option<ConsumerInfo>, RcError>>,
    },

    /// Explicitly close a producer.
    CloseProducer {
        producer_id: String,
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },

    /// Explicitly close a consumer.
    CloseConsumer {
        consumer_id: String,
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },

    /// Strict lookup of a transport snapshot.
    GetTransport {
        transport_id: String,
        respond_to: oneshot::Sender<Result<TransportInfo, RcError>>,
    },

    /// Safe lookup of a transport snapshot.
    FindTransport {
        transport_id: String,
        respond_to: oneshot::Sender<Option<TransportInfo>>,
    },

    /// Strict lookup of a producer snapshot.
    GetProducer {
        producer_id: String,
        respond_to: oneshot::Sender<Result<ProducerInfo, RcError>>,
    },

    /// Safe lookup of a producer snapshot.
    FindProducer {
        producer_id: String,
        respond_to: oneshot::Sender<Option<ProducerInfo>>,
    },

    /// Strict lookup of a consumer snapshot.
    GetConsumer {
        consumer_id: String,
        respond_to: oneshot::Sender<Result<ConsumerInfo, RcError>>,
    },

    /// Safe lookup of a consumer snapshot.
    FindConsumer {
        consumer_id: String,
        respond_to: oneshot::Sender<Option<ConsumerInfo>>,
    },

    /// Point-in-time snapshot of the peer's resources.
    GetSnapshot {
        respond_to: oneshot::Sender<PeerInfo>,
    },

    /// Close the peer: consumers, then producers, then transports.
    Close {
        respond_to: oneshot::Sender<Result<(), RcError>>,
    },

    /// The engine signalled closure of a resource this peer owns. No reply;
    /// a no-op if the resource was already removed by an explicit close.
    EngineClosed { kind: ResourceKind, id: String },
}

/// Kind of a peer-owned resource, for engine close notifications and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Transport,
    Producer,
    Consumer,
}

impl ResourceKind {
    /// Returns the kind as a string for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Transport => "transport",
            ResourceKind::Producer => "producer",
            ResourceKind::Consumer => "consumer",
        }
    }
}

// ----------------------------------------------------------------------------
// Snapshot types
// ----------------------------------------------------------------------------

/// Snapshot of a transport owned by a peer.
#[derive(Debug, Clone, Serialize)]
pub struct TransportInfo {
    /// Engine-assigned transport id.
    pub transport_id: String,
    /// Transport direction.
    pub direction: TransportDirection,
    /// Parameters the client needs to connect (ICE/DTLS blob).
    pub parameters: TransportParameters,
}

/// Snapshot of a producer owned by a peer.
#[derive(Debug, Clone, Serialize)]
pub struct ProducerInfo {
    /// Engine-assigned producer id.
    pub producer_id: String,
    /// Transport the producer runs over.
    pub transport_id: String,
    /// Media kind.
    pub kind: MediaKind,
}

/// Snapshot of a consumer owned by a peer.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumerInfo {
    /// Engine-assigned consumer id.
    pub consumer_id: String,
    /// Producer this consumer subscribes to (may belong to another peer).
    pub producer_id: String,
    /// Transport the consumer runs over.
    pub transport_id: String,
    /// Media kind.
    pub kind: MediaKind,
    /// RTP parameters the engine negotiated for this consumer.
    pub rtp_parameters: RtpParameters,
}

/// Snapshot of a peer and everything it owns.
#[derive(Debug, Clone, Serialize)]
pub struct PeerInfo {
    /// Peer id (unique within its room).
    pub peer_id: String,
    /// Transports owned by this peer.
    pub transports: Vec<TransportInfo>,
    /// Producers owned by this peer.
    pub producers: Vec<ProducerInfo>,
    /// Consumers owned by this peer.
    pub consumers: Vec<ConsumerInfo>,
}

/// Snapshot of a room and its peers.
#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    /// Room id (unique within the registry).
    pub room_id: String,
    /// Room creation timestamp (unix seconds).
    pub created_at: i64,
    /// Peers currently in the room.
    pub peers: Vec<PeerInfo>,
}

/// Status of the `RegistryActor` (for health checks).
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    /// Total live rooms.
    pub room_count: usize,
    /// Total live peers across all rooms.
    pub peer_count: usize,
    /// Whether the registry is draining.
    pub is_draining: bool,
    /// Current registry mailbox depth.
    pub mailbox_depth: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_kind_as_str() {
        assert_eq!(ResourceKind::Transport.as_str(), "transport");
        assert_eq!(ResourceKind::Producer.as_str(), "producer");
        assert_eq!(ResourceKind::Consumer.as_str(), "consumer");
    }

    #[test]
    fn test_peer_info_serializes() {
        let info = PeerInfo {
            peer_id: "p1".to_string(),
            transports: vec![TransportInfo {
                transport_id: "t1".to_string(),
                direction: TransportDirection::Send,
                parameters: TransportParameters(json!({ "iceCandidates": [] })),
            }],
            producers: vec![],
            consumers: vec![],
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["peer_id"], "p1");
        assert_eq!(value["transports"][0]["direction"], "send");
    }

    #[test]
    fn test_room_info_clone() {
        let info = RoomInfo {
            room_id: "r1".to_string(),
            created_at: 0,
            peers: vec![],
        };
        let cloned = info.clone();
        assert_eq!(info.room_id, cloned.room_id);
    }
}
