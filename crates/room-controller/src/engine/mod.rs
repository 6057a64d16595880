//! Opaque capability interface to the media-routing engine.
//!
//! The engine performs the actual RTP/ICE/DTLS work; this crate only
//! orchestrates the lifecycle of the objects it hands out. Everything the
//! engine returns is reached through object-safe async traits so the core
//! never depends on a concrete engine implementation (production worker or
//! the mock in `rc-test-utils`).
//!
//! # Close notification
//!
//! Every engine object exposes a [`CancellationToken`] via `closed()`. The
//! engine cancels it when the object dies, whether through an explicit
//! `close()` call or implicitly when a parent object (transport, router) is
//! torn down. Owners watch the token to mirror engine-side closure into
//! their own bookkeeping.
//!
//! # Opaque payloads
//!
//! RTP parameters, RTP capabilities, and DTLS parameters are negotiated
//! between clients and the engine. The core carries them as schema-free
//! JSON newtypes and never branches on their contents; validation belongs
//! to the protocol boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Media kind of a producer or consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio stream.
    Audio,
    /// Video stream.
    Video,
}

impl MediaKind {
    /// Returns the kind as a string for logging and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transport relative to the peer that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportDirection {
    /// Peer sends media to the engine.
    Send,
    /// Peer receives media from the engine.
    Recv,
}

impl TransportDirection {
    /// Returns the direction as a string for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportDirection::Send => "send",
            TransportDirection::Recv => "recv",
        }
    }
}

impl fmt::Display for TransportDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque RTP send/receive parameters supplied by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpParameters(pub serde_json::Value);

/// Opaque RTP capability set (device or router side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpCapabilities(pub serde_json::Value);

/// Opaque DTLS handshake parameters supplied by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtlsParameters(pub serde_json::Value);

/// Opaque transport parameters the engine hands back on transport creation
/// (ICE candidates, DTLS fingerprints, and whatever else the client needs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportParameters(pub serde_json::Value);

/// Options for acquiring a router capability.
#[derive(Debug, Clone, Serialize)]
pub struct RouterOptions {
    /// Codec configuration the router negotiates with, as opaque JSON.
    pub media_codecs: Vec<serde_json::Value>,
}

/// Fully-merged settings for transport creation (caller options merged over
/// configured defaults, see `Config::transport_settings`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportSettings {
    /// Local IP the transport listens on.
    pub listen_ip: String,
    /// Prefer UDP over TCP when both are available.
    pub prefer_udp: bool,
    /// Prefer TCP over UDP when both are available.
    pub prefer_tcp: bool,
    /// Initial available outgoing bitrate estimate, in bps.
    pub initial_available_outgoing_bitrate: u32,
    /// Minimum outgoing bitrate, in bps.
    pub min_outgoing_bitrate: u32,
    /// Maximum outgoing bitrate, in bps.
    pub max_outgoing_bitrate: u32,
}

/// Failure reported by the engine for a capability call.
///
/// The core propagates these unchanged; retry policy belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine rejected the request (bad parameters, closed object, ...).
    #[error("engine rejected request: {0}")]
    Rejected(String),

    /// The engine could not be reached or terminated mid-operation.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Entry point to the media engine: hands out router capabilities.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Acquire a new router with the given codec configuration.
    async fn create_router(&self, options: RouterOptions) -> Result<Arc<dyn Router>, EngineError>;
}

/// Per-room routing capability: negotiates codecs, creates transports, and
/// answers consumption compatibility checks.
#[async_trait]
pub trait Router: Send + Sync {
    /// Engine-assigned router id.
    fn id(&self) -> &str;

    /// The router's negotiated RTP capability set.
    fn rtp_capabilities(&self) -> RtpCapabilities;

    /// Whether a consumer with `rtp_capabilities` can consume the producer
    /// identified by `producer_id`. Incompatibility is an expected
    /// negotiation outcome, not a fault.
    fn can_consume(&self, producer_id: &str, rtp_capabilities: &RtpCapabilities) -> bool;

    /// Create a transport endpoint on this router.
    async fn create_transport(
        &self,
        direction: TransportDirection,
        settings: TransportSettings,
    ) -> Result<Arc<dyn Transport>, EngineError>;

    /// Release the router. Closes every transport it still owns.
    async fn close(&self) -> Result<(), EngineError>;
}

/// A network endpoint capability used to send or receive media.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Engine-assigned transport id.
    fn id(&self) -> &str;

    /// Parameters the client needs to connect to this transport.
    fn remote_parameters(&self) -> TransportParameters;

    /// Token cancelled when the engine closes this transport.
    fn closed(&self) -> CancellationToken;

    /// Run the DTLS handshake with client-supplied parameters.
    async fn connect(&self, dtls_parameters: DtlsParameters) -> Result<(), EngineError>;

    /// Start producing media of `kind` over this transport.
    async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Arc<dyn Producer>, EngineError>;

    /// Create a consumer for `producer_id` over this transport.
    ///
    /// The consumer is created **paused**; the caller resumes it once its
    /// own bookkeeping is in place.
    async fn consume(
        &self,
        producer_id: &str,
        rtp_capabilities: &RtpCapabilities,
    ) -> Result<Arc<dyn Consumer>, EngineError>;

    /// Close the transport.
    async fn close(&self) -> Result<(), EngineError>;
}

/// An outbound media stream owned by a peer.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Engine-assigned producer id.
    fn id(&self) -> &str;

    /// Media kind of the stream.
    fn kind(&self) -> MediaKind;

    /// Token cancelled when the engine closes this producer.
    fn closed(&self) -> CancellationToken;

    /// Close the producer.
    async fn close(&self) -> Result<(), EngineError>;
}

/// An inbound subscription to some producer's media.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Engine-assigned consumer id.
    fn id(&self) -> &str;

    /// Id of the producer this consumer subscribes to. This is a lookup
    /// key, not an ownership edge; the producer may belong to another peer.
    fn producer_id(&self) -> &str;

    /// Media kind of the stream.
    fn kind(&self) -> MediaKind;

    /// RTP parameters the engine negotiated for this consumer.
    fn rtp_parameters(&self) -> RtpParameters;

    /// Token cancelled when the engine closes this consumer.
    fn closed(&self) -> CancellationToken;

    /// Resume a paused consumer.
    async fn resume(&self) -> Result<(), EngineError>;

    /// Close the consumer.
    async fn close(&self) -> Result<(), EngineError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_as_str() {
        assert_eq!(MediaKind::Audio.as_str(), "audio");
        assert_eq!(MediaKind::Video.as_str(), "video");
    }

    #[test]
    fn test_transport_direction_as_str() {
        assert_eq!(TransportDirection::Send.as_str(), "send");
        assert_eq!(TransportDirection::Recv.as_str(), "recv");
    }

    #[test]
    fn test_media_kind_serde_lowercase() {
        let json = serde_json::to_string(&MediaKind::Audio).unwrap();
        assert_eq!(json, "\"audio\"");

        let kind: MediaKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(kind, MediaKind::Video);
    }

    #[test]
    fn test_opaque_payloads_round_trip() {
        let params = RtpParameters(serde_json::json!({ "codecs": [], "mid": "0" }));
        let json = serde_json::to_string(&params).unwrap();
        let back: RtpParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(
            format!("{}", EngineError::Rejected("bad dtls role".to_string())),
            "engine rejected request: bad dtls role"
        );
        assert_eq!(
            format!("{}", EngineError::Unavailable("worker died".to_string())),
            "engine unavailable: worker died"
        );
    }
}
