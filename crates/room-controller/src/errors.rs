//! Control-plane error types.
//!
//! Error kinds map to stable error codes for the protocol dispatcher that
//! sits in front of this core. Internal details are logged server-side but
//! not exposed to clients.
//!
//! Consumer incompatibility is deliberately *not* an error: `create_consumer`
//! returns `Ok(None)` when the router reports the capabilities as
//! incompatible, because that is an expected negotiation outcome.

use crate::engine::EngineError;
use thiserror::Error;

/// Room-controller error type.
///
/// Maps to dispatcher error codes:
/// - `*NotFound`: `NOT_FOUND` (4)
/// - `Conflict`: `CONFLICT` (5)
/// - `Engine`, `Internal`: `INTERNAL_ERROR` (6)
/// - `CapacityExceeded`, `Draining`: `CAPACITY_EXCEEDED` (7)
/// - `NotInitialized`: `NOT_INITIALIZED` (8)
#[derive(Debug, Error)]
pub enum RcError {
    /// Create on an already-existing id (room or peer).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Strict lookup of a missing room.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Strict lookup of a missing peer.
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    /// Strict lookup of a missing transport.
    #[error("Transport not found: {0}")]
    TransportNotFound(String),

    /// Strict lookup of a missing producer.
    #[error("Producer not found: {0}")]
    ProducerNotFound(String),

    /// Strict lookup of a missing consumer.
    #[error("Consumer not found: {0}")]
    ConsumerNotFound(String),

    /// Operation requires a router capability that is not (or no longer)
    /// held, e.g. a capability query against a closed room.
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// A configured capacity limit was hit (max rooms, max peers per room).
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The registry is draining (graceful shutdown in progress).
    #[error("Registry is draining")]
    Draining,

    /// The media engine failed or rejected a request. Propagated unchanged;
    /// the core never retries.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Internal error (actor channel failures and similar).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RcError {
    /// Returns the dispatcher error code for this error.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            RcError::RoomNotFound(_)
            | RcError::PeerNotFound(_)
            | RcError::TransportNotFound(_)
            | RcError::ProducerNotFound(_)
            | RcError::ConsumerNotFound(_) => 4, // NOT_FOUND
            RcError::Conflict(_) => 5,           // CONFLICT
            RcError::Engine(_) | RcError::Internal(_) => 6, // INTERNAL_ERROR
            RcError::CapacityExceeded(_) | RcError::Draining => 7, // CAPACITY_EXCEEDED
            RcError::NotInitialized(_) => 8,     // NOT_INITIALIZED
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            RcError::Conflict(msg) => msg.clone(),
            RcError::RoomNotFound(_) => "Room not found".to_string(),
            RcError::PeerNotFound(_) => "Peer not found".to_string(),
            RcError::TransportNotFound(_) => "Transport not found".to_string(),
            RcError::ProducerNotFound(_) => "Producer not found".to_string(),
            RcError::ConsumerNotFound(_) => "Consumer not found".to_string(),
            RcError::NotInitialized(_) => "Room is not ready".to_string(),
            RcError::CapacityExceeded(_) => "Server is at capacity".to_string(),
            RcError::Draining => "Server is shutting down, please reconnect".to_string(),
            RcError::Engine(_) | RcError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        // Not found -> 4
        assert_eq!(RcError::RoomNotFound("r1".to_string()).error_code(), 4);
        assert_eq!(RcError::PeerNotFound("p1".to_string()).error_code(), 4);
        assert_eq!(RcError::TransportNotFound("t1".to_string()).error_code(), 4);
        assert_eq!(RcError::ProducerNotFound("pr1".to_string()).error_code(), 4);
        assert_eq!(RcError::ConsumerNotFound("c1".to_string()).error_code(), 4);

        // Conflict -> 5
        assert_eq!(
            RcError::Conflict("Room already exists".to_string()).error_code(),
            5
        );

        // Internal -> 6
        assert_eq!(
            RcError::Engine(EngineError::Rejected("nope".to_string())).error_code(),
            6
        );
        assert_eq!(
            RcError::Internal("channel send failed".to_string()).error_code(),
            6
        );

        // Capacity -> 7
        assert_eq!(
            RcError::CapacityExceeded("max rooms".to_string()).error_code(),
            7
        );
        assert_eq!(RcError::Draining.error_code(), 7);

        // Not initialized -> 8
        assert_eq!(
            RcError::NotInitialized("router released".to_string()).error_code(),
            8
        );
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let engine_err = RcError::Engine(EngineError::Unavailable(
            "worker pipe at /tmp/worker-42.sock broke".to_string(),
        ));
        assert!(!engine_err.client_message().contains("/tmp"));
        assert_eq!(engine_err.client_message(), "An internal error occurred");

        let internal = RcError::Internal("mailbox closed for room r-secret".to_string());
        assert!(!internal.client_message().contains("r-secret"));
    }

    #[test]
    fn test_engine_error_conversion() {
        let engine_err = EngineError::Rejected("bad parameters".to_string());
        let err: RcError = engine_err.into();
        assert!(matches!(err, RcError::Engine(_)));
        assert_eq!(err.error_code(), 6);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", RcError::RoomNotFound("r1".to_string())),
            "Room not found: r1"
        );
        assert_eq!(
            format!("{}", RcError::Conflict("Peer already exists".to_string())),
            "Conflict: Peer already exists"
        );
        assert_eq!(format!("{}", RcError::Draining), "Registry is draining");
    }
}
