//! Room controller: the control plane of an SFU media server.
//!
//! Orchestrates the lifecycle of rooms, peers, and the media resources
//! (transports, producers, consumers) acquired for them from an opaque
//! media engine. The engine does the actual packet work; this crate owns
//! the bookkeeping, command surface, and event surface above it.
//!
//! # Architecture
//!
//! ```text
//! RegistryActor (singleton)
//!   └── RoomActor (one per room, holds a Router)
//!         └── PeerActor (one per peer, holds Transports/Producers/Consumers)
//! ```
//!
//! Each level is an actor with a private mailbox. Commands flow down the
//! tree through handles; lifecycle events flow up through per-child
//! forwarder tasks that tag each event with its origin, so the external
//! channel returned by [`RegistryHandle::new`] carries fully-addressed
//! events.
//!
//! # Example
//!
//! ```no_run
//! use room_controller::{Config, RegistryHandle, RoomOptions};
//! use room_controller::actors::metrics::ActorMetrics;
//! use std::sync::Arc;
//!
//! # async fn run(engine: Arc<dyn room_controller::engine::MediaEngine>) -> Result<(), room_controller::RcError> {
//! let config = Arc::new(Config::from_env().map_err(|e| room_controller::RcError::Internal(e.to_string()))?);
//! let (registry, mut events) = RegistryHandle::new(engine, config, ActorMetrics::new());
//!
//! registry.create_room("room-1".to_string(), RoomOptions::default()).await?;
//! registry.add_peer("room-1".to_string(), "peer-1".to_string()).await?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod actors;
pub mod config;
pub mod engine;
pub mod errors;

pub use actors::events::{ControlEvent, PeerEvent, RoomEvent};
pub use actors::messages::{
    ConsumerInfo, PeerInfo, ProducerInfo, RegistryStatus, RoomInfo, TransportInfo,
};
pub use actors::registry::RegistryHandle;
pub use config::{Config, ConfigError, RoomOptions, WebRtcTransportOptions};
pub use engine::{MediaKind, TransportDirection};
pub use errors::RcError;
