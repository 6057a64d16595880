//! Actor-based room orchestration.
//!
//! Three actor levels, each owning the one below:
//!
//! - [`registry::RegistryHandle`] - singleton, owns rooms
//! - [`room::RoomActorHandle`] - one per room, owns a router and peers
//! - [`peer::PeerActorHandle`] - one per peer, owns engine resources
//!
//! All communication is message passing over `tokio::sync::mpsc`; no shared
//! mutable state. Cancellation propagates down the tree through child
//! tokens; lifecycle events propagate up through per-child forwarders.

pub mod events;
pub mod messages;
pub mod metrics;
pub mod peer;
pub mod registry;
pub mod room;
