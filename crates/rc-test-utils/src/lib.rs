//! # Room Controller Test Utilities
//!
//! Shared test utilities for the room controller.
//!
//! This crate provides a mock media engine and test fixtures for isolated
//! control-plane testing without a real media worker.
//!
//! ## Modules
//!
//! - `mock_engine` - Mock engine implementing the capability traits, with
//!   failure injection, compatibility control, and engine-initiated closure
//! - `fixtures` - Pre-configured RTP/DTLS payloads and configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rc_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let engine = MockEngineBuilder::new()
//!         .fail_resume()
//!         .build();
//!
//!     // Spawn the registry against the mock and drive it...
//! }
//! ```

pub mod fixtures;
pub mod mock_engine;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_engine::*;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a tracing subscriber for test runs, honoring `RUST_LOG`.
///
/// Output goes through the test writer so it is captured per test. Safe to
/// call from every test; only the first call installs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}
