//! Room controller configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults. It also owns the option-merging rules: caller-supplied room and
//! transport options are merged over these defaults at creation time.

use crate::engine::{RouterOptions, TransportSettings};
use serde::Deserialize;
use serde_json::json;
use std::env;
use thiserror::Error;

/// Default local IP transports listen on.
pub const DEFAULT_LISTEN_IP: &str = "0.0.0.0";

/// Default initial available outgoing bitrate, in bps.
pub const DEFAULT_INITIAL_OUTGOING_BITRATE: u32 = 1_000_000;

/// Default minimum outgoing bitrate, in bps.
pub const DEFAULT_MIN_OUTGOING_BITRATE: u32 = 600_000;

/// Default maximum outgoing bitrate, in bps.
pub const DEFAULT_MAX_OUTGOING_BITRATE: u32 = 1_500_000;

/// Default maximum concurrent rooms.
pub const DEFAULT_MAX_ROOMS: u32 = 500;

/// Default maximum peers per room.
pub const DEFAULT_MAX_PEERS_PER_ROOM: u32 = 64;

/// Room controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Local IP transports listen on.
    pub listen_ip: String,

    /// Prefer UDP when both UDP and TCP are available.
    pub prefer_udp: bool,

    /// Prefer TCP when both UDP and TCP are available.
    pub prefer_tcp: bool,

    /// Initial available outgoing bitrate estimate, in bps.
    pub initial_outgoing_bitrate: u32,

    /// Minimum outgoing bitrate, in bps.
    pub min_outgoing_bitrate: u32,

    /// Maximum outgoing bitrate, in bps.
    pub max_outgoing_bitrate: u32,

    /// Codec configuration routers are created with, as opaque JSON.
    pub media_codecs: Vec<serde_json::Value>,

    /// Maximum concurrent rooms.
    pub max_rooms: u32,

    /// Maximum peers per room.
    pub max_peers_per_room: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_ip: DEFAULT_LISTEN_IP.to_string(),
            prefer_udp: true,
            prefer_tcp: false,
            initial_outgoing_bitrate: DEFAULT_INITIAL_OUTGOING_BITRATE,
            min_outgoing_bitrate: DEFAULT_MIN_OUTGOING_BITRATE,
            max_outgoing_bitrate: DEFAULT_MAX_OUTGOING_BITRATE,
            media_codecs: default_media_codecs(),
            max_rooms: DEFAULT_MAX_ROOMS,
            max_peers_per_room: DEFAULT_MAX_PEERS_PER_ROOM,
        }
    }
}

/// Default codec set: Opus audio and VP8 video.
fn default_media_codecs() -> Vec<serde_json::Value> {
    vec![
        json!({
            "kind": "audio",
            "mimeType": "audio/opus",
            "clockRate": 48000,
            "channels": 2,
        }),
        json!({
            "kind": "video",
            "mimeType": "video/VP8",
            "clockRate": 90000,
        }),
    ]
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// Parse failure description.
        reason: String,
    },
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// `from_env` delegates here; tests inject closures instead of mutating
    /// process environment.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let media_codecs = match get("RC_MEDIA_CODECS") {
            Some(raw) => {
                serde_json::from_str::<Vec<serde_json::Value>>(&raw).map_err(|e| {
                    ConfigError::InvalidValue {
                        name: "RC_MEDIA_CODECS".to_string(),
                        reason: e.to_string(),
                    }
                })?
            }
            None => defaults.media_codecs,
        };

        Ok(Self {
            listen_ip: get("RC_LISTEN_IP").unwrap_or(defaults.listen_ip),
            prefer_udp: parse_var(&get, "RC_PREFER_UDP", defaults.prefer_udp)?,
            prefer_tcp: parse_var(&get, "RC_PREFER_TCP", defaults.prefer_tcp)?,
            initial_outgoing_bitrate: parse_var(
                &get,
                "RC_INITIAL_OUTGOING_BITRATE",
                defaults.initial_outgoing_bitrate,
            )?,
            min_outgoing_bitrate: parse_var(
                &get,
                "RC_MIN_OUTGOING_BITRATE",
                defaults.min_outgoing_bitrate,
            )?,
            max_outgoing_bitrate: parse_var(
                &get,
                "RC_MAX_OUTGOING_BITRATE",
                defaults.max_outgoing_bitrate,
            )?,
            media_codecs,
            max_rooms: parse_var(&get, "RC_MAX_ROOMS", defaults.max_rooms)?,
            max_peers_per_room: parse_var(
                &get,
                "RC_MAX_PEERS_PER_ROOM",
                defaults.max_peers_per_room,
            )?,
        })
    }

    /// Build router options for room creation, merging caller options over
    /// the configured defaults.
    #[must_use]
    pub fn router_options(&self, options: &RoomOptions) -> RouterOptions {
        RouterOptions {
            media_codecs: options
                .media_codecs
                .clone()
                .unwrap_or_else(|| self.media_codecs.clone()),
        }
    }

    /// Build transport settings, merging caller options over the configured
    /// defaults.
    #[must_use]
    pub fn transport_settings(&self, options: &WebRtcTransportOptions) -> TransportSettings {
        TransportSettings {
            listen_ip: options
                .listen_ip
                .clone()
                .unwrap_or_else(|| self.listen_ip.clone()),
            prefer_udp: options.prefer_udp.unwrap_or(self.prefer_udp),
            prefer_tcp: options.prefer_tcp.unwrap_or(self.prefer_tcp),
            initial_available_outgoing_bitrate: options
                .initial_outgoing_bitrate
                .unwrap_or(self.initial_outgoing_bitrate),
            min_outgoing_bitrate: options
                .min_outgoing_bitrate
                .unwrap_or(self.min_outgoing_bitrate),
            max_outgoing_bitrate: options
                .max_outgoing_bitrate
                .unwrap_or(self.max_outgoing_bitrate),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Caller-supplied options for room creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomOptions {
    /// Codec configuration override; defaults to the configured codec set.
    pub media_codecs: Option<Vec<serde_json::Value>>,
}

/// Caller-supplied options for transport creation. Unset fields fall back
/// to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebRtcTransportOptions {
    /// Listen IP override.
    pub listen_ip: Option<String>,
    /// Prefer-UDP override.
    pub prefer_udp: Option<bool>,
    /// Prefer-TCP override.
    pub prefer_tcp: Option<bool>,
    /// Initial available outgoing bitrate override, in bps.
    pub initial_outgoing_bitrate: Option<u32>,
    /// Minimum outgoing bitrate override, in bps.
    pub min_outgoing_bitrate: Option<u32>,
    /// Maximum outgoing bitrate override, in bps.
    pub max_outgoing_bitrate: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_ip, "0.0.0.0");
        assert!(config.prefer_udp);
        assert!(!config.prefer_tcp);
        assert_eq!(config.initial_outgoing_bitrate, 1_000_000);
        assert_eq!(config.media_codecs.len(), 2);
        assert_eq!(config.max_rooms, 500);
        assert_eq!(config.max_peers_per_room, 64);
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = Config::from_vars(|name| match name {
            "RC_LISTEN_IP" => Some("10.0.0.5".to_string()),
            "RC_MAX_ROOMS" => Some("8".to_string()),
            "RC_PREFER_TCP" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.listen_ip, "10.0.0.5");
        assert_eq!(config.max_rooms, 8);
        assert!(config.prefer_tcp);
        // Untouched fields keep defaults
        assert_eq!(config.max_peers_per_room, DEFAULT_MAX_PEERS_PER_ROOM);
    }

    #[test]
    fn test_from_vars_invalid_value() {
        let result = Config::from_vars(|name| match name {
            "RC_MAX_ROOMS" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name, .. }) if name == "RC_MAX_ROOMS"
        ));
    }

    #[test]
    fn test_from_vars_invalid_codecs() {
        let result = Config::from_vars(|name| match name {
            "RC_MEDIA_CODECS" => Some("{not json".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_router_options_merge() {
        let config = Config::default();

        let defaulted = config.router_options(&RoomOptions::default());
        assert_eq!(defaulted.media_codecs, config.media_codecs);

        let custom = config.router_options(&RoomOptions {
            media_codecs: Some(vec![json!({ "mimeType": "video/H264" })]),
        });
        assert_eq!(custom.media_codecs.len(), 1);
    }

    #[test]
    fn test_transport_settings_merge() {
        let config = Config::default();

        let defaulted = config.transport_settings(&WebRtcTransportOptions::default());
        assert_eq!(defaulted.listen_ip, config.listen_ip);
        assert_eq!(
            defaulted.initial_available_outgoing_bitrate,
            config.initial_outgoing_bitrate
        );

        let merged = config.transport_settings(&WebRtcTransportOptions {
            max_outgoing_bitrate: Some(3_000_000),
            prefer_tcp: Some(true),
            ..Default::default()
        });
        assert_eq!(merged.max_outgoing_bitrate, 3_000_000);
        assert!(merged.prefer_tcp);
        // Unset overrides keep defaults
        assert_eq!(merged.min_outgoing_bitrate, config.min_outgoing_bitrate);
    }
}
