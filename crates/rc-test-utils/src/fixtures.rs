//! Pre-configured test data for room controller tests.

use room_controller::engine::{DtlsParameters, RtpCapabilities, RtpParameters};
use room_controller::Config;
use serde_json::json;

/// RTP parameters for a plausible Opus audio producer.
pub fn audio_rtp_parameters() -> RtpParameters {
    RtpParameters(json!({
        "mid": "0",
        "codecs": [{
            "mimeType": "audio/opus",
            "payloadType": 111,
            "clockRate": 48000,
            "channels": 2,
        }],
        "encodings": [{ "ssrc": 11111111 }],
    }))
}

/// RTP parameters for a plausible VP8 video producer.
pub fn video_rtp_parameters() -> RtpParameters {
    RtpParameters(json!({
        "mid": "1",
        "codecs": [{
            "mimeType": "video/VP8",
            "payloadType": 96,
            "clockRate": 90000,
        }],
        "encodings": [{ "ssrc": 22222222 }],
    }))
}

/// Capability set a typical client device would report.
pub fn device_rtp_capabilities() -> RtpCapabilities {
    RtpCapabilities(json!({
        "codecs": [
            { "mimeType": "audio/opus", "clockRate": 48000, "channels": 2 },
            { "mimeType": "video/VP8", "clockRate": 90000 },
        ],
        "headerExtensions": [],
    }))
}

/// Capability set the mock router rejects in `can_consume`.
pub fn incompatible_rtp_capabilities() -> RtpCapabilities {
    RtpCapabilities(json!({
        "codecs": [],
        "incompatible": true,
    }))
}

/// DTLS parameters for transport connect calls.
pub fn dtls_parameters() -> DtlsParameters {
    DtlsParameters(json!({
        "role": "client",
        "fingerprints": [{
            "algorithm": "sha-256",
            "value": "AB:CD:EF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC",
        }],
    }))
}

/// Default configuration for tests.
pub fn test_config() -> Config {
    Config::default()
}
