//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! The defaults carry the canonical protocol constants: 16 kHz wire rate,
//! 20 ms frames, 1.5 s prebuffer, 5 s open timeout, 1 s merge window.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioSettings
// ---------------------------------------------------------------------------

/// Settings for the audio path shared by capture and playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Canonical wire sample rate in Hz.  Both directions of the protocol
    /// speak this rate regardless of device rates.
    pub wire_sample_rate: u32,
    /// Duration of one transmitted frame in milliseconds.
    pub frame_ms: u32,
    /// Seconds of audio the jitter buffer accumulates before playback
    /// begins.  Trades latency for glitch resistance.
    pub prebuffer_secs: f32,
}

impl AudioSettings {
    /// Samples per transmitted frame (`wire_sample_rate * frame_ms / 1000`).
    ///
    /// ```rust
    /// use meeting_stream::config::AudioSettings;
    ///
    /// assert_eq!(AudioSettings::default().frame_samples(), 320);
    /// ```
    pub fn frame_samples(&self) -> usize {
        (self.wire_sample_rate as usize * self.frame_ms as usize) / 1000
    }

    /// Jitter-buffer start threshold in samples at the given device rate.
    pub fn prebuffer_samples(&self, device_rate: u32) -> usize {
        (device_rate as f32 * self.prebuffer_secs) as usize
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            wire_sample_rate: 16_000,
            frame_ms: 20,
            prebuffer_secs: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// TransportSettings
// ---------------------------------------------------------------------------

/// Settings for the websocket transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Endpoint URL of the meeting websocket.
    pub url: String,
    /// Maximum seconds to wait for the socket open confirmation before the
    /// start sequence fails as a unit.
    pub open_timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws/meeting".into(),
            open_timeout_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptSettings
// ---------------------------------------------------------------------------

/// Settings for transcript reconciliation and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSettings {
    /// Milliseconds within which a containment match against the most recent
    /// entry is treated as a progressive refinement and merged in place.
    pub merge_window_ms: u64,
    /// Number of trailing history entries checked for exact duplicates.
    pub recent_window: usize,
    /// Maximum history length; the oldest entry is evicted beyond this.
    pub max_lines: usize,
    /// Sentinel the server embeds before each redacted word in `safe_text`.
    /// Spans starting with this marker render emphasized.
    pub bleep_marker: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            merge_window_ms: 1_000,
            recent_window: 3,
            max_lines: 5,
            bleep_marker: "삐-".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use meeting_stream::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio path settings.
    pub audio: AudioSettings,
    /// Websocket transport settings.
    pub transport: TransportSettings,
    /// Transcript reconciliation settings.
    pub transcript: TranscriptSettings,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
