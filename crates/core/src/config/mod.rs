use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{VizError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl AppConfig {
    pub fn live_defaults() -> Self {
        Self::default()
    }

    /// Reads a JSON config file, falling back to defaults for any missing
    /// section.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| VizError::Message(e.to_string()))
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
        }
    }
}

/// Configuration for the rendering loop shared by the live and export paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Target frame rate for both the live scheduler and the export clock.
    pub fps: u32,
    /// Number of frequency bins handed to the renderers each tick.
    pub spectrum_bins: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            spectrum_bins: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.audio.sample_rate, 48_000);
        assert_eq!(back.render.fps, 60);
        assert_eq!(back.render.spectrum_bins, 64);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"render": {"fps": 30, "spectrum_bins": 32}}"#).unwrap();
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.render.fps, 30);
    }
}
