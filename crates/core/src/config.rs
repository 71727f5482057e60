//! Bridge configuration: device identity, loop timing, and per-family tuning.

use crate::cache::DEFAULT_TTL;
use crate::device::DeviceIdentity;
use crate::error::{Error, Result};
use crate::event_loop::DEFAULT_POLL_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Longest read timeout a HID backend can be handed (a signed 32-bit millisecond count).
pub const MAX_POLL_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Which HID interface to open.
    pub device: DeviceIdentity,
    /// Read timeout per loop tick.
    pub poll_timeout_ms: u64,
    /// Time-to-live for cached external handles.
    pub cache_ttl_ms: u64,
    pub lamp: LampConfig,
    pub volume: VolumeConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device: DeviceIdentity::default(),
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
            cache_ttl_ms: DEFAULT_TTL.as_millis() as u64,
            lamp: LampConfig::default(),
            volume: VolumeConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Lamp brightness stepping. Brightness is on the 0..=65535 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LampConfig {
    pub brightness_step: u16,
    pub min_brightness: u16,
    pub max_brightness: u16,
    pub brightness_transition_ms: u32,
    pub power_transition_ms: u32,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            brightness_step: 6553,
            min_brightness: 6553,
            max_brightness: 65535,
            brightness_transition_ms: 100,
            power_transition_ms: 500,
        }
    }
}

/// Chat/game volume balancing. Volumes are scalars in 0.0..=1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub step: f32,
    pub balance_level: f32,
    /// Process name fragment of the voice-chat application.
    pub chat_app: String,
    /// Process name fragments of games, tried in order.
    pub game_names: Vec<String>,
    /// Optional game list file, one name per line. Relative paths resolve
    /// against the config file's directory. Entries are appended to `game_names`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub games_file: Option<PathBuf>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            step: 0.06,
            balance_level: 0.75,
            chat_app: "discord".to_string(),
            game_names: Vec::new(),
            games_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl BridgeConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.interval_ms)
    }

    /// Reject values the loop or controllers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout_ms == 0 || self.poll_timeout_ms > MAX_POLL_TIMEOUT_MS {
            return Err(Error::Config(format!(
                "poll_timeout_ms must be in 1..={MAX_POLL_TIMEOUT_MS}, got {}",
                self.poll_timeout_ms
            )));
        }
        if self.cache_ttl_ms == 0 {
            return Err(Error::Config("cache_ttl_ms must be greater than 0".into()));
        }
        if self.telemetry.interval_ms == 0 {
            return Err(Error::Config(
                "telemetry.interval_ms must be greater than 0".into(),
            ));
        }
        if self.lamp.min_brightness > self.lamp.max_brightness {
            return Err(Error::Config(format!(
                "lamp.min_brightness ({}) exceeds lamp.max_brightness ({})",
                self.lamp.min_brightness, self.lamp.max_brightness
            )));
        }
        if !(self.volume.step > 0.0 && self.volume.step <= 1.0) {
            return Err(Error::Config(format!(
                "volume.step must be in (0, 1], got {}",
                self.volume.step
            )));
        }
        if !(0.0..=1.0).contains(&self.volume.balance_level) {
            return Err(Error::Config(format!(
                "volume.balance_level must be in [0, 1], got {}",
                self.volume.balance_level
            )));
        }
        if self.volume.chat_app.trim().is_empty() {
            return Err(Error::Config("volume.chat_app must not be empty".into()));
        }
        Ok(())
    }
}

/// Load and validate a JSON config file.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
    let mut config: BridgeConfig = serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("parse {}: {e}", path.display())))?;
    if let Some(games_file) = &config.volume.games_file {
        let games_path = match path.parent() {
            Some(dir) if games_file.is_relative() => dir.join(games_file),
            _ => games_file.clone(),
        };
        let games = load_game_list(&games_path)?;
        debug!(path = %games_path.display(), count = games.len(), "Game list loaded");
        config.volume.game_names.extend(games);
    }
    config.validate()?;
    Ok(config)
}

/// Read a game list file in the [`parse_game_list`] format.
pub fn load_game_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
    Ok(parse_game_list(&text))
}

/// Write `config` as pretty JSON.
pub fn save_config(config: &BridgeConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("serialize: {e}")))?;
    std::fs::write(path, json).map_err(|e| Error::Config(format!("write {}: {e}", path.display())))
}

/// Parse a game list: one name fragment per line, `#` comments and blank lines
/// skipped, names lowercased.
pub fn parse_game_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}
