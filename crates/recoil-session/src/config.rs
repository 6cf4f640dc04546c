use std::path::Path;
use std::time::Duration;

use recoil_frame::{FireMode, ShotMode};
use recoil_link::DEVICE_NAME_PREFIX;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Controls session and supervisor behavior.
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Magazine size restored when a reload completes.
    pub max_ammo: u8,
    /// Reload cooldown in milliseconds.
    pub reload_interval_ms: u64,
    /// Receive poll timeout in milliseconds. Bounds stop and timer latency.
    pub receive_timeout_ms: u64,
    /// Duration of one discovery scan in milliseconds.
    pub scan_duration_ms: u64,
    /// Pause before rescanning after a lost or failed connection.
    pub reconnect_delay_ms: u64,
    /// Rescan after link loss instead of exiting the supervisor.
    pub reconnect: bool,
    /// Advertised name prefix that identifies a tagger.
    pub device_name_prefix: String,
    /// Initial recoil setting.
    pub recoil_enabled: bool,
    /// Initial fire mode.
    pub fire_mode: FireMode,
    /// Initial shot mode.
    pub shot_mode: ShotMode,
    /// Push recoil and fire configuration to the device right after connecting.
    pub sync_on_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_ammo: 30,
            reload_interval_ms: 3000,
            receive_timeout_ms: 1000,
            scan_duration_ms: 3000,
            reconnect_delay_ms: 1000,
            reconnect: true,
            device_name_prefix: DEVICE_NAME_PREFIX.to_string(),
            recoil_enabled: true,
            fire_mode: FireMode::Single,
            shot_mode: ShotMode::IndoorNoCone,
            sync_on_connect: false,
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate JSON config text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_ammo == 0 {
            return Err(SessionError::InvalidConfig(
                "max_ammo must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("reload_interval_ms", self.reload_interval_ms),
            ("receive_timeout_ms", self.receive_timeout_ms),
            ("scan_duration_ms", self.scan_duration_ms),
        ] {
            if value == 0 {
                return Err(SessionError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.device_name_prefix.trim().is_empty() {
            return Err(SessionError::InvalidConfig(
                "device_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_interval_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// True if an advertised name matches the configured prefix.
    pub fn matches_device(&self, name: &str) -> bool {
        name.starts_with(&self.device_name_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_behavior() {
        let config = SessionConfig::default();
        assert_eq!(config.max_ammo, 30);
        assert_eq!(config.reload_interval(), Duration::from_secs(3));
        assert_eq!(config.receive_timeout(), Duration::from_secs(1));
        assert!(config.recoil_enabled);
        assert_eq!(config.fire_mode, FireMode::Single);
        assert_eq!(config.shot_mode, ShotMode::IndoorNoCone);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SessionConfig::from_json(r#"{ "max_ammo": 12, "shot_mode": "outdoor_with_cone" }"#)
                .unwrap();
        assert_eq!(config.max_ammo, 12);
        assert_eq!(config.shot_mode, ShotMode::OutdoorWithCone);
        assert_eq!(config.reload_interval_ms, 3000);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            SessionConfig::from_json(r#"{ "max_ammo": 0 }"#),
            Err(SessionError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{ "receive_timeout_ms": 0 }"#),
            Err(SessionError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{ "device_name_prefix": " " }"#),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            SessionConfig::from_json(r#"{ "max_amo": 10 }"#),
            Err(SessionError::Json(_))
        ));
    }

    #[test]
    fn device_prefix_matching() {
        let config = SessionConfig::default();
        assert!(config.matches_device("SRG1-0042"));
        assert!(!config.matches_device("Headphones"));
    }
}
