//! Demo configuration, read from an optional TOML file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! [animation]
//! fps = 60
//! rate_increment = 1.0
//!
//! [viewer]
//! background = [0, 0, 0]
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FanConfig {
    pub animation: AnimationConfig,
    pub scene: SceneConfig,
    pub viewer: ViewerConfig,
}

/// Parameters of the spin ramp. Rates are in degrees per tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// Step used after Up/Down.
    pub slow: f32,
    /// Step used after Left (stop).
    pub fast: f32,
    /// Timer ticks per second.
    pub fps: u32,
    /// Target change per Up/Down press.
    pub rate_increment: f32,
    /// Speed error below which the ramp holds still.
    pub dead_band: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            slow: 0.05,
            fast: 0.5,
            fps: 30,
            rate_increment: 2.0,
            dead_band: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Translation placing the blade inside the frame.
    pub blade_offset: [f32; 3],
    /// Rotation about +X applied to the whole model, degrees.
    pub tilt_degrees: f32,
    /// Fraction of the camera distance added after framing the model.
    pub zoom_back: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            blade_offset: [0.0, 0.005, 0.0],
            tilt_degrees: 90.0,
            zoom_back: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub title: String,
    /// RGB background of the viewer.
    pub background: [u8; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Fan Animation".to_string(),
            background: [207, 231, 253],
        }
    }
}

impl FanConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let animation = &self.animation;
        if animation.fps == 0 {
            return Err(ConfigError::Invalid {
                field: "animation.fps",
                reason: "must be at least 1",
            });
        }
        for (field, value) in [
            ("animation.slow", animation.slow),
            ("animation.fast", animation.fast),
            ("animation.dead_band", animation.dead_band),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be a non-negative number",
                });
            }
        }
        if !animation.rate_increment.is_finite() {
            return Err(ConfigError::Invalid {
                field: "animation.rate_increment",
                reason: "must be finite",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = FanConfig::from_toml_str("").unwrap();
        assert_eq!(config, FanConfig::default());
        assert_eq!(config.animation.fps, 30);
        assert_eq!(config.viewer.background, [207, 231, 253]);
    }

    #[test]
    fn test_partial_override() {
        let config = FanConfig::from_toml_str(
            "[animation]\nfps = 60\n\n[viewer]\ntitle = \"Spin\"\n",
        )
        .unwrap();
        assert_eq!(config.animation.fps, 60);
        assert_eq!(config.animation.slow, 0.05);
        assert_eq!(config.viewer.title, "Spin");
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = FanConfig::from_toml_str("[animation]\nspeed = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_fps_is_rejected() {
        let result = FanConfig::from_toml_str("[animation]\nfps = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "animation.fps", .. })
        ));
    }
}
