mod loader;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Default glyph ramp, dark to bright
pub const DEFAULT_GLYPH_RAMP: &str = " .:-=+%*@#";

/// Main renderer configuration
///
/// Every field has a default matching the stock renderer, so an empty YAML
/// document (or no file at all) produces a working setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub glyph_ramp: String,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub animation: AnimationConfig,
    pub geometry: GeometryConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            glyph_ramp: DEFAULT_GLYPH_RAMP.to_string(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            animation: AnimationConfig::default(),
            geometry: GeometryConfig::default(),
        }
    }
}

/// Projection and view placement
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Translation applied after the model is centred, rotated and scaled
    pub offset: [f32; 3],
    /// Fixed pitch (radians) applied before the animated spin
    pub tilt: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            offset: [0.0, -0.1, -1.5],
            tilt: 0.3,
        }
    }
}

/// Phong lighting coefficients
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Direction from the surface toward the light
    pub light_direction: [f32; 3],
    pub view_position: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub base_color: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            light_direction: [0.0, 0.0, 1.0],
            view_position: [0.0, 0.0, 0.0],
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.6, 0.6, 0.6],
            specular: [1.0, 1.0, 1.0],
            shininess: 64.0,
            base_color: [1.0, 1.0, 1.0],
        }
    }
}

impl LightingConfig {
    pub fn light_direction(&self) -> Vector3<f32> {
        Vector3::from(self.light_direction)
    }

    pub fn view_position(&self) -> Vector3<f32> {
        Vector3::from(self.view_position)
    }
}

/// How elapsed time advances between frames
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Advance by `time_step` every frame
    #[default]
    Fixed,
    /// Advance by measured wall-clock seconds
    Wall,
}

/// Animation timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub clock: ClockMode,
    pub time_step: f32,
    /// Spin speed in radians per unit of elapsed time
    pub spin_rate: f32,
    pub frame_interval_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            clock: ClockMode::Fixed,
            time_step: 0.05,
            spin_rate: 0.1,
            frame_interval_ms: 50,
        }
    }
}

/// How indices from several meshes are merged into one store
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Rebase each mesh's indices by the number of vertices before it
    #[default]
    Offset,
    /// Concatenate indices verbatim; only correct for single-mesh sources
    Shared,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub index_mode: IndexMode,
}

impl RenderConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load from `path` if given, otherwise fall back to defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new("ascii-raster.yaml");
                if default_path.exists() {
                    return Self::from_file(default_path);
                }
                Ok(Self::default())
            }
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Validation(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.glyph_ramp.chars().count() < 3 {
            return Err(ConfigError::Validation(
                "glyph_ramp needs at least 3 characters".to_string(),
            ));
        }
        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ConfigError::Validation(format!(
                "near/far planes must satisfy 0 < near < far, got {} / {}",
                camera.near, camera.far
            )));
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::Validation(format!(
                "fov_degrees must be in (0, 180), got {}",
                camera.fov_degrees
            )));
        }
        if self.lighting.shininess < 0.0 {
            return Err(ConfigError::Validation(
                "shininess must not be negative".to_string(),
            ));
        }
        if self.lighting.light_direction().norm() == 0.0 {
            return Err(ConfigError::Validation(
                "light_direction must not be the zero vector".to_string(),
            ));
        }
        if self.animation.time_step < 0.0 {
            return Err(ConfigError::Validation(
                "time_step must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.width, 100);
        assert_eq!(config.glyph_ramp, DEFAULT_GLYPH_RAMP);
        assert_eq!(config.geometry.index_mode, IndexMode::Offset);
    }

    #[test]
    fn test_zero_width_rejected() {
        let config = RenderConfig {
            width: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_short_ramp_rejected() {
        let config = RenderConfig {
            glyph_ramp: " #".to_string(),
            ..RenderConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_inverted_planes_rejected() {
        let mut config = RenderConfig::default();
        config.camera.near = 10.0;
        config.camera.far = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aspect() {
        let config = RenderConfig {
            width: 160,
            height: 80,
            ..RenderConfig::default()
        };
        assert!((config.aspect() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_or_default_without_path() {
        // No ascii-raster.yaml is shipped in the crate root
        let config = RenderConfig::load_or_default(None).unwrap();
        assert_eq!(config.height, 100);
    }
}
