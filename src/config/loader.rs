use std::path::Path;

use super::{ConfigError, RenderConfig};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RenderConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: RenderConfig = if content.trim().is_empty() {
        RenderConfig::default()
    } else {
        serde_yaml::from_str(&content)?
    };
    config.validate()?;

    tracing::debug!(
        path = %path.display(),
        width = config.width,
        height = config.height,
        "Loaded render configuration"
    );

    Ok(config)
}
