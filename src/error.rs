//! Error types shared by the loader, geometry store and frame driver

use crate::config::ConfigError;

/// Failures while turning a mesh source into renderable geometry
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read mesh file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed mesh data at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Mesh loader failed: {0}")]
    LoadFailure(String),

    #[error("Mesh contains no vertices")]
    EmptyGeometry,
}

/// Failures surfaced by the frame driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("No geometry loaded; call load() before rendering")]
    NotLoaded,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
