// synlidar_sim/src/simulation/errors.rs

use std::path::PathBuf;

use synlidar_core::prelude::{ClassTableError, ConfigError, NoiseError};
use thiserror::Error;

/// Everything that can stop a scenario from running.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] figment::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    ClassTable(#[from] ClassTableError),

    #[error("LiDAR geometry rejected: {0}")]
    Geometry(#[from] ConfigError),

    #[error(transparent)]
    Noise(#[from] NoiseError),

    #[error("ego vehicle {0} could not be attached")]
    Attach(u32),
}
