// synlidar_core/src/errors.rs

use thiserror::Error;

/// Rejections raised while initialising the scan geometry.
/// A sensor that fails initialisation stays uninitialised and scans return no data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("horizontal FOV angle parameters error: right limit {right} must exceed left limit {left}")]
    InvertedHorizontalLimits { left: f64, right: f64 },

    #[error("vertical FOV angle parameters error: lower limit {lower} must exceed upper limit {upper}")]
    InvertedVerticalLimits { upper: f64, lower: f64 },

    #[error("{axis} sample count must be at least 1")]
    ZeroSamples { axis: &'static str },

    #[error("{axis} angular resolution must be positive, got {value}")]
    NonPositiveResolution { axis: &'static str, value: f64 },

    #[error("maximum range must be positive, got {0}")]
    NonPositiveRange(f64),
}

#[derive(Debug, Error)]
pub enum ClassTableError {
    #[error("failed to read vehicle class table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed vehicle class table line {line}: '{content}'")]
    MalformedLine { line: usize, content: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NoiseError {
    #[error("depth noise standard deviation must be finite and non-negative, got {0}")]
    InvalidStdDev(f64),
}
