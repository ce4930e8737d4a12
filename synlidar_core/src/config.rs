// synlidar_core/src/config.rs

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::ScanMode;

// =========================================================================
// == Scan Geometry ==
// =========================================================================

/// Horizontal field of view. Angles are azimuths in degrees measured
/// clockwise from forward; the sweep runs from `right_limit` up through 360°
/// and wraps to `left_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalLimits {
    pub samples: u32,
    pub left_limit: f64,
    pub right_limit: f64,
}

/// Vertical field of view as zenith angles in degrees (90° is the horizon).
/// `lower_limit` is the larger angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalLimits {
    pub samples: u32,
    pub upper_limit: f64,
    pub lower_limit: f64,
}

/// Validated, immutable scan geometry. Only constructible through the
/// initialisation functions below, so the limit ordering always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    max_range: f64,
    horizontal: HorizontalLimits,
    horizontal_resolution: f64,
    vertical: Option<(VerticalLimits, f64)>,
}

impl ScanConfig {
    /// 2D sensor from explicit horizontal limits and a sample count.
    pub fn planar_from_samples(
        max_range: f64,
        horizontal: HorizontalLimits,
    ) -> Result<Self, ConfigError> {
        check_range(max_range)?;
        let horizontal_resolution = validate_horizontal(&horizontal)?;
        Ok(Self {
            max_range,
            horizontal,
            horizontal_resolution,
            vertical: None,
        })
    }

    /// 3D sensor from explicit horizontal and vertical limits and sample counts.
    pub fn volumetric_from_samples(
        max_range: f64,
        horizontal: HorizontalLimits,
        vertical: VerticalLimits,
    ) -> Result<Self, ConfigError> {
        check_range(max_range)?;
        let vertical_resolution = validate_vertical(&vertical)?;
        let horizontal_resolution = validate_horizontal(&horizontal)?;
        Ok(Self {
            max_range,
            horizontal,
            horizontal_resolution,
            vertical: Some((vertical, vertical_resolution)),
        })
    }

    /// 2D sensor from a horizontal field of view centred on forward.
    pub fn planar_from_fov(
        max_range: f64,
        horizontal_fov: f64,
        horizontal_resolution: f64,
    ) -> Result<Self, ConfigError> {
        Self::planar_from_samples(
            max_range,
            fov_to_horizontal(horizontal_fov, horizontal_resolution)?,
        )
    }

    /// 3D sensor from fields of view. `upper_elevation` is the elevation (degrees
    /// above the horizon) of the topmost beam.
    pub fn volumetric_from_fov(
        max_range: f64,
        horizontal_fov: f64,
        horizontal_resolution: f64,
        vertical_fov: f64,
        vertical_resolution: f64,
        upper_elevation: f64,
    ) -> Result<Self, ConfigError> {
        if vertical_resolution <= 0.0 {
            return Err(ConfigError::NonPositiveResolution {
                axis: "vertical",
                value: vertical_resolution,
            });
        }
        let vertical = VerticalLimits {
            samples: (vertical_fov / vertical_resolution) as u32,
            upper_limit: 90.0 - upper_elevation,
            lower_limit: 90.0 + vertical_fov - upper_elevation,
        };
        Self::volumetric_from_samples(
            max_range,
            fov_to_horizontal(horizontal_fov, horizontal_resolution)?,
            vertical,
        )
    }

    pub fn mode(&self) -> ScanMode {
        if self.vertical.is_some() {
            ScanMode::Scan3D
        } else {
            ScanMode::Scan2D
        }
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    pub fn horizontal(&self) -> &HorizontalLimits {
        &self.horizontal
    }

    pub fn horizontal_resolution(&self) -> f64 {
        self.horizontal_resolution
    }

    pub fn vertical(&self) -> Option<&VerticalLimits> {
        self.vertical.as_ref().map(|(limits, _)| limits)
    }

    pub fn vertical_resolution(&self) -> Option<f64> {
        self.vertical.as_ref().map(|(_, resolution)| *resolution)
    }

    pub fn horizontal_samples(&self) -> u32 {
        self.horizontal.samples
    }

    pub fn vertical_samples(&self) -> u32 {
        self.vertical().map_or(0, |v| v.samples)
    }

    /// Upper bound on beams per scan.
    pub fn total_samples(&self) -> u64 {
        match self.mode() {
            ScanMode::Scan3D => {
                u64::from(self.horizontal.samples) * u64::from(self.vertical_samples())
            }
            _ => u64::from(self.horizontal.samples),
        }
    }
}

fn check_range(max_range: f64) -> Result<(), ConfigError> {
    if max_range > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveRange(max_range))
    }
}

fn validate_horizontal(limits: &HorizontalLimits) -> Result<f64, ConfigError> {
    if limits.right_limit <= limits.left_limit {
        return Err(ConfigError::InvertedHorizontalLimits {
            left: limits.left_limit,
            right: limits.right_limit,
        });
    }
    if limits.samples == 0 {
        return Err(ConfigError::ZeroSamples { axis: "horizontal" });
    }
    Ok((limits.left_limit + 360.0 - limits.right_limit) / limits.samples as f64)
}

fn validate_vertical(limits: &VerticalLimits) -> Result<f64, ConfigError> {
    if limits.lower_limit <= limits.upper_limit {
        return Err(ConfigError::InvertedVerticalLimits {
            upper: limits.upper_limit,
            lower: limits.lower_limit,
        });
    }
    if limits.samples == 0 {
        return Err(ConfigError::ZeroSamples { axis: "vertical" });
    }
    Ok((limits.lower_limit - limits.upper_limit) / limits.samples as f64)
}

fn fov_to_horizontal(fov: f64, resolution: f64) -> Result<HorizontalLimits, ConfigError> {
    if resolution <= 0.0 {
        return Err(ConfigError::NonPositiveResolution {
            axis: "horizontal",
            value: resolution,
        });
    }
    Ok(HorizontalLimits {
        samples: (fov / resolution) as u32,
        left_limit: fov / 2.0,
        right_limit: 360.0 - fov / 2.0,
    })
}

// =========================================================================
// == Sensor Options ==
// =========================================================================

/// Toggles and constants for one sensor instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorOptions {
    /// Cast a geometric ray for every beam in addition to sampling depth.
    pub use_raycasting: bool,
    /// Record every ray-cast hit into the ray-cast-only cloud.
    pub output_raycast_points: bool,
    /// Record depth-rescaled ray-cast endpoints into the adjusted cloud.
    pub output_adjusted_points: bool,
    /// Track longitudinal extents of entities struck by rays.
    pub track_ray_hits: bool,
    /// Query ground clearance for each candidate so depth statistics can run.
    pub output_depth_stats: bool,
    /// Record the projected screen position of every beam.
    pub record_beam_map: bool,
    /// Points farther than this from the camera are discarded.
    pub max_output_range: f64,
    /// Capacity of each output buffer, in points.
    pub max_points: usize,
    /// Class tag that sets the class-intensity channel to 1.
    pub target_class: String,
    /// Height of the LiDAR above the ground below the ego vehicle.
    pub mount_height: f64,
    pub depth_noise: DepthNoiseOptions,
}

impl Default for SensorOptions {
    fn default() -> Self {
        Self {
            use_raycasting: true,
            output_raycast_points: true,
            output_adjusted_points: false,
            track_ray_hits: true,
            output_depth_stats: false,
            record_beam_map: false,
            max_output_range: 120.0,
            max_points: 250_000,
            target_class: "Car".to_string(),
            mount_height: 1.73,
            depth_noise: DepthNoiseOptions::default(),
        }
    }
}

/// Gaussian noise added to every sampled depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthNoiseOptions {
    pub enabled: bool,
    pub mean: f64,
    pub stddev: f64,
    /// Seed for the sensor's generator. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for DepthNoiseOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            mean: 0.0,
            stddev: 0.05,
            seed: None,
        }
    }
}
