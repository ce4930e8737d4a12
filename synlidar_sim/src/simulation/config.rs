// synlidar_sim/src/simulation/config.rs

use std::path::{Path, PathBuf};

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use synlidar_core::class_table::DEFAULT_TRUNCATION_DEPTH;
use synlidar_core::prelude::*;

use crate::simulation::errors::ScenarioError;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// Root of the data parsed from a `scenario.toml` file: the scene, the
/// camera carried by the ego vehicle, and the LiDAR attached to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub camera: CameraSection,

    #[serde(default)]
    pub lidar: LidarSection,

    #[serde(default)]
    pub ground: GroundSection,

    pub ego: EntityConfig,

    // The TOML has `[[entities]]`, which becomes a Vec of EntityConfig structs.
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl ScenarioConfig {
    /// Loads a scenario file. Missing sections fall back to their defaults,
    /// unknown keys are rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        // Figment treats a missing file as an empty source.
        if !path.is_file() {
            return Err(ScenarioError::NotFound(path.to_path_buf()));
        }
        let config: Self = Figment::new().merge(Toml::file(path)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a scenario held in memory.
    pub fn from_toml_str(source: &str) -> Result<Self, ScenarioError> {
        let config: Self = Figment::new().merge(Toml::string(source)).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.ego.id == 0 {
            return Err(ScenarioError::Invalid(
                "ego id 0 is reserved for world geometry".to_string(),
            ));
        }
        let mut seen = vec![self.ego.id];
        for entity in &self.entities {
            if entity.id == 0 || seen.contains(&entity.id) {
                return Err(ScenarioError::Invalid(format!(
                    "entity id {} is reserved or duplicated",
                    entity.id
                )));
            }
            seen.push(entity.id);
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ScenarioError::Invalid(
                "camera resolution must be non-zero".to_string(),
            ));
        }
        if self.simulation.step_seconds < 0.0 {
            return Err(ScenarioError::Invalid(format!(
                "step_seconds must not be negative, got {}",
                self.simulation.step_seconds
            )));
        }
        Ok(())
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationSection {
    /// Number of scans to run. The scene advances by `step_seconds` between scans.
    pub scans: u32,
    pub step_seconds: f64,
    /// Vehicle class table, one `model,class` pair per line.
    pub class_table: Option<PathBuf>,
    /// How many trailing characters of a model name may be dropped to form aliases.
    pub truncation_depth: usize,
    /// Scan from this entity's point of view instead of the ego.
    pub perspective: Option<u32>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            scans: 1,
            step_seconds: 0.1,
            class_table: None,
            truncation_depth: DEFAULT_TRUNCATION_DEPTH,
            perspective: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CameraSection {
    pub width: usize,
    pub height: usize,
    /// Vertical field of view in degrees.
    pub vertical_fov: f64,
    pub near_clip: f64,
    pub far_clip: f64,
    /// Camera position in the ego body frame: right, forward, up.
    pub mount_offset: [f64; 3],
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            width: 320,
            height: 160,
            vertical_fov: 60.0,
            near_clip: 0.15,
            far_clip: 1000.0,
            mount_offset: [0.0, 0.0, 1.7],
        }
    }
}

impl CameraSection {
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::from_vertical_fov(
            self.width,
            self.height,
            self.vertical_fov,
            self.near_clip,
            self.far_clip,
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LidarSection {
    #[serde(default)]
    pub geometry: LidarGeometry,
    #[serde(default)]
    pub options: SensorOptions,
}

/// The four ways a sensor can be initialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LidarGeometry {
    PlanarSamples {
        max_range: f64,
        horizontal: HorizontalLimits,
    },
    VolumetricSamples {
        max_range: f64,
        horizontal: HorizontalLimits,
        vertical: VerticalLimits,
    },
    PlanarFov {
        max_range: f64,
        horizontal_fov: f64,
        horizontal_resolution: f64,
    },
    VolumetricFov {
        max_range: f64,
        horizontal_fov: f64,
        horizontal_resolution: f64,
        vertical_fov: f64,
        vertical_resolution: f64,
        upper_elevation: f64,
    },
}

impl Default for LidarGeometry {
    fn default() -> Self {
        // A 64-ring spinning sensor.
        LidarGeometry::VolumetricFov {
            max_range: 120.0,
            horizontal_fov: 359.5,
            horizontal_resolution: 0.5,
            vertical_fov: 26.9,
            vertical_resolution: 0.42,
            upper_elevation: 2.0,
        }
    }
}

impl LidarGeometry {
    /// Initialises `lidar` with this geometry.
    pub fn apply(&self, lidar: &mut Lidar) -> Result<(), ConfigError> {
        match *self {
            LidarGeometry::PlanarSamples {
                max_range,
                horizontal,
            } => lidar.init_2d_from_samples(max_range, horizontal),
            LidarGeometry::VolumetricSamples {
                max_range,
                horizontal,
                vertical,
            } => lidar.init_3d_from_samples(max_range, horizontal, vertical),
            LidarGeometry::PlanarFov {
                max_range,
                horizontal_fov,
                horizontal_resolution,
            } => lidar.init_2d_from_fov(max_range, horizontal_fov, horizontal_resolution),
            LidarGeometry::VolumetricFov {
                max_range,
                horizontal_fov,
                horizontal_resolution,
                vertical_fov,
                vertical_resolution,
                upper_elevation,
            } => lidar.init_3d_from_fov(
                max_range,
                horizontal_fov,
                horizontal_resolution,
                vertical_fov,
                vertical_resolution,
                upper_elevation,
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GroundSection {
    /// Height of the flat ground plane.
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Vehicle,
    Pedestrian,
    /// Anything else: props, animals, debris.
    Prop,
}

/// One box-shaped entity in the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub id: u32,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub model: Option<String>,
    /// Centre of the box's footprint on the ground.
    pub position: [f64; 3],
    /// Width, length, height.
    #[serde(default = "default_size")]
    pub size: [f64; 3],
    /// Heading in degrees, clockwise from +y.
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub velocity: [f64; 3],
}

fn default_size() -> [f64; 3] {
    [1.8, 4.5, 1.5]
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            id: 1,
            kind: EntityKind::Vehicle,
            model: None,
            position: [0.0; 3],
            size: default_size(),
            heading: 0.0,
            velocity: [0.0; 3],
        }
    }
}
