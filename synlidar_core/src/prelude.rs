// synlidar_core/src/prelude.rs

// --- Sensor ---
pub use crate::sensor::{Lidar, ScanSummary};

// --- Configuration ---
pub use crate::config::{DepthNoiseOptions, HorizontalLimits, ScanConfig, SensorOptions, VerticalLimits};

// --- World contracts ---
pub use crate::world::{EntityKinematics, EntityState, RayCaster, RayHit, ScreenProjector, World};

// --- Data ---
pub use crate::buffers::{PointBuffer, PointRecord, FLOATS_PER_POINT};
pub use crate::camera::{CameraFrame, CameraIntrinsics, ScreenPoint};
pub use crate::class_table::VehicleClassTable;
pub use crate::frames::CameraBasis;
pub use crate::hits::EntityHitStats;
pub use crate::stats::DepthStats;
pub use crate::types::{EntityHitMap, EntityId, ScanMode, Vec3};

// --- Errors ---
pub use crate::errors::{ClassTableError, ConfigError, NoiseError};
