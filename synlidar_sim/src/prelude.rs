// synlidar_sim/src/prelude.rs

// Re-export the synlidar_core prelude so binaries and tests need one import.
pub use synlidar_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::simulation::camera::{PinholeCamera, RenderedFrame};
pub use crate::simulation::config::{EntityConfig, EntityKind, LidarGeometry, ScenarioConfig};
pub use crate::simulation::errors::ScenarioError;
pub use crate::simulation::runner::{load_class_table, ScanReport, ScenarioRunner};
pub use crate::simulation::world::{AnalyticWorld, BoxEntity};
