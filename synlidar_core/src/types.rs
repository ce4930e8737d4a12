// synlidar_core/src/types.rs

use nalgebra::Vector3;
use std::collections::HashMap;

use crate::hits::EntityHitStats;

// --- Core Type Aliases ---
pub type Vec3 = Vector3<f64>;

/// Per-scan map of struck entities, owned by the caller.
pub type EntityHitMap = HashMap<EntityId, EntityHitStats>;

// --- Core Identifier ---
/// Identity of an entity in the simulated world.
/// The value `0` is reserved for world geometry (no entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// World geometry: ground, buildings, anything that is not an entity.
    pub const NONE: EntityId = EntityId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The identity as written into a point channel.
    pub fn as_channel(self) -> f32 {
        self.0 as f32
    }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Which scan the sensor was initialised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    NotInitialized,
    Scan2D,
    Scan3D,
}
