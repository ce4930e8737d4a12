// synlidar_core/src/world.rs

//! Contracts the sensor consumes from the simulated world.
//!
//! The sensor never owns scene data. Ray intersection, screen projection and
//! entity lookups are injected through these traits so the core can run
//! against a game engine, the analytic world in `synlidar_sim`, or a test fake.

use nalgebra::Quaternion;

use crate::camera::ScreenPoint;
use crate::types::{EntityId, Vec3};

/// Result of a successful ray intersection test. All vectors are in world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Entity struck, or [`EntityId::NONE`] for world geometry.
    pub entity: EntityId,
}

/// Line-segment intersection against world geometry.
pub trait RayCaster {
    /// Casts from `origin` towards `target` and returns the first hit along the
    /// segment, ignoring `excluded` (the vehicle carrying the sensor).
    fn cast_ray(&self, origin: &Vec3, target: &Vec3, excluded: EntityId) -> Option<RayHit>;
}

/// Projection of world points onto the active camera's screen.
pub trait ScreenProjector {
    /// Normalised screen position. Values outside `[0, 1]` are off-screen.
    fn project_to_screen(&self, point: &Vec3) -> ScreenPoint;
}

/// Kinematic snapshot of one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f64,
    /// Unit forward axis of the entity in world frame.
    pub forward: Vec3,
    /// Body-to-world rotation as an `(x, y, z, w)` quaternion.
    pub orientation: Quaternion<f64>,
    /// Pedestrians only. Animals are not pedestrians.
    pub is_ped: bool,
    pub is_vehicle: bool,
    pub is_stationary: bool,
}

impl EntityState {
    /// Pedestrians and vehicles are the only entities the sensor labels.
    pub fn is_actor(&self) -> bool {
        self.is_ped || self.is_vehicle
    }

    /// A pedestrian or vehicle that is currently stopped.
    pub fn is_stopped_actor(&self) -> bool {
        self.is_actor() && self.is_stationary
    }
}

/// Entity lookups inside the simulated world.
pub trait EntityKinematics {
    fn entity_state(&self, id: EntityId) -> Option<EntityState>;

    /// Display name of the entity's model, as used by the vehicle class table.
    fn model_name(&self, id: EntityId) -> Option<String>;

    /// Height of the ground below `point`, if the world can answer it.
    fn ground_z(&self, _point: &Vec3) -> Option<f64> {
        None
    }
}

/// Everything a scan needs from the world.
pub trait World: RayCaster + ScreenProjector + EntityKinematics {}

impl<T> World for T where T: RayCaster + ScreenProjector + EntityKinematics + ?Sized {}
