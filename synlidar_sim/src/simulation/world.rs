// synlidar_sim/src/simulation/world.rs

//! Analytic scene: a flat ground plane and oriented boxes.
//!
//! Implements every world contract the sensor consumes, so a full scan can
//! run without a game engine.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};
use parry3d_f64::query::{Ray, RayCast};
use parry3d_f64::shape::{Cuboid, HalfSpace};
use synlidar_core::prelude::*;
use tracing::debug;

use crate::simulation::camera::PinholeCamera;
use crate::simulation::config::{EntityConfig, EntityKind, ScenarioConfig};

/// Entities slower than this count as stationary.
const STATIONARY_SPEED: f64 = 1e-3;

// =========================================================================
// == Box Entities ==
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BoxEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub model: Option<String>,
    /// Centre of the footprint on the ground.
    pub position: Vec3,
    /// Half width, half length, half height in the body frame.
    pub half_extents: Vec3,
    /// Body-to-world rotation. The body frame is right, forward, up.
    pub rotation: UnitQuaternion<f64>,
    pub velocity: Vec3,
}

impl BoxEntity {
    pub fn from_config(config: &EntityConfig) -> Self {
        let [width, length, height] = config.size;
        Self {
            id: EntityId(config.id),
            kind: config.kind,
            model: config.model.clone(),
            position: Vec3::from(config.position),
            half_extents: Vec3::new(width, length, height) / 2.0,
            // Headings turn clockwise seen from above.
            rotation: UnitQuaternion::from_axis_angle(&Vec3::z_axis(), -config.heading.to_radians()),
            velocity: Vec3::from(config.velocity),
        }
    }

    pub fn centre(&self) -> Vec3 {
        self.position + Vec3::z() * self.half_extents.z
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    pub fn state(&self) -> EntityState {
        let speed = self.velocity.norm();
        EntityState {
            position: self.position,
            velocity: self.velocity,
            speed,
            forward: self.forward(),
            orientation: self.rotation.into_inner(),
            is_ped: self.kind == EntityKind::Pedestrian,
            is_vehicle: self.kind == EntityKind::Vehicle,
            is_stationary: speed < STATIONARY_SPEED,
        }
    }

    pub fn shape(&self) -> Cuboid {
        Cuboid::new(self.half_extents)
    }

    /// Box pose in the world frame.
    pub fn pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.centre()), self.rotation)
    }

    /// Casts the segment `origin + s * (target - origin)`, `s` in `[0, 1]`.
    /// Returns the entry fraction and the world-frame outward normal. Segments
    /// starting inside the box do not hit it.
    pub fn intersect(&self, origin: &Vec3, target: &Vec3) -> Option<(f64, Vec3)> {
        cast_segment(&self.shape(), &self.pose(), origin, target)
    }
}

/// Solid cast of a segment against `shape`. A start inside the shape reports
/// an impact at zero, which counts as a miss.
fn cast_segment(
    shape: &impl RayCast,
    pose: &Isometry3<f64>,
    origin: &Vec3,
    target: &Vec3,
) -> Option<(f64, Vec3)> {
    let delta = target - origin;
    if delta.norm_squared() == 0.0 {
        return None;
    }
    let ray = Ray::new(Point3::from(*origin), delta);
    shape
        .cast_ray_and_get_normal(pose, &ray, 1.0, true)
        .filter(|hit| hit.time_of_impact > 0.0)
        .map(|hit| (hit.time_of_impact, hit.normal))
}

// =========================================================================
// == World ==
// =========================================================================

#[derive(Debug, Clone)]
pub struct AnalyticWorld {
    ground_height: f64,
    entities: Vec<BoxEntity>,
    camera: Option<PinholeCamera>,
}

impl AnalyticWorld {
    pub fn new(ground_height: f64) -> Self {
        Self {
            ground_height,
            entities: Vec::new(),
            camera: None,
        }
    }

    pub fn from_config(config: &ScenarioConfig) -> Self {
        let mut world = Self::new(config.ground.height);
        world.spawn(BoxEntity::from_config(&config.ego));
        for entity in &config.entities {
            world.spawn(BoxEntity::from_config(entity));
        }
        debug!(entities = world.entities.len(), "Analytic world built");
        world
    }

    pub fn spawn(&mut self, entity: BoxEntity) {
        self.entities.push(entity);
    }

    pub fn entity(&self, id: EntityId) -> Option<&BoxEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entities(&self) -> &[BoxEntity] {
        &self.entities
    }

    pub fn ground_height(&self) -> f64 {
        self.ground_height
    }

    /// Sets the camera used for screen projection.
    pub fn mount_camera(&mut self, camera: PinholeCamera) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&PinholeCamera> {
        self.camera.as_ref()
    }

    /// Moves every entity along its velocity.
    pub fn advance(&mut self, dt: f64) {
        for entity in &mut self.entities {
            entity.position += entity.velocity * dt;
        }
    }

    fn ground_hit(&self, origin: &Vec3, target: &Vec3) -> Option<(f64, RayHit)> {
        let ground = HalfSpace::new(Vec3::z_axis());
        let pose = Isometry3::translation(0.0, 0.0, self.ground_height);
        let (s, normal) = cast_segment(&ground, &pose, origin, target)?;
        let along = origin + (target - origin) * s;
        Some((
            s,
            RayHit {
                // Exactly on the plane, so ground clearance reads as zero.
                point: Vec3::new(along.x, along.y, self.ground_height),
                normal,
                entity: EntityId::NONE,
            },
        ))
    }
}

impl RayCaster for AnalyticWorld {
    fn cast_ray(&self, origin: &Vec3, target: &Vec3, excluded: EntityId) -> Option<RayHit> {
        let mut nearest = self.ground_hit(origin, target);
        for entity in self.entities.iter().filter(|e| e.id != excluded) {
            if let Some((s, normal)) = entity.intersect(origin, target) {
                if nearest.as_ref().map_or(true, |(best, _)| s < *best) {
                    nearest = Some((
                        s,
                        RayHit {
                            point: origin + (target - origin) * s,
                            normal,
                            entity: entity.id,
                        },
                    ));
                }
            }
        }
        nearest.map(|(_, hit)| hit)
    }
}

impl ScreenProjector for AnalyticWorld {
    fn project_to_screen(&self, point: &Vec3) -> ScreenPoint {
        self.camera
            .as_ref()
            .map_or(ScreenPoint::OFF_SCREEN, |camera| camera.project(point))
    }
}

impl EntityKinematics for AnalyticWorld {
    fn entity_state(&self, id: EntityId) -> Option<EntityState> {
        self.entity(id).map(BoxEntity::state)
    }

    fn model_name(&self, id: EntityId) -> Option<String> {
        self.entity(id).and_then(|e| e.model.clone())
    }

    fn ground_z(&self, _point: &Vec3) -> Option<f64> {
        Some(self.ground_height)
    }
}
