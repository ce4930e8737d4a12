// synlidar_core/tests/common/mod.rs

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use nalgebra::Quaternion;
use synlidar_core::prelude::*;

pub const EGO: EntityId = EntityId(1);
pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 48;

/// Deterministic world: a pinhole camera looking along +y from the origin,
/// an ego vehicle at the origin, optional extra entities, and a ray caster
/// that reports a hit at a fixed fraction of every segment.
pub struct FakeWorld {
    pub intrinsics: CameraIntrinsics,
    pub entities: HashMap<EntityId, (EntityState, Option<String>)>,
    pub hit_fraction: Option<f64>,
    pub hit_entity: EntityId,
    pub ground: Option<f64>,
    pub excluded: Cell<Option<EntityId>>,
    pub casts: RefCell<usize>,
}

pub fn vehicle_state(position: Vec3, velocity: Vec3, orientation: Quaternion<f64>) -> EntityState {
    EntityState {
        position,
        velocity,
        speed: velocity.norm(),
        forward: Vec3::y(),
        orientation,
        is_ped: false,
        is_vehicle: true,
        is_stationary: velocity.norm() == 0.0,
    }
}

impl FakeWorld {
    pub fn new() -> Self {
        let mut entities = HashMap::new();
        entities.insert(
            EGO,
            (
                vehicle_state(Vec3::zeros(), Vec3::new(0.0, 2.0, 0.0), Quaternion::identity()),
                Some("ego".to_string()),
            ),
        );
        Self {
            intrinsics: CameraIntrinsics::from_vertical_fov(WIDTH, HEIGHT, 60.0, 0.15, 1000.0),
            entities,
            hit_fraction: None,
            hit_entity: EntityId::NONE,
            ground: None,
            excluded: Cell::new(None),
            casts: RefCell::new(0),
        }
    }

    pub fn with_entity(mut self, id: EntityId, state: EntityState, model: Option<&str>) -> Self {
        self.entities.insert(id, (state, model.map(str::to_string)));
        self
    }

    pub fn frame<'a>(&self, depth: &'a [f32], segmentation: &'a [u32]) -> CameraFrame<'a> {
        CameraFrame {
            position: Vec3::zeros(),
            basis: CameraBasis::default(),
            intrinsics: self.intrinsics,
            depth,
            segmentation,
        }
    }

    /// Depth buffer that decodes to `metres` at every pixel.
    pub fn constant_depth(&self, metres: f64) -> Vec<f32> {
        self.depth_from(|_, _| metres)
    }

    pub fn depth_from(&self, metres: impl Fn(usize, usize) -> f64) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(WIDTH * HEIGHT);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                buffer.push(self.intrinsics.ndc_from_metric(x, y, metres(x, y)));
            }
        }
        buffer
    }

    pub fn segmentation(&self, id: u32) -> Vec<u32> {
        vec![id; WIDTH * HEIGHT]
    }
}

impl RayCaster for FakeWorld {
    fn cast_ray(&self, origin: &Vec3, target: &Vec3, excluded: EntityId) -> Option<RayHit> {
        self.excluded.set(Some(excluded));
        *self.casts.borrow_mut() += 1;
        let fraction = self.hit_fraction?;
        Some(RayHit {
            point: origin + (target - origin) * fraction,
            normal: Vec3::z(),
            entity: self.hit_entity,
        })
    }
}

impl ScreenProjector for FakeWorld {
    fn project_to_screen(&self, point: &Vec3) -> ScreenPoint {
        let forward = point.y;
        if forward <= 0.0 {
            return ScreenPoint::OFF_SCREEN;
        }
        let near = self.intrinsics.near_clip;
        ScreenPoint::new(
            0.5 + point.x / forward * near / self.intrinsics.near_clip_width,
            0.5 - point.z / forward * near / self.intrinsics.near_clip_height,
        )
    }
}

impl EntityKinematics for FakeWorld {
    fn entity_state(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(&id).map(|(state, _)| *state)
    }

    fn model_name(&self, id: EntityId) -> Option<String> {
        self.entities.get(&id).and_then(|(_, model)| model.clone())
    }

    fn ground_z(&self, _point: &Vec3) -> Option<f64> {
        self.ground
    }
}
