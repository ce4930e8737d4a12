// synlidar_core/src/synth.rs

//! Per-beam point synthesis.
//!
//! A beam is resolved from two independent sources. The geometric ray cast
//! gives an exact intersection but misses detail the renderer draws. The
//! depth buffer matches what the camera sees but only exists on screen. This
//! module turns one beam into the records each source contributes and leaves
//! the bookkeeping of buffers and counters to the orchestrator.

use nalgebra::Matrix3;

use crate::buffers::{PointRecord, ADJUSTED_POINT_SENTINEL};
use crate::camera::{CameraFrame, ScreenPoint};
use crate::class_table::VehicleClassTable;
use crate::config::SensorOptions;
use crate::depth::DepthSampler;
use crate::frames::to_output_axes;
use crate::scan_pattern::Beam;
use crate::types::{EntityId, Vec3};
use crate::velocity::{
    elevation_angle, moving_entity_velocity, static_point_velocity, MotionClass,
};
use crate::world::{EntityState, RayHit, World};

/// Class-intensity value for an entity whose model name is not in the table.
pub const UNRECOGNIZED_MODEL_INTENSITY: f32 = 999.99;

/// Ground-clearance channel value when no clearance was measured.
pub const UNKNOWN_GROUND_CLEARANCE: f32 = -1.0;

/// An on-screen beam kept for reconciliation after the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitCandidate {
    /// Nominal world-frame target of the beam at maximum range.
    pub target: Vec3,
    pub screen: ScreenPoint,
    /// Height of the ray-cast end point above the ground, when measured.
    pub ground_clearance: Option<f64>,
    /// Distance from the camera to the ray-cast end point.
    pub ray_distance: f64,
}

/// A depth-map point that survived the range filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSample {
    pub record: PointRecord,
    /// Entity under the beam, with the ego vehicle mapped to world geometry.
    pub entity: EntityId,
}

/// What a ray-cast hit contributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySample {
    /// Position and entity identity; `None` beyond the output range.
    pub record: Option<PointRecord>,
    /// Depth-rescaled variant, when enabled and within range.
    pub adjusted: Option<PointRecord>,
    /// Labelled entity: pedestrians and vehicles only.
    pub entity: EntityId,
    /// Hit point relative to the camera, world-aligned.
    pub offset: Vec3,
    pub on_screen: bool,
}

/// Everything one beam produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamResult {
    pub screen: ScreenPoint,
    pub candidate: Option<HitCandidate>,
    pub depth: Option<DepthSample>,
    pub ray: Option<RaySample>,
}

/// A depth-map reconstruction of a beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthPoint {
    /// Camera-relative offset in world-aligned axes.
    pub world_offset: Vec3,
    /// Camera-relative offset in vehicle axes (right, forward, up).
    pub vehicle: Vec3,
}

/// Rebuilds the camera-relative point behind `screen` by scaling the unit
/// vector from the camera to `target` by the sampled depth.
pub fn depth_point(
    frame: &CameraFrame<'_>,
    sampler: &mut DepthSampler,
    target: &Vec3,
    screen: &ScreenPoint,
) -> Option<DepthPoint> {
    let direction = target - frame.position;
    let distance = direction.norm();
    if distance <= f64::EPSILON {
        return None;
    }
    let depth = sampler.sample(frame, screen)?;
    let world_offset = direction / distance * depth;
    Some(DepthPoint {
        world_offset,
        vehicle: frame.basis.to_vehicle_axes(&world_offset),
    })
}

/// Recomputes a candidate for the fused cloud: position plus ground clearance.
pub fn reconcile(
    frame: &CameraFrame<'_>,
    sampler: &mut DepthSampler,
    candidate: &HitCandidate,
    max_output_range: f64,
) -> Option<PointRecord> {
    let point = depth_point(frame, sampler, &candidate.target, &candidate.screen)?;
    if point.vehicle.norm() > max_output_range {
        return None;
    }
    let clearance = candidate
        .ground_clearance
        .map_or(UNKNOWN_GROUND_CLEARANCE, |c| c as f32);
    Some(PointRecord::with_value(to_output_axes(&point.vehicle), clearance))
}

/// Motion class of the entity under a point.
pub fn motion_class(entity: EntityId, ego: EntityId, state: Option<&EntityState>) -> MotionClass {
    if entity == ego {
        MotionClass::Ego
    } else if entity.is_none() {
        MotionClass::Static
    } else {
        match state {
            Some(state) if !state.is_stopped_actor() => MotionClass::Moving,
            _ => MotionClass::Static,
        }
    }
}

/// Per-scan state shared by every beam.
pub struct ScanContext<'a, W: World + ?Sized> {
    pub world: &'a W,
    pub frame: CameraFrame<'a>,
    /// Body-to-world rotation of the scanning vehicle.
    pub dcm: Matrix3<f64>,
    pub max_range: f64,
    pub ego: EntityId,
    pub ego_position: Vec3,
    pub ego_velocity: Vec3,
    /// Sensor position used for elevation angles: above the ground at mount height.
    pub sensor_point: Vec3,
    pub options: &'a SensorOptions,
    pub class_table: &'a VehicleClassTable,
}

impl<'a, W: World + ?Sized> ScanContext<'a, W> {
    /// World-frame end point of the beam at maximum range.
    pub fn nominal_target(&self, beam: &Beam) -> Vec3 {
        self.dcm * beam.endpoint(self.max_range) + self.frame.position
    }

    pub fn synthesize(&self, sampler: &mut DepthSampler, beam: &Beam) -> BeamResult {
        let target = self.nominal_target(beam);
        let hit = if self.options.use_raycasting {
            self.world.cast_ray(&self.frame.position, &target, self.ego)
        } else {
            None
        };

        // Off-screen beams are expected and simply contribute no depth point.
        let screen = self.world.project_to_screen(&target);
        let on_screen = screen.is_on_screen();

        let mut result = BeamResult {
            screen,
            candidate: None,
            depth: None,
            ray: None,
        };

        if on_screen {
            let end = hit.map_or(target, |h| h.point);
            let ground_clearance = if self.options.output_depth_stats {
                self.world.ground_z(&end).map(|ground| end.z - ground)
            } else {
                None
            };
            result.candidate = Some(HitCandidate {
                target,
                screen,
                ground_clearance,
                ray_distance: (end - self.frame.position).norm(),
            });
            result.depth = self.depth_sample(sampler, &target, &screen);
        }

        if let Some(hit) = hit {
            result.ray = Some(self.ray_sample(sampler, &hit, on_screen));
        }
        result
    }

    fn in_output_range(&self, vehicle: &Vec3) -> bool {
        vehicle.norm() <= self.options.max_output_range
    }

    fn depth_sample(
        &self,
        sampler: &mut DepthSampler,
        target: &Vec3,
        screen: &ScreenPoint,
    ) -> Option<DepthSample> {
        let point = depth_point(&self.frame, sampler, target, screen)?;
        if !self.in_output_range(&point.vehicle) {
            return None;
        }

        let seen = self.frame.entity_at(screen);
        let entity = if seen == self.ego { EntityId::NONE } else { seen };
        let world_point = self.frame.position + point.world_offset;
        let channels = [
            entity.as_channel(),
            self.class_intensity(entity),
            0.0,
            self.radial_velocity(seen, &world_point) as f32,
        ];
        Some(DepthSample {
            record: PointRecord::new(to_output_axes(&point.vehicle), channels),
            entity,
        })
    }

    /// 1 for the target class, 0 for other classes and world geometry, and a
    /// sentinel for entities whose model is missing or not in the table.
    fn class_intensity(&self, entity: EntityId) -> f32 {
        if entity.is_none() || entity == self.ego {
            return 0.0;
        }
        let Some(model) = self.world.model_name(entity) else {
            return UNRECOGNIZED_MODEL_INTENSITY;
        };
        match self.class_table.lookup(&model) {
            None => UNRECOGNIZED_MODEL_INTENSITY,
            Some(class) if class == self.options.target_class => 1.0,
            Some(_) => 0.0,
        }
    }

    fn radial_velocity(&self, entity: EntityId, world_point: &Vec3) -> f64 {
        let state = if entity.is_none() {
            None
        } else {
            self.world.entity_state(entity)
        };
        let elevation = elevation_angle(&self.sensor_point, world_point);
        match (motion_class(entity, self.ego, state.as_ref()), state) {
            (MotionClass::Moving, Some(state)) => moving_entity_velocity(
                &self.ego_position,
                &self.ego_velocity,
                &state.position,
                &state.velocity,
                elevation,
            ),
            (MotionClass::Static, _) => static_point_velocity(&self.ego_velocity, elevation),
            _ => 0.0,
        }
    }

    /// Only pedestrians and vehicles keep their identity on ray-cast points.
    fn labelled_entity(&self, entity: EntityId) -> EntityId {
        if entity.is_none() || entity == self.ego {
            return EntityId::NONE;
        }
        match self.world.entity_state(entity) {
            Some(state) if state.is_actor() => entity,
            _ => EntityId::NONE,
        }
    }

    fn ray_sample(&self, sampler: &mut DepthSampler, hit: &RayHit, on_screen: bool) -> RaySample {
        let offset = hit.point - self.frame.position;
        let vehicle = self.frame.basis.to_vehicle_axes(&offset);
        let entity = self.labelled_entity(hit.entity);

        let record = self
            .in_output_range(&vehicle)
            .then(|| PointRecord::with_entity(to_output_axes(&vehicle), entity));
        let adjusted = if self.options.output_adjusted_points {
            self.adjusted_point(sampler, &hit.point, vehicle)
        } else {
            None
        };

        RaySample {
            record,
            adjusted,
            entity,
            offset,
            on_screen,
        }
    }

    /// Ray-cast end point rescaled so its length matches the depth map.
    /// End points that project off-screen keep their ray-cast length.
    fn adjusted_point(
        &self,
        sampler: &mut DepthSampler,
        hit_point: &Vec3,
        mut vehicle: Vec3,
    ) -> Option<PointRecord> {
        let screen = self.world.project_to_screen(hit_point);
        let raw = vehicle.norm();
        if screen.is_on_screen() && raw > f64::EPSILON {
            if let Some(depth) = sampler.sample(&self.frame, &screen) {
                vehicle *= depth / raw;
            }
        }
        self.in_output_range(&vehicle).then(|| {
            PointRecord::new(
                to_output_axes(&vehicle),
                [ADJUSTED_POINT_SENTINEL, 0.0, 0.0, 0.0],
            )
        })
    }
}
