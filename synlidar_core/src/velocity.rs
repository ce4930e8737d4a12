// synlidar_core/src/velocity.rs

//! Radial velocity channel.
//!
//! The LiDAR measures speed along the line of sight only. Both estimators here
//! take the magnitude of a relative velocity and scale it by the cosine of the
//! point's elevation seen from the sensor, which models the Doppler cosine
//! error for points above or below the sensor.

use crate::types::Vec3;

/// Look-ahead used to decide whether a moving entity approaches or departs.
const LOOK_AHEAD_STEP: f64 = 1.0;

/// Which estimator applies to a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionClass {
    /// The ego vehicle itself. No velocity is reported.
    Ego,
    /// A non-ego entity in motion.
    Moving,
    /// World geometry or a stopped pedestrian/vehicle.
    Static,
}

/// Elevation of `point` seen from `sensor`, in radians.
/// Positive when the sensor is above the point.
pub fn elevation_angle(sensor: &Vec3, point: &Vec3) -> f64 {
    let delta = sensor - point;
    delta.z.atan2(delta.x.hypot(delta.y))
}

/// Signed radial speed of a moving entity, positive when departing.
///
/// The sign comes from comparing the separation now with the separation after
/// both bodies move for one look-ahead step at their current velocities.
pub fn moving_entity_velocity(
    ego_position: &Vec3,
    ego_velocity: &Vec3,
    entity_position: &Vec3,
    entity_velocity: &Vec3,
    elevation: f64,
) -> f64 {
    let relative_speed = (entity_velocity - ego_velocity).norm();
    let current = (entity_position - ego_position).norm();
    let future = ((entity_position + entity_velocity * LOOK_AHEAD_STEP)
        - (ego_position + ego_velocity * LOOK_AHEAD_STEP))
        .norm();

    let radial = if future > current {
        relative_speed
    } else if future < current {
        -relative_speed
    } else {
        0.0
    };
    radial * elevation.cos()
}

/// Radial speed of ground or a stopped entity. The ground has zero absolute
/// velocity, so the point always appears to approach at the ego speed.
pub fn static_point_velocity(ego_velocity: &Vec3, elevation: f64) -> f64 {
    let relative = Vec3::zeros() - ego_velocity;
    -relative.norm() * elevation.cos()
}
