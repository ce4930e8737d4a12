// synlidar_core/src/frames.rs

//! Frame conventions used by the sensor.
//!
//! Three frames show up in a scan:
//! - **Sensor frame**: spherical beam directions, right = east positive,
//!   forward = north positive, up positive.
//! - **World frame**: the simulator's frame. Sensor vectors are rotated into it
//!   with the direction-cosine matrix of the ego orientation.
//! - **Output frame**: vehicle-relative axes remapped to the point-cloud
//!   convention, forward = +x, left = +y, up = +z.

use nalgebra::{Matrix3, Quaternion};

use crate::types::Vec3;

/// Builds the direction-cosine matrix that maps body-frame vectors into the
/// world frame from an `(x, y, z, w)` quaternion.
///
/// The quaternion is not normalised. A non-unit input gives a non-orthonormal
/// matrix and is passed through as-is.
pub fn dcm_from_quaternion(q: &Quaternion<f64>) -> Matrix3<f64> {
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);

    let q00 = w * w;
    let q11 = x * x;
    let q22 = y * y;
    let q33 = z * z;
    let q01 = w * x;
    let q02 = w * y;
    let q03 = w * z;
    let q12 = x * y;
    let q13 = x * z;
    let q23 = y * z;

    Matrix3::new(
        q00 + q11 - q22 - q33,
        2.0 * (q12 - q03),
        2.0 * (q13 + q02),
        2.0 * (q12 + q03),
        q00 - q11 + q22 - q33,
        2.0 * (q23 - q01),
        2.0 * (q13 - q02),
        2.0 * (q23 + q01),
        q00 - q11 - q22 + q33,
    )
}

/// Orthogonal basis of the camera in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl CameraBasis {
    /// Projects a world-aligned offset onto the basis.
    /// The result is vehicle-relative: `x` = right, `y` = forward, `z` = up.
    pub fn to_vehicle_axes(&self, offset: &Vec3) -> Vec3 {
        Vec3::new(
            offset.dot(&self.right),
            offset.dot(&self.forward),
            offset.dot(&self.up),
        )
    }

    /// Inverse of [`CameraBasis::to_vehicle_axes`] for an orthonormal basis.
    pub fn to_world_axes(&self, vehicle: &Vec3) -> Vec3 {
        self.right * vehicle.x + self.forward * vehicle.y + self.up * vehicle.z
    }
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self {
            forward: Vec3::y(),
            right: Vec3::x(),
            up: Vec3::z(),
        }
    }
}

/// Remaps a vehicle-relative point `(a, b, c)` to the output convention `(b, -a, c)`.
pub fn to_output_axes(vehicle: &Vec3) -> [f32; 3] {
    [vehicle.y as f32, -vehicle.x as f32, vehicle.z as f32]
}
