// synlidar_sim/src/simulation/camera.rs

//! Pinhole camera that renders the depth and segmentation buffers the
//! sensor samples, by casting one ray per pixel through the scene.

use nalgebra::UnitQuaternion;
use synlidar_core::prelude::*;
use tracing::debug;

/// Depth (NDC) and entity buffers for one frame, row-major.
#[derive(Debug, Clone, Default)]
pub struct RenderedFrame {
    pub depth: Vec<f32>,
    pub segmentation: Vec<u32>,
    /// Pixels whose ray struck nothing before the far clip.
    pub empty_pixels: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    pub position: Vec3,
    pub basis: CameraBasis,
    pub intrinsics: CameraIntrinsics,
}

impl PinholeCamera {
    /// Camera rigidly mounted on an entity. `offset` is in the entity's body
    /// frame: right, forward, up.
    pub fn mounted_on(state: &EntityState, offset: &Vec3, intrinsics: CameraIntrinsics) -> Self {
        let rotation = UnitQuaternion::from_quaternion(state.orientation);
        Self {
            position: state.position + rotation * offset,
            basis: CameraBasis {
                forward: rotation * Vec3::y(),
                right: rotation * Vec3::x(),
                up: rotation * Vec3::z(),
            },
            intrinsics,
        }
    }

    /// Normalised screen position of a world point. Points behind the camera
    /// are off-screen.
    pub fn project(&self, point: &Vec3) -> ScreenPoint {
        let local = self.basis.to_vehicle_axes(&(point - self.position));
        if local.y <= 0.0 {
            return ScreenPoint::OFF_SCREEN;
        }
        let near = self.intrinsics.near_clip;
        ScreenPoint::new(
            0.5 + local.x / local.y * near / self.intrinsics.near_clip_width,
            0.5 - local.z / local.y * near / self.intrinsics.near_clip_height,
        )
    }

    /// Unit world direction through the centre of pixel `(x, y)`.
    pub fn pixel_direction(&self, x: usize, y: usize) -> Vec3 {
        let u = (x as f64 + 0.5) / self.intrinsics.width as f64;
        let v = (y as f64 + 0.5) / self.intrinsics.height as f64;
        let direction = self.basis.forward * self.intrinsics.near_clip
            + self.basis.right * ((u - 0.5) * self.intrinsics.near_clip_width)
            + self.basis.up * ((0.5 - v) * self.intrinsics.near_clip_height);
        direction.normalize()
    }

    /// Renders the scene as seen from this camera, ignoring `excluded`
    /// (the vehicle carrying the camera).
    pub fn render<C: RayCaster + ?Sized>(&self, caster: &C, excluded: EntityId) -> RenderedFrame {
        let pixels = self.intrinsics.pixel_count();
        let mut rendered = RenderedFrame {
            depth: Vec::with_capacity(pixels),
            segmentation: Vec::with_capacity(pixels),
            empty_pixels: 0,
        };

        for y in 0..self.intrinsics.height {
            for x in 0..self.intrinsics.width {
                let far = self.position + self.pixel_direction(x, y) * self.intrinsics.far_clip;
                match caster.cast_ray(&self.position, &far, excluded) {
                    Some(hit) => {
                        let distance = (hit.point - self.position).norm();
                        rendered
                            .depth
                            .push(self.intrinsics.ndc_from_metric(x, y, distance));
                        rendered.segmentation.push(hit.entity.0);
                    }
                    None => {
                        rendered.depth.push(0.0);
                        rendered.segmentation.push(EntityId::NONE.0);
                        rendered.empty_pixels += 1;
                    }
                }
            }
        }

        debug!(
            width = self.intrinsics.width,
            height = self.intrinsics.height,
            empty = rendered.empty_pixels,
            "Camera frame rendered"
        );
        rendered
    }

    /// Borrows a rendered frame as sensor input.
    pub fn frame<'a>(&self, rendered: &'a RenderedFrame) -> CameraFrame<'a> {
        CameraFrame {
            position: self.position,
            basis: self.basis,
            intrinsics: self.intrinsics,
            depth: &rendered.depth,
            segmentation: &rendered.segmentation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> PinholeCamera {
        PinholeCamera {
            position: Vec3::new(0.0, 0.0, 1.0),
            basis: CameraBasis::default(),
            intrinsics: CameraIntrinsics::from_vertical_fov(40, 20, 60.0, 0.15, 1000.0),
        }
    }

    #[test]
    fn pixel_directions_project_back_to_their_centres() {
        let camera = camera();
        for (x, y) in [(0, 0), (13, 7), (39, 19)] {
            let point = camera.position + camera.pixel_direction(x, y) * 25.0;
            let screen = camera.project(&point);
            assert_relative_eq!(screen.u, (x as f64 + 0.5) / 40.0, epsilon = 1e-9);
            assert_relative_eq!(screen.v, (y as f64 + 0.5) / 20.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn points_behind_the_camera_are_off_screen() {
        let screen = camera().project(&Vec3::new(0.0, -5.0, 1.0));
        assert!(!screen.is_on_screen());
    }

    #[test]
    fn mounting_follows_the_entity_heading() {
        // Heading 90 degrees clockwise: forward is +x.
        let orientation =
            UnitQuaternion::from_axis_angle(&Vec3::z_axis(), -std::f64::consts::FRAC_PI_2);
        let state = EntityState {
            position: Vec3::new(10.0, 0.0, 0.0),
            velocity: Vec3::zeros(),
            speed: 0.0,
            forward: Vec3::x(),
            orientation: orientation.into_inner(),
            is_ped: false,
            is_vehicle: true,
            is_stationary: true,
        };
        let camera = PinholeCamera::mounted_on(
            &state,
            &Vec3::new(0.0, 1.0, 1.5),
            camera().intrinsics,
        );
        assert_relative_eq!(camera.basis.forward, Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(camera.basis.right, -Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(camera.position, Vec3::new(11.0, 0.0, 1.5), epsilon = 1e-12);
    }
}
