// synlidar_core/src/camera.rs

use serde::{Deserialize, Serialize};

use crate::frames::CameraBasis;
use crate::types::{EntityId, Vec3};

/// Static camera parameters needed to turn NDC depth into metric depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: usize,
    pub height: usize,
    pub near_clip: f64,
    pub far_clip: f64,
    /// Width of the near-clip plane in world units.
    pub near_clip_width: f64,
    /// Height of the near-clip plane in world units.
    pub near_clip_height: f64,
}

impl CameraIntrinsics {
    /// Derives the near-clip plane from a vertical field of view (degrees)
    /// and the pixel aspect ratio.
    pub fn from_vertical_fov(
        width: usize,
        height: usize,
        vertical_fov_deg: f64,
        near_clip: f64,
        far_clip: f64,
    ) -> Self {
        let near_clip_height = 2.0 * near_clip * (vertical_fov_deg.to_radians() / 2.0).tan();
        let aspect = width as f64 / height.max(1) as f64;
        Self {
            width,
            height,
            near_clip,
            far_clip,
            near_clip_width: near_clip_height * aspect,
            near_clip_height,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Distance from the camera to the near-clip plane through pixel `(x, y)`.
    /// Pixels are assumed in range.
    pub fn near_clip_distance(&self, x: usize, y: usize) -> f64 {
        let x_norm = normalized_index(x, self.width);
        let y_norm = normalized_index(y, self.height);
        let nc_x = (2.0 * x_norm - 1.0).abs() * self.near_clip_width / 2.0;
        let nc_y = (2.0 * y_norm - 1.0).abs() * self.near_clip_height / 2.0;
        (self.near_clip * self.near_clip + nc_x * nc_x + nc_y * nc_y).sqrt()
    }

    /// Converts an NDC depth sample at pixel `(x, y)` into metric distance.
    /// Zero, negative or non-finite samples have no metric depth.
    pub fn metric_depth(&self, x: usize, y: usize, ndc: f32) -> Option<f64> {
        let ndc = ndc as f64;
        if !ndc.is_finite() || ndc <= 0.0 {
            return None;
        }
        let depth = self.near_clip_distance(x, y) / ndc;
        let divisor = (self.near_clip * depth) / (2.0 * self.far_clip);
        let depth = depth / (1.0 + divisor);
        (depth.is_finite() && depth > 0.0).then_some(depth)
    }

    /// Inverse of [`CameraIntrinsics::metric_depth`]. Used by renderers that
    /// produce the depth buffer from known distances.
    pub fn ndc_from_metric(&self, x: usize, y: usize, depth: f64) -> f32 {
        let denominator = 1.0 - (self.near_clip * depth) / (2.0 * self.far_clip);
        if denominator <= 0.0 {
            return 0.0;
        }
        let unscaled = depth / denominator;
        (self.near_clip_distance(x, y) / unscaled) as f32
    }
}

fn normalized_index(index: usize, extent: usize) -> f64 {
    if extent > 1 {
        index as f64 / (extent - 1) as f64
    } else {
        0.5
    }
}

/// Screen-space position normalised to `[0, 1] x [0, 1]`. Anything outside
/// that square is off-screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub u: f64,
    pub v: f64,
}

impl ScreenPoint {
    pub const OFF_SCREEN: ScreenPoint = ScreenPoint { u: -1.0, v: -1.0 };

    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    pub fn is_on_screen(&self) -> bool {
        (0.0..=1.0).contains(&self.u) && (0.0..=1.0).contains(&self.v)
    }
}

/// One rendered camera frame: pose, intrinsics and the per-scan buffers.
/// The buffers are borrowed for the duration of a scan call only.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame<'a> {
    pub position: Vec3,
    pub basis: CameraBasis,
    pub intrinsics: CameraIntrinsics,
    /// Row-major NDC depth, one sample per pixel.
    pub depth: &'a [f32],
    /// Row-major entity identity, one value per pixel.
    pub segmentation: &'a [u32],
}

impl<'a> CameraFrame<'a> {
    /// Pixel under a screen position, using the same half-pixel shift as the
    /// interpolation grid and clamped to the image.
    pub fn pixel_at(&self, screen: &ScreenPoint) -> (usize, usize) {
        let x = (screen.u * self.intrinsics.width as f64 - 0.5).floor();
        let y = (screen.v * self.intrinsics.height as f64 - 0.5).floor();
        (
            clamp_index(x, self.intrinsics.width),
            clamp_index(y, self.intrinsics.height),
        )
    }

    /// Entity visible under a screen position. Missing data reads as world geometry.
    pub fn entity_at(&self, screen: &ScreenPoint) -> EntityId {
        let (x, y) = self.pixel_at(screen);
        self.segmentation
            .get(y * self.intrinsics.width + x)
            .copied()
            .map(EntityId)
            .unwrap_or(EntityId::NONE)
    }
}

pub(crate) fn clamp_index(value: f64, extent: usize) -> usize {
    if extent == 0 || value <= 0.0 || value.is_nan() {
        0
    } else {
        (value as usize).min(extent - 1)
    }
}
