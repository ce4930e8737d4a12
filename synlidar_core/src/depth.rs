// synlidar_core/src/depth.rs

//! Depth acquisition from the rendered depth buffer.
//!
//! [`depth_at_pixel`] converts one buffer sample into metric depth.
//! [`depth_at_screen`] is the continuous variant: it interpolates bilinearly
//! in the image interior and falls back to the nearest pixel near the edges
//! or across depth discontinuities. [`DepthSampler`] adds the optional
//! Gaussian noise on top and is the only entry point the sensor uses.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::camera::{clamp_index, CameraFrame, ScreenPoint};
use crate::config::DepthNoiseOptions;
use crate::errors::NoiseError;

/// Ratio between the deepest and shallowest of four neighbouring samples
/// above which they are treated as an object edge and not blended.
pub const DISCONTINUITY_RATIO: f64 = 1.08;

/// Metric depth of pixel `(x, y)`. Coordinates are clamped to the image.
pub fn depth_at_pixel(frame: &CameraFrame<'_>, x: i64, y: i64) -> Option<f64> {
    let intrinsics = &frame.intrinsics;
    let x = clamp_index(x as f64, intrinsics.width);
    let y = clamp_index(y as f64, intrinsics.height);
    let ndc = *frame.depth.get(y * intrinsics.width + x)?;
    intrinsics.metric_depth(x, y, ndc)
}

/// Metric depth at a continuous screen position, without noise.
pub fn depth_at_screen(frame: &CameraFrame<'_>, screen: &ScreenPoint) -> Option<f64> {
    interpolated_depth(frame, screen).or_else(|| nearest_depth(frame, screen))
}

fn interpolated_depth(frame: &CameraFrame<'_>, screen: &ScreenPoint) -> Option<f64> {
    let width = frame.intrinsics.width as f64;
    let height = frame.intrinsics.height as f64;
    let half_w = 0.5 / width;
    let half_h = 0.5 / height;
    let interior = screen.u > half_w
        && screen.u < 1.0 - half_w
        && screen.v > half_h
        && screen.v < 1.0 - half_h;
    if !interior {
        return None;
    }

    // Pixel centres sit at half-integer positions.
    let x = screen.u * width - 0.5;
    let y = screen.v * height - 0.5;
    let (x0, x1) = (x.floor() as i64, x.ceil() as i64);
    let (y0, y1) = (y.floor() as i64, y.ceil() as i64);

    let d00 = depth_at_pixel(frame, x0, y0)?;
    let d01 = depth_at_pixel(frame, x0, y1)?;
    let d10 = depth_at_pixel(frame, x1, y0)?;
    let d11 = depth_at_pixel(frame, x1, y1)?;

    let min_depth = d00.min(d01).min(d10).min(d11);
    let max_depth = d00.max(d01).max(d10).max(d11);
    if max_depth > min_depth * DISCONTINUITY_RATIO {
        return None;
    }

    let tx = x - x0 as f64;
    let ty = y - y0 as f64;
    Some(
        (1.0 - tx) * (1.0 - ty) * d00
            + tx * (1.0 - ty) * d10
            + (1.0 - tx) * ty * d01
            + tx * ty * d11,
    )
}

fn nearest_depth(frame: &CameraFrame<'_>, screen: &ScreenPoint) -> Option<f64> {
    let x = (screen.u * frame.intrinsics.width as f64).floor() as i64;
    let y = (screen.v * frame.intrinsics.height as f64).floor() as i64;
    depth_at_pixel(frame, x, y)
}

// =========================================================================
// == Noise ==
// =========================================================================

/// Seedable Gaussian depth noise owned by one sensor.
#[derive(Debug, Clone)]
pub struct DepthNoise {
    rng: ChaCha8Rng,
    distribution: Normal<f64>,
}

impl DepthNoise {
    pub fn new(mean: f64, stddev: f64, seed: Option<u64>) -> Result<Self, NoiseError> {
        if !stddev.is_finite() || stddev < 0.0 {
            return Err(NoiseError::InvalidStdDev(stddev));
        }
        let distribution =
            Normal::new(mean, stddev).map_err(|_| NoiseError::InvalidStdDev(stddev))?;
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self { rng, distribution })
    }

    pub fn sample(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng)
    }
}

/// The single depth-acquisition primitive used by the sensor.
#[derive(Debug, Clone, Default)]
pub struct DepthSampler {
    noise: Option<DepthNoise>,
}

impl DepthSampler {
    pub fn from_options(options: &DepthNoiseOptions) -> Result<Self, NoiseError> {
        let noise = if options.enabled {
            Some(DepthNoise::new(options.mean, options.stddev, options.seed)?)
        } else {
            None
        };
        Ok(Self { noise })
    }

    pub fn noiseless() -> Self {
        Self { noise: None }
    }

    /// Depth at a screen position with noise applied. A noisy depth that is
    /// no longer positive is discarded.
    pub fn sample(&mut self, frame: &CameraFrame<'_>, screen: &ScreenPoint) -> Option<f64> {
        let depth = depth_at_screen(frame, screen)?;
        match self.noise.as_mut() {
            Some(noise) => {
                let noisy = depth + noise.sample();
                (noisy > 0.0).then_some(noisy)
            }
            None => Some(depth),
        }
    }
}
