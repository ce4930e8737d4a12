// synlidar_core/src/scan_pattern.rs

use crate::config::{HorizontalLimits, ScanConfig, VerticalLimits};
use crate::types::Vec3;

/// Zenith angle of the single beam ring of a 2D sensor.
pub const HORIZON_ZENITH_DEG: f64 = 90.0;

/// One sampled ray direction, both angles in degrees.
/// `phi` is the zenith angle, `theta` the azimuth clockwise from forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub phi: f64,
    pub theta: f64,
}

impl Beam {
    /// Sensor-frame endpoint of the beam at `range`
    /// (`x` = east/right, `y` = north/forward, `z` = up).
    pub fn endpoint(&self, range: f64) -> Vec3 {
        let phi = self.phi.to_radians();
        let theta = self.theta.to_radians();
        Vec3::new(
            -range * phi.sin() * theta.sin(),
            range * phi.sin() * theta.cos(),
            range * phi.cos(),
        )
    }
}

/// Azimuths of one horizontal sweep.
///
/// Starts at the right limit and steps by `resolution` while the previous
/// angle is below `360 - resolution`. Samples left over continue from 0°
/// while the previous angle is below `left_limit - resolution`. Both runs
/// stop early rather than overshoot, so fewer than `samples` angles may come
/// back, and no angle is emitted twice across the seam.
pub fn horizontal_sweep(limits: &HorizontalLimits, resolution: f64) -> Vec<f64> {
    let samples = limits.samples as usize;
    let mut angles = Vec::with_capacity(samples);

    // --- Right side: right limit up towards 360° ---
    let mut theta = limits.right_limit;
    let mut emitted = 0usize;
    while emitted < samples {
        if theta < 360.0 - resolution {
            theta = limits.right_limit + emitted as f64 * resolution;
        } else {
            break;
        }
        angles.push(theta);
        emitted += 1;
    }

    // --- Left side: wraps from 0° towards the left limit ---
    theta -= 360.0;
    for i in 0..samples - emitted {
        if theta < limits.left_limit - resolution {
            theta = i as f64 * resolution;
        } else {
            break;
        }
        angles.push(theta);
    }

    angles
}

/// Zenith angles of the beam rings, from the lower limit towards the upper
/// limit. Stops as soon as the previous ring is no longer above
/// `upper_limit - resolution`.
pub fn vertical_sweep(limits: &VerticalLimits, resolution: f64) -> Vec<f64> {
    let mut rings = Vec::with_capacity(limits.samples as usize);
    let mut phi = limits.lower_limit;
    for k in 0..limits.samples {
        if phi > limits.upper_limit - resolution {
            phi = limits.lower_limit - k as f64 * resolution;
        } else {
            break;
        }
        rings.push(phi);
    }
    rings
}

/// The ordered beams of one full scan.
#[derive(Debug, Clone)]
pub enum ScanPattern {
    Scan2D { azimuths: Vec<f64> },
    Scan3D { rings: Vec<f64>, azimuths: Vec<f64> },
}

impl ScanPattern {
    pub fn from_config(config: &ScanConfig) -> Self {
        let azimuths = horizontal_sweep(config.horizontal(), config.horizontal_resolution());
        match (config.vertical(), config.vertical_resolution()) {
            (Some(vertical), Some(resolution)) => ScanPattern::Scan3D {
                rings: vertical_sweep(vertical, resolution),
                azimuths,
            },
            _ => ScanPattern::Scan2D { azimuths },
        }
    }

    /// Beams in scan order: ring by ring, each ring swept right to left.
    pub fn beams(&self) -> impl Iterator<Item = Beam> + '_ {
        let (rings, azimuths): (&[f64], &[f64]) = match self {
            ScanPattern::Scan2D { azimuths } => (&[HORIZON_ZENITH_DEG], azimuths.as_slice()),
            ScanPattern::Scan3D { rings, azimuths } => (rings.as_slice(), azimuths.as_slice()),
        };
        rings.iter().flat_map(move |&phi| {
            azimuths
                .iter()
                .map(move |&theta| Beam { phi, theta })
        })
    }

    pub fn ring_count(&self) -> usize {
        match self {
            ScanPattern::Scan2D { .. } => 1,
            ScanPattern::Scan3D { rings, .. } => rings.len(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScanPattern::Scan2D { azimuths } => azimuths.len(),
            ScanPattern::Scan3D { rings, azimuths } => rings.len() * azimuths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
