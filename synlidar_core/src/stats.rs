// synlidar_core/src/stats.rs

use std::fmt;

/// Running sum of distance ratios falling into one band.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatioBand {
    pub sum: f64,
    pub count: usize,
}

impl RatioBand {
    fn add(&mut self, ratio: f64) {
        self.sum += ratio;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Agreement between depth-map distance and ray-cast distance over the
/// ground-level candidates of one scan. A ratio of 1 means both sources agree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthStats {
    /// Ratios within 10 % of unity.
    pub overall: RatioBand,
    /// Every ratio whose depth-map distance exceeds 100 m.
    pub beyond_100m: RatioBand,
    /// Ratios within 5 % of unity, depth-map distance up to 10 m.
    pub within_10m: RatioBand,
    /// Ratios within 5 % of unity, depth-map distance in (10, 40] m.
    pub within_40m: RatioBand,
    /// Ratios within 5 % of unity, depth-map distance from 40 m up to the output range.
    pub within_max: RatioBand,
}

impl DepthStats {
    pub fn accumulate(&mut self, depth_distance: f64, ray_distance: f64, max_range: f64) {
        if ray_distance <= 0.0 {
            return;
        }
        let ratio = depth_distance / ray_distance;
        if ratio > 0.9 && ratio < 1.1 {
            self.overall.add(ratio);
        }
        if depth_distance > 100.0 {
            self.beyond_100m.add(ratio);
        }
        if depth_distance <= max_range && ratio > 0.95 && ratio < 1.05 {
            if depth_distance <= 10.0 {
                self.within_10m.add(ratio);
            } else if depth_distance <= 40.0 {
                self.within_40m.add(ratio);
            } else {
                self.within_max.add(ratio);
            }
        }
    }
}

fn write_band(f: &mut fmt::Formatter<'_>, label: &str, band: &RatioBand) -> fmt::Result {
    match band.mean() {
        Some(mean) => write!(f, "{label}: {mean:.4} ({} pts)", band.count),
        None => write!(f, "{label}: n/a"),
    }
}

impl fmt::Display for DepthStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_band(f, "avg distance ratio", &self.overall)?;
        f.write_str(", ")?;
        write_band(f, "over 100", &self.beyond_100m)?;
        f.write_str(", ")?;
        write_band(f, "under max", &self.within_max)?;
        f.write_str(", ")?;
        write_band(f, "under 40", &self.within_40m)?;
        f.write_str(", ")?;
        write_band(f, "under 10", &self.within_10m)
    }
}
