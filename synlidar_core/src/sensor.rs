// synlidar_core/src/sensor.rs

//! The scan orchestrator.
//!
//! A [`Lidar`] owns its configuration, its noise generator, the output buffers
//! and the hit candidates of the current scan. It borrows everything else
//! (world, camera frame, hit map) for the duration of a single call.
//!
//! Lifecycle: construct, initialise with one of the `init_*` functions, attach
//! to the ego vehicle, then call [`Lidar::scan`] once per frame followed by
//! [`Lidar::update_point_cloud`]. Buffers stay readable until the next scan.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::buffers::PointBuffer;
use crate::camera::{CameraFrame, ScreenPoint};
use crate::class_table::VehicleClassTable;
use crate::config::{HorizontalLimits, ScanConfig, SensorOptions, VerticalLimits};
use crate::depth::DepthSampler;
use crate::errors::{ConfigError, NoiseError};
use crate::frames::dcm_from_quaternion;
use crate::hits::HitTracker;
use crate::scan_pattern::ScanPattern;
use crate::stats::DepthStats;
use crate::synth::{depth_point, reconcile, BeamResult, HitCandidate, ScanContext};
use crate::types::{EntityHitMap, EntityId, ScanMode, Vec3};
use crate::world::{EntityKinematics, World};

/// Counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Beams traversed.
    pub beams: usize,
    /// Depth-map points written to the primary cloud.
    pub depth_map_points: usize,
    /// Off-screen ray-cast points written to the primary cloud.
    pub ray_points: usize,
    pub primary_points: usize,
    pub raycast_points: usize,
    /// Ray-cast points placed in the fused cloud during the scan. Grows after
    /// [`Lidar::update_point_cloud`].
    pub updated_points: usize,
    pub adjusted_points: usize,
    /// Records lost to full buffers, over every buffer.
    pub dropped_points: usize,
}

#[derive(Debug)]
struct ScanOutputs {
    primary: PointBuffer,
    raycast: PointBuffer,
    updated: PointBuffer,
    adjusted: PointBuffer,
    beam_map: Vec<ScreenPoint>,
    candidates: Vec<HitCandidate>,
    summary: ScanSummary,
}

impl ScanOutputs {
    fn new(capacity: usize, record_beam_map: bool) -> Self {
        Self {
            primary: PointBuffer::new("primary", capacity),
            raycast: PointBuffer::new("raycast", capacity),
            updated: PointBuffer::new("updated", capacity),
            adjusted: PointBuffer::new("adjusted", capacity),
            beam_map: Vec::with_capacity(if record_beam_map { capacity } else { 0 }),
            candidates: Vec::new(),
            summary: ScanSummary::default(),
        }
    }

    /// Resets everything a scan overwrites. Candidates left unreconciled by
    /// the previous scan are dropped.
    fn begin_scan(&mut self) {
        self.candidates.clear();
        self.primary.clear();
        self.raycast.clear();
        self.updated.clear();
        self.adjusted.clear();
        self.beam_map.clear();
        self.summary = ScanSummary::default();
    }

    fn commit<W: EntityKinematics + ?Sized>(
        &mut self,
        result: BeamResult,
        tracker: &mut HitTracker<'_, W>,
        options: &SensorOptions,
    ) {
        self.summary.beams += 1;
        if options.record_beam_map && self.beam_map.len() < self.primary.capacity() {
            self.beam_map.push(result.screen);
        }
        if let Some(candidate) = result.candidate {
            self.candidates.push(candidate);
        }

        if let Some(depth) = result.depth {
            if self.primary.push(depth.record) {
                self.summary.depth_map_points += 1;
            }
            tracker.record_depth_hit(depth.entity);
        }

        if let Some(ray) = result.ray {
            if let Some(record) = ray.record {
                if !ray.on_screen {
                    if self.primary.push(record) {
                        self.summary.ray_points += 1;
                    }
                    self.updated.push(record);
                }
                if options.output_raycast_points {
                    self.raycast.push(record);
                }
            }
            if let Some(adjusted) = ray.adjusted {
                self.adjusted.push(adjusted);
            }
            if options.track_ray_hits {
                tracker.record_ray_hit(ray.entity, &ray.offset);
            }
        }
    }

    fn finish_scan(&mut self) -> ScanSummary {
        self.summary.primary_points = self.primary.len();
        self.summary.raycast_points = self.raycast.len();
        self.summary.updated_points = self.updated.len();
        self.summary.adjusted_points = self.adjusted.len();
        self.summary.dropped_points = self.primary.dropped()
            + self.raycast.dropped()
            + self.updated.dropped()
            + self.adjusted.dropped();
        self.summary
    }
}

/// Synthetic LiDAR sensor.
#[derive(Debug)]
pub struct Lidar {
    config: Option<ScanConfig>,
    pattern: Option<ScanPattern>,
    options: SensorOptions,
    class_table: Arc<VehicleClassTable>,
    sampler: DepthSampler,
    ego: Option<EntityId>,
    outputs: ScanOutputs,
}

impl Lidar {
    /// Builds an uninitialised, unattached sensor. Output buffers are
    /// allocated here, once, at `options.max_points` records each.
    pub fn new(
        options: SensorOptions,
        class_table: Arc<VehicleClassTable>,
    ) -> Result<Self, NoiseError> {
        let sampler = DepthSampler::from_options(&options.depth_noise)?;
        let outputs = ScanOutputs::new(options.max_points, options.record_beam_map);
        Ok(Self {
            config: None,
            pattern: None,
            options,
            class_table,
            sampler,
            ego: None,
            outputs,
        })
    }

    // --- Initialisation ---

    pub fn init_2d_from_samples(
        &mut self,
        max_range: f64,
        horizontal: HorizontalLimits,
    ) -> Result<(), ConfigError> {
        self.apply_config(ScanConfig::planar_from_samples(max_range, horizontal))
    }

    pub fn init_3d_from_samples(
        &mut self,
        max_range: f64,
        horizontal: HorizontalLimits,
        vertical: VerticalLimits,
    ) -> Result<(), ConfigError> {
        self.apply_config(ScanConfig::volumetric_from_samples(
            max_range, horizontal, vertical,
        ))
    }

    pub fn init_2d_from_fov(
        &mut self,
        max_range: f64,
        horizontal_fov: f64,
        horizontal_resolution: f64,
    ) -> Result<(), ConfigError> {
        self.apply_config(ScanConfig::planar_from_fov(
            max_range,
            horizontal_fov,
            horizontal_resolution,
        ))
    }

    /// `upper_elevation` is the elevation of the topmost beam in degrees above the horizon.
    pub fn init_3d_from_fov(
        &mut self,
        max_range: f64,
        horizontal_fov: f64,
        horizontal_resolution: f64,
        vertical_fov: f64,
        vertical_resolution: f64,
        upper_elevation: f64,
    ) -> Result<(), ConfigError> {
        self.apply_config(ScanConfig::volumetric_from_fov(
            max_range,
            horizontal_fov,
            horizontal_resolution,
            vertical_fov,
            vertical_resolution,
            upper_elevation,
        ))
    }

    /// Installs a new geometry. Any previous geometry and buffered output is
    /// discarded first, so a rejected configuration leaves the sensor uninitialised.
    fn apply_config(&mut self, config: Result<ScanConfig, ConfigError>) -> Result<(), ConfigError> {
        self.config = None;
        self.pattern = None;
        self.outputs.begin_scan();

        let config = config.map_err(|e| {
            error!(error = %e, "LiDAR configuration rejected, sensor left uninitialised");
            e
        })?;

        let pattern = ScanPattern::from_config(&config);
        info!(
            mode = ?config.mode(),
            max_range = config.max_range(),
            horizontal_samples = config.horizontal_samples(),
            vertical_samples = config.vertical_samples(),
            horizontal_resolution = config.horizontal_resolution(),
            beams = pattern.len(),
            "LiDAR initialised"
        );
        if pattern.len() > self.options.max_points {
            warn!(
                beams = pattern.len(),
                max_points = self.options.max_points,
                "Scan pattern exceeds buffer capacity, points will be dropped"
            );
        }
        self.pattern = Some(pattern);
        self.config = Some(config);
        Ok(())
    }

    /// Binds the sensor to the vehicle that carries it. Only the first call
    /// takes effect. Returns whether this call attached the sensor.
    pub fn attach(&mut self, ego: EntityId) -> bool {
        if ego.is_none() {
            warn!("Cannot attach LiDAR to world geometry");
            return false;
        }
        match self.ego {
            Some(current) => {
                info!(ego = current.0, "LiDAR is already attached to a vehicle");
                false
            }
            None => {
                self.ego = Some(ego);
                info!(ego = ego.0, "LiDAR attached to vehicle");
                true
            }
        }
    }

    // --- Scanning ---

    /// Runs one full scan from the attached vehicle.
    ///
    /// Returns an empty summary if the sensor is not initialised, not attached,
    /// or the world has no state for the scanning vehicle.
    pub fn scan<W: World + ?Sized>(
        &mut self,
        world: &W,
        frame: &CameraFrame<'_>,
        hits: &mut EntityHitMap,
    ) -> ScanSummary {
        self.run_scan(world, frame, hits, None)
    }

    /// Runs one full scan as seen from `perspective` instead of the attached
    /// vehicle. The attachment itself is unchanged.
    pub fn scan_from_perspective<W: World + ?Sized>(
        &mut self,
        world: &W,
        frame: &CameraFrame<'_>,
        hits: &mut EntityHitMap,
        perspective: EntityId,
    ) -> ScanSummary {
        self.run_scan(world, frame, hits, Some(perspective))
    }

    fn run_scan<W: World + ?Sized>(
        &mut self,
        world: &W,
        frame: &CameraFrame<'_>,
        hits: &mut EntityHitMap,
        perspective: Option<EntityId>,
    ) -> ScanSummary {
        self.outputs.begin_scan();

        let (Some(config), Some(pattern)) = (self.config.as_ref(), self.pattern.as_ref()) else {
            debug!("Scan requested before initialisation");
            return ScanSummary::default();
        };
        let Some(attached) = self.ego else {
            debug!("Scan requested before the LiDAR was attached");
            return ScanSummary::default();
        };
        let ego = perspective.filter(|p| !p.is_none()).unwrap_or(attached);
        let Some(ego_state) = world.entity_state(ego) else {
            warn!(ego = ego.0, "No state for the scanning vehicle, scan skipped");
            return ScanSummary::default();
        };

        let pixels = frame.intrinsics.pixel_count();
        if frame.depth.len() < pixels || frame.segmentation.len() < pixels {
            warn!(
                pixels,
                depth = frame.depth.len(),
                segmentation = frame.segmentation.len(),
                "Camera buffers are smaller than the image, missing pixels yield no depth"
            );
        }

        let ground = world
            .ground_z(&ego_state.position)
            .unwrap_or(ego_state.position.z);
        let context = ScanContext {
            world,
            frame: *frame,
            dcm: dcm_from_quaternion(&ego_state.orientation),
            max_range: config.max_range(),
            ego,
            ego_position: ego_state.position,
            ego_velocity: ego_state.velocity,
            sensor_point: Vec3::new(
                ego_state.position.x,
                ego_state.position.y,
                ground + self.options.mount_height,
            ),
            options: &self.options,
            class_table: &self.class_table,
        };
        let mut tracker = HitTracker::new(hits, world, frame.position, ego);

        match pattern {
            ScanPattern::Scan2D { azimuths } => {
                debug!(azimuths = azimuths.len(), "Generating 2D scan");
            }
            ScanPattern::Scan3D { rings, azimuths } => {
                debug!(rings = rings.len(), azimuths = azimuths.len(), "Generating 3D scan");
            }
        }
        for beam in pattern.beams() {
            let result = context.synthesize(&mut self.sampler, &beam);
            self.outputs.commit(result, &mut tracker, &self.options);
        }

        let summary = self.outputs.finish_scan();
        debug!(
            beams = summary.beams,
            depth_map_points = summary.depth_map_points,
            ray_points = summary.ray_points,
            raycast_points = summary.raycast_points,
            total = summary.primary_points,
            "Scan complete"
        );
        if summary.dropped_points > 0 {
            warn!(dropped = summary.dropped_points, "Points dropped this scan");
        }
        summary
    }

    /// Reconciles the hit candidates of the last scan against `frame` and
    /// appends them to the fused cloud. Consumes the candidates.
    /// Returns the size of the fused cloud.
    pub fn update_point_cloud(&mut self, frame: &CameraFrame<'_>) -> usize {
        let max_output_range = self.options.max_output_range;
        for candidate in self.outputs.candidates.drain(..) {
            if let Some(record) = reconcile(frame, &mut self.sampler, &candidate, max_output_range) {
                self.outputs.updated.push(record);
            }
        }
        debug!(updated = self.outputs.updated.len(), "Fused point cloud updated");
        self.outputs.updated.len()
    }

    /// Compares depth-map distance with ray-cast distance over the pending
    /// ground-level candidates. Must run before [`Lidar::update_point_cloud`].
    ///
    /// Candidates without a measured clearance count as ground.
    pub fn depth_stats(&mut self, frame: &CameraFrame<'_>) -> DepthStats {
        let mut stats = DepthStats::default();
        let max_output_range = self.options.max_output_range;
        for candidate in &self.outputs.candidates {
            if candidate.ground_clearance.is_some_and(|c| c > 0.0) {
                continue;
            }
            if let Some(point) =
                depth_point(frame, &mut self.sampler, &candidate.target, &candidate.screen)
            {
                stats.accumulate(point.vehicle.norm(), candidate.ray_distance, max_output_range);
            }
        }
        info!(%stats, "Depth statistics");
        stats
    }

    // --- Output access ---

    pub fn primary_cloud(&self) -> &PointBuffer {
        &self.outputs.primary
    }

    pub fn raycast_cloud(&self) -> &PointBuffer {
        &self.outputs.raycast
    }

    pub fn updated_cloud(&self) -> &PointBuffer {
        &self.outputs.updated
    }

    pub fn adjusted_cloud(&self) -> &PointBuffer {
        &self.outputs.adjusted
    }

    /// Screen position of every beam of the last scan, in scan order.
    /// Empty unless `record_beam_map` is set.
    pub fn beam_map(&self) -> &[ScreenPoint] {
        &self.outputs.beam_map
    }

    /// Hit candidates waiting for reconciliation.
    pub fn pending_candidates(&self) -> &[HitCandidate] {
        &self.outputs.candidates
    }

    pub fn last_summary(&self) -> ScanSummary {
        self.outputs.summary
    }

    // --- Configuration access ---

    pub fn mode(&self) -> ScanMode {
        self.config
            .as_ref()
            .map_or(ScanMode::NotInitialized, ScanConfig::mode)
    }

    pub fn config(&self) -> Option<&ScanConfig> {
        self.config.as_ref()
    }

    pub fn pattern(&self) -> Option<&ScanPattern> {
        self.pattern.as_ref()
    }

    pub fn options(&self) -> &SensorOptions {
        &self.options
    }

    pub fn class_table(&self) -> &Arc<VehicleClassTable> {
        &self.class_table
    }

    pub fn ego(&self) -> Option<EntityId> {
        self.ego
    }

    pub fn is_attached(&self) -> bool {
        self.ego.is_some()
    }

    /// Configured beam count: horizontal samples, times vertical samples in 3D.
    pub fn total_samples(&self) -> u64 {
        self.config.as_ref().map_or(0, ScanConfig::total_samples)
    }

    pub fn horizontal_samples(&self) -> u32 {
        self.config.as_ref().map_or(0, ScanConfig::horizontal_samples)
    }

    pub fn vertical_samples(&self) -> u32 {
        self.config.as_ref().map_or(0, ScanConfig::vertical_samples)
    }
}
