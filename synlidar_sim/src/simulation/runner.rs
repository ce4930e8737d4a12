// synlidar_sim/src/simulation/runner.rs

use std::path::Path;
use std::sync::Arc;

use synlidar_core::prelude::*;
use tracing::info;

use crate::simulation::camera::PinholeCamera;
use crate::simulation::config::ScenarioConfig;
use crate::simulation::errors::ScenarioError;
use crate::simulation::world::AnalyticWorld;

/// Outcome of one scan step.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub index: u32,
    pub summary: ScanSummary,
    /// Size of the fused cloud after reconciliation.
    pub fused_points: usize,
    pub depth_stats: Option<DepthStats>,
    pub hits: EntityHitMap,
}

/// Drives a scenario: renders the camera, scans, reconciles, advances the scene.
pub struct ScenarioRunner {
    config: ScenarioConfig,
    world: AnalyticWorld,
    lidar: Lidar,
    ego: EntityId,
    viewpoint: EntityId,
    scans_run: u32,
}

/// Loads the vehicle class table named by the scenario, or `path_override`
/// when given. No table at all gives an empty one.
pub fn load_class_table(
    config: &ScenarioConfig,
    path_override: Option<&Path>,
) -> Result<Arc<VehicleClassTable>, ScenarioError> {
    let depth = config.simulation.truncation_depth;
    let table = match path_override.or(config.simulation.class_table.as_deref()) {
        Some(path) => VehicleClassTable::from_path(path, depth)?,
        None => {
            info!("No vehicle class table configured, class channel stays empty");
            VehicleClassTable::new(depth)
        }
    };
    Ok(Arc::new(table))
}

impl ScenarioRunner {
    pub fn new(
        config: ScenarioConfig,
        class_table: Arc<VehicleClassTable>,
    ) -> Result<Self, ScenarioError> {
        let world = AnalyticWorld::from_config(&config);
        let mut lidar = Lidar::new(config.lidar.options.clone(), class_table)?;

        let ego = EntityId(config.ego.id);
        if !lidar.attach(ego) {
            return Err(ScenarioError::Attach(ego.0));
        }
        config.lidar.geometry.apply(&mut lidar)?;

        let viewpoint = config.simulation.perspective.map_or(ego, EntityId);
        if world.entity(viewpoint).is_none() {
            return Err(ScenarioError::Invalid(format!(
                "perspective entity {} is not in the scene",
                viewpoint.0
            )));
        }

        Ok(Self {
            config,
            world,
            lidar,
            ego,
            viewpoint,
            scans_run: 0,
        })
    }

    /// Runs one scan and advances the scene by one step.
    pub fn step(&mut self) -> Result<ScanReport, ScenarioError> {
        let state = self.world.entity_state(self.viewpoint).ok_or_else(|| {
            ScenarioError::Invalid(format!("no state for entity {}", self.viewpoint.0))
        })?;
        let offset = Vec3::from(self.config.camera.mount_offset);
        let camera = PinholeCamera::mounted_on(&state, &offset, self.config.camera.intrinsics());
        self.world.mount_camera(camera);

        let rendered = camera.render(&self.world, self.viewpoint);
        let frame = camera.frame(&rendered);

        let mut hits = EntityHitMap::new();
        let summary = if self.viewpoint == self.ego {
            self.lidar.scan(&self.world, &frame, &mut hits)
        } else {
            self.lidar
                .scan_from_perspective(&self.world, &frame, &mut hits, self.viewpoint)
        };
        let depth_stats = self
            .lidar
            .options()
            .output_depth_stats
            .then(|| self.lidar.depth_stats(&frame));
        let fused_points = self.lidar.update_point_cloud(&frame);

        let report = ScanReport {
            index: self.scans_run,
            summary,
            fused_points,
            depth_stats,
            hits,
        };
        info!(
            scan = report.index,
            beams = summary.beams,
            points = summary.primary_points,
            raycast = summary.raycast_points,
            fused = fused_points,
            entities = report.hits.len(),
            "Scan finished"
        );

        self.world.advance(self.config.simulation.step_seconds);
        self.scans_run += 1;
        Ok(report)
    }

    /// Runs every scan the scenario asks for.
    pub fn run(&mut self) -> Result<Vec<ScanReport>, ScenarioError> {
        (0..self.config.simulation.scans)
            .map(|_| self.step())
            .collect()
    }

    pub fn lidar(&self) -> &Lidar {
        &self.lidar
    }

    pub fn world(&self) -> &AnalyticWorld {
        &self.world
    }

    pub fn scans_run(&self) -> u32 {
        self.scans_run
    }
}
