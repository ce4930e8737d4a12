// synlidar_sim/src/bin/synlidar.rs

use clap::Parser;
use synlidar_sim::cli::Cli;
use synlidar_sim::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ScenarioError> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // --- 1. Load Scenario ---
    info!(path = %cli.scenario.display(), "Loading scenario");
    let mut config = ScenarioConfig::load(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        config.lidar.options.depth_noise.seed = Some(seed);
    }
    let class_table = load_class_table(&config, cli.class_table.as_deref())?;

    // --- 2. Run ---
    let mut runner = ScenarioRunner::new(config, class_table)?;
    let reports = runner.run()?;

    // --- 3. Report ---
    for report in &reports {
        if let Some(stats) = &report.depth_stats {
            info!(scan = report.index, %stats, "Depth agreement");
        }
        let mut hits: Vec<_> = report.hits.iter().collect();
        hits.sort_by_key(|(id, _)| **id);
        for (id, stats) in hits {
            match stats.longitudinal_extent() {
                Some((back, front)) => info!(
                    scan = report.index,
                    entity = id.0,
                    hits = stats.hits,
                    back,
                    front,
                    "Entity struck"
                ),
                None => info!(scan = report.index, entity = id.0, hits = stats.hits, "Entity seen"),
            }
        }
        if report.summary.dropped_points > 0 {
            warn!(
                scan = report.index,
                dropped = report.summary.dropped_points,
                "Buffer capacity exceeded"
            );
        }
    }

    if let Some(last) = reports.last() {
        let lidar = runner.lidar();
        info!(
            scans = reports.len(),
            primary = lidar.primary_cloud().len(),
            fused = last.fused_points,
            floats = lidar.primary_cloud().as_floats().len(),
            "Run complete"
        );
    }
    Ok(())
}
