// synlidar_sim/tests/scenario_runs.rs

use std::sync::Arc;

use approx::assert_relative_eq;
use synlidar_sim::prelude::*;

const FOLLOWING: &str = r#"
    [simulation]
    scans = 2
    step_seconds = 0.5

    [camera]
    width = 64
    height = 32
    vertical_fov = 40.0

    [lidar.geometry]
    kind = "planar_fov"
    max_range = 60.0
    horizontal_fov = 60.0
    horizontal_resolution = 1.0

    [lidar.options]
    output_adjusted_points = true

    [ego]
    id = 1
    model = "Asterope"
    position = [0.0, 0.0, 0.0]
    velocity = [0.0, 4.0, 0.0]

    [[entities]]
    id = 2
    model = "Premier"
    position = [0.0, 15.0, 0.0]
    size = [2.0, 4.5, 2.0]
    velocity = [0.0, 2.0, 0.0]
"#;

fn asset(relative: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn class_table() -> Arc<VehicleClassTable> {
    let mut table = VehicleClassTable::new(3);
    table.insert("Premier", "Car");
    Arc::new(table)
}

fn runner(source: &str) -> ScenarioRunner {
    let config = ScenarioConfig::from_toml_str(source).unwrap();
    ScenarioRunner::new(config, class_table()).unwrap()
}

/// Forward distance of the labelled point nearest the centre line.
fn nearest_forward(cloud: &PointBuffer, entity: f32) -> f32 {
    cloud
        .records()
        .iter()
        .filter(|r| r.entity() == entity)
        .min_by(|a, b| a.position[1].abs().total_cmp(&b.position[1].abs()))
        .map(|r| r.position[0])
        .unwrap()
}

#[test]
fn car_ahead_is_labelled_and_tracked() {
    let mut runner = runner(FOLLOWING);
    let report = runner.step().unwrap();

    assert_eq!(report.summary.beams, 60);
    let lidar = runner.lidar();
    let car_points: Vec<_> = lidar
        .primary_cloud()
        .records()
        .iter()
        .filter(|r| r.entity() == 2.0)
        .collect();
    assert!(!car_points.is_empty());
    assert!(car_points.iter().all(|r| r.class_intensity() == 1.0));
    // Ego closes at 4 m/s on a car doing 2 m/s.
    assert!(car_points
        .iter()
        .all(|r| (r.velocity().abs() - 2.0).abs() < 0.05));

    // Rear bumper is 12.75 m ahead of the camera.
    assert_relative_eq!(nearest_forward(lidar.primary_cloud(), 2.0), 12.75, epsilon = 0.1);

    let stats = report.hits.get(&EntityId(2)).unwrap();
    assert!(stats.hits > 0);
    let (back, front) = stats.longitudinal_extent().unwrap();
    assert_relative_eq!(back, -2.25, epsilon = 1e-6);
    assert_relative_eq!(front, -2.25, epsilon = 1e-6);
    assert!(!report.hits.contains_key(&EntityId(1)));

    assert!(lidar.raycast_cloud().records().iter().any(|r| r.entity() == 2.0));
    assert!(!lidar.adjusted_cloud().is_empty());
    assert!(report.fused_points > 0);
}

#[test]
fn gap_shrinks_as_the_scene_advances() {
    let mut runner = runner(FOLLOWING);
    runner.step().unwrap();
    let first = nearest_forward(runner.lidar().primary_cloud(), 2.0);
    runner.step().unwrap();
    let second = nearest_forward(runner.lidar().primary_cloud(), 2.0);

    assert_relative_eq!(first - second, 1.0, epsilon = 0.1);
    assert_eq!(runner.scans_run(), 2);
}

#[test]
fn run_performs_every_configured_scan() {
    let reports = runner(FOLLOWING).run().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].index, 1);
}

#[test]
fn perspective_scan_ignores_the_viewing_vehicle() {
    let source = FOLLOWING.replace("step_seconds = 0.5", "step_seconds = 0.5\nperspective = 2");
    let mut runner = runner(&source);
    let report = runner.step().unwrap();

    assert!(!report.hits.contains_key(&EntityId(2)));
    assert!(runner
        .lidar()
        .primary_cloud()
        .records()
        .iter()
        .all(|r| r.entity() != 2.0));
    assert_eq!(runner.lidar().ego(), Some(EntityId(1)));
}

#[test]
fn unknown_perspective_is_rejected() {
    let source = FOLLOWING.replace("step_seconds = 0.5", "step_seconds = 0.5\nperspective = 9");
    let config = ScenarioConfig::from_toml_str(&source).unwrap();
    assert!(matches!(
        ScenarioRunner::new(config, class_table()),
        Err(ScenarioError::Invalid(_))
    ));
}

#[test]
fn bad_geometry_is_rejected() {
    let source = FOLLOWING.replace("horizontal_resolution = 1.0", "horizontal_resolution = 0.0");
    let config = ScenarioConfig::from_toml_str(&source).unwrap();
    assert!(matches!(
        ScenarioRunner::new(config, class_table()),
        Err(ScenarioError::Geometry(_))
    ));
}

#[test]
fn bundled_assets_load() {
    let mut config = ScenarioConfig::load(asset("assets/scenarios/intersection.toml")).unwrap();
    assert_eq!(config.entities.len(), 4);
    assert_eq!(config.simulation.scans, 3);

    config.simulation.class_table = None;
    let table = load_class_table(&config, Some(asset("assets/vehicle_labels.csv").as_path())).unwrap();
    assert_eq!(table.lookup("Premier"), Some("Car"));
    assert_eq!(table.lookup("Mule"), Some("Truck"));

    let empty = load_class_table(&config, None).unwrap();
    assert!(empty.is_empty());

    let mut runner = ScenarioRunner::new(config, table).unwrap();
    assert_eq!(runner.lidar().mode(), ScanMode::Scan3D);
    assert_eq!(runner.lidar().horizontal_samples(), 719);
    let report = runner.step().unwrap();
    assert!(report.summary.primary_points > 0);
    assert!(report.hits.contains_key(&EntityId(2)));
}

#[test]
fn default_geometry_builds_and_scans() {
    let source = r#"
        [camera]
        width = 32
        height = 16

        [ego]
        id = 1
        position = [0.0, 0.0, 0.0]

        [[entities]]
        id = 2
        model = "Premier"
        position = [0.0, 15.0, 0.0]
    "#;
    let config = ScenarioConfig::from_toml_str(source).unwrap();
    assert_eq!(config.lidar.geometry, LidarGeometry::default());

    let mut runner = ScenarioRunner::new(config, class_table()).unwrap();
    assert_eq!(runner.lidar().mode(), ScanMode::Scan3D);
    let beams = runner.lidar().pattern().map_or(0, |pattern| pattern.len());
    assert!(beams > 0);

    let report = runner.step().unwrap();
    assert_eq!(report.summary.beams, beams);
    assert!(report.summary.primary_points > 0);
}
