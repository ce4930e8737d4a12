// synlidar_core/tests/scan_scenarios.rs

mod common;

use std::io::Cursor;
use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use synlidar_core::frames::dcm_from_quaternion;
use synlidar_core::prelude::*;
use synlidar_core::synth::{UNKNOWN_GROUND_CLEARANCE, UNRECOGNIZED_MODEL_INTENSITY};

use common::{vehicle_state, FakeWorld, EGO};

fn lidar_with(options: SensorOptions, table: VehicleClassTable) -> Lidar {
    let mut lidar = Lidar::new(options, Arc::new(table)).unwrap();
    lidar.attach(EGO);
    lidar
}

fn lidar() -> Lidar {
    lidar_with(SensorOptions::default(), VehicleClassTable::default())
}

/// Full circle: right limit just past the rear, left limit just before it.
fn full_circle(samples: u32) -> HorizontalLimits {
    HorizontalLimits {
        samples,
        left_limit: 179.0,
        right_limit: 181.0,
    }
}

fn on_screen_beams(lidar: &Lidar, world: &FakeWorld) -> usize {
    let max_range = lidar.config().unwrap().max_range();
    lidar
        .pattern()
        .unwrap()
        .beams()
        .filter(|beam| world.project_to_screen(&beam.endpoint(max_range)).is_on_screen())
        .count()
}

#[test]
fn empty_world_at_max_range_yields_no_points() {
    let world = FakeWorld::new();
    let mut lidar = lidar();
    lidar
        .init_2d_from_samples(
            150.0,
            HorizontalLimits {
                samples: 360,
                left_limit: 0.0,
                right_limit: 350.0,
            },
        )
        .unwrap();

    let depth = world.constant_depth(150.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let mut hits = EntityHitMap::new();
    let summary = lidar.scan(&world, &frame, &mut hits);

    assert_eq!(summary.beams, lidar.pattern().unwrap().len());
    assert!(summary.beams >= 359);
    assert_eq!(summary.primary_points, 0);
    assert!(lidar.primary_cloud().is_empty());
    assert!(hits.is_empty());
    assert_eq!(lidar.update_point_cloud(&frame), 0);
}

#[test]
fn flat_depth_gives_one_point_per_on_screen_beam() {
    let world = FakeWorld::new();
    let mut lidar = lidar();
    lidar
        .init_3d_from_fov(100.0, 90.0, 1.0, 20.0, 2.0, 10.0)
        .unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let summary = lidar.scan(&world, &frame, &mut EntityHitMap::new());

    let expected = on_screen_beams(&lidar, &world);
    assert!(expected > 0 && expected < summary.beams);
    assert_eq!(summary.primary_points, expected);
    assert_eq!(summary.depth_map_points, expected);

    for record in lidar.primary_cloud().records() {
        assert_eq!(record.entity(), 0.0);
        assert_eq!(record.zero_intensity(), 0.0);
        assert_relative_eq!(record.range(), 10.0, epsilon = 1e-3);
        // Ground seen from a vehicle doing 2 m/s.
        assert!(record.velocity() < 0.0 && record.velocity() >= -2.0 - 1e-6);
    }
}

#[test]
fn every_buffer_respects_the_output_range() {
    let mut world = FakeWorld::new();
    world.hit_fraction = Some(0.25);
    let options = SensorOptions {
        max_output_range: 60.0,
        output_adjusted_points: true,
        ..SensorOptions::default()
    };
    let mut lidar = lidar_with(options, VehicleClassTable::default());
    lidar
        .init_3d_from_samples(
            200.0,
            full_circle(180),
            VerticalLimits {
                samples: 10,
                upper_limit: 80.0,
                lower_limit: 100.0,
            },
        )
        .unwrap();

    let depth = world.depth_from(|x, _| 5.0 + 3.0 * x as f64);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let summary = lidar.scan(&world, &frame, &mut EntityHitMap::new());
    lidar.update_point_cloud(&frame);

    assert!(summary.depth_map_points > 0);
    assert!(summary.ray_points > 0);
    assert!(summary.adjusted_points > 0);
    for buffer in [
        lidar.primary_cloud(),
        lidar.raycast_cloud(),
        lidar.updated_cloud(),
        lidar.adjusted_cloud(),
    ] {
        for record in buffer.records() {
            assert!(record.range() <= 60.0 + 1e-3, "{}: {:?}", buffer.name(), record);
        }
    }
}

#[test]
fn ray_points_follow_the_output_axis_convention() {
    let mut world = FakeWorld::new();
    world.hit_fraction = Some(0.5);
    let mut lidar = lidar();
    lidar.init_2d_from_samples(40.0, full_circle(360)).unwrap();

    let depth = world.constant_depth(30.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let summary = lidar.scan(&world, &frame, &mut EntityHitMap::new());

    let pattern = lidar.pattern().unwrap();
    let raycast = lidar.raycast_cloud().records();
    assert_eq!(raycast.len(), pattern.len());
    for (beam, record) in pattern.beams().zip(raycast) {
        let raw = beam.endpoint(40.0) * 0.5;
        let [x, y, z] = record.position;
        assert_relative_eq!(x, raw.y as f32, epsilon = 1e-4);
        assert_relative_eq!(y, -raw.x as f32, epsilon = 1e-4);
        assert_relative_eq!(z, raw.z as f32, epsilon = 1e-4);
        assert_eq!(record.entity(), 0.0);
    }

    let off_screen = pattern.len() - on_screen_beams(&lidar, &world);
    assert_eq!(summary.ray_points, off_screen);
    assert_eq!(summary.primary_points, summary.depth_map_points + off_screen);
    assert_eq!(summary.updated_points, off_screen);
}

#[test]
fn perspective_override_rotates_and_excludes_the_other_vehicle() {
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
    let other = EntityId(2);
    let mut world = FakeWorld::new().with_entity(
        other,
        vehicle_state(Vec3::new(5.0, 0.0, 0.0), Vec3::zeros(), *yaw.quaternion()),
        Some("bus"),
    );
    world.hit_fraction = Some(0.5);

    let mut lidar = lidar();
    lidar.init_2d_from_samples(40.0, full_circle(8)).unwrap();
    let depth = world.constant_depth(30.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    lidar.scan_from_perspective(&world, &frame, &mut EntityHitMap::new(), other);

    assert_eq!(world.excluded.get(), Some(other));
    assert_eq!(lidar.ego(), Some(EGO));

    let dcm = dcm_from_quaternion(yaw.quaternion());
    let beam = lidar.pattern().unwrap().beams().next().unwrap();
    let raw = dcm * beam.endpoint(40.0) * 0.5;
    let first = lidar.raycast_cloud().records()[0];
    assert_relative_eq!(first.position[0], raw.y as f32, epsilon = 1e-4);
    assert_relative_eq!(first.position[1], -raw.x as f32, epsilon = 1e-4);

    lidar.scan(&world, &frame, &mut EntityHitMap::new());
    assert_eq!(world.excluded.get(), Some(EGO));
}

#[test]
fn class_channel_tolerates_truncated_model_names() {
    let car = EntityId(5);
    let world = FakeWorld::new().with_entity(
        car,
        vehicle_state(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 4.0, 0.0), Quaternion::identity()),
        Some("CIVICCA"),
    );
    let table = VehicleClassTable::from_reader(Cursor::new("civiccar,Car\n"), 3).unwrap();
    let options = SensorOptions {
        use_raycasting: false,
        ..SensorOptions::default()
    };
    let mut lidar = lidar_with(options, table);
    lidar.init_2d_from_fov(100.0, 60.0, 1.0).unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(car.0);
    let frame = world.frame(&depth, &seg);
    let mut hits = EntityHitMap::new();
    let summary = lidar.scan(&world, &frame, &mut hits);

    assert!(summary.primary_points > 0);
    for record in lidar.primary_cloud().records() {
        assert_eq!(record.entity(), 5.0);
        assert_eq!(record.class_intensity(), 1.0);
        // Car pulls away at 2 m/s relative to the ego.
        assert!(record.velocity() > 0.0 && record.velocity() <= 2.0 + 1e-6);
    }
    assert_eq!(hits[&car].hits as usize, summary.depth_map_points);
}

#[test]
fn shallow_truncation_leaves_short_names_unrecognised() {
    let car = EntityId(5);
    let world = FakeWorld::new().with_entity(
        car,
        vehicle_state(Vec3::new(0.0, 10.0, 0.0), Vec3::zeros(), Quaternion::identity()),
        Some("civic"),
    );
    let table = VehicleClassTable::from_reader(Cursor::new("civiccar,Car\n"), 2).unwrap();
    let mut lidar = lidar_with(SensorOptions::default(), table);
    lidar.init_2d_from_fov(100.0, 60.0, 1.0).unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(car.0);
    let frame = world.frame(&depth, &seg);
    lidar.scan(&world, &frame, &mut EntityHitMap::new());

    assert!(!lidar.primary_cloud().is_empty());
    for record in lidar.primary_cloud().records() {
        assert_eq!(record.class_intensity(), UNRECOGNIZED_MODEL_INTENSITY);
        // Stopped vehicles are treated like the ground.
        assert!(record.velocity() < 0.0);
    }
}

#[test]
fn uninitialised_or_unattached_sensor_scans_nothing() {
    let world = FakeWorld::new();
    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);

    let mut uninitialised = lidar();
    assert_eq!(
        uninitialised.scan(&world, &frame, &mut EntityHitMap::new()),
        ScanSummary::default()
    );
    assert_eq!(uninitialised.mode(), ScanMode::NotInitialized);

    let mut unattached =
        Lidar::new(SensorOptions::default(), Arc::new(VehicleClassTable::default())).unwrap();
    unattached.init_2d_from_fov(100.0, 60.0, 1.0).unwrap();
    assert_eq!(
        unattached.scan(&world, &frame, &mut EntityHitMap::new()),
        ScanSummary::default()
    );
    assert!(unattached.primary_cloud().is_empty());
    assert_eq!(*world.casts.borrow(), 0);
}

#[test]
fn reconciliation_fills_the_fused_cloud_once() {
    let world = FakeWorld::new();
    let mut lidar = lidar();
    lidar.init_2d_from_samples(100.0, full_circle(90)).unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let summary = lidar.scan(&world, &frame, &mut EntityHitMap::new());

    let candidates = lidar.pending_candidates().len();
    assert_eq!(candidates, on_screen_beams(&lidar, &world));
    assert_eq!(summary.updated_points, 0);

    assert_eq!(lidar.update_point_cloud(&frame), candidates);
    assert!(lidar.pending_candidates().is_empty());
    for record in lidar.updated_cloud().records() {
        assert_eq!(record.channels[0], UNKNOWN_GROUND_CLEARANCE);
        assert_relative_eq!(record.range(), 10.0, epsilon = 1e-3);
    }
    assert_eq!(lidar.update_point_cloud(&frame), candidates);
}

#[test]
fn unreconciled_candidates_do_not_carry_into_the_next_scan() {
    let world = FakeWorld::new();
    let mut lidar = lidar();
    lidar.init_2d_from_fov(100.0, 60.0, 1.0).unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);

    lidar.scan(&world, &frame, &mut EntityHitMap::new());
    let per_scan = lidar.pending_candidates().len();
    assert!(per_scan > 0);
    assert_eq!(per_scan, on_screen_beams(&lidar, &world));

    for _ in 0..2 {
        lidar.scan(&world, &frame, &mut EntityHitMap::new());
        assert_eq!(lidar.pending_candidates().len(), per_scan);
    }
    assert_eq!(lidar.update_point_cloud(&frame), per_scan);
}

#[test]
fn depth_stats_measure_agreement_on_the_ground() {
    let mut world = FakeWorld::new();
    world.hit_fraction = Some(0.5);
    // End points at or below the ground count as ground.
    world.ground = Some(0.5);
    let options = SensorOptions {
        output_depth_stats: true,
        ..SensorOptions::default()
    };
    let mut lidar = lidar_with(options, VehicleClassTable::default());
    lidar.init_2d_from_fov(40.0, 60.0, 1.0).unwrap();

    let depth = world.constant_depth(20.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    lidar.scan(&world, &frame, &mut EntityHitMap::new());

    let stats = lidar.depth_stats(&frame);
    let candidates = lidar.pending_candidates().len();
    assert!(candidates > 0);
    assert_eq!(stats.within_40m.count, candidates);
    assert_eq!(stats.overall.count, candidates);
    assert_relative_eq!(stats.within_40m.mean().unwrap(), 1.0, epsilon = 1e-3);

    // Raised end points are not ground and are left out.
    lidar.update_point_cloud(&frame);
    world.ground = Some(-1.0);
    lidar.scan(&world, &frame, &mut EntityHitMap::new());
    let stats = lidar.depth_stats(&frame);
    assert_eq!(stats.overall.count, 0);
}

#[test]
fn full_buffers_drop_points_without_failing() {
    let world = FakeWorld::new();
    let options = SensorOptions {
        max_points: 10,
        ..SensorOptions::default()
    };
    let mut lidar = lidar_with(options, VehicleClassTable::default());
    lidar.init_2d_from_fov(100.0, 60.0, 1.0).unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let summary = lidar.scan(&world, &frame, &mut EntityHitMap::new());

    assert_eq!(lidar.primary_cloud().len(), 10);
    assert_eq!(summary.depth_map_points, 10);
    assert!(summary.dropped_points > 0);
}

#[test]
fn seeded_noise_reproduces_the_same_cloud() {
    let world = FakeWorld::new();
    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);

    let cloud = |seed: u64| {
        let mut options = SensorOptions::default();
        options.depth_noise.enabled = true;
        options.depth_noise.stddev = 0.1;
        options.depth_noise.seed = Some(seed);
        let mut lidar = lidar_with(options, VehicleClassTable::default());
        lidar.init_2d_from_fov(100.0, 60.0, 1.0).unwrap();
        lidar.scan(&world, &frame, &mut EntityHitMap::new());
        lidar.primary_cloud().as_floats().to_vec()
    };

    assert_eq!(cloud(7), cloud(7));
    assert_ne!(cloud(7), cloud(8));
}

#[test]
fn beam_map_records_every_beam_in_order() {
    let world = FakeWorld::new();
    let options = SensorOptions {
        record_beam_map: true,
        ..SensorOptions::default()
    };
    let mut lidar = lidar_with(options, VehicleClassTable::default());
    lidar.init_2d_from_samples(50.0, full_circle(36)).unwrap();

    let depth = world.constant_depth(10.0);
    let seg = world.segmentation(0);
    let frame = world.frame(&depth, &seg);
    let summary = lidar.scan(&world, &frame, &mut EntityHitMap::new());

    let map = lidar.beam_map();
    assert_eq!(map.len(), summary.beams);
    let first = lidar.pattern().unwrap().beams().next().unwrap();
    assert_eq!(map[0], world.project_to_screen(&first.endpoint(50.0)));
    assert!(map.iter().any(|p| *p == ScreenPoint::OFF_SCREEN));
}
