// synlidar_sim/src/lib.rs

//! Headless harness for the synthetic LiDAR: an analytic scene, a pinhole
//! camera that renders the depth and segmentation buffers, and a runner that
//! drives scans from a TOML scenario.

// This prelude is for convenience for other files WITHIN the synlidar_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;
