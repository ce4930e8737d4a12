// synlidar_sim/src/simulation/mod.rs

pub mod camera;
pub mod config;
pub mod errors;
pub mod runner;
pub mod world;
