// synlidar_core/src/lib.rs

pub mod buffers;
pub mod camera;
pub mod class_table;
pub mod config;
pub mod depth;
pub mod errors;
pub mod frames;
pub mod hits;
pub mod prelude;
pub mod scan_pattern;
pub mod sensor;
pub mod stats;
pub mod synth;
pub mod types;
pub mod velocity;
pub mod world;
