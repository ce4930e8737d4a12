// synlidar_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// synlidar: synthetic LiDAR scans of an analytic scene.
///
/// This struct defines the command-line arguments accepted by the `synlidar` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/intersection.toml")]
    pub scenario: PathBuf,

    /// Vehicle class table to use instead of the one named by the scenario.
    #[arg(short, long)]
    pub class_table: Option<PathBuf>,

    /// Seed for depth noise. Overrides the scenario.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
