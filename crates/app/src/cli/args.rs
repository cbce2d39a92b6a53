pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "seabed")]
#[command(about = "Administer a seabed repository store")]
pub struct Args {
    /// Path to the seabed data directory (defaults to ~/.seabed)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
