//! Root CLI structure for dae-tools

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::convert::ConvertArgs;

#[derive(Parser)]
#[command(name = "dae-tools")]
#[command(about = "Inspect, sample and convert skinned COLLADA scenes", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the skeleton, geometry and animations of a scene as a tree
    Info {
        /// Path to the scene description (JSON)
        scene: PathBuf,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Convert a scene into a runtime document (JSON header + binary blob)
    Convert(ConvertArgs),

    /// Sample an animation and print the resulting skin matrices
    Sample {
        /// Path to the scene description (JSON)
        scene: PathBuf,

        /// Name of the animation to sample
        #[arg(short, long)]
        animation: String,

        /// Frame to sample; fractional and negative frames are allowed
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        frame: f32,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
