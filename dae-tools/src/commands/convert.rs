//! `convert`: write a scene as a runtime document

use anyhow::{Context, Result};
use clap::Args;
use dae_rig::{ConverterOptions, InterchangeDocument};
use std::path::PathBuf;

use super::load_and_convert;

#[derive(Args)]
pub struct ConvertArgs {
    /// Path to the scene description (JSON)
    pub scene: PathBuf,

    /// Output directory for the `.json` header and `.bin` blob
    #[arg(short, long)]
    pub output: PathBuf,

    /// Converter options file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep geometry chunks separate
    #[arg(long)]
    pub no_merge: bool,

    /// Override the frame rate of every animation
    #[arg(long)]
    pub fps: Option<f32>,

    /// Maximum bone influences per vertex (1 to 4)
    #[arg(long)]
    pub max_influences: Option<usize>,
}

pub fn execute(args: ConvertArgs) -> Result<()> {
    let mut options = match &args.config {
        Some(path) => ConverterOptions::load(path)
            .with_context(|| format!("Failed to load options: {}", path.display()))?,
        None => ConverterOptions::default(),
    };
    if args.no_merge {
        options.merge_chunks = false;
    }
    if args.fps.is_some() {
        options.fps_override = args.fps;
    }
    if let Some(limit) = args.max_influences {
        options.max_influences = limit;
    }

    let (converted, diagnostics) = load_and_convert(&args.scene, options)?;

    std::fs::create_dir_all(&args.output).with_context(|| {
        format!("Failed to create output directory: {}", args.output.display())
    })?;

    let stem = args
        .scene
        .file_stem()
        .map_or_else(|| "scene".to_string(), |s| s.to_string_lossy().into_owned());
    let mut document = InterchangeDocument::from_converted(&converted)?;
    let (json_path, blob_path) = document
        .write_to(&args.output, &stem)
        .with_context(|| format!("Failed to write document to {}", args.output.display()))?;

    println!("Converted {}", args.scene.display());
    println!("  Bones:      {}", converted.skeleton.bone_count());
    println!("  Chunks:     {}", converted.chunks.len());
    println!("  Animations: {}", converted.animations.len());
    println!("  Warnings:   {}", diagnostics.len());
    println!("  Header:     {}", json_path.display());
    println!("  Blob:       {}", blob_path.display());
    Ok(())
}
