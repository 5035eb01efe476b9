//! Command implementations

pub mod convert;
pub mod info;
pub mod sample;

use anyhow::{Context, Result};
use dae_rig::{Converted, Converter, ConverterOptions, Diagnostics, SceneDescription};
use std::path::Path;

/// Load a scene description and run it through the converter
pub(crate) fn load_and_convert(
    scene: &Path,
    options: ConverterOptions,
) -> Result<(Converted, Diagnostics)> {
    let description = SceneDescription::load(scene)
        .with_context(|| format!("Failed to load scene: {}", scene.display()))?;

    let mut diagnostics = Diagnostics::new();
    let converted = Converter::new(options)
        .convert(&description, &mut diagnostics)
        .with_context(|| format!("Failed to convert scene: {}", scene.display()))?;

    if !diagnostics.is_empty() {
        log::info!("{} data warning(s) while converting", diagnostics.len());
    }
    Ok((converted, diagnostics))
}
