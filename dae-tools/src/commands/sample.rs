//! `sample`: evaluate one frame of an animation and print the skin matrices

use anyhow::{Result, bail};
use dae_rig::animation::sample_animation;
use dae_rig::skinning::export_pose;
use dae_rig::{ConverterOptions, Pose, SkeletonMatrices};
use std::path::Path;

use super::load_and_convert;
use crate::utils::{add_table_row, create_table, format_matrix, format_vec};

pub fn execute(scene: &Path, animation: &str, frame: f32) -> Result<()> {
    let (converted, _) = load_and_convert(scene, ConverterOptions::default())?;
    let Some(clip) = converted.animation(animation) else {
        let names: Vec<&str> = converted.animations.iter().map(|a| a.name.as_str()).collect();
        bail!(
            "Animation '{animation}' not found; available: {}",
            if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            }
        );
    };

    let skeleton = &converted.skeleton;
    let mut pose = Pose::new(skeleton.bone_count());
    let mut matrices = SkeletonMatrices::new(skeleton.bone_count());
    sample_animation(clip, skeleton, &mut pose, frame)?;
    export_pose(skeleton, &pose, &mut matrices)?;

    println!(
        "{} @ frame {frame} ({} frames, {} fps)",
        clip.name, clip.frame_count, clip.fps
    );

    let mut table = create_table(&["Bone", "Name", "Parent", "World position", "Skin matrix"]);
    for (index, bone) in skeleton.bones().iter().enumerate() {
        let world = matrices.world_matrix(index);
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                bone.name.clone(),
                bone.parent.map_or_else(|| "-".to_string(), |p| p.to_string()),
                format_vec(&world[12..15]),
                format_matrix(matrices.skin_matrix(index)),
            ],
        );
    }
    table.printstd();
    Ok(())
}
