//! `info`: render a converted scene as a tree

use anyhow::Result;
use dae_rig::{ConverterOptions, Skeleton};
use std::path::Path;

use super::load_and_convert;
use crate::utils::{NodeType, TreeNode, TreeOptions, render_tree};

pub fn execute(scene: &Path, depth: Option<usize>, no_color: bool) -> Result<()> {
    let (converted, diagnostics) = load_and_convert(scene, ConverterOptions::default())?;

    let name = scene
        .file_name()
        .map_or_else(|| scene.display().to_string(), |n| n.to_string_lossy().into_owned());

    let mut skeleton = TreeNode::new("Skeleton", NodeType::Section)
        .with_metadata("bones", converted.skeleton.bone_count());
    for root in bone_trees(&converted.skeleton) {
        skeleton = skeleton.add_child(root);
    }

    let mut geometry = TreeNode::new("Geometry", NodeType::Section)
        .with_metadata("chunks", converted.chunks.len());
    for chunk in &converted.chunks {
        geometry = geometry.add_child(
            TreeNode::new(&chunk.name, NodeType::Geometry)
                .with_metadata("vertices", chunk.vertex_count)
                .with_metadata("triangles", chunk.triangle_count())
                .with_metadata("attributes", format!("{:?}", chunk.attributes())),
        );
    }
    if let Some(merged) = &converted.merged {
        geometry = geometry.add_child(
            TreeNode::new(&merged.geometry.name, NodeType::Geometry)
                .with_metadata("merged", merged.ranges.len())
                .with_metadata("vertices", merged.geometry.vertex_count),
        );
    }

    let mut animations = TreeNode::new("Animations", NodeType::Section)
        .with_metadata("count", converted.animations.len());
    for animation in &converted.animations {
        let animated = animation.tracks.iter().filter(|t| t.is_animated()).count();
        animations = animations.add_child(
            TreeNode::new(&animation.name, NodeType::Animation)
                .with_metadata("frames", animation.frame_count)
                .with_metadata("fps", animation.fps)
                .with_metadata("duration", format!("{:.2}s", animation.duration()))
                .with_metadata("tracks", animated),
        );
    }

    let root = TreeNode::new(name, NodeType::Root)
        .with_metadata("warnings", diagnostics.len())
        .add_child(skeleton)
        .add_child(geometry)
        .add_child(animations);

    let options = TreeOptions {
        max_depth: depth,
        no_color,
        show_metadata: true,
    };
    print!("{}", render_tree(&root, &options));

    for warning in diagnostics.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}

/// Build one tree per root bone, children in skeleton order
fn bone_trees(skeleton: &Skeleton) -> Vec<TreeNode> {
    let bones = skeleton.bones();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); bones.len()];
    let mut roots = Vec::new();
    for (index, bone) in bones.iter().enumerate() {
        match bone.parent {
            Some(parent) if parent < bones.len() => children[parent].push(index),
            _ => roots.push(index),
        }
    }

    fn build(index: usize, skeleton: &Skeleton, children: &[Vec<usize>]) -> TreeNode {
        let bones = skeleton.bones();
        let bone = &bones[index];
        let node_type = if bone.skinned {
            NodeType::SkinnedBone
        } else {
            NodeType::Bone
        };
        let mut node = TreeNode::new(format!("{index}: {}", bone.name), node_type)
            .with_metadata("node", bone.node);
        for &child in &children[index] {
            node = node.add_child(build(child, skeleton, children));
        }
        node
    }

    roots
        .into_iter()
        .map(|root| build(root, skeleton, &children))
        .collect()
}
