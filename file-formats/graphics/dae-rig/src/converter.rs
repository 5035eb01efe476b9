//! Scene description to runtime data
//!
//! The [`Converter`] runs the whole pipeline over a loaded
//! [`SceneDescription`]: skeleton extraction and merging, parent completion,
//! sorting and consistency checks, geometry re-indexing with skin weights
//! rewritten to the final bone order, and animation clip conversion.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::{Animation, AnimationTrack};
use crate::error::{DataWarning, Diagnostics, Result, RigError};
use crate::geometry::{
    GeometryChunk, MAX_INFLUENCES, MergedGeometry, SkinInfluences, build_chunk, merge_chunk_data,
};
use crate::scene::{AnimationClip, NodeId, SceneDescription, SceneGraph};
use crate::skeleton::{
    Skeleton, SkeletonMerger, add_bone_parents, check_consistency, sort_bones,
};
use crate::texture::BoneMatrixTexture;

/// Options controlling the conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    /// Frame rate used for every clip instead of the clip's own
    pub fps_override: Option<f32>,
    /// Whether to merge all geometry chunks into shared buffers
    pub merge_chunks: bool,
    /// Bone influences kept per vertex (at most 4)
    pub max_influences: usize,
    /// Fail when the skeleton does not fit a bone matrix texture
    pub validate_texture_size: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            fps_override: None,
            merge_chunks: true,
            max_influences: MAX_INFLUENCES,
            validate_texture_size: true,
        }
    }
}

impl ConverterOptions {
    /// Load options from a JSON file; missing fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Result of a conversion
#[derive(Debug, Clone)]
pub struct Converted {
    /// Sorted, deduplicated skeleton
    pub skeleton: Skeleton,
    /// One animation per clip, tracks in skeleton order
    pub animations: Vec<Animation>,
    /// One chunk per geometry, bone indices in skeleton order
    pub chunks: Vec<GeometryChunk>,
    /// All chunks in shared buffers, when merging was requested and possible
    pub merged: Option<MergedGeometry>,
}

impl Converted {
    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }
}

/// Runs the conversion pipeline
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConverterOptions,
}

impl Converter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Convert `scene`, recording data-quality issues in `diagnostics`
    pub fn convert(&self, scene: &SceneDescription, diagnostics: &mut Diagnostics) -> Result<Converted> {
        let graph = &scene.nodes;
        graph.validate()?;

        let (mut skeleton, joint_maps) = self.build_skeleton(scene)?;
        let added = add_bone_parents(&mut skeleton, graph)?;
        let order = sort_bones(&mut skeleton)?;
        check_consistency(&skeleton, graph)?;
        log::debug!(
            "Skeleton: {} bones ({added} added as parents)",
            skeleton.bone_count()
        );

        if self.options.validate_texture_size {
            BoneMatrixTexture::optimal_size(skeleton.bone_count())?;
        }

        // Joint index -> final bone index, per skin
        let joint_maps: Vec<Vec<usize>> = joint_maps
            .into_iter()
            .map(|remap| remap.into_iter().map(|bone| order[bone]).collect())
            .collect();

        let mut chunks = Vec::with_capacity(scene.geometries.len());
        for geometry in &scene.geometries {
            let streams = match geometry.skin {
                Some(index) => {
                    let skin = scene.skins.get(index).ok_or_else(|| {
                        RigError::InvalidGeometry(format!(
                            "'{}' references skin {index} of {}",
                            geometry.name,
                            scene.skins.len()
                        ))
                    })?;
                    let influences = SkinInfluences::from_controller(skin, &joint_maps[index])?;
                    Some(influences.to_vertex_streams_limited(self.options.max_influences, diagnostics)?)
                }
                None => None,
            };
            chunks.push(build_chunk(geometry, streams.as_ref(), diagnostics)?);
        }

        let merged = if self.options.merge_chunks {
            merge_chunk_data(&chunks, diagnostics)
        } else {
            None
        };

        let animations = scene
            .animations
            .iter()
            .map(|clip| self.convert_clip(clip, &skeleton, diagnostics))
            .collect::<Result<Vec<_>>>()?;

        Ok(Converted {
            skeleton,
            animations,
            chunks,
            merged,
        })
    }

    /// Merged skeleton plus, per skin, the joint -> merged bone remap
    fn build_skeleton(&self, scene: &SceneDescription) -> Result<(Skeleton, Vec<Vec<usize>>)> {
        let graph = &scene.nodes;
        let mut merger = SkeletonMerger::new();
        let mut joint_maps = Vec::with_capacity(scene.skins.len());

        if scene.skins.is_empty() {
            for root in animated_roots(scene, graph)? {
                merger.add(&Skeleton::from_node(graph, root)?);
            }
        } else {
            for skin in &scene.skins {
                joint_maps.push(merger.add(&Skeleton::from_skin(graph, skin)?));
            }
        }
        Ok((merger.finish(), joint_maps))
    }

    fn convert_clip(
        &self,
        clip: &AnimationClip,
        skeleton: &Skeleton,
        diagnostics: &mut Diagnostics,
    ) -> Result<Animation> {
        let mut tracks: Vec<AnimationTrack> =
            (0..skeleton.bone_count()).map(AnimationTrack::bind_pose).collect();

        for channel in &clip.channels {
            // Bones with differing bind poses may share a node; all of them follow it
            let mut targeted = false;
            for (bone, track) in skeleton.bones().iter().zip(tracks.iter_mut()) {
                if bone.node != channel.target {
                    continue;
                }
                targeted = true;
                if channel.position.is_some() {
                    track.position = channel.position.clone();
                }
                if channel.rotation.is_some() {
                    track.rotation = channel.rotation.clone();
                }
                if channel.scale.is_some() {
                    track.scale = channel.scale.clone();
                }
            }
            if !targeted {
                diagnostics.warn(DataWarning::UntargetedChannel {
                    animation: clip.name.clone(),
                    node: channel.target,
                });
            }
        }

        let fps = self.options.fps_override.unwrap_or(clip.fps);
        let animation = Animation::new(clip.name.clone(), fps, clip.frame_count, tracks)?;
        log::debug!(
            "Animation '{}': {} frames at {fps} fps, {} animated bones",
            animation.name,
            animation.frame_count,
            animation.tracks.iter().filter(|t| t.is_animated()).count()
        );
        Ok(animation)
    }
}

/// Scene roots of every animated node, in order of first appearance
fn animated_roots(scene: &SceneDescription, graph: &SceneGraph) -> Result<Vec<NodeId>> {
    let mut roots: Vec<NodeId> = Vec::new();
    for channel in scene.animations.iter().flat_map(|clip| &clip.channels) {
        if !graph.contains(channel.target) {
            continue;
        }
        let mut node = channel.target;
        let mut steps = 0;
        while let Some(parent) = graph.parent_of(node)? {
            node = parent;
            steps += 1;
            if steps > graph.nodes().len() {
                return Err(RigError::CyclicHierarchy(format!("node {node}")));
            }
        }
        if !roots.contains(&node) {
            roots.push(node);
        }
    }
    Ok(roots)
}
