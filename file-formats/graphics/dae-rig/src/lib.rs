//! Skeletal animation and geometry pipeline for COLLADA scenes
//!
//! The crate turns an already-parsed scene description into runtime data:
//!
//! - [`skeleton`]: bones extracted from skin controllers or node hierarchies,
//!   merged, completed with missing ancestors and sorted parents-first
//! - [`animation`]: uniformly sampled per-bone curves, looping sampling and
//!   pose blending
//! - [`skinning`]: pose to world and skin matrices
//! - [`blend_tree`]: parameter driven blending of several animations
//! - [`geometry`]: per-attribute COLLADA indices re-indexed into GPU-ready
//!   vertex buffers with a single index buffer
//! - [`texture`]: skin matrices packed into a square float texture
//! - [`converter`] and [`document`]: the end-to-end pipeline and its
//!   header-plus-blob output
//!
//! # Example
//!
//! ```rust,no_run
//! use dae_rig::{Converter, ConverterOptions, Diagnostics, Pose, SceneDescription};
//! use dae_rig::animation::sample_animation;
//! use dae_rig::skinning::{SkeletonMatrices, export_pose};
//!
//! let scene = SceneDescription::load("character.json")?;
//! let mut diagnostics = Diagnostics::new();
//! let converted = Converter::new(ConverterOptions::default()).convert(&scene, &mut diagnostics)?;
//!
//! let skeleton = &converted.skeleton;
//! let mut pose = Pose::new(skeleton.bone_count());
//! let mut matrices = SkeletonMatrices::new(skeleton.bone_count());
//! if let Some(walk) = converted.animation("walk") {
//!     sample_animation(walk, skeleton, &mut pose, 12.5)?;
//!     export_pose(skeleton, &pose, &mut matrices)?;
//! }
//! # Ok::<(), dae_rig::RigError>(())
//! ```

pub mod animation;
pub mod blend_tree;
pub mod converter;
pub mod document;
pub mod error;
pub mod geometry;
pub mod pose;
pub mod scene;
pub mod skeleton;
pub mod skinning;
pub mod stream;
pub mod texture;

// Re-export common types
pub use animation::{Animation, AnimationTrack};
pub use blend_tree::{BlendTree, BlendTreeBuilder, BlendTreeState};
pub use converter::{Converted, Converter, ConverterOptions};
pub use document::InterchangeDocument;
pub use error::{DataWarning, Diagnostics, Result, RigError};
pub use geometry::GeometryChunk;
pub use pose::{Pose, PoseStack};
pub use scene::{NodeId, SceneDescription, SceneGraph};
pub use skeleton::{Bone, Skeleton};
pub use skinning::SkeletonMatrices;
pub use texture::BoneMatrixTexture;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
