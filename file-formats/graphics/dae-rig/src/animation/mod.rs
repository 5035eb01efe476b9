//! Skeletal animation runtime
//!
//! This module provides:
//! - The [`Animation`] data model (per-bone position/rotation/scale curves)
//! - Looping and clamped sampling of an animation into a [`Pose`](crate::pose::Pose)
//! - Pose blending for cross-fades
//!
//! # Example
//!
//! ```rust,ignore
//! use dae_rig::animation::{sample_animation, blend_pose};
//! use dae_rig::pose::Pose;
//!
//! let mut walk_pose = Pose::new(skeleton.bone_count());
//! let mut run_pose = Pose::new(skeleton.bone_count());
//! sample_animation(&walk, &skeleton, &mut walk_pose, frame)?;
//! sample_animation(&run, &skeleton, &mut run_pose, frame)?;
//!
//! let mut blended = Pose::new(skeleton.bone_count());
//! blend_pose(&walk_pose, &run_pose, 0.3, &mut blended)?;
//! ```

mod blend;
mod sampler;
mod types;

pub use blend::blend_pose;
pub use sampler::{reset_pose, sample_animation, sample_animation_clamped};
pub use types::{Animation, AnimationTrack};
