//! Integration tests for the dae-rig pipeline

mod animation;
mod blend_tree;
mod pipeline;
mod skeleton;
