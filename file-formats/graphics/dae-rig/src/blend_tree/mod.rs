//! Animation blend trees
//!
//! A [`BlendTree`] is an immutable definition built with a
//! [`BlendTreeBuilder`]. Each playing instance owns a [`BlendTreeState`]
//! holding its parameters, per-node progress and weights, and a pose stack for
//! temporaries, so one tree can drive any number of characters.
//!
//! Per frame the caller sets parameters, calls [`BlendTree::tick`] and then
//! [`BlendTree::eval`] to get the blended pose.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut builder = BlendTreeBuilder::new();
//! let walk = builder.track(walk_animation, true);
//! let run = builder.track(run_animation, true);
//! let root = builder.boolean("running", 0.3, walk, run)?;
//! let tree = builder.build(root)?;
//!
//! let mut state = tree.new_state();
//! state.params.set("running", true);
//! tree.tick(1.0 / 60.0, &mut state)?;
//! tree.eval(&skeleton, &mut state, &mut pose)?;
//! ```

mod node;
mod state;

pub use node::{BOOL_THRESHOLD, BlendNode, BlendNodeId, BoolNode, FloatNode, TrackNode, smoothstep};
pub use state::{BlendTreeState, NodeState, ParamValue, Parameters};

use std::sync::Arc;

use crate::animation::{Animation, blend_pose, sample_animation, sample_animation_clamped};
use crate::error::{Result, RigError};
use crate::pose::{Pose, PoseStack};
use crate::skeleton::Skeleton;

/// Builds a [`BlendTree`] bottom-up
///
/// Nodes can only reference nodes that were added before them and each node
/// can have at most one parent, so every finished tree is acyclic.
#[derive(Debug, Default)]
pub struct BlendTreeBuilder {
    nodes: Vec<BlendNode>,
    has_parent: Vec<bool>,
}

impl BlendTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: BlendNode) -> BlendNodeId {
        self.nodes.push(node);
        self.has_parent.push(false);
        BlendNodeId(self.nodes.len() - 1)
    }

    fn adopt(&mut self, child: BlendNodeId) -> Result<()> {
        match self.has_parent.get_mut(child.0) {
            None => Err(RigError::InvalidBlendTree(format!("{child} does not exist"))),
            Some(true) => Err(RigError::InvalidBlendTree(format!(
                "{child} already has a parent"
            ))),
            Some(flag) => {
                *flag = true;
                Ok(())
            }
        }
    }

    /// Add a node playing `animation` from the start
    pub fn track(&mut self, animation: Arc<Animation>, looping: bool) -> BlendNodeId {
        self.track_with_phase(animation, looping, 0.0)
    }

    /// Add a node playing `animation` offset by `phase` (normalized)
    pub fn track_with_phase(
        &mut self,
        animation: Arc<Animation>,
        looping: bool,
        phase: f32,
    ) -> BlendNodeId {
        self.push(BlendNode::Track(TrackNode {
            animation,
            phase,
            looping,
        }))
    }

    /// Add a cross-fade between two children on parameter `param`
    pub fn boolean(
        &mut self,
        param: impl Into<String>,
        transition_time: f32,
        when_false: BlendNodeId,
        when_true: BlendNodeId,
    ) -> Result<BlendNodeId> {
        if !(transition_time >= 0.0 && transition_time.is_finite()) {
            return Err(RigError::InvalidBlendTree(format!(
                "invalid transition time {transition_time}"
            )));
        }
        if when_false == when_true {
            return Err(RigError::InvalidBlendTree(format!(
                "{when_false} used for both sides of a bool node"
            )));
        }
        self.adopt(when_false)?;
        self.adopt(when_true)?;
        Ok(self.push(BlendNode::Bool(BoolNode {
            param: param.into(),
            transition_time,
            when_false,
            when_true,
        })))
    }

    /// Add a blend along parameter `param` over `(value, child)` pairs
    pub fn float(
        &mut self,
        param: impl Into<String>,
        change_speed: f32,
        mut children: Vec<(f32, BlendNodeId)>,
    ) -> Result<BlendNodeId> {
        // Infinite speed is allowed and snaps to the target
        if change_speed.is_nan() || change_speed < 0.0 {
            return Err(RigError::InvalidBlendTree(format!(
                "invalid change speed {change_speed}"
            )));
        }
        if children.is_empty() {
            return Err(RigError::InvalidBlendTree(
                "float node without children".to_string(),
            ));
        }
        if let Some((value, child)) = children.iter().find(|(value, _)| !value.is_finite()) {
            return Err(RigError::InvalidBlendTree(format!(
                "{child} placed at non-finite value {value}"
            )));
        }
        for &(_, child) in &children {
            self.adopt(child)?;
        }
        children.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(self.push(BlendNode::Float(FloatNode {
            param: param.into(),
            change_speed,
            children,
        })))
    }

    /// Finish the tree with `root` as its output node
    pub fn build(self, root: BlendNodeId) -> Result<BlendTree> {
        match self.has_parent.get(root.0) {
            None => Err(RigError::InvalidBlendTree(format!("root {root} does not exist"))),
            Some(true) => Err(RigError::InvalidBlendTree(format!(
                "root {root} is a child of another node"
            ))),
            Some(false) => {
                let unused = self
                    .has_parent
                    .iter()
                    .enumerate()
                    .filter(|&(i, &p)| !p && i != root.0)
                    .count();
                if unused > 0 {
                    log::debug!("Blend tree has {unused} nodes unreachable from {root}");
                }
                Ok(BlendTree {
                    nodes: self.nodes,
                    root,
                })
            }
        }
    }
}

/// Immutable blend tree definition
#[derive(Debug, Clone)]
pub struct BlendTree {
    nodes: Vec<BlendNode>,
    root: BlendNodeId,
}

impl BlendTree {
    pub fn root(&self) -> BlendNodeId {
        self.root
    }

    pub fn node(&self, id: BlendNodeId) -> Option<&BlendNode> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Fresh playback state: every track at progress 0, every bool node fully
    /// on its `false` side
    pub fn new_state(&self) -> BlendTreeState {
        let nodes = self
            .nodes
            .iter()
            .map(|node| match node {
                BlendNode::Track(_) => NodeState::Track { progress: 0.0 },
                BlendNode::Bool(_) => NodeState::Bool { weight: 0.0 },
                BlendNode::Float(_) => NodeState::Float {
                    value: None,
                    progress: 0.0,
                },
            })
            .collect();
        BlendTreeState::new(nodes)
    }

    /// Check that every track animates exactly the bones of `skeleton`
    pub fn validate(&self, skeleton: &Skeleton) -> Result<()> {
        for node in &self.nodes {
            if let BlendNode::Track(track) = node {
                track.animation.validate(skeleton)?;
            }
        }
        Ok(())
    }

    fn check_state(&self, state: &BlendTreeState) -> Result<()> {
        if state.nodes.len() != self.nodes.len() {
            return Err(RigError::InvalidBlendTree(format!(
                "state has {} nodes, tree has {}",
                state.nodes.len(),
                self.nodes.len()
            )));
        }
        Ok(())
    }

    fn foreign_state(id: BlendNodeId) -> RigError {
        RigError::InvalidBlendTree(format!("state of {id} belongs to a different tree"))
    }

    /// Update weights from parameters, then advance playback by `dt` seconds
    pub fn tick(&self, dt: f32, state: &mut BlendTreeState) -> Result<()> {
        self.check_state(state)?;
        self.update_state(self.root, dt, state)?;
        self.advance_time(self.root, dt, state)
    }

    /// Recompute blend weights of `id` and its subtree from the parameters
    pub fn update_state(&self, id: BlendNodeId, dt: f32, state: &mut BlendTreeState) -> Result<()> {
        match (self.nodes.get(id.0), state.nodes.get_mut(id.0)) {
            (Some(BlendNode::Track(_)), Some(NodeState::Track { .. })) => Ok(()),
            (Some(BlendNode::Bool(node)), Some(NodeState::Bool { weight })) => {
                *weight = node.step_weight(*weight, state.params.float(&node.param), dt);
                self.update_state(node.when_false, dt, state)?;
                self.update_state(node.when_true, dt, state)
            }
            (Some(BlendNode::Float(node)), Some(NodeState::Float { value, .. })) => {
                *value = Some(node.step_value(*value, state.params.float(&node.param), dt));
                for &(_, child) in &node.children {
                    self.update_state(child, dt, state)?;
                }
                Ok(())
            }
            _ => Err(Self::foreign_state(id)),
        }
    }

    /// Move playback of `id` and its subtree forward by `dt` seconds
    pub fn advance_time(&self, id: BlendNodeId, dt: f32, state: &mut BlendTreeState) -> Result<()> {
        match (self.nodes.get(id.0), state.nodes.get(id.0)) {
            (Some(BlendNode::Track(track)), Some(NodeState::Track { progress })) => {
                let duration = track.animation.duration();
                let next = track.wrap_progress(progress + dt / duration);
                state.nodes[id.0] = NodeState::Track { progress: next };
                Ok(())
            }
            (Some(BlendNode::Bool(node)), Some(&NodeState::Bool { weight })) => {
                if weight <= 0.0 {
                    self.advance_time(node.when_false, dt, state)?;
                    self.set_progress(node.when_true, 0.0, state)
                } else if weight >= 1.0 {
                    self.advance_time(node.when_true, dt, state)?;
                    self.set_progress(node.when_false, 0.0, state)
                } else {
                    self.advance_time(node.when_false, dt, state)?;
                    self.advance_time(node.when_true, dt, state)
                }
            }
            (Some(BlendNode::Float(_)), Some(&NodeState::Float { progress, .. })) => {
                let duration = self.duration(id, state)?;
                let next = if duration > 0.0 {
                    (progress + dt / duration).rem_euclid(1.0)
                } else {
                    progress
                };
                self.set_progress(id, next, state)
            }
            _ => Err(Self::foreign_state(id)),
        }
    }

    /// Seek `id` and its subtree to normalized `progress`
    pub fn set_progress(&self, id: BlendNodeId, progress: f32, state: &mut BlendTreeState) -> Result<()> {
        match (self.nodes.get(id.0), state.nodes.get_mut(id.0)) {
            (Some(BlendNode::Track(track)), Some(NodeState::Track { progress: current })) => {
                *current = track.wrap_progress(progress);
                Ok(())
            }
            (Some(BlendNode::Bool(node)), Some(NodeState::Bool { .. })) => {
                self.set_progress(node.when_false, progress, state)?;
                self.set_progress(node.when_true, progress, state)
            }
            (Some(BlendNode::Float(node)), Some(NodeState::Float { progress: current, .. })) => {
                *current = progress;
                for &(_, child) in &node.children {
                    self.set_progress(child, progress, state)?;
                }
                Ok(())
            }
            _ => Err(Self::foreign_state(id)),
        }
    }

    /// Effective duration of `id` in seconds under the current blend weights
    pub fn duration(&self, id: BlendNodeId, state: &BlendTreeState) -> Result<f32> {
        match (self.nodes.get(id.0), state.nodes.get(id.0)) {
            (Some(BlendNode::Track(track)), Some(NodeState::Track { .. })) => Ok(track.animation.duration()),
            (Some(BlendNode::Bool(node)), Some(&NodeState::Bool { weight })) => {
                let w = smoothstep(weight);
                let a = self.duration(node.when_false, state)?;
                let b = self.duration(node.when_true, state)?;
                Ok(a + (b - a) * w)
            }
            (Some(BlendNode::Float(node)), Some(&NodeState::Float { value, .. })) => {
                let (low, high, t) = node.bracket(value.unwrap_or(0.0));
                let a = self.duration(low, state)?;
                let b = self.duration(high, state)?;
                Ok(a + (b - a) * t)
            }
            _ => Err(Self::foreign_state(id)),
        }
    }

    /// Evaluate the root node into `out`, resizing it to the skeleton
    pub fn eval(&self, skeleton: &Skeleton, state: &mut BlendTreeState, out: &mut Pose) -> Result<()> {
        self.check_state(state)?;
        if out.bone_count() != skeleton.bone_count() {
            out.resize(skeleton.bone_count());
        }
        let BlendTreeState { nodes, stack, .. } = state;
        self.eval_node(self.root, skeleton, nodes, stack, out)
    }

    fn eval_node(
        &self,
        id: BlendNodeId,
        skeleton: &Skeleton,
        states: &[NodeState],
        stack: &mut PoseStack,
        out: &mut Pose,
    ) -> Result<()> {
        match (self.nodes.get(id.0), states.get(id.0)) {
            (Some(BlendNode::Track(track)), Some(&NodeState::Track { progress })) => {
                let frame = track.frame_at(progress);
                if track.looping {
                    sample_animation(&track.animation, skeleton, out, frame)
                } else {
                    sample_animation_clamped(&track.animation, skeleton, out, frame)
                }
            }
            (Some(BlendNode::Bool(node)), Some(&NodeState::Bool { weight })) => {
                let w = smoothstep(weight);
                self.eval_blend(node.when_false, node.when_true, w, skeleton, states, stack, out)
            }
            (Some(BlendNode::Float(node)), Some(&NodeState::Float { value, .. })) => {
                let (low, high, t) = node.bracket(value.unwrap_or(0.0));
                self.eval_blend(low, high, t, skeleton, states, stack, out)
            }
            _ => Err(Self::foreign_state(id)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_blend(
        &self,
        a: BlendNodeId,
        b: BlendNodeId,
        t: f32,
        skeleton: &Skeleton,
        states: &[NodeState],
        stack: &mut PoseStack,
        out: &mut Pose,
    ) -> Result<()> {
        if a == b || t <= 0.0 {
            return self.eval_node(a, skeleton, states, stack, out);
        }
        if t >= 1.0 {
            return self.eval_node(b, skeleton, states, stack, out);
        }

        let count = skeleton.bone_count();
        let mut pose_a = stack.push(count);
        let mut pose_b = stack.push(count);
        let result = self
            .eval_node(a, skeleton, states, stack, &mut pose_a)
            .and_then(|_| self.eval_node(b, skeleton, states, stack, &mut pose_b))
            .and_then(|_| blend_pose(&pose_a, &pose_b, t, out));
        stack.pop(pose_b);
        stack.pop(pose_a);
        result
    }
}
