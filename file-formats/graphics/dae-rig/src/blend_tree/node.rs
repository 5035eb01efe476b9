//! Blend tree node definitions

use std::fmt;
use std::sync::Arc;

use crate::animation::Animation;

/// Index of a node inside its [`BlendTree`](super::BlendTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlendNodeId(pub(crate) usize);

impl BlendNodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlendNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

/// Plays one animation
#[derive(Debug, Clone)]
pub struct TrackNode {
    pub animation: Arc<Animation>,
    /// Offset added to the normalized progress before sampling
    pub phase: f32,
    pub looping: bool,
}

impl TrackNode {
    /// Frame to sample for a normalized progress
    pub fn frame_at(&self, progress: f32) -> f32 {
        let p = progress + self.phase;
        let p = if self.looping { p } else { p.clamp(0.0, 1.0) };
        p * self.animation.frame_count as f32
    }

    pub(crate) fn wrap_progress(&self, progress: f32) -> f32 {
        if self.looping {
            progress.rem_euclid(1.0)
        } else {
            progress.clamp(0.0, 1.0)
        }
    }
}

/// Cross-fades between two children on a boolean parameter
#[derive(Debug, Clone)]
pub struct BoolNode {
    pub param: String,
    /// Seconds for a full cross-fade
    pub transition_time: f32,
    pub when_false: BlendNodeId,
    pub when_true: BlendNodeId,
}

/// Parameter values above this read as `true`
pub const BOOL_THRESHOLD: f32 = 0.5;

impl BoolNode {
    /// Move `weight` one step towards the parameter's side
    pub(crate) fn step_weight(&self, weight: f32, param: f32, dt: f32) -> f32 {
        let target = if param > BOOL_THRESHOLD { 1.0 } else { 0.0 };
        if self.transition_time <= 0.0 {
            return target;
        }
        let step = dt / self.transition_time;
        if target > weight {
            (weight + step).min(1.0)
        } else {
            (weight - step).max(0.0)
        }
    }
}

/// Blends between children placed along one parameter axis
#[derive(Debug, Clone)]
pub struct FloatNode {
    pub param: String,
    /// Maximum change of the smoothed value per second
    pub change_speed: f32,
    /// `(value, child)` pairs sorted by ascending value, never empty
    pub children: Vec<(f32, BlendNodeId)>,
}

impl FloatNode {
    /// Move the smoothed value towards `target` by at most `dt * change_speed`
    pub(crate) fn step_value(&self, value: Option<f32>, target: f32, dt: f32) -> f32 {
        match value {
            None => target,
            Some(current) => {
                let delta = target - current;
                let max = (dt * self.change_speed).abs();
                // A NaN limit (infinite speed over a zero step) snaps
                if max < delta.abs() {
                    current + max.copysign(delta)
                } else {
                    target
                }
            }
        }
    }

    /// Bracketing children for `value` and the blend factor between them
    pub fn bracket(&self, value: f32) -> (BlendNodeId, BlendNodeId, f32) {
        let (first_value, first) = self.children[0];
        if value <= first_value {
            return (first, first, 0.0);
        }
        for pair in self.children.windows(2) {
            let (low_value, low) = pair[0];
            let (high_value, high) = pair[1];
            if value <= high_value {
                let span = high_value - low_value;
                let t = if span > 0.0 {
                    (value - low_value) / span
                } else {
                    1.0
                };
                return (low, high, t);
            }
        }
        let (_, last) = self.children[self.children.len() - 1];
        (last, last, 0.0)
    }
}

/// A node of a blend tree
#[derive(Debug, Clone)]
pub enum BlendNode {
    Track(TrackNode),
    Bool(BoolNode),
    Float(FloatNode),
}

impl BlendNode {
    /// Child nodes in evaluation order
    pub fn children(&self) -> Vec<BlendNodeId> {
        match self {
            Self::Track(_) => Vec::new(),
            Self::Bool(node) => vec![node.when_false, node.when_true],
            Self::Float(node) => node.children.iter().map(|&(_, child)| child).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Track(_) => "track",
            Self::Bool(_) => "bool",
            Self::Float(_) => "float",
        }
    }
}

/// Smoothstep easing `3w² - 2w³`
pub fn smoothstep(w: f32) -> f32 {
    w * w * (3.0 - 2.0 * w)
}
