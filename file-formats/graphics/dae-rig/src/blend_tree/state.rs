//! Per-instance blend tree state

use std::collections::HashMap;

use crate::pose::PoseStack;

/// Value of a named blend tree parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Text(String),
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Float(if value { 1.0 } else { 0.0 })
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Named parameters driving a blend tree instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: HashMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Numeric value of a parameter; missing and text parameters read as 0
    pub fn float(&self, name: &str) -> f32 {
        match self.values.get(name) {
            Some(ParamValue::Float(value)) => *value,
            _ => 0.0,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// Working state of a single node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    /// Normalized playback position
    Track { progress: f32 },
    /// Cross-fade weight towards the `true` child, before smoothing
    Bool { weight: f32 },
    /// Smoothed parameter value (unset until the first update) and shared progress
    Float { value: Option<f32>, progress: f32 },
}

/// Everything that changes while one instance of a blend tree plays
///
/// The tree definition itself is immutable and can be shared between any
/// number of states.
#[derive(Debug)]
pub struct BlendTreeState {
    pub params: Parameters,
    pub(crate) nodes: Vec<NodeState>,
    pub(crate) stack: PoseStack,
}

impl BlendTreeState {
    pub(crate) fn new(nodes: Vec<NodeState>) -> Self {
        Self {
            params: Parameters::new(),
            nodes,
            stack: PoseStack::new(),
        }
    }

    pub fn node_state(&self, index: usize) -> Option<&NodeState> {
        self.nodes.get(index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
