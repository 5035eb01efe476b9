//! Per-vertex bone influences

use crate::error::{DataWarning, Diagnostics, Result, RigError};
use crate::scene::SkinController;

/// Bone influences kept per vertex in the output streams
pub const MAX_INFLUENCES: usize = 4;

/// Variable-length `(bone, weight)` lists, one per source position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinInfluences {
    influences: Vec<Vec<(u32, f32)>>,
}

/// Fixed-width weight and bone index streams
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfluenceStreams {
    pub weights: Vec<f32>,
    pub indices: Vec<u16>,
}

impl InfluenceStreams {
    pub fn vertex_count(&self) -> usize {
        self.weights.len() / MAX_INFLUENCES
    }

    pub fn vertex(&self, vertex: usize) -> Option<(&[f32], &[u16])> {
        let range = vertex * MAX_INFLUENCES..(vertex + 1) * MAX_INFLUENCES;
        Some((self.weights.get(range.clone())?, self.indices.get(range)?))
    }
}

impl SkinInfluences {
    pub fn new(influences: Vec<Vec<(u32, f32)>>) -> Self {
        Self { influences }
    }

    /// Influences of a skin controller with joint indices rewritten to bone
    /// indices through `joint_to_bone`
    pub fn from_controller(skin: &SkinController, joint_to_bone: &[usize]) -> Result<Self> {
        let influences = skin
            .influences
            .iter()
            .map(|vertex| {
                vertex
                    .iter()
                    .map(|&(joint, weight)| {
                        let bone = joint_to_bone.get(joint as usize).ok_or_else(|| {
                            RigError::InvalidGeometry(format!(
                                "skin '{}' references joint {joint} of {}",
                                skin.name,
                                joint_to_bone.len()
                            ))
                        })?;
                        Ok((*bone as u32, weight))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { influences })
    }

    pub fn vertex_count(&self) -> usize {
        self.influences.len()
    }

    /// Reduce every vertex to [`MAX_INFLUENCES`] normalized weights
    ///
    /// The strongest influences are kept. Vertices without any positive
    /// weight are bound fully to bone 0.
    pub fn to_vertex_streams(&self, diagnostics: &mut Diagnostics) -> Result<InfluenceStreams> {
        self.to_vertex_streams_limited(MAX_INFLUENCES, diagnostics)
    }

    /// Like [`to_vertex_streams`](Self::to_vertex_streams) but keeping at most
    /// `limit` influences (clamped to `1..=MAX_INFLUENCES`); the remaining
    /// slots are zero
    pub fn to_vertex_streams_limited(
        &self,
        limit: usize,
        diagnostics: &mut Diagnostics,
    ) -> Result<InfluenceStreams> {
        let limit = limit.clamp(1, MAX_INFLUENCES);
        let mut streams = InfluenceStreams {
            weights: Vec::with_capacity(self.influences.len() * MAX_INFLUENCES),
            indices: Vec::with_capacity(self.influences.len() * MAX_INFLUENCES),
        };

        let mut sorted: Vec<(u32, f32)> = Vec::new();
        for (vertex, influences) in self.influences.iter().enumerate() {
            sorted.clear();
            sorted.extend(
                influences
                    .iter()
                    .copied()
                    .filter(|&(_, weight)| weight > 0.0 && weight.is_finite()),
            );
            sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

            if sorted.len() > limit {
                diagnostics.warn(DataWarning::TooManyInfluences {
                    vertex,
                    influences: sorted.len(),
                    kept: limit,
                });
                sorted.truncate(limit);
            }

            if sorted.is_empty() {
                diagnostics.warn(DataWarning::UnweightedVertex { vertex });
                sorted.push((0, 1.0));
            }
            let total: f32 = sorted.iter().map(|&(_, weight)| weight).sum();

            for slot in 0..MAX_INFLUENCES {
                let (bone, weight) = sorted.get(slot).copied().unwrap_or((0, 0.0));
                let bone = u16::try_from(bone).map_err(|_| RigError::TooManyBones {
                    count: bone as usize + 1,
                    limit: u16::MAX as usize + 1,
                })?;
                streams.weights.push(weight / total);
                streams.indices.push(bone);
            }
        }
        Ok(streams)
    }
}
