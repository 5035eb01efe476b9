//! Bone matrices packed into a square RGBA32F texture
//!
//! Each skin matrix occupies four consecutive RGBA texels (one column per
//! texel), so a texture of side `n` holds `n * n / 4` bones.

use crate::error::{Result, RigError};
use crate::skinning::SkeletonMatrices;

/// Largest texture side the packer will produce
pub const MAX_TEXTURE_SIZE: usize = 2048;

const TEXELS_PER_MATRIX: usize = 4;
const FLOATS_PER_TEXEL: usize = 4;

/// CPU-side texel data for a bone matrix texture
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMatrixTexture {
    size: usize,
    bone_count: usize,
    data: Vec<f32>,
}

impl BoneMatrixTexture {
    /// Smallest power-of-two side whose texel capacity fits `bone_count` matrices
    pub fn optimal_size(bone_count: usize) -> Result<usize> {
        let limit = MAX_TEXTURE_SIZE * MAX_TEXTURE_SIZE / TEXELS_PER_MATRIX;
        if bone_count > limit {
            return Err(RigError::TooManyBones {
                count: bone_count,
                limit,
            });
        }

        let mut size = 2;
        while size * size / TEXELS_PER_MATRIX < bone_count {
            size *= 2;
        }
        Ok(size)
    }

    /// Allocate a zeroed texture large enough for `bone_count` matrices
    pub fn new(bone_count: usize) -> Result<Self> {
        let size = Self::optimal_size(bone_count)?;
        log::debug!("Bone matrix texture {size}x{size} for {bone_count} bones");
        Ok(Self {
            size,
            bone_count,
            data: vec![0.0; size * size * FLOATS_PER_TEXEL],
        })
    }

    /// Side length in texels
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    /// Row-major RGBA32F texel data, `size * size * 4` floats
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copy the skin matrices into the texel data
    pub fn upload(&mut self, matrices: &SkeletonMatrices) -> Result<()> {
        if matrices.bone_count() != self.bone_count {
            return Err(RigError::LengthMismatch {
                what: "bone matrix texture bones",
                expected: self.bone_count,
                actual: matrices.bone_count(),
            });
        }
        self.data[..matrices.skin.len()].copy_from_slice(&matrices.skin);
        Ok(())
    }
}
