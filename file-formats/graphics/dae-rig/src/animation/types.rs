//! Animation data model

use crate::error::{Result, RigError};
use crate::skeleton::Skeleton;

/// Keyframe curves of one bone
///
/// A curve holds one value per frame: 3 floats for position and scale, 4 for
/// the rotation quaternion. `None` means the bone keeps its bind-pose value
/// for that channel during the whole animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationTrack {
    pub bone: usize,
    pub position: Option<Vec<f32>>,
    pub rotation: Option<Vec<f32>>,
    pub scale: Option<Vec<f32>>,
}

impl AnimationTrack {
    /// Track with every channel at bind pose
    pub fn bind_pose(bone: usize) -> Self {
        Self {
            bone,
            ..Default::default()
        }
    }

    pub fn is_animated(&self) -> bool {
        self.position.is_some() || self.rotation.is_some() || self.scale.is_some()
    }
}

/// Uniformly sampled skeletal animation
///
/// `tracks[i]` drives bone `i` of the skeleton the animation was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Frames per second
    pub fps: f32,
    pub frame_count: usize,
    pub tracks: Vec<AnimationTrack>,
}

impl Animation {
    /// Create an animation, validating frame count, frame rate and curve sizes
    pub fn new(
        name: impl Into<String>,
        fps: f32,
        frame_count: usize,
        tracks: Vec<AnimationTrack>,
    ) -> Result<Self> {
        let animation = Self {
            name: name.into(),
            fps,
            frame_count,
            tracks,
        };
        animation.validate_curves()?;
        Ok(animation)
    }

    /// Animation that holds the bind pose of every bone
    pub fn still(name: impl Into<String>, fps: f32, frame_count: usize, bone_count: usize) -> Result<Self> {
        Self::new(
            name,
            fps,
            frame_count,
            (0..bone_count).map(AnimationTrack::bind_pose).collect(),
        )
    }

    /// Length in seconds
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 / self.fps
    }

    fn validate_curves(&self) -> Result<()> {
        if self.frame_count == 0 {
            return Err(RigError::InvalidAnimation(format!(
                "'{}' has no frames",
                self.name
            )));
        }
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(RigError::InvalidAnimation(format!(
                "'{}' has invalid frame rate {}",
                self.name, self.fps
            )));
        }

        for (index, track) in self.tracks.iter().enumerate() {
            if track.bone != index {
                return Err(RigError::InvalidAnimation(format!(
                    "'{}': track {index} drives bone {}",
                    self.name, track.bone
                )));
            }
            let channels = [
                ("position", &track.position, 3),
                ("rotation", &track.rotation, 4),
                ("scale", &track.scale, 3),
            ];
            for (channel, curve, width) in channels {
                if let Some(curve) = curve
                    && curve.len() != self.frame_count * width
                {
                    return Err(RigError::InvalidAnimation(format!(
                        "'{}': {channel} curve of bone {index} has {} values, expected {}",
                        self.name,
                        curve.len(),
                        self.frame_count * width
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check that the animation has exactly one track per bone of `skeleton`
    pub fn validate(&self, skeleton: &Skeleton) -> Result<()> {
        if self.tracks.len() != skeleton.bone_count() {
            return Err(RigError::InvalidAnimation(format!(
                "'{}' has {} tracks for {} bones",
                self.name,
                self.tracks.len(),
                skeleton.bone_count()
            )));
        }
        self.validate_curves()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let animation = Animation::still("idle", 30.0, 60, 1).unwrap();
        assert!((animation.duration() - 2.0).abs() < 1e-6);
        assert!(!animation.tracks[0].is_animated());
    }

    #[test]
    fn test_rejects_zero_frames() {
        assert!(matches!(
            Animation::still("empty", 30.0, 0, 1),
            Err(RigError::InvalidAnimation(_))
        ));
    }

    #[test]
    fn test_rejects_short_curve() {
        let track = AnimationTrack {
            bone: 0,
            rotation: Some(vec![0.0, 0.0, 0.0, 1.0]),
            ..Default::default()
        };
        assert!(Animation::new("walk", 24.0, 2, vec![track]).is_err());
    }

    #[test]
    fn test_rejects_misaligned_track() {
        let tracks = vec![AnimationTrack::bind_pose(1)];
        assert!(Animation::new("walk", 24.0, 2, tracks).is_err());
    }
}
