//! Sampling animations into poses

use super::types::Animation;
use crate::error::{Result, RigError};
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use crate::stream::{quat_copy, quat_slerp, vec3_copy, vec3_lerp};

fn check_sizes(animation: &Animation, skeleton: &Skeleton, pose: &Pose) -> Result<()> {
    if animation.tracks.len() != skeleton.bone_count() {
        return Err(RigError::LengthMismatch {
            what: "animation tracks",
            expected: skeleton.bone_count(),
            actual: animation.tracks.len(),
        });
    }
    if pose.bone_count() != skeleton.bone_count() {
        return Err(RigError::LengthMismatch {
            what: "pose bones",
            expected: skeleton.bone_count(),
            actual: pose.bone_count(),
        });
    }
    Ok(())
}

/// Sample a looping animation at a fractional frame
///
/// `frame` wraps into `[0, frame_count)`, negative values included, so the
/// last frame interpolates back towards the first one. Every channel of every
/// bone is written: absent channels receive the bone's bind-pose value.
pub fn sample_animation(
    animation: &Animation,
    skeleton: &Skeleton,
    out: &mut Pose,
    frame: f32,
) -> Result<()> {
    check_sizes(animation, skeleton, out)?;

    let count = animation.frame_count;
    let frame = if frame.is_finite() {
        frame.rem_euclid(count as f32)
    } else {
        0.0
    };
    let floor = frame.floor();
    let f1 = (floor as usize) % count;
    let f2 = (frame.ceil() as usize) % count;
    let s = frame - floor;

    write_frames(animation, skeleton, out, f1, f2, s);
    Ok(())
}

/// Sample a non-looping animation; `frame` is clamped to `[0, frame_count - 1]`
pub fn sample_animation_clamped(
    animation: &Animation,
    skeleton: &Skeleton,
    out: &mut Pose,
    frame: f32,
) -> Result<()> {
    check_sizes(animation, skeleton, out)?;

    let last = animation.frame_count - 1;
    let frame = if frame.is_finite() {
        frame.clamp(0.0, last as f32)
    } else {
        0.0
    };
    let floor = frame.floor();
    let f1 = (floor as usize).min(last);
    let f2 = (frame.ceil() as usize).min(last);
    let s = frame - floor;

    write_frames(animation, skeleton, out, f1, f2, s);
    Ok(())
}

fn write_frames(
    animation: &Animation,
    skeleton: &Skeleton,
    out: &mut Pose,
    f1: usize,
    f2: usize,
    s: f32,
) {
    for (b, (bone, track)) in skeleton.bones().iter().zip(&animation.tracks).enumerate() {
        match &track.position {
            Some(curve) => vec3_lerp(&mut out.pos, b * 3, curve, f1 * 3, curve, f2 * 3, s),
            None => vec3_copy(&mut out.pos, b * 3, &bone.bind_position, 0),
        }
        match &track.rotation {
            Some(curve) => quat_slerp(&mut out.rot, b * 4, curve, f1 * 4, curve, f2 * 4, s),
            None => quat_copy(&mut out.rot, b * 4, &bone.bind_rotation, 0),
        }
        match &track.scale {
            Some(curve) => vec3_lerp(&mut out.scl, b * 3, curve, f1 * 3, curve, f2 * 3, s),
            None => vec3_copy(&mut out.scl, b * 3, &bone.bind_scale, 0),
        }
    }
}

/// Write every bone's bind pose into `pose`, resizing it to the skeleton
pub fn reset_pose(skeleton: &Skeleton, pose: &mut Pose) {
    if pose.bone_count() != skeleton.bone_count() {
        pose.resize(skeleton.bone_count());
    }
    for (b, bone) in skeleton.bones().iter().enumerate() {
        vec3_copy(&mut pose.pos, b * 3, &bone.bind_position, 0);
        quat_copy(&mut pose.rot, b * 4, &bone.bind_rotation, 0);
        vec3_copy(&mut pose.scl, b * 3, &bone.bind_scale, 0);
    }
}
