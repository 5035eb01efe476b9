//! Blending between two poses

use crate::error::{Result, RigError};
use crate::pose::Pose;
use crate::stream::{quat_slerp, vec3_lerp};

/// Interpolate two poses bone by bone
///
/// Positions and scales are blended linearly, rotations spherically. `t = 0`
/// reproduces `a`, `t = 1` reproduces `b`; `t` is not clamped.
pub fn blend_pose(a: &Pose, b: &Pose, t: f32, out: &mut Pose) -> Result<()> {
    let count = a.bone_count();
    for (what, actual) in [("blend target pose", b.bone_count()), ("blend output pose", out.bone_count())] {
        if actual != count {
            return Err(RigError::LengthMismatch {
                what,
                expected: count,
                actual,
            });
        }
    }

    for bone in 0..count {
        vec3_lerp(&mut out.pos, bone * 3, &a.pos, bone * 3, &b.pos, bone * 3, t);
        quat_slerp(&mut out.rot, bone * 4, &a.rot, bone * 4, &b.rot, bone * 4, t);
        vec3_lerp(&mut out.scl, bone * 3, &a.scl, bone * 3, &b.scl, bone * 3, t);
    }
    Ok(())
}
