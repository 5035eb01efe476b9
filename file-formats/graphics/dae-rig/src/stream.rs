//! Flat-buffer vector, quaternion and matrix operations
//!
//! Every function reads from and writes to sub-ranges of caller-owned `f32`
//! slices, addressed by an element offset. Nothing here allocates.
//!
//! Conventions:
//! - vectors are 3 floats `[x, y, z]`
//! - quaternions are 4 floats `[x, y, z, w]`
//! - matrices are 16 floats in column-major order (like OpenGL/WebGL)

/// Threshold below which slerp falls back to linear coefficients
pub const SLERP_EPSILON: f32 = 1e-6;

/// Column-major 4x4 identity
pub const MAT4_IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, // Column 0
    0.0, 1.0, 0.0, 0.0, // Column 1
    0.0, 0.0, 1.0, 0.0, // Column 2
    0.0, 0.0, 0.0, 1.0, // Column 3
];

/// Copy 3 floats
#[inline]
pub fn vec3_copy(out: &mut [f32], out_off: usize, a: &[f32], a_off: usize) {
    out[out_off..out_off + 3].copy_from_slice(&a[a_off..a_off + 3]);
}

/// Copy 4 floats
#[inline]
pub fn quat_copy(out: &mut [f32], out_off: usize, a: &[f32], a_off: usize) {
    out[out_off..out_off + 4].copy_from_slice(&a[a_off..a_off + 4]);
}

/// Componentwise `(1 - t) * a + t * b`
///
/// `t` is not clamped.
#[inline]
pub fn vec3_lerp(
    out: &mut [f32],
    out_off: usize,
    a: &[f32],
    a_off: usize,
    b: &[f32],
    b_off: usize,
    t: f32,
) {
    let s = 1.0 - t;
    for i in 0..3 {
        out[out_off + i] = s * a[a_off + i] + t * b[b_off + i];
    }
}

/// Spherical linear interpolation between two quaternions
///
/// Takes the shorter arc by negating `b` when the quaternions point into
/// opposite hemispheres. Nearly parallel inputs blend the coefficients
/// linearly instead of dividing by a vanishing sine.
pub fn quat_slerp(
    out: &mut [f32],
    out_off: usize,
    a: &[f32],
    a_off: usize,
    b: &[f32],
    b_off: usize,
    t: f32,
) {
    let ax = a[a_off];
    let ay = a[a_off + 1];
    let az = a[a_off + 2];
    let aw = a[a_off + 3];
    let mut bx = b[b_off];
    let mut by = b[b_off + 1];
    let mut bz = b[b_off + 2];
    let mut bw = b[b_off + 3];

    let mut cosom = ax * bx + ay * by + az * bz + aw * bw;
    if cosom < 0.0 {
        cosom = -cosom;
        bx = -bx;
        by = -by;
        bz = -bz;
        bw = -bw;
    }

    let (scale0, scale1) = if 1.0 - cosom > SLERP_EPSILON {
        let omega = cosom.acos();
        let sinom = omega.sin();
        (
            ((1.0 - t) * omega).sin() / sinom,
            (t * omega).sin() / sinom,
        )
    } else {
        (1.0 - t, t)
    };

    out[out_off] = scale0 * ax + scale1 * bx;
    out[out_off + 1] = scale0 * ay + scale1 * by;
    out[out_off + 2] = scale0 * az + scale1 * bz;
    out[out_off + 3] = scale0 * aw + scale1 * bw;
}

/// Normalize a quaternion in place; a zero quaternion becomes the identity
pub fn quat_normalize(q: &mut [f32], off: usize) {
    let len = (q[off] * q[off]
        + q[off + 1] * q[off + 1]
        + q[off + 2] * q[off + 2]
        + q[off + 3] * q[off + 3])
        .sqrt();
    if len > 0.0 {
        let inv = 1.0 / len;
        for c in &mut q[off..off + 4] {
            *c *= inv;
        }
    } else {
        q[off..off + 4].copy_from_slice(&[0.0, 0.0, 0.0, 1.0]);
    }
}

/// Write the identity matrix
#[inline]
pub fn mat4_identity(out: &mut [f32], out_off: usize) {
    out[out_off..out_off + 16].copy_from_slice(&MAT4_IDENTITY);
}

/// Build an affine matrix from translation, rotation and non-uniform scale
///
/// Equivalent to `T * R * S`.
#[allow(clippy::too_many_arguments)]
pub fn mat_compose(
    out: &mut [f32],
    out_off: usize,
    pos: &[f32],
    pos_off: usize,
    rot: &[f32],
    rot_off: usize,
    scl: &[f32],
    scl_off: usize,
) {
    let x = rot[rot_off];
    let y = rot[rot_off + 1];
    let z = rot[rot_off + 2];
    let w = rot[rot_off + 3];

    let x2 = x + x;
    let y2 = y + y;
    let z2 = z + z;

    let xx = x * x2;
    let xy = x * y2;
    let xz = x * z2;
    let yy = y * y2;
    let yz = y * z2;
    let zz = z * z2;
    let wx = w * x2;
    let wy = w * y2;
    let wz = w * z2;

    let sx = scl[scl_off];
    let sy = scl[scl_off + 1];
    let sz = scl[scl_off + 2];

    let m = &mut out[out_off..out_off + 16];
    m[0] = (1.0 - (yy + zz)) * sx;
    m[1] = (xy + wz) * sx;
    m[2] = (xz - wy) * sx;
    m[3] = 0.0;
    m[4] = (xy - wz) * sy;
    m[5] = (1.0 - (xx + zz)) * sy;
    m[6] = (yz + wx) * sy;
    m[7] = 0.0;
    m[8] = (xz + wy) * sz;
    m[9] = (yz - wx) * sz;
    m[10] = (1.0 - (xx + yy)) * sz;
    m[11] = 0.0;
    m[12] = pos[pos_off];
    m[13] = pos[pos_off + 1];
    m[14] = pos[pos_off + 2];
    m[15] = 1.0;
}

/// Product of two column-major matrices, `a * b` (applies `b` first)
fn mat4_product(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut r = [0.0f32; 16];
    for col in 0..4 {
        let b0 = b[col * 4];
        let b1 = b[col * 4 + 1];
        let b2 = b[col * 4 + 2];
        let b3 = b[col * 4 + 3];
        for row in 0..4 {
            r[col * 4 + row] = b0 * a[row] + b1 * a[4 + row] + b2 * a[8 + row] + b3 * a[12 + row];
        }
    }
    r
}

fn load_mat4(src: &[f32], off: usize) -> [f32; 16] {
    let mut m = [0.0f32; 16];
    m.copy_from_slice(&src[off..off + 16]);
    m
}

/// `out = a * b` for column-major matrices
///
/// Both operands are read completely before `out` is written.
pub fn mat4_multiply(
    out: &mut [f32],
    out_off: usize,
    a: &[f32],
    a_off: usize,
    b: &[f32],
    b_off: usize,
) {
    let r = mat4_product(&load_mat4(a, a_off), &load_mat4(b, b_off));
    out[out_off..out_off + 16].copy_from_slice(&r);
}

/// `buf[out_off] = buf[a_off] * b[b_off]`
///
/// Variant of [`mat4_multiply`] for when the left operand lives in the output
/// buffer, possibly at the output offset itself.
pub fn mat4_multiply_within(
    buf: &mut [f32],
    out_off: usize,
    a_off: usize,
    b: &[f32],
    b_off: usize,
) {
    let r = mat4_product(&load_mat4(buf, a_off), &load_mat4(b, b_off));
    buf[out_off..out_off + 16].copy_from_slice(&r);
}

/// Transform a point by a column-major matrix
pub fn mat4_transform_point(m: &[f32], m_off: usize, p: [f32; 3]) -> [f32; 3] {
    let m = &m[m_off..m_off + 16];
    [
        m[0] * p[0] + m[4] * p[1] + m[8] * p[2] + m[12],
        m[1] * p[0] + m[5] * p[1] + m[9] * p[2] + m[13],
        m[2] * p[0] + m[6] * p[1] + m[10] * p[2] + m[14],
    ]
}
