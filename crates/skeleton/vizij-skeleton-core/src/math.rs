//! Small fixed-size math helpers used by the pose pipeline.
//! - static-axes XYZ Euler → quaternion
//! - quaternion slerp with a linear fallback near sinθ = 0
//! - position smoothing
//! - translation/rotation matrix composition (column-major, column vectors)

use nalgebra::{Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3};
use std::f32::consts::FRAC_PI_2;

/// Default threshold below which slerp falls back to a normalized linear blend.
pub const SLERP_EPSILON: f32 = 1e-6;

/// Build a rotation from static-axes XYZ Euler angles (radians).
///
/// Equivalent to `Rz(z) * Ry(y) * Rx(x)`.
#[inline]
pub fn quat_from_euler_xyz(angles: [f32; 3]) -> UnitQuaternion<f32> {
    UnitQuaternion::from_euler_angles(angles[0], angles[1], angles[2])
}

/// Fixed +90° rotation about Y aligning capture "up" with the internal rig's
/// primitive axis. Shared by every joint and edge.
#[inline]
pub fn axis_realignment() -> UnitQuaternion<f32> {
    quat_from_euler_xyz([0.0, FRAC_PI_2, 0.0])
}

/// Spherical interpolation from `q0` (t = 0) to `q1` (t = 1).
///
/// No shortest-arc flip is applied. When `sinθ < eps` the two inputs are nearly
/// identical or antipodal and the blend degrades to `normalize((1-t)·q0 + t·q1)`.
/// If that linear blend collapses (antipodal inputs at t ≈ 0.5) the nearer
/// endpoint is returned, which encodes the same rotation.
pub fn slerp(
    q0: &UnitQuaternion<f32>,
    q1: &UnitQuaternion<f32>,
    t: f32,
    eps: f32,
) -> UnitQuaternion<f32> {
    let a: Quaternion<f32> = *q0.quaternion();
    let b: Quaternion<f32> = *q1.quaternion();

    let cos_theta = a.dot(&b).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();
    let sin_theta = theta.sin();

    let blended = if sin_theta < eps {
        a * (1.0 - t) + b * t
    } else {
        let wa = ((1.0 - t) * theta).sin() / sin_theta;
        let wb = (t * theta).sin() / sin_theta;
        a * wa + b * wb
    };

    // Per-quaternion renormalization keeps the unit invariant joint by joint.
    match UnitQuaternion::try_new(blended, eps) {
        Some(q) => q,
        None if t < 0.5 => *q0,
        None => *q1,
    }
}

/// `smoothed * factor + incoming * (1 - factor)`.
#[inline]
pub fn smooth_vec3(
    smoothed: &Vector3<f32>,
    incoming: &Vector3<f32>,
    factor: f32,
) -> Vector3<f32> {
    smoothed * factor + incoming * (1.0 - factor)
}

/// Homogeneous translation matrix.
#[inline]
pub fn translation_matrix(position: &Vector3<f32>) -> Matrix4<f32> {
    Translation3::from(*position).to_homogeneous()
}

/// `T(position) * R(rotation)`: rotate in the local frame, then place.
#[inline]
pub fn placement_matrix(
    position: &Vector3<f32>,
    rotation: &UnitQuaternion<f32>,
) -> Matrix4<f32> {
    translation_matrix(position) * rotation.to_homogeneous()
}

#[inline]
pub fn vec3_is_finite(v: &Vector3<f32>) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[inline]
pub fn quat_is_finite(q: &Quaternion<f32>) -> bool {
    q.coords.iter().all(|c| c.is_finite())
}
