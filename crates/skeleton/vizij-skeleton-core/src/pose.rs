//! Smoothed joint pose plus root placement.
//!
//! `PoseState` has a single owner (the engine's writer lock). Blend methods
//! expect inputs already filtered to rig order and validated by
//! [`crate::ingest`]; they never reject.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

use crate::math::{slerp, smooth_vec3, translation_matrix};

#[derive(Clone, Debug, PartialEq)]
pub struct PoseState {
    root_position: Vector3<f32>,
    root_transform: Matrix4<f32>,
    root_inverse: Matrix4<f32>,
    positions: Vec<Vector3<f32>>,
    rotations: Vec<UnitQuaternion<f32>>,
    smoothing: f32,
}

impl PoseState {
    /// Rest pose: every joint at the origin with identity rotation, root at the origin.
    pub fn new(joint_count: usize, smoothing: f32) -> Self {
        Self {
            root_position: Vector3::zeros(),
            root_transform: Matrix4::identity(),
            root_inverse: Matrix4::identity(),
            positions: vec![Vector3::zeros(); joint_count],
            rotations: vec![UnitQuaternion::identity(); joint_count],
            smoothing: clamp_smoothing(smoothing, 0.0),
        }
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Clamp to `[0, 1]` and store; NaN keeps the current factor. Returns the stored value.
    pub fn set_smoothing(&mut self, factor: f32) -> f32 {
        self.smoothing = clamp_smoothing(factor, self.smoothing);
        self.smoothing
    }

    /// A factor of exactly 1 freezes the pose.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.smoothing >= 1.0
    }

    /// Replace the root placement. Not smoothed.
    pub fn set_root_position(&mut self, position: Vector3<f32>) {
        self.root_position = position;
        self.root_transform = translation_matrix(&position);
        self.root_inverse = translation_matrix(&-position);
    }

    #[inline]
    pub fn root_position(&self) -> &Vector3<f32> {
        &self.root_position
    }

    #[inline]
    pub fn root_transform(&self) -> &Matrix4<f32> {
        &self.root_transform
    }

    #[inline]
    pub fn root_inverse(&self) -> &Matrix4<f32> {
        &self.root_inverse
    }

    #[inline]
    pub fn positions(&self) -> &[Vector3<f32>] {
        &self.positions
    }

    #[inline]
    pub fn rotations(&self) -> &[UnitQuaternion<f32>] {
        &self.rotations
    }

    /// `smoothed = smoothed * f + incoming * (1 - f)` per joint.
    pub fn blend_positions(&mut self, incoming: &[Vector3<f32>]) {
        debug_assert_eq!(incoming.len(), self.positions.len());
        let f = self.smoothing;
        for (smoothed, target) in self.positions.iter_mut().zip(incoming) {
            *smoothed = smooth_vec3(smoothed, target, f);
        }
    }

    /// Slerp each joint toward `incoming` with weight `1 - f`, renormalizing per joint.
    pub fn blend_rotations(&mut self, incoming: &[UnitQuaternion<f32>], eps: f32) {
        debug_assert_eq!(incoming.len(), self.rotations.len());
        let t = 1.0 - self.smoothing;
        for (smoothed, target) in self.rotations.iter_mut().zip(incoming) {
            *smoothed = slerp(smoothed, target, t, eps);
        }
    }
}

fn clamp_smoothing(factor: f32, fallback: f32) -> f32 {
    if factor.is_nan() {
        fallback
    } else {
        factor.clamp(0.0, 1.0)
    }
}
