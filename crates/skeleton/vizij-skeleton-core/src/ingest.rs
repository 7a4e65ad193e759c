//! Validation of raw pose updates against a rig.
//!
//! Raw capture arrays are gathered through `jointFilter`, checked for shape and
//! finiteness, and (for rotations) corrected. Nothing here touches
//! [`crate::pose::PoseState`]; a rejected update is reported as an
//! [`IgnoreReason`] before any state is written.

use std::fmt;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::math::{quat_is_finite, vec3_is_finite};
use crate::rig::RigDefinition;

/// Result of handing one pose update to the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// State changed and a snapshot with this generation was published.
    Applied { generation: u64 },
    /// Nothing changed.
    Ignored(IgnoreReason),
}

impl UpdateOutcome {
    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    #[inline]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }

    /// Published generation, when the update was applied.
    #[inline]
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Applied { generation } => Some(*generation),
            Self::Ignored(_) => None,
        }
    }
}

/// Why an update was dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Raw array length differs from the rig's capture joint count.
    ShapeMismatch { expected: usize, actual: usize },
    /// A filter entry points past the end of the raw array.
    FilterOutOfRange { index: usize, len: usize },
    /// A used component was NaN or infinite.
    NonFinite,
    /// The corrected rotation for this rig joint has zero length.
    DegenerateRotation { joint: usize },
    /// Smoothing factor is 1; incoming poses are ignored.
    Frozen,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "expected {expected} capture joints, got {actual}")
            }
            Self::FilterOutOfRange { index, len } => {
                write!(f, "filter index {index} is outside a payload of {len} joints")
            }
            Self::NonFinite => f.write_str("payload contains non-finite values"),
            Self::DegenerateRotation { joint } => {
                write!(f, "rotation for joint {joint} has zero length")
            }
            Self::Frozen => f.write_str("smoothing factor is 1"),
        }
    }
}

/// Pick the rig's joints out of a raw capture array, in rig order.
pub fn gather<T: Copy>(rig: &RigDefinition, raw: &[T]) -> Result<Vec<T>, IgnoreReason> {
    if let Some(expected) = rig.capture_joint_count() {
        if raw.len() != expected {
            return Err(IgnoreReason::ShapeMismatch {
                expected,
                actual: raw.len(),
            });
        }
    }
    rig.joint_filter()
        .iter()
        .map(|&index| {
            raw.get(index).copied().ok_or(IgnoreReason::FilterOutOfRange {
                index,
                len: raw.len(),
            })
        })
        .collect()
}

/// Filtered joint positions ready for blending.
pub fn filter_positions(
    rig: &RigDefinition,
    raw: &[Vector3<f32>],
) -> Result<Vec<Vector3<f32>>, IgnoreReason> {
    let positions = gather(rig, raw)?;
    if !positions.iter().all(vec3_is_finite) {
        return Err(IgnoreReason::NonFinite);
    }
    Ok(positions)
}

/// Filtered rotations with each joint's correction applied on the left, normalized.
pub fn filter_rotations(
    rig: &RigDefinition,
    raw: &[Quaternion<f32>],
    eps: f32,
) -> Result<Vec<UnitQuaternion<f32>>, IgnoreReason> {
    let rotations = gather(rig, raw)?;
    if !rotations.iter().all(quat_is_finite) {
        return Err(IgnoreReason::NonFinite);
    }
    rotations
        .iter()
        .enumerate()
        .map(|(joint, q)| {
            let corrected = rig.joint_correction(joint).quaternion() * q;
            UnitQuaternion::try_new(corrected, eps)
                .ok_or(IgnoreReason::DegenerateRotation { joint })
        })
        .collect()
}
