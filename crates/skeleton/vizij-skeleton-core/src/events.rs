//! Tagged pose events and the control-address table that produces them.
//!
//! The network layer hands over `(address, flat f32 payload)` pairs. `decode`
//! turns those into a [`PoseEvent`] with capture axes and quaternion order
//! already normalized to the rig convention; [`dispatch`] routes an event to
//! the engine through one exhaustive match.

use std::str::FromStr;

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{CaptureAxes, EngineConfig, QuatOrder};
use crate::engine::SkeletonEngine;
use crate::error::{Result, SkeletonError};
use crate::ingest::UpdateOutcome;

/// One inbound pose update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PoseEvent {
    SetUpdateSmoothing(f32),
    SetRootPosition(Vector3<f32>),
    SetJointPositions(Vec<Vector3<f32>>),
    /// Quaternions in `(w, x, y, z)` storage.
    SetJointRotations(Vec<Quaternion<f32>>),
}

impl PoseEvent {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetUpdateSmoothing(_) => "setUpdateSmoothing",
            Self::SetRootPosition(_) => "setRootPosition",
            Self::SetJointPositions(_) => "setJointPositions",
            Self::SetJointRotations(_) => "setJointRotations",
        }
    }

    /// Build an event from a control address and its flat float payload.
    pub fn decode(address: &str, payload: &[f32], config: &EngineConfig) -> Result<Self> {
        let target: ControlAddress = address.parse()?;
        let axes = config.capture_axes;
        match target {
            ControlAddress::UpdateSmoothing => match payload {
                [f] => Ok(Self::SetUpdateSmoothing(*f)),
                _ => Err(malformed(address, payload.len(), "1")),
            },
            ControlAddress::RootPosition => match payload {
                [x, y, z] => Ok(Self::SetRootPosition(remap_position(
                    Vector3::new(*x, *y, *z),
                    axes,
                ))),
                _ => Err(malformed(address, payload.len(), "3")),
            },
            ControlAddress::JointPositions => {
                if payload.len() % 3 != 0 {
                    return Err(malformed(address, payload.len(), "a multiple of 3"));
                }
                Ok(Self::SetJointPositions(
                    payload
                        .chunks_exact(3)
                        .map(|c| remap_position(Vector3::new(c[0], c[1], c[2]), axes))
                        .collect(),
                ))
            }
            ControlAddress::JointRotations => {
                if payload.len() % 4 != 0 {
                    return Err(malformed(address, payload.len(), "a multiple of 4"));
                }
                Ok(Self::SetJointRotations(
                    payload
                        .chunks_exact(4)
                        .map(|c| remap_rotation(read_quat(c, config.quat_order), axes))
                        .collect(),
                ))
            }
        }
    }
}

fn malformed(address: &str, len: usize, expected: &str) -> SkeletonError {
    SkeletonError::MalformedPayload {
        address: address.to_string(),
        len,
        expected: expected.to_string(),
    }
}

fn read_quat(c: &[f32], order: QuatOrder) -> Quaternion<f32> {
    match order {
        QuatOrder::Wxyz => Quaternion::new(c[0], c[1], c[2], c[3]),
        QuatOrder::Xyzw => Quaternion::new(c[3], c[0], c[1], c[2]),
    }
}

/// Map a capture-space position onto rig axes.
pub fn remap_position(p: Vector3<f32>, axes: CaptureAxes) -> Vector3<f32> {
    match axes {
        CaptureAxes::Identity => p,
        CaptureAxes::SwapXY => Vector3::new(p.y, p.x, p.z),
    }
}

/// Map a capture-space rotation onto rig axes.
pub fn remap_rotation(q: Quaternion<f32>, axes: CaptureAxes) -> Quaternion<f32> {
    match axes {
        CaptureAxes::Identity => q,
        CaptureAxes::SwapXY => Quaternion::new(q.w, q.j, q.i, q.k),
    }
}

/// Control-channel addresses that carry pose data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlAddress {
    UpdateSmoothing,
    RootPosition,
    JointPositions,
    JointRotations,
}

impl ControlAddress {
    /// Every accepted address string with its target.
    pub const ROUTES: [(&'static str, ControlAddress); 6] = [
        ("/mocap/updatesmoothing", ControlAddress::UpdateSmoothing),
        ("/mocap/skelposworld", ControlAddress::RootPosition),
        ("/mocap/joint/pos_world", ControlAddress::JointPositions),
        ("/mocap/0/joint/pos_world", ControlAddress::JointPositions),
        ("/mocap/joint/rot_world", ControlAddress::JointRotations),
        ("/mocap/0/joint/rot_world", ControlAddress::JointRotations),
    ];
}

impl FromStr for ControlAddress {
    type Err = SkeletonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ROUTES
            .iter()
            .find(|(address, _)| *address == s)
            .map(|(_, target)| *target)
            .ok_or_else(|| SkeletonError::UnknownAddress {
                address: s.to_string(),
            })
    }
}

/// Apply one event to the engine.
///
/// Smoothing changes never publish; they report the generation currently visible.
pub fn dispatch(engine: &SkeletonEngine, event: PoseEvent) -> UpdateOutcome {
    trace!(kind = event.kind(), "dispatch pose event");
    match event {
        PoseEvent::SetUpdateSmoothing(f) => {
            engine.set_update_smoothing(f);
            UpdateOutcome::Applied {
                generation: engine.generation(),
            }
        }
        PoseEvent::SetRootPosition(p) => engine.set_root_position(p),
        PoseEvent::SetJointPositions(p) => engine.set_joint_positions(&p),
        PoseEvent::SetJointRotations(q) => engine.set_joint_rotations(&q),
    }
}
