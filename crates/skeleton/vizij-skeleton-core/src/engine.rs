//! The skeleton engine: ingest → blend → derive → publish.
//!
//! One writer lock guards the smoothed pose for the whole
//! blend+derive+publish step, so updates are applied one at a time in arrival
//! order. Readers go through [`SnapshotPublisher::latest`] and never take the
//! writer lock.

use std::sync::Arc;

use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::derive::DerivedTransforms;
use crate::ingest::{filter_positions, filter_rotations, IgnoreReason, UpdateOutcome};
use crate::math::vec3_is_finite;
use crate::pose::PoseState;
use crate::rig::RigDefinition;
use crate::snapshot::{Snapshot, SnapshotPublisher};

#[derive(Debug)]
struct Writer {
    pose: PoseState,
    generation: u64,
}

/// Owns the pose state of one rig and publishes its derived transforms.
///
/// `SkeletonEngine` is `Send + Sync`; share it behind an `Arc` between the
/// update context and any number of readers.
#[derive(Debug)]
pub struct SkeletonEngine {
    rig: Arc<RigDefinition>,
    config: EngineConfig,
    writer: Mutex<Writer>,
    publisher: SnapshotPublisher,
}

impl SkeletonEngine {
    /// Start from the rest pose and publish it as generation 0.
    pub fn new(rig: impl Into<Arc<RigDefinition>>, config: EngineConfig) -> Self {
        let rig = rig.into();
        let pose = PoseState::new(rig.joint_count(), config.initial_smoothing);
        let initial = Snapshot::new(
            0,
            Arc::clone(&rig),
            *pose.root_transform(),
            DerivedTransforms::derive(&rig, &pose),
        );
        Self {
            rig,
            config,
            writer: Mutex::new(Writer {
                pose,
                generation: 0,
            }),
            publisher: SnapshotPublisher::new(initial),
        }
    }

    #[inline]
    pub fn rig(&self) -> &Arc<RigDefinition> {
        &self.rig
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---------- updates ----------

    /// Set the smoothing factor, clamped to `[0, 1]`. NaN keeps the current
    /// factor. Returns the factor now in effect.
    pub fn set_update_smoothing(&self, factor: f32) -> f32 {
        let mut w = self.writer.lock();
        if factor.is_nan() {
            warn!(
                current = w.pose.smoothing(),
                "NaN smoothing factor ignored"
            );
        }
        let stored = w.pose.set_smoothing(factor);
        debug!(requested = factor, stored, "smoothing factor updated");
        stored
    }

    /// Replace the root placement. Not smoothed and not subject to freezing.
    pub fn set_root_position(&self, position: Vector3<f32>) -> UpdateOutcome {
        if !vec3_is_finite(&position) {
            return self.ignored("root_position", IgnoreReason::NonFinite);
        }
        let mut w = self.writer.lock();
        w.pose.set_root_position(position);
        self.publish_locked(&mut w, "root_position")
    }

    /// Filter and blend a raw capture array of joint positions.
    pub fn set_joint_positions(&self, raw: &[Vector3<f32>]) -> UpdateOutcome {
        let incoming = match filter_positions(&self.rig, raw) {
            Ok(p) => p,
            Err(reason) => return self.ignored("joint_positions", reason),
        };
        let mut w = self.writer.lock();
        if w.pose.is_frozen() {
            drop(w);
            return self.ignored("joint_positions", IgnoreReason::Frozen);
        }
        w.pose.blend_positions(&incoming);
        self.publish_locked(&mut w, "joint_positions")
    }

    /// Filter, correct and slerp a raw capture array of joint rotations.
    ///
    /// Raw quaternions need not be unit length; each is normalized after its
    /// correction is applied.
    pub fn set_joint_rotations(&self, raw: &[Quaternion<f32>]) -> UpdateOutcome {
        let eps = self.config.slerp_epsilon;
        let incoming = match filter_rotations(&self.rig, raw, eps) {
            Ok(q) => q,
            Err(reason) => return self.ignored("joint_rotations", reason),
        };
        let mut w = self.writer.lock();
        if w.pose.is_frozen() {
            drop(w);
            return self.ignored("joint_rotations", IgnoreReason::Frozen);
        }
        w.pose.blend_rotations(&incoming, eps);
        self.publish_locked(&mut w, "joint_rotations")
    }

    fn publish_locked(&self, w: &mut Writer, kind: &'static str) -> UpdateOutcome {
        let transforms = DerivedTransforms::derive(&self.rig, &w.pose);
        w.generation += 1;
        let generation = w.generation;
        self.publisher.publish(Snapshot::new(
            generation,
            Arc::clone(&self.rig),
            *w.pose.root_transform(),
            transforms,
        ));
        debug!(generation, kind, "snapshot published");
        UpdateOutcome::Applied { generation }
    }

    fn ignored(&self, kind: &'static str, reason: IgnoreReason) -> UpdateOutcome {
        warn!(rig = %self.rig.name(), kind, %reason, "pose update ignored");
        UpdateOutcome::Ignored(reason)
    }

    // ---------- reads ----------

    /// Latest complete snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.publisher.latest()
    }

    pub fn get_joint_transforms(&self) -> Vec<Matrix4<f32>> {
        self.snapshot().joint_transforms().to_vec()
    }

    pub fn get_edge_transforms(&self) -> Vec<Matrix4<f32>> {
        self.snapshot().edge_transforms().to_vec()
    }

    pub fn get_edge_lengths(&self) -> Vec<f32> {
        self.snapshot().edge_lengths().to_vec()
    }

    #[inline]
    pub fn get_joint_count(&self) -> usize {
        self.rig.joint_count()
    }

    #[inline]
    pub fn get_edge_count(&self) -> usize {
        self.rig.edge_count()
    }

    /// Copy of the smoothed joint positions, in rig order.
    pub fn joint_positions(&self) -> Vec<Vector3<f32>> {
        self.writer.lock().pose.positions().to_vec()
    }

    /// Copy of the smoothed joint rotations, in rig order.
    pub fn joint_rotations(&self) -> Vec<UnitQuaternion<f32>> {
        self.writer.lock().pose.rotations().to_vec()
    }

    pub fn smoothing(&self) -> f32 {
        self.writer.lock().pose.smoothing()
    }

    pub fn root_transform(&self) -> Matrix4<f32> {
        *self.writer.lock().pose.root_transform()
    }

    pub fn root_inverse(&self) -> Matrix4<f32> {
        *self.writer.lock().pose.root_inverse()
    }

    /// Full copy of the pose state.
    pub fn pose(&self) -> PoseState {
        self.writer.lock().pose.clone()
    }

    /// Generation of the most recently published snapshot.
    pub fn generation(&self) -> u64 {
        self.writer.lock().generation
    }
}
