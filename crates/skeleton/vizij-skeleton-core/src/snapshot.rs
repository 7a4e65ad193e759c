//! Double-buffered publication of derived transforms.
//!
//! The writer builds a complete [`Snapshot`] off to the side and swaps the
//! published `Arc` under a write lock held only for the pointer store. Readers
//! clone the `Arc` under a short read lock and then read an immutable value, so
//! a reader sees either the previous or the next snapshot, never a mix.

use std::sync::Arc;

use nalgebra::Matrix4;
use parking_lot::RwLock;

use crate::derive::DerivedTransforms;
use crate::rig::{Edge, RigDefinition};

/// One immutable, fully derived pose.
#[derive(Clone, Debug)]
pub struct Snapshot {
    generation: u64,
    rig: Arc<RigDefinition>,
    root_transform: Matrix4<f32>,
    transforms: DerivedTransforms,
}

impl Snapshot {
    pub fn new(
        generation: u64,
        rig: Arc<RigDefinition>,
        root_transform: Matrix4<f32>,
        transforms: DerivedTransforms,
    ) -> Self {
        Self {
            generation,
            rig,
            root_transform,
            transforms,
        }
    }

    /// Count of accepted updates that produced this snapshot; 0 is the rest pose.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn root_transform(&self) -> &Matrix4<f32> {
        &self.root_transform
    }

    #[inline]
    pub fn transforms(&self) -> &DerivedTransforms {
        &self.transforms
    }

    #[inline]
    pub fn joint_transforms(&self) -> &[Matrix4<f32>] {
        &self.transforms.joint_world
    }

    #[inline]
    pub fn edge_transforms(&self) -> &[Matrix4<f32>] {
        &self.transforms.edge_world
    }

    #[inline]
    pub fn edge_lengths(&self) -> &[f32] {
        &self.transforms.edge_length
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.transforms.joint_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.transforms.edge_count()
    }

    /// `(parent, child)` for each edge id.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        self.rig.edges()
    }

    /// Joint matrices packed back to back, column-major, ready for upload.
    pub fn joint_matrices_flat(&self) -> Vec<f32> {
        flatten(&self.transforms.joint_world)
    }

    /// Edge matrices packed back to back, column-major, ready for upload.
    pub fn edge_matrices_flat(&self) -> Vec<f32> {
        flatten(&self.transforms.edge_world)
    }
}

fn flatten(matrices: &[Matrix4<f32>]) -> Vec<f32> {
    let mut out = Vec::with_capacity(matrices.len() * 16);
    for m in matrices {
        out.extend_from_slice(m.as_slice());
    }
    out
}

/// Holds the currently visible snapshot.
#[derive(Debug)]
pub struct SnapshotPublisher {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Replace the visible snapshot in one step.
    pub fn publish(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        // Drop the old snapshot outside the lock.
        drop(previous);
    }

    /// Latest complete snapshot. Never blocks on derivation work.
    #[inline]
    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }
}
