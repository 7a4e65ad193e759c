//! Vizij Skeleton Core (engine-agnostic)
//!
//! Real-time skeletal pose engine:
//! - `rig`: validated joint filter, parent→children tree and corrective rotations
//! - `pose` + `ingest`: smoothed pose state and validation of raw capture updates
//! - `derive`: pure per-joint / per-edge world matrices and bone lengths
//! - `snapshot`: double-buffered publication for independently scheduled readers
//! - `events` + `worker`: tagged control events and a background ingest thread
//!
//! The crate owns no rendering resources; consumers poll
//! [`SkeletonEngine::snapshot`] and upload the matrices themselves.

pub mod config;
pub mod derive;
pub mod engine;
pub mod error;
pub mod events;
pub mod ingest;
pub mod math;
pub mod pose;
pub mod rig;
pub mod snapshot;
pub mod worker;

// Re-exports for consumers (renderers, network adapters)
pub use config::{CaptureAxes, EngineConfig, QuatOrder};
pub use derive::DerivedTransforms;
pub use engine::SkeletonEngine;
pub use error::{Result, SkeletonError};
pub use events::{dispatch, ControlAddress, PoseEvent};
pub use ingest::{IgnoreReason, UpdateOutcome};
pub use pose::PoseState;
pub use rig::{
    Edge, EdgeCorrectionSpec, JointCorrectionSpec, RigConfig, RigDefinition, RotationSpec,
};
pub use snapshot::{Snapshot, SnapshotPublisher};
pub use worker::{IngestHandle, IngestStats, IngestWorker};
