//! Feed a synthetic capture stream into the body rig and poll snapshots on a
//! 10 ms render tick.
//!
//! `RUST_LOG=debug cargo run -p vizij-skeleton-core --example stream_replay [rig.json]`

use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;
use vizij_skeleton_core::{
    EngineConfig, IngestWorker, RigConfig, RigDefinition, SkeletonEngine, SkeletonError,
};

const CAPTURE_JOINTS: usize = 32;
const FRAMES: usize = 240;

fn capture_frame(frame: usize) -> (Vec<f32>, Vec<f32>) {
    let phase = frame as f32 / 60.0 * TAU;
    let mut positions = Vec::with_capacity(CAPTURE_JOINTS * 3);
    let mut rotations = Vec::with_capacity(CAPTURE_JOINTS * 4);
    for j in 0..CAPTURE_JOINTS {
        let sway = (phase + j as f32 * 0.2).sin() * 0.05;
        positions.extend_from_slice(&[sway, j as f32 * 0.1, 0.0]);
        let half = 0.5 * sway;
        rotations.extend_from_slice(&[half.cos(), 0.0, 0.0, half.sin()]);
    }
    (positions, rotations)
}

fn main() -> Result<(), SkeletonError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rig = match std::env::args().nth(1) {
        Some(path) => RigDefinition::from_path(path)?,
        None => RigDefinition::from_config(&RigConfig::mocap_body())?,
    };
    let engine = Arc::new(SkeletonEngine::new(
        rig,
        EngineConfig {
            initial_smoothing: 0.6,
            ..EngineConfig::default()
        },
    ));
    let worker = IngestWorker::spawn_default(Arc::clone(&engine))?;
    let handle = worker.handle();

    let producer = thread::spawn(move || -> Result<(), SkeletonError> {
        for frame in 0..FRAMES {
            let (positions, rotations) = capture_frame(frame);
            handle.send_control("/mocap/0/joint/pos_world", &positions)?;
            handle.send_control("/mocap/0/joint/rot_world", &rotations)?;
            thread::sleep(Duration::from_millis(4));
        }
        Ok(())
    });

    let started = Instant::now();
    let mut last = 0;
    while !producer.is_finished() {
        let snap = engine.snapshot();
        if snap.generation() != last {
            last = snap.generation();
            let total: f32 = snap.edge_lengths().iter().sum();
            info!(
                generation = last,
                joints = snap.joint_count(),
                edges = snap.edge_count(),
                bone_total = total,
                upload_floats = snap.joint_matrices_flat().len() + snap.edge_matrices_flat().len(),
                "frame"
            );
        }
        thread::sleep(Duration::from_millis(10));
    }

    let produced = producer
        .join()
        .unwrap_or(Err(SkeletonError::WorkerStopped));
    let stats = worker.shutdown();
    info!(
        applied = stats.applied,
        ignored = stats.ignored,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "replay finished"
    );
    produced
}
