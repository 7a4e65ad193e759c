//! Readers polling snapshots while writers alternate position and rotation
//! updates must always see joint and edge data from one generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nalgebra::{Matrix4, Quaternion, Vector3};
use vizij_skeleton_core::{
    math::quat_from_euler_xyz, EngineConfig, IngestWorker, PoseEvent, RigConfig, RigDefinition,
    SkeletonEngine, Snapshot,
};

const JOINTS: usize = 6;

fn engine() -> Arc<SkeletonEngine> {
    let rig = RigDefinition::from_config(&RigConfig::chain(JOINTS)).expect("chain rig");
    Arc::new(SkeletonEngine::new(rig, EngineConfig::default()))
}

/// Chain positions spaced `step` apart along y.
fn positions(step: f32) -> Vec<Vector3<f32>> {
    (0..JOINTS)
        .map(|j| Vector3::new(0.0, j as f32 * step, 0.0))
        .collect()
}

fn rotations(angle: f32) -> Vec<Quaternion<f32>> {
    vec![*quat_from_euler_xyz([0.0, 0.0, angle]).quaternion(); JOINTS]
}

fn translation(m: &Matrix4<f32>) -> Vector3<f32> {
    m.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Every edge must sit halfway between its joints and match its stored length.
fn assert_self_consistent(snap: &Snapshot) {
    let joints = snap.joint_transforms();
    for (id, edge) in snap.edges().iter().enumerate() {
        let parent = translation(&joints[edge.parent]);
        let child = translation(&joints[edge.child]);
        let mid = translation(&snap.edge_transforms()[id]);
        assert!(
            (mid - (parent + child) * 0.5).norm() < 1e-4,
            "generation {} edge {id} midpoint torn",
            snap.generation()
        );
        assert!(
            ((child - parent).norm() - snap.edge_lengths()[id]).abs() < 1e-4,
            "generation {} edge {id} length torn",
            snap.generation()
        );
        assert_eq!(
            joints[edge.parent].fixed_view::<3, 3>(0, 0),
            snap.edge_transforms()[id].fixed_view::<3, 3>(0, 0),
            "generation {} edge {id} orientation torn",
            snap.generation()
        );
    }
}

#[test]
fn readers_never_observe_mixed_generations() {
    let engine = engine();
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..2)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..300 {
                    let k = (w * 1000 + i) as f32;
                    if i % 2 == 0 {
                        let outcome = engine.set_joint_positions(&positions(1.0 + k * 0.001));
                        assert!(outcome.is_applied());
                    } else {
                        let outcome = engine.set_joint_rotations(&rotations(k * 0.01));
                        assert!(outcome.is_applied());
                    }
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last = 0u64;
                let mut seen = 0usize;
                while !done.load(Ordering::Acquire) {
                    let snap = engine.snapshot();
                    assert!(snap.generation() >= last, "generation went backwards");
                    last = snap.generation();
                    assert_eq!(snap.joint_count(), JOINTS);
                    assert_eq!(snap.edge_count(), JOINTS - 1);
                    assert_self_consistent(&snap);
                    seen += 1;
                }
                seen
            })
        })
        .collect();

    for w in writers {
        w.join().expect("writer panicked");
    }
    done.store(true, Ordering::Release);
    for r in readers {
        assert!(r.join().expect("reader panicked") > 0);
    }

    assert_eq!(engine.snapshot().generation(), 600);
    assert_self_consistent(&engine.snapshot());
}

#[test]
fn renderer_polling_against_ingest_worker() {
    let engine = engine();
    let worker = IngestWorker::spawn(Arc::clone(&engine), 64).expect("spawn worker");
    let handle = worker.handle();

    let render = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let mut frames = 0;
            loop {
                let snap = engine.snapshot();
                assert_self_consistent(&snap);
                frames += 1;
                if snap.generation() >= 200 {
                    return frames;
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    for i in 0..100 {
        handle
            .send(PoseEvent::SetJointPositions(positions(1.0 + i as f32 * 0.01)))
            .expect("queue open");
        handle
            .send(PoseEvent::SetJointRotations(rotations(i as f32 * 0.05)))
            .expect("queue open");
    }

    let stats = worker.shutdown();
    assert_eq!(stats.applied, 200);
    assert_eq!(stats.ignored, 0);
    assert!(render.join().expect("render thread panicked") > 0);
}
