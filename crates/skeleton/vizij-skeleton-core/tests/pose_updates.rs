use approx::assert_relative_eq;
use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};
use vizij_skeleton_core::{
    math::quat_from_euler_xyz, EngineConfig, IgnoreReason, RigConfig, RigDefinition,
    SkeletonEngine, UpdateOutcome,
};

fn chain_engine(n: usize) -> SkeletonEngine {
    let rig = RigDefinition::from_config(&RigConfig::chain(n)).expect("chain rig");
    SkeletonEngine::new(rig, EngineConfig::default())
}

fn body_engine() -> SkeletonEngine {
    let rig = RigDefinition::from_config(&RigConfig::mocap_body()).expect("body rig");
    SkeletonEngine::new(rig, EngineConfig::default())
}

fn translation(m: &Matrix4<f32>) -> Vector3<f32> {
    m.fixed_view::<3, 1>(0, 3).into_owned()
}

fn capture_positions(n: usize, scale: f32) -> Vec<Vector3<f32>> {
    (0..n)
        .map(|i| Vector3::new(i as f32 * scale, (i % 4) as f32 * 0.5, -(i as f32) * 0.25))
        .collect()
}

fn capture_rotations(n: usize, phase: f32) -> Vec<Quaternion<f32>> {
    (0..n)
        .map(|i| {
            let a = phase + i as f32 * 0.1;
            *quat_from_euler_xyz([a, -0.5 * a, 0.3 * a]).quaternion()
        })
        .collect()
}

#[test]
fn three_joint_chain_scenario() {
    let engine = chain_engine(3);
    engine.set_update_smoothing(0.0);
    let outcome = engine.set_joint_positions(&[
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
    ]);
    assert!(outcome.is_applied());

    let lengths = engine.get_edge_lengths();
    assert_relative_eq!(lengths[0], 1.0);
    assert_relative_eq!(lengths[1], 1.0);

    let joints = engine.get_joint_transforms();
    assert_relative_eq!(
        translation(&joints[0]),
        translation(&engine.root_transform())
    );
    assert_eq!(engine.get_joint_count(), 3);
    assert_eq!(engine.get_edge_count(), 2);
}

#[test]
fn zero_smoothing_adopts_filtered_input() {
    let engine = body_engine();
    let raw_p = capture_positions(32, 0.3);
    let raw_q = capture_rotations(32, 0.2);
    engine.set_joint_positions(&raw_p);
    engine.set_joint_rotations(&raw_q);

    let rig = engine.rig().clone();
    let positions = engine.joint_positions();
    let rotations = engine.joint_rotations();
    for (joint, &capture) in rig.joint_filter().iter().enumerate() {
        assert_relative_eq!(positions[joint], raw_p[capture]);
        let expected = rig.joint_correction(joint) * UnitQuaternion::new_normalize(raw_q[capture]);
        assert_relative_eq!(rotations[joint], expected, epsilon = 1e-5);
    }
}

#[test]
fn full_smoothing_freezes_everything() {
    let engine = body_engine();
    engine.set_joint_positions(&capture_positions(32, 0.3));
    engine.set_update_smoothing(1.0);
    let pose = engine.pose();
    let snap = engine.snapshot();

    let p = engine.set_joint_positions(&capture_positions(32, 2.0));
    let q = engine.set_joint_rotations(&capture_rotations(32, 1.0));
    assert_eq!(p, UpdateOutcome::Ignored(IgnoreReason::Frozen));
    assert_eq!(q, UpdateOutcome::Ignored(IgnoreReason::Frozen));

    assert_eq!(engine.pose(), pose);
    let after = engine.snapshot();
    assert_eq!(after.generation(), snap.generation());
    assert_eq!(after.transforms(), snap.transforms());
}

#[test]
fn mismatched_update_is_reported_and_changes_nothing() {
    let engine = body_engine();
    engine.set_update_smoothing(0.4);
    engine.set_joint_positions(&capture_positions(32, 0.3));
    engine.set_joint_rotations(&capture_rotations(32, 0.7));
    let pose = engine.pose();
    let snap = engine.snapshot();

    let p = engine.set_joint_positions(&capture_positions(31, 9.0));
    assert_eq!(
        p,
        UpdateOutcome::Ignored(IgnoreReason::ShapeMismatch {
            expected: 32,
            actual: 31
        })
    );
    let q = engine.set_joint_rotations(&capture_rotations(40, 9.0));
    assert!(q.is_ignored());

    assert_eq!(engine.pose(), pose);
    let after = engine.snapshot();
    assert_eq!(after.generation(), snap.generation());
    assert_eq!(after.joint_transforms(), snap.joint_transforms());
    assert_eq!(after.edge_transforms(), snap.edge_transforms());
    assert_eq!(after.edge_lengths(), snap.edge_lengths());
}

#[test]
fn identical_update_twice_is_idempotent() {
    let engine = body_engine();
    let raw_p = capture_positions(32, 0.3);
    let raw_q = capture_rotations(32, 0.9);

    engine.set_joint_positions(&raw_p);
    engine.set_joint_rotations(&raw_q);
    let first = engine.snapshot();
    engine.set_joint_positions(&raw_p);
    engine.set_joint_rotations(&raw_q);
    let second = engine.snapshot();

    assert_eq!(second.generation(), first.generation() + 2);
    for (a, b) in first.joint_transforms().iter().zip(second.joint_transforms()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
    for (a, b) in first.edge_transforms().iter().zip(second.edge_transforms()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
    assert_eq!(first.edge_lengths(), second.edge_lengths());
}

#[test]
fn rotations_stay_unit_under_partial_smoothing() {
    let engine = body_engine();
    engine.set_update_smoothing(0.35);
    for step in 0..25 {
        let mut raw = capture_rotations(32, step as f32 * 0.4);
        // unnormalized and sign-flipped input must not break the invariant
        raw[5] = raw[5] * 3.0;
        raw[7] = -raw[7];
        assert!(engine.set_joint_rotations(&raw).is_applied());
        for q in engine.joint_rotations() {
            assert_relative_eq!(q.quaternion().norm(), 1.0, epsilon = 1e-5);
        }
    }
}

#[test]
fn antipodal_targets_never_produce_nan() {
    let engine = chain_engine(2);
    engine.set_update_smoothing(0.5);
    let q = Quaternion::new(1.0, 0.0, 0.0, 0.0);
    engine.set_joint_rotations(&[q, q]);
    assert!(engine.set_joint_rotations(&[-q, -q]).is_applied());
    for m in engine.get_joint_transforms() {
        assert!(m.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn partial_smoothing_moves_part_way() {
    let engine = chain_engine(2);
    engine.set_update_smoothing(0.75);
    engine.set_joint_positions(&[Vector3::zeros(), Vector3::new(0.0, 4.0, 0.0)]);
    assert_relative_eq!(engine.get_edge_lengths()[0], 1.0);
    engine.set_joint_positions(&[Vector3::zeros(), Vector3::new(0.0, 4.0, 0.0)]);
    assert_relative_eq!(engine.get_edge_lengths()[0], 1.75);
}

#[test]
fn root_position_moves_every_published_matrix() {
    let engine = chain_engine(3);
    engine.set_joint_positions(&[
        Vector3::zeros(),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
    ]);
    let before = engine.snapshot();
    engine.set_root_position(Vector3::new(10.0, 0.0, 0.0));
    let after = engine.snapshot();

    for (a, b) in before.joint_transforms().iter().zip(after.joint_transforms()) {
        assert_relative_eq!(translation(b) - translation(a), Vector3::new(10.0, 0.0, 0.0));
    }
    assert_eq!(before.edge_lengths(), after.edge_lengths());
    assert_relative_eq!(engine.root_transform() * engine.root_inverse(), Matrix4::identity());
}

#[test]
fn non_finite_payloads_are_ignored() {
    let engine = chain_engine(2);
    let outcome =
        engine.set_joint_positions(&[Vector3::zeros(), Vector3::new(f32::NAN, 0.0, 0.0)]);
    assert_eq!(outcome, UpdateOutcome::Ignored(IgnoreReason::NonFinite));
    let outcome = engine.set_joint_rotations(&[
        Quaternion::new(1.0, 0.0, 0.0, 0.0),
        Quaternion::new(f32::INFINITY, 0.0, 0.0, 0.0),
    ]);
    assert_eq!(outcome, UpdateOutcome::Ignored(IgnoreReason::NonFinite));
    assert_eq!(engine.snapshot().generation(), 0);
}
