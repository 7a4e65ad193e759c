//! Transform derivation: `(RigDefinition, PoseState) → DerivedTransforms`.
//!
//! Matrices are nalgebra column-major and act on column vectors:
//! - joint `j`: `root * T(position_j) * R(realign * rotation_j)`
//! - edge `e = (p, c)`: `root * T((position_p + position_c) / 2) * R(realign * correction_e * rotation_p)`
//!
//! `correction_e` is the rig's edge correction and is identity for ordinary edges.
//! Flattening a matrix with `as_slice()` yields the column-major layout GPU
//! uniform uploads expect without transposition.

use nalgebra::{Matrix4, UnitQuaternion};

use crate::math::{axis_realignment, placement_matrix};
use crate::pose::PoseState;
use crate::rig::RigDefinition;

/// World matrices and bone lengths for one pose.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedTransforms {
    pub joint_world: Vec<Matrix4<f32>>,
    /// Indexed by edge id (see [`RigDefinition::edges`]).
    pub edge_world: Vec<Matrix4<f32>>,
    pub edge_length: Vec<f32>,
}

impl DerivedTransforms {
    /// Pure derivation; the same inputs always give bit-identical output.
    pub fn derive(rig: &RigDefinition, pose: &PoseState) -> Self {
        let realign = axis_realignment();
        let root = pose.root_transform();
        let positions = pose.positions();
        let rotations = pose.rotations();

        let joint_world = positions
            .iter()
            .zip(rotations)
            .map(|(position, rotation)| {
                root * placement_matrix(position, &(realign * rotation))
            })
            .collect();

        let mut edge_world = Vec::with_capacity(rig.edge_count());
        let mut edge_length = Vec::with_capacity(rig.edge_count());
        for (id, edge) in rig.edges().iter().enumerate() {
            let parent = &positions[edge.parent];
            let child = &positions[edge.child];
            let midpoint = (parent + child) * 0.5;

            let orientation: UnitQuaternion<f32> = match rig.edge_correction(id) {
                Some(correction) => realign * correction * rotations[edge.parent],
                None => realign * rotations[edge.parent],
            };

            edge_world.push(root * placement_matrix(&midpoint, &orientation));
            edge_length.push((child - parent).norm());
        }

        Self {
            joint_world,
            edge_world,
            edge_length,
        }
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joint_world.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_world.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::quat_from_euler_xyz;
    use crate::rig::{EdgeCorrectionSpec, RigConfig, RotationSpec};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use std::f32::consts::FRAC_PI_2;

    fn chain3() -> RigDefinition {
        RigDefinition::from_config(&RigConfig::chain(3)).unwrap()
    }

    fn translation(m: &Matrix4<f32>) -> Vector3<f32> {
        m.fixed_view::<3, 1>(0, 3).into_owned()
    }

    #[test]
    fn chain_lengths_and_midpoints() {
        let rig = chain3();
        let mut pose = PoseState::new(3, 0.0);
        pose.blend_positions(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ]);
        let d = DerivedTransforms::derive(&rig, &pose);
        assert_eq!(d.edge_length, vec![1.0, 1.0]);
        assert_relative_eq!(translation(&d.edge_world[0]), Vector3::new(0.0, 0.5, 0.0));
        assert_relative_eq!(translation(&d.edge_world[1]), Vector3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn root_offsets_every_matrix() {
        let rig = chain3();
        let mut pose = PoseState::new(3, 0.0);
        pose.set_root_position(Vector3::new(5.0, 0.0, -1.0));
        let d = DerivedTransforms::derive(&rig, &pose);
        for m in d.joint_world.iter().chain(&d.edge_world) {
            assert_relative_eq!(translation(m), Vector3::new(5.0, 0.0, -1.0));
        }
    }

    #[test]
    fn joint_rotation_includes_realignment() {
        let rig = chain3();
        let mut pose = PoseState::new(3, 0.0);
        let q = quat_from_euler_xyz([0.0, 0.0, FRAC_PI_2]);
        pose.blend_rotations(&[q, q, q], 1e-6);
        let d = DerivedTransforms::derive(&rig, &pose);
        let expected = (axis_realignment() * q).to_homogeneous();
        assert_relative_eq!(d.joint_world[1], expected, epsilon = 1e-6);
        // Z quarter turn takes +x to +y, which the Y realignment leaves alone
        let p = d.joint_world[0].transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn edge_correction_only_touches_its_edge() {
        let mut cfg = RigConfig::chain(3);
        cfg.edge_corrections.push(EdgeCorrectionSpec {
            parent: 0,
            child: 1,
            rotation: RotationSpec::Euler {
                euler: [0.0, 0.0, -FRAC_PI_2],
            },
        });
        let corrected = RigDefinition::from_config(&cfg).unwrap();
        let plain = chain3();
        let pose = PoseState::new(3, 0.0);

        let a = DerivedTransforms::derive(&corrected, &pose);
        let b = DerivedTransforms::derive(&plain, &pose);

        let expected = (axis_realignment() * quat_from_euler_xyz([0.0, 0.0, -FRAC_PI_2]))
            .to_homogeneous();
        assert_relative_eq!(a.edge_world[0], expected, epsilon = 1e-6);
        assert_eq!(a.edge_world[1], b.edge_world[1]);
        assert_eq!(a.joint_world, b.joint_world);
    }

    #[test]
    fn derivation_is_deterministic() {
        let rig = RigDefinition::from_config(&RigConfig::mocap_body()).unwrap();
        let mut pose = PoseState::new(rig.joint_count(), 0.0);
        let positions: Vec<_> = (0..rig.joint_count())
            .map(|j| Vector3::new(j as f32 * 0.1, (j % 3) as f32, -(j as f32)))
            .collect();
        pose.blend_positions(&positions);
        let a = DerivedTransforms::derive(&rig, &pose);
        let b = DerivedTransforms::derive(&rig, &pose);
        assert_eq!(a, b);
        assert_eq!(a.edge_count(), 27);
        assert_eq!(a.joint_count(), 28);
    }
}
