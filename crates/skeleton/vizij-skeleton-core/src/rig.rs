//! Rig definition: joint filter, parent→children tree and corrective rotations.
//!
//! A rig is loaded once from JSON (see [`RigConfig`]) and validated into an
//! immutable [`RigDefinition`]. Any structural problem is a fatal
//! [`SkeletonError`]; there is no partially valid rig.
//!
//! Edge ids are assigned by walking `jointConnectivity` parent-ascending and
//! then in child list order, so the same file always yields the same ids.

use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::path::Path;

use hashbrown::HashMap;
use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SkeletonError};
use crate::math::{quat_from_euler_xyz, SLERP_EPSILON};

/// A rotation as written in rig files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RotationSpec {
    /// Quaternion components `[w, x, y, z]`; normalized on load.
    Quat { quat: [f32; 4] },
    /// Static-axes XYZ Euler angles in radians.
    Euler { euler: [f32; 3] },
}

impl RotationSpec {
    fn resolve(&self, target: impl FnOnce() -> String) -> Result<UnitQuaternion<f32>> {
        match self {
            RotationSpec::Euler { euler } => {
                if euler.iter().all(|a| a.is_finite()) {
                    Ok(quat_from_euler_xyz(*euler))
                } else {
                    Err(SkeletonError::DegenerateCorrection { target: target() })
                }
            }
            RotationSpec::Quat { quat } => {
                let [w, x, y, z] = *quat;
                let q = Quaternion::new(w, x, y, z);
                if !q.coords.iter().all(|c| c.is_finite()) {
                    return Err(SkeletonError::DegenerateCorrection { target: target() });
                }
                UnitQuaternion::try_new(q, SLERP_EPSILON)
                    .ok_or_else(|| SkeletonError::DegenerateCorrection { target: target() })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointCorrectionSpec {
    pub joint: usize,
    pub rotation: RotationSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeCorrectionSpec {
    pub parent: usize,
    pub child: usize,
    pub rotation: RotationSpec,
}

/// Serialized rig description (camelCase JSON).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Number of joints in the raw capture stream, when known.
    #[serde(default)]
    pub capture_joint_count: Option<usize>,
    #[serde(default)]
    pub joint_names: Option<Vec<String>>,
    /// `jointFilter[i]` is the raw capture index feeding rig joint `i`.
    pub joint_filter: Vec<usize>,
    /// Children of each rig joint; joint 0 is the root.
    pub joint_connectivity: Vec<Vec<usize>>,
    #[serde(default)]
    pub joint_corrections: Vec<JointCorrectionSpec>,
    #[serde(default)]
    pub edge_corrections: Vec<EdgeCorrectionSpec>,
}

impl RigConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SkeletonError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Straight chain `0 → 1 → … → n-1` with an identity filter and no corrections.
    pub fn chain(joint_count: usize) -> Self {
        let joint_connectivity = (0..joint_count)
            .map(|j| if j + 1 < joint_count { vec![j + 1] } else { Vec::new() })
            .collect();
        Self {
            name: Some(format!("chain{joint_count}")),
            capture_joint_count: None,
            joint_names: None,
            joint_filter: (0..joint_count).collect(),
            joint_connectivity,
            joint_corrections: Vec::new(),
            edge_corrections: Vec::new(),
        }
    }

    /// 28-joint body rig fed by a 32-joint capture stream.
    ///
    /// Hips, shoulders, arms and hands get a +90° Z correction, feet and toes a
    /// +90° Y correction, and the hips → spine edge a −90° Z correction.
    pub fn mocap_body() -> Self {
        const NAMES: [&str; 28] = [
            "Hips",
            "Spine",
            "Spine1",
            "Spine2",
            "Neck",
            "Head",
            "LeftShoulder",
            "LeftArm",
            "LeftForeArm",
            "LeftForeArmRoll",
            "LeftHand",
            "LeftInHandMiddle",
            "LeftHandMiddle2",
            "RightShoulder",
            "RightArm",
            "RightForeArm",
            "RightForeArmRoll",
            "RightHand",
            "RightInHandMiddle",
            "RightHandMiddle2",
            "LeftUpLeg",
            "LeftLeg",
            "LeftFoot",
            "LeftToeBase",
            "RightUpLeg",
            "RightLeg",
            "RightFoot",
            "RightToeBase",
        ];

        // Capture indices 6, 14, 22 and 31 are end sites the rig does not use.
        let joint_filter = vec![
            0, 1, 2, 3, 4, 5, 7, 8, 9, 10, 11, 12, 13, 15, 16, 17, 18, 19, 20, 21, 23, 24, 25,
            26, 27, 28, 29, 30,
        ];

        let mut joint_connectivity: Vec<Vec<usize>> = vec![Vec::new(); NAMES.len()];
        joint_connectivity[0] = vec![1, 20, 24];
        joint_connectivity[3] = vec![4, 6, 13];
        for (parent, child) in [
            (1, 2),
            (2, 3),
            (4, 5),
            (6, 7),
            (7, 8),
            (8, 9),
            (9, 10),
            (10, 11),
            (11, 12),
            (13, 14),
            (14, 15),
            (15, 16),
            (16, 17),
            (17, 18),
            (18, 19),
            (20, 21),
            (21, 22),
            (22, 23),
            (24, 25),
            (25, 26),
            (26, 27),
        ] {
            joint_connectivity[parent].push(child);
        }

        let about_z = RotationSpec::Euler {
            euler: [0.0, 0.0, FRAC_PI_2],
        };
        let about_y = RotationSpec::Euler {
            euler: [0.0, FRAC_PI_2, 0.0],
        };
        let joint_corrections = std::iter::once(0)
            .chain(6..=19)
            .map(|joint| JointCorrectionSpec {
                joint,
                rotation: about_z.clone(),
            })
            .chain([22, 23, 26, 27].into_iter().map(|joint| JointCorrectionSpec {
                joint,
                rotation: about_y.clone(),
            }))
            .collect();

        Self {
            name: Some("mocap_body".into()),
            capture_joint_count: Some(32),
            joint_names: Some(NAMES.iter().map(|n| (*n).to_string()).collect()),
            joint_filter,
            joint_connectivity,
            joint_corrections,
            edge_corrections: vec![EdgeCorrectionSpec {
                parent: 0,
                child: 1,
                rotation: RotationSpec::Euler {
                    euler: [0.0, 0.0, -FRAC_PI_2],
                },
            }],
        }
    }
}

/// One parent → child bone.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub parent: usize,
    pub child: usize,
}

/// Validated, immutable rig.
#[derive(Clone, Debug)]
pub struct RigDefinition {
    name: String,
    capture_joint_count: Option<usize>,
    joint_names: Option<Vec<String>>,
    joint_filter: Vec<usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    edges: Vec<Edge>,
    edge_ids: HashMap<(usize, usize), usize>,
    joint_correction: Vec<UnitQuaternion<f32>>,
    edge_correction: Vec<Option<UnitQuaternion<f32>>>,
}

impl RigDefinition {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_config(&RigConfig::from_json_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(&RigConfig::from_path(path)?)
    }

    /// Validate a config and build the rig.
    pub fn from_config(cfg: &RigConfig) -> Result<Self> {
        let joint_count = cfg.joint_filter.len();
        if joint_count == 0 {
            return Err(SkeletonError::EmptyRig);
        }

        validate_filter(&cfg.joint_filter, cfg.capture_joint_count)?;
        let parents = validate_tree(&cfg.joint_connectivity, joint_count)?;

        if let Some(names) = &cfg.joint_names {
            if names.len() != joint_count {
                return Err(SkeletonError::NameCount {
                    expected: joint_count,
                    actual: names.len(),
                });
            }
        }

        let mut edges = Vec::with_capacity(joint_count - 1);
        let mut edge_ids = HashMap::with_capacity(joint_count - 1);
        for (parent, children) in cfg.joint_connectivity.iter().enumerate() {
            for &child in children {
                edge_ids.insert((parent, child), edges.len());
                edges.push(Edge { parent, child });
            }
        }

        let mut joint_correction = vec![UnitQuaternion::identity(); joint_count];
        for jc in &cfg.joint_corrections {
            if jc.joint >= joint_count {
                return Err(SkeletonError::UnknownCorrectionJoint {
                    joint: jc.joint,
                    joint_count,
                });
            }
            joint_correction[jc.joint] = jc.rotation.resolve(|| format!("joint {}", jc.joint))?;
        }

        let mut edge_correction = vec![None; edges.len()];
        for ec in &cfg.edge_corrections {
            let Some(&edge) = edge_ids.get(&(ec.parent, ec.child)) else {
                return Err(SkeletonError::UnknownCorrectionEdge {
                    parent: ec.parent,
                    child: ec.child,
                });
            };
            edge_correction[edge] = Some(
                ec.rotation
                    .resolve(|| format!("edge ({}, {})", ec.parent, ec.child))?,
            );
        }

        let rig = Self {
            name: cfg.name.clone().unwrap_or_else(|| "rig".into()),
            capture_joint_count: cfg.capture_joint_count,
            joint_names: cfg.joint_names.clone(),
            joint_filter: cfg.joint_filter.clone(),
            children: cfg.joint_connectivity.clone(),
            parents,
            edges,
            edge_ids,
            joint_correction,
            edge_correction,
        };
        info!(
            rig = %rig.name,
            joints = rig.joint_count(),
            edges = rig.edge_count(),
            "rig loaded"
        );
        Ok(rig)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joint_filter.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn capture_joint_count(&self) -> Option<usize> {
        self.capture_joint_count
    }

    #[inline]
    pub fn joint_filter(&self) -> &[usize] {
        &self.joint_filter
    }

    pub fn joint_name(&self, joint: usize) -> Option<&str> {
        self.joint_names
            .as_ref()
            .and_then(|names| names.get(joint))
            .map(String::as_str)
    }

    /// Look a joint up by name when the rig carries names.
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_names
            .as_ref()
            .and_then(|names| names.iter().position(|n| n == name))
    }

    #[inline]
    pub fn children(&self, joint: usize) -> &[usize] {
        &self.children[joint]
    }

    #[inline]
    pub fn parent(&self, joint: usize) -> Option<usize> {
        self.parents[joint]
    }

    /// Edges in stable id order.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn edge_index(&self, parent: usize, child: usize) -> Option<usize> {
        self.edge_ids.get(&(parent, child)).copied()
    }

    #[inline]
    pub fn joint_correction(&self, joint: usize) -> &UnitQuaternion<f32> {
        &self.joint_correction[joint]
    }

    #[inline]
    pub fn edge_correction(&self, edge: usize) -> Option<&UnitQuaternion<f32>> {
        self.edge_correction[edge].as_ref()
    }
}

fn validate_filter(filter: &[usize], capture_count: Option<usize>) -> Result<()> {
    let mut seen: HashMap<usize, usize> = HashMap::with_capacity(filter.len());
    for (joint, &capture) in filter.iter().enumerate() {
        if let Some(capture_count) = capture_count {
            if capture >= capture_count {
                return Err(SkeletonError::FilterIndexOutOfRange {
                    joint,
                    capture,
                    capture_count,
                });
            }
        }
        if let Some(&first) = seen.get(&capture) {
            return Err(SkeletonError::DuplicateFilterIndex {
                capture,
                first,
                second: joint,
            });
        }
        seen.insert(capture, joint);
    }
    Ok(())
}

/// Check that `connectivity` is a tree rooted at joint 0 and return each joint's parent.
fn validate_tree(connectivity: &[Vec<usize>], joint_count: usize) -> Result<Vec<Option<usize>>> {
    if connectivity.len() != joint_count {
        return Err(SkeletonError::ConnectivityLength {
            expected: joint_count,
            actual: connectivity.len(),
        });
    }

    let mut parents: Vec<Option<usize>> = vec![None; joint_count];
    let mut edges = 0usize;
    for (parent, children) in connectivity.iter().enumerate() {
        for &child in children {
            if child >= joint_count {
                return Err(SkeletonError::ChildOutOfRange {
                    parent,
                    child,
                    joint_count,
                });
            }
            if child == parent {
                return Err(SkeletonError::SelfLoop { joint: child });
            }
            if child == 0 {
                return Err(SkeletonError::RootHasParent { parent });
            }
            if let Some(first) = parents[child] {
                return Err(SkeletonError::MultipleParents {
                    child,
                    first,
                    second: parent,
                });
            }
            parents[child] = Some(parent);
            edges += 1;
        }
    }

    if edges != joint_count - 1 {
        return Err(SkeletonError::EdgeCountMismatch {
            joints: joint_count,
            edges,
            expected: joint_count - 1,
        });
    }

    // Single parents and N-1 edges still admit a detached cycle; walk from the root.
    let mut reached = vec![false; joint_count];
    let mut stack = vec![0usize];
    reached[0] = true;
    while let Some(joint) = stack.pop() {
        for &child in &connectivity[joint] {
            if !reached[child] {
                reached[child] = true;
                stack.push(child);
            }
        }
    }
    if let Some(joint) = reached.iter().position(|r| !r) {
        return Err(SkeletonError::Unreachable { joint });
    }

    Ok(parents)
}
