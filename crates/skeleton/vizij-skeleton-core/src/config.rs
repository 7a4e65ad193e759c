//! Engine configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkeletonError};
use crate::math::SLERP_EPSILON;

/// How raw capture axes map onto the internal rig axes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureAxes {
    /// Pass components through untouched.
    Identity,
    /// Swap x and y (right-handed capture → left-handed rig). Applies to positions
    /// and to the x/y imaginary parts of rotations.
    #[default]
    #[serde(rename = "swap_xy")]
    SwapXY,
}

/// Component order of quaternions in flat control payloads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuatOrder {
    #[default]
    Wxyz,
    Xyzw,
}

/// Configuration for the skeleton engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smoothing factor in effect before the first `setUpdateSmoothing` event.
    pub initial_smoothing: f32,
    /// Threshold on sinθ under which slerp uses a normalized linear blend.
    pub slerp_epsilon: f32,
    pub capture_axes: CaptureAxes,
    pub quat_order: QuatOrder,
    /// Bounded queue length between the control channel and the ingest worker.
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_smoothing: 0.0,
            slerp_epsilon: SLERP_EPSILON,
            capture_axes: CaptureAxes::SwapXY,
            quat_order: QuatOrder::Wxyz,
            event_queue_capacity: 1024,
        }
    }
}

impl EngineConfig {
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
}
