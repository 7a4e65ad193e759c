//! Error types for rig loading, event decoding and the ingest worker.
//!
//! Shape-mismatched pose updates are not errors; they surface as
//! [`crate::ingest::UpdateOutcome::Ignored`].

/// Errors raised by the skeleton core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SkeletonError {
    /// The rig declares no joints.
    #[error("rig has no joints")]
    EmptyRig,

    /// `jointConnectivity` does not list one entry per joint.
    #[error("jointConnectivity has {actual} entries, expected {expected}")]
    ConnectivityLength { expected: usize, actual: usize },

    /// A child index points outside the rig.
    #[error("joint {parent} lists child {child}, but the rig has {joint_count} joints")]
    ChildOutOfRange {
        parent: usize,
        child: usize,
        joint_count: usize,
    },

    /// A joint lists itself as a child.
    #[error("joint {joint} lists itself as a child")]
    SelfLoop { joint: usize },

    /// The root joint appears as a child of another joint.
    #[error("root joint 0 is listed as a child of joint {parent}")]
    RootHasParent { parent: usize },

    /// A joint is reached from two parents.
    #[error("joint {child} has parents {first} and {second}")]
    MultipleParents {
        child: usize,
        first: usize,
        second: usize,
    },

    /// A joint cannot be reached from the root.
    #[error("joint {joint} is not reachable from the root")]
    Unreachable { joint: usize },

    /// Edge total does not match `jointCount - 1`.
    #[error("rig has {edges} edges, a tree over {joints} joints needs {expected}")]
    EdgeCountMismatch {
        joints: usize,
        edges: usize,
        expected: usize,
    },

    /// Two rig joints read the same raw capture joint.
    #[error("jointFilter maps capture joint {capture} to rig joints {first} and {second}")]
    DuplicateFilterIndex {
        capture: usize,
        first: usize,
        second: usize,
    },

    /// A filter entry exceeds the declared capture joint count.
    #[error("jointFilter[{joint}] = {capture} exceeds captureJointCount {capture_count}")]
    FilterIndexOutOfRange {
        joint: usize,
        capture: usize,
        capture_count: usize,
    },

    /// `jointNames` length differs from the joint count.
    #[error("jointNames has {actual} entries, expected {expected}")]
    NameCount { expected: usize, actual: usize },

    /// A joint correction references a joint outside the rig.
    #[error("joint correction targets joint {joint}, but the rig has {joint_count} joints")]
    UnknownCorrectionJoint { joint: usize, joint_count: usize },

    /// An edge correction references a pair that is not an edge of the tree.
    #[error("edge correction targets ({parent}, {child}), which is not a rig edge")]
    UnknownCorrectionEdge { parent: usize, child: usize },

    /// A correction quaternion has zero or non-finite length.
    #[error("correction rotation for {target} cannot be normalized")]
    DegenerateCorrection { target: String },

    /// Reading a configuration file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document failed to parse.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A control message arrived on an address with no pose handler.
    #[error("no pose handler for address {address}")]
    UnknownAddress { address: String },

    /// A control message payload has the wrong arity.
    #[error("payload for {address} has {len} values, expected {expected}")]
    MalformedPayload {
        address: String,
        len: usize,
        expected: String,
    },

    /// The ingest worker has shut down and no longer accepts events.
    #[error("ingest worker has stopped")]
    WorkerStopped,
}

impl SkeletonError {
    /// Stable category label for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyRig
            | Self::ConnectivityLength { .. }
            | Self::ChildOutOfRange { .. }
            | Self::SelfLoop { .. }
            | Self::RootHasParent { .. }
            | Self::MultipleParents { .. }
            | Self::Unreachable { .. }
            | Self::EdgeCountMismatch { .. }
            | Self::DuplicateFilterIndex { .. }
            | Self::FilterIndexOutOfRange { .. }
            | Self::NameCount { .. }
            | Self::UnknownCorrectionJoint { .. }
            | Self::UnknownCorrectionEdge { .. }
            | Self::DegenerateCorrection { .. } => "rig",
            Self::Io { .. } | Self::Json(_) => "io",
            Self::UnknownAddress { .. } | Self::MalformedPayload { .. } => "decode",
            Self::WorkerStopped => "runtime",
        }
    }

    /// Rig errors must stop startup; everything else can be reported and skipped.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.category() == "rig"
    }
}

pub type Result<T> = std::result::Result<T, SkeletonError>;
