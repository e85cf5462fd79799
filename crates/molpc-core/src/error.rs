use thiserror::Error;

/// Errors raised by the molpc workspace.
///
/// Everything except `Io` and `ConfigParse` is a precondition violation: the
/// caller handed in inconsistent shapes, batches or settings. None of them is
/// retried anywhere in the workspace.
#[derive(Debug, Error)]
pub enum MolGraphError {
    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("evidence batch lengths differ: {nodes} node rows vs {edges} edge rows")]
    EvidenceLengthMismatch { nodes: usize, edges: usize },

    #[error("requested {requested} samples but evidence holds {evidence} rows")]
    CountMismatch { requested: usize, evidence: usize },

    #[error("unsupported regime '{0}'")]
    UnsupportedRegime(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("component index {index} out of range for {components} components")]
    InvalidComponent { index: usize, components: usize },

    #[error("inconsistent evidence for example {example}: {reason}")]
    InconsistentEvidence { example: usize, reason: String },

    #[error("example {example} has no present nodes")]
    EmptyGraph { example: usize },

    #[error("{group} label {label} of example {example} is outside 0..={max}")]
    LabelOutOfRange {
        group: &'static str,
        example: usize,
        label: i64,
        max: i64,
    },

    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MolGraphError>;

impl MolGraphError {
    pub fn shape(context: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        MolGraphError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

/// Fail with [`MolGraphError::ShapeMismatch`] unless `actual == expected`.
pub fn ensure_shape(context: &'static str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MolGraphError::shape(context, expected, actual))
    }
}
