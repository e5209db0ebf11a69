use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("cluster: empty input")]
    EmptyInput,

    #[error("cluster: vector {0} has zero norm")]
    ZeroNorm(usize),

    #[error("cluster: dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("cluster: cannot form {k} clusters from {n} points")]
    InvalidClusterCount { k: usize, n: usize },

    #[error("cluster: degenerate clustering: {0}")]
    Degenerate(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
