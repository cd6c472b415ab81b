use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultilatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("node {0} is already registered")]
    DuplicateNode(i32),

    #[error("network is already active")]
    AlreadyActive,

    #[error("network has not been started")]
    NotActive,

    #[error("need at least {need} usable measurements, have {have}")]
    InsufficientMeasurements { have: usize, need: usize },

    #[error("least-squares solver failed to converge")]
    SolverDivergence,

    #[error("malformed trajectory: {0}")]
    MalformedTrajectory(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MultilatError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn trajectory(msg: impl Into<String>) -> Self {
        Self::MalformedTrajectory(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MultilatError>;
