pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("`users` must be a positive integer")]
    InvalidUsers,

    #[error("`min_wait` must not exceed `max_wait`")]
    InvalidWaitRange,

    #[error("`max_attempts` must be a positive integer")]
    InvalidMaxAttempts,

    #[error("task weights must be positive and non-empty")]
    InvalidWeights,

    #[error("no target configured for protocol `{0}`")]
    MissingTarget(crate::Protocol),

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("grpc connect failed: {0}")]
    GrpcConnect(#[from] tonic::transport::Error),
}
