use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid lead status: {0}")]
    InvalidStatus(String),

    #[error("invalid activity kind: {0}")]
    InvalidActivityKind(String),

    #[error("candidate handle must be non-empty")]
    EmptyHandle,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read targets file {path}: {source}")]
    TargetsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse targets file: {0}")]
    TargetsFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
