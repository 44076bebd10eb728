use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write {artifact}: {source}")]
    Artifact {
        artifact: String,
        #[source]
        source: std::io::Error,
    },

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl IndexError {
    pub fn artifact(artifact: impl Into<String>, source: std::io::Error) -> Self {
        Self::Artifact {
            artifact: artifact.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding backend misconfigured: {0}")]
    Config(String),
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
