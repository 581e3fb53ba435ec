#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid knowledge base url: {0}")]
    InvalidUrl(String),
    #[error("source fetch failed: {0}")]
    SourceFetch(String),
    #[error("fetch of {location} timed out after {seconds}s")]
    Timeout { location: String, seconds: u64 },
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimMismatch { expected: usize, actual: usize },
    #[error("knowledge base initialization failed (legacy: {legacy}; sources: {sources})")]
    InitFailed { legacy: String, sources: String },
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
