use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsbuiltError {
    #[error("no eligible features selected")]
    NoSelection,

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("cannot derive provenance from {path:?}: {reason}")]
    AmbiguousProvenance { path: String, reason: String },

    #[error("invalid run configuration: {0}")]
    Config(String),

    #[error("no rows in destination collection to attach {0:?} to")]
    AttachmentTargetNotFound(String),

    #[error("cannot read attachment source {path:?}: {source}")]
    AttachmentRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Write failure reported by the destination collection; the batch was rolled back.
    #[error("{0}")]
    Transaction(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AsbuiltError {
    /// Wrap a destination-collection error, keeping its message verbatim.
    pub fn transaction<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transaction(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, AsbuiltError>;
