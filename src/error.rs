use std::sync::Arc;

/// Errors surfaced while consuming a multipart exchange or persisting uploads.
///
/// The enum is `Clone` so a failed part stream can keep handing back its
/// terminal error on every subsequent poll.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MultipartError {
    #[error("the request is not multipart")]
    NotMultipart,
    #[error("the multipart body has already been consumed")]
    AlreadyConsumed,
    #[error("invalid multipart boundary")]
    InvalidBoundary,
    #[error("field name {0:?} is not allowed")]
    ProhibitedName(String),
    #[error("reached parts limit")]
    PartsLimit,
    #[error("reached files limit")]
    FilesLimit,
    #[error("reached fields limit")]
    FieldsLimit,
    #[error("request file too large")]
    FileTooLarge,
    #[error("premature close of the multipart body")]
    PrematureClose,
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for MultipartError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
