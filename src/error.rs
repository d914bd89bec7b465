pub type StickerResult<T> = Result<T, StickerError>;

#[derive(thiserror::Error, Debug)]
pub enum StickerError {
    /// Degenerate user input (empty drag rectangle, transparent seed pixel).
    /// Callers absorb this locally; it never aborts a session.
    #[error("input error: {0}")]
    Input(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// Base image missing or undecodable. Fatal for the current operation.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The encoder reported an internal failure. Recoverable via the
    /// still-image fallback.
    #[error("encoding failed: {0}")]
    EncodingFailure(String),

    /// The encoder did not finish within the configured deadline.
    #[error("encoding timed out after {0:?}")]
    EncodingTimeout(std::time::Duration),

    /// The export was cancelled by the caller.
    #[error("encoding aborted")]
    EncodingAborted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StickerError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }

    /// True for the failures the exporter recovers from by falling back to a
    /// single still frame.
    pub fn is_recoverable_encode_failure(&self) -> bool {
        matches!(
            self,
            Self::EncodingFailure(_) | Self::EncodingTimeout(_) | Self::EncodingAborted
        )
    }
}
