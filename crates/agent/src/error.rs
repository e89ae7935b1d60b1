/// Failure of a callable handler as a whole.
///
/// Failures to reach a single recipient are never represented here: they're
/// captured in the handler's aggregate result instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("caller must be authenticated")]
    Unauthenticated,
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// Status code of this error within the callable protocol.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Unauthenticated => "UNAUTHENTICATED",
            DispatchError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DispatchError::Internal(_) => "INTERNAL",
        }
    }
}
