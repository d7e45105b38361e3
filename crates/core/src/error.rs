/// Result alias that carries the custom [`BoulderVizError`] type.
pub type Result<T> = std::result::Result<T, BoulderVizError>;

/// Common error type for the core crate.
///
/// Soft failures inside the engine (dropped rings, rejected samples, clamped
/// settings) are logged instead of being reported here. This type is reserved
/// for the plumbing around the engine: files, JSON documents and shared state.
#[derive(Debug, thiserror::Error)]
pub enum BoulderVizError {
    /// Free-form message raised by collaborators.
    #[error("{0}")]
    Message(String),
    /// Input that cannot be processed at all.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The shared visualization state was poisoned by a panicking writer.
    #[error("{0} has been poisoned")]
    StatePoisoned(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Settings or scene documents that failed to (de)serialize.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Failure reported by the spectral analysis backend.
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl BoulderVizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for BoulderVizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BoulderVizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
