/// Result alias that carries the custom [`VizError`] type.
pub type Result<T> = std::result::Result<T, VizError>;

/// Common error type for the core crate.
///
/// Numeric and geometric faults never reach this type; they are repaired at
/// the point of use by the safety module. What remains are resource faults
/// (missing audio, encoder setup, image decoding) and IO.
#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// Free-form error carrying a readable message.
    #[error("{0}")]
    Message(String),
    /// A caller handed an argument that violates a documented precondition.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// FFT planning or processing failed.
    #[error("fft: {0}")]
    Fft(#[from] realfft::FftError),
    /// Audio decoding or playback failed.
    #[error("audio: {0}")]
    Audio(String),
    /// The video encoder could not be opened or fed.
    #[error("encoder: {0}")]
    Encoder(String),
    /// Avatar image decoding failed.
    #[error("image: {0}")]
    Image(String),
}

impl VizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for VizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for VizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
