//! Error types for watermark processing.
//!
//! Compositing failures (`Decode`, `Encode`) and transport failures (`Fetch`,
//! `Io`) are converted into one user-visible message at the session boundary.
//! `SizeLimitExceeded` and `Validation` are reported before any processing.

use thiserror::Error;

/// Errors that can occur while accepting or processing media.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// Input media could not be decoded
    #[error("Failed to decode media: {0}")]
    Decode(String),

    /// Video is larger than the configured ceiling
    #[error("Media size {size} bytes exceeds limit of {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// User input was rejected (e.g. text too long)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Output media could not be produced
    #[error("Failed to encode media: {0}")]
    Encode(String),

    /// Media could not be retrieved from the chat service
    #[error("Failed to fetch media: {0}")]
    Fetch(String),

    /// Temporary storage or subprocess I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shown for any failure that happened while processing a file.
pub const PROCESSING_FAILED_MESSAGE: &str =
    "Processing failed. Please try a different file.";

impl WatermarkError {
    /// Text sent back to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::SizeLimitExceeded { limit, .. } => format!(
                "File is too large. Maximum video size is {} MB.",
                limit / (1024 * 1024)
            ),
            Self::Validation(msg) => msg.clone(),
            Self::Decode(_) | Self::Encode(_) | Self::Fetch(_) | Self::Io(_) => {
                PROCESSING_FAILED_MESSAGE.to_string()
            }
        }
    }
}
