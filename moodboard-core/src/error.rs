//! Error types for board operations.

use thiserror::Error;

/// Result type for board operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in board operations.
///
/// None of these cross a gesture-update boundary: the gesture path turns
/// them into "no hit" or "no update" and logs them.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Scale is at or near zero, so screen points cannot be mapped back.
    #[error("Degenerate transform (scale = {0})")]
    DegenerateTransform(f64),

    /// Item not found on the board.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Invalid item or board operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The user cancelled the picker or denied permission.
    #[error("Image acquisition cancelled")]
    ImageAcquisitionCancelled,

    /// The native size of a picked image could not be decoded.
    #[error("Image dimensions unavailable for {uri}: {reason}")]
    ImageDimensionUnavailable {
        /// Image URI or path.
        uri: String,
        /// Decoder message.
        reason: String,
    },

    /// A debounced write to the item store or viewport cache failed.
    #[error("Persistence write failed: {0}")]
    PersistenceWriteFailure(String),
}
