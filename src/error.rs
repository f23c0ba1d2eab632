use thiserror::Error;

/// I/O errors that can occur when reading source bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Source does not exist
    #[error("Source not found: {0}")]
    NotFound(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Any other failure while reading
    #[error("Read error: {0}")]
    Read(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Read(err.to_string()),
        }
    }
}

/// Malformed or out-of-bounds operation parameters.
///
/// Raised by [`crate::operation::OperationList::validate`] before anything is
/// decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Crop origin lies outside the full image
    #[error("Crop origin ({x}, {y}) is outside the {width}x{height} image")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Crop has a zero or negative extent
    #[error("Crop width and height must be positive, got {width}x{height}")]
    EmptyCrop { width: f64, height: f64 },

    /// Percent crop value outside 0-1
    #[error("Crop {field} must be between 0 and 1 when expressed as a percentage, got {value}")]
    InvalidPercent { field: &'static str, value: f64 },

    /// Scale target is zero or negative
    #[error("Invalid scale: {0}")]
    InvalidScale(String),

    /// Rotation outside 0-360
    #[error("Rotation must be between 0 and 360 degrees, got {0}")]
    InvalidRotation(f64),

    /// Output quality outside 1-100
    #[error("Output quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),
}

/// Errors reported by a decode capability.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// I/O error while reading source bytes
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Source bytes cannot be handled by this codec
    #[error("Unsupported source format ({format}): {reason}")]
    UnsupportedFormat { format: String, reason: String },

    /// Bytes were recognized but decoding failed
    #[error("Failed to decode {format} image: {message}")]
    Decode { format: String, message: String },
}

/// Errors that can occur when reading a region from a source image
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// I/O error while reading the source, propagated unchanged
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The operation list was rejected before any decode
    #[error("Invalid operation list: {0}")]
    Validation(#[from] ValidationError),

    /// Source not decodable, or the decode produced no usable image
    #[error("Unsupported source format ({format}): {reason}")]
    UnsupportedFormat { format: String, reason: String },

    /// The reader has already released its handle
    #[error("Reader has been disposed")]
    Disposed,
}

impl From<CodecError> for ReadError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(io) => ReadError::Io(io),
            CodecError::UnsupportedFormat { format, reason } => {
                ReadError::UnsupportedFormat { format, reason }
            }
            CodecError::Decode { format, message } => ReadError::UnsupportedFormat {
                format,
                reason: message,
            },
        }
    }
}
