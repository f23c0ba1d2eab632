use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Random access to the bytes of a source image.
///
/// Decode capabilities pull exactly the ranges they need through this trait,
/// so a reader never has to hold a whole multi-gigabyte pyramid in memory.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns [`IoError::RangeOutOfBounds`] if the range extends past the end
    /// of the source.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Total size of the source in bytes.
    fn size(&self) -> u64;

    /// Name of the source, used in logs and error messages.
    fn identifier(&self) -> &str;

    /// Read the whole source.
    async fn read_all(&self) -> Result<Bytes, IoError> {
        let len = usize::try_from(self.size())
            .map_err(|_| IoError::Read(format!("{} is too large to buffer", self.identifier())))?;
        self.read_exact_at(0, len).await
    }
}

/// Check that `len` bytes at `offset` fit inside a source of `size` bytes.
pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<(), IoError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size,
        }),
    }
}
