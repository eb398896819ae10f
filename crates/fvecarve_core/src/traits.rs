//! Core traits at the seams between the carving pipeline and its collaborators.
//!
//! The pipeline never touches files directly: dumps arrive through a
//! [`BlockSource`] and validated keys leave through a [`KeySink`].

use std::io;

use crate::error::Result;
use crate::key::ValidatedKey;

/// A source of raw dump bytes, typically a memory image file.
///
/// This trait abstracts away where the bytes come from, so the same carving
/// logic runs over a memory-mapped file, positional reads, or a pipe.
///
/// # Example
///
/// ```ignore
/// struct RawImage { /* ... */ }
///
/// impl BlockSource for RawImage {
///     fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
///         // Read from the image at offset
///     }
///
///     fn size(&self) -> Option<u64> {
///         // Total size in bytes, when known
///     }
/// }
/// ```
pub trait BlockSource {
    /// Reads a chunk of data from the source at the specified offset.
    ///
    /// # Arguments
    ///
    /// * `offset` - The absolute byte offset to start reading from
    /// * `buffer` - The buffer to read data into
    ///
    /// # Returns
    ///
    /// The number of bytes actually read, which may be less than `buffer.len()`.
    /// Zero means the end of the source was reached.
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize>;

    /// Returns the total size of the source in bytes, or `None` for streams
    /// whose length is not known up front.
    fn size(&self) -> Option<u64>;
}

impl BlockSource for &[u8] {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        if start >= self.len() {
            return Ok(0);
        }
        let len = buffer.len().min(self.len() - start);
        buffer[..len].copy_from_slice(&self[start..start + len]);
        Ok(len)
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

/// Destination for validated keys.
///
/// `index` is the zero-based position of the key in encounter order. Sinks
/// return plain I/O errors; [`crate::emit::Emitter`] turns them into
/// [`crate::CoreError::OutputUnwritable`] with the partial count attached.
pub trait KeySink {
    fn write_key(&mut self, index: usize, key: &ValidatedKey) -> io::Result<()>;

    /// Flushes buffered output. Called once after the last key.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: KeySink + ?Sized> KeySink for &mut S {
    fn write_key(&mut self, index: usize, key: &ValidatedKey) -> io::Result<()> {
        (**self).write_key(index, key)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl KeySink for Vec<ValidatedKey> {
    #[inline]
    fn write_key(&mut self, _index: usize, key: &ValidatedKey) -> io::Result<()> {
        self.push(key.clone());
        Ok(())
    }
}
