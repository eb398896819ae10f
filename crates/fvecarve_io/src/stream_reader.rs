//! Sequential block source for pipes and standard input.

use fvecarve_core::{BlockSource, Result};
use std::io::{ErrorKind, Read};

/// Adapts any [`Read`] into a [`BlockSource`].
///
/// The stream cannot seek, so chunks must be requested in order; the
/// offset argument is only checked against the running position. The total
/// size is unknown until the stream ends.
pub struct StreamReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> BlockSource for StreamReader<R> {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        debug_assert_eq!(offset, self.position, "stream sources are sequential");

        let mut filled = 0;
        while filled < buffer.len() {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;

        Ok(filled)
    }

    fn size(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fvecarve_core::CoreError;
    use std::io::{self, Cursor};

    /// Hands out at most three bytes per call and fails once with EINTR.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let n = buf.len().min(3).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn fills_whole_chunks_from_short_reads() {
        let data: Vec<u8> = (0..20).collect();
        let mut reader = StreamReader::new(Trickle {
            data: data.clone(),
            pos: 0,
            interrupted: false,
        });

        let mut buffer = [0u8; 8];
        assert_eq!(reader.read_chunk(0, &mut buffer).unwrap(), 8);
        assert_eq!(&buffer, &data[..8]);
        assert_eq!(reader.read_chunk(8, &mut buffer).unwrap(), 8);
        assert_eq!(reader.read_chunk(16, &mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], &data[16..]);
        assert_eq!(reader.read_chunk(20, &mut buffer).unwrap(), 0);
        assert_eq!(reader.position(), 20);
    }

    #[test]
    fn size_is_unknown() {
        let reader = StreamReader::new(Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(reader.size(), None);
    }

    #[test]
    fn read_errors_surface_as_io() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("pipe closed"))
            }
        }

        let mut reader = StreamReader::new(Broken);
        let err = reader.read_chunk(0, &mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
