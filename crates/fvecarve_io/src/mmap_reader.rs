use fvecarve_core::{BlockSource, CoreError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

pub struct MmapReader {
    mmap: Mmap,
}

impl MmapReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let context = || format!("map {}", path.display());

        let file = File::open(path).map_err(|e| CoreError::input(context(), e))?;
        let size = file
            .metadata()
            .map_err(|e| CoreError::input(context(), e))?
            .len();

        if size == 0 {
            return Err(CoreError::input(
                context(),
                io::Error::new(io::ErrorKind::InvalidInput, "cannot mmap empty file"),
            ));
        }

        // The dump is opened read-only and never written through this
        // mapping. Concurrent truncation by another process is the caller's
        // responsibility.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| CoreError::input(context(), e))?;

        if mmap.is_empty() {
            return Err(CoreError::input(
                context(),
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    "mmap returned empty mapping (block device not supported)",
                ),
            ));
        }

        #[cfg(unix)]
        {
            use memmap2::Advice;
            let _ = mmap.advise(Advice::Sequential);
        }

        Ok(Self { mmap })
    }

    #[inline]
    pub fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        if start >= self.mmap.len() {
            return None;
        }
        let end = start.saturating_add(len).min(self.mmap.len());
        Some(&self.mmap[start..end])
    }
}

impl BlockSource for MmapReader {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        if let Some(slice) = self.slice(offset, buffer.len()) {
            let len = slice.len();
            buffer[..len].copy_from_slice(slice);
            Ok(len)
        } else {
            Ok(0)
        }
    }

    fn size(&self) -> Option<u64> {
        Some(self.mmap.len() as u64)
    }
}
