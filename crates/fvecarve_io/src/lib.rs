mod mmap_reader;
mod reader;
mod sink;
mod stream_reader;

pub use mmap_reader::MmapReader;
pub use reader::DiskReader;
pub use sink::{batch_file, key_file_path, KeyFileSink};
pub use stream_reader::StreamReader;

use fvecarve_core::{BlockSource, Result};
use std::io::{self, Stdin};
use std::path::Path;
use tracing::debug;

/// Path that selects standard input instead of a file.
pub const STDIN_PATH: &str = "-";

pub enum Reader {
    Mmap(MmapReader),
    Disk(DiskReader),
    Stdin(StreamReader<Stdin>),
}

impl Reader {
    /// Opens `path`, preferring a memory map and falling back to buffered
    /// reads for block devices and files that cannot be mapped. `-` reads
    /// standard input.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        if path_ref == Path::new(STDIN_PATH) {
            return Ok(Reader::Stdin(StreamReader::new(io::stdin())));
        }

        match MmapReader::new(path_ref) {
            Ok(r) => Ok(Reader::Mmap(r)),
            Err(e) => {
                debug!(path = %path_ref.display(), "mmap unavailable ({e}), using buffered reads");
                Ok(Reader::Disk(DiskReader::new(path_ref)?))
            }
        }
    }

    #[inline]
    pub fn is_mmap(&self) -> bool {
        matches!(self, Reader::Mmap(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reader::Mmap(_) => "mmap",
            Reader::Disk(_) => "buffered",
            Reader::Stdin(_) => "stdin",
        }
    }
}

impl BlockSource for Reader {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        match self {
            Reader::Mmap(r) => r.read_chunk(offset, buffer),
            Reader::Disk(r) => r.read_chunk(offset, buffer),
            Reader::Stdin(r) => r.read_chunk(offset, buffer),
        }
    }

    fn size(&self) -> Option<u64> {
        match self {
            Reader::Mmap(r) => r.size(),
            Reader::Disk(r) => r.size(),
            Reader::Stdin(r) => r.size(),
        }
    }
}
