//! Block reader for physical disks, memory dump files and anything else
//! that can be opened and seeked.

use fvecarve_core::{BlockSource, CoreError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A read-only block source over a seekable file.
///
/// Used for raw devices (`/dev/mem`, `/dev/fmem`, `/dev/sda`), for dump
/// files that cannot be memory mapped, and for empty files.
///
/// # Example
///
/// ```ignore
/// use fvecarve_io::DiskReader;
/// use fvecarve_core::BlockSource;
///
/// let mut reader = DiskReader::new("memory.raw")?;
/// let mut buffer = vec![0u8; 4096];
/// let bytes_read = reader.read_chunk(0, &mut buffer)?;
/// ```
pub struct DiskReader {
    file: File,
    size: u64,
    position: u64,
}

impl DiskReader {
    /// Opens `path` read-only.
    ///
    /// Fails with [`CoreError::InputUnreadable`] when the path does not
    /// exist, permission is denied, or the size cannot be determined.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let context = || format!("open {}", path.display());

        let mut file = OpenOptions::new()
            .read(true)
            .write(false)
            .open(path)
            .map_err(|e| CoreError::input(context(), e))?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{fadvise, Advice};

            let _ = fadvise(&file, 0, None, Advice::Sequential);
            let _ = fadvise(&file, 0, None, Advice::NoReuse);
        }

        let size = file
            .seek(SeekFrom::End(0))
            .map_err(|e| CoreError::input(context(), e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| CoreError::input(context(), e))?;

        Ok(Self {
            file,
            size,
            position: 0,
        })
    }
}

impl BlockSource for DiskReader {
    fn read_chunk(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize> {
        if offset != self.position {
            self.file.seek(SeekFrom::Start(offset))?;
            self.position = offset;
        }

        let mut filled = 0;
        while filled < buffer.len() {
            match self.file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;

        Ok(filled)
    }

    fn size(&self) -> Option<u64> {
        Some(self.size)
    }
}
