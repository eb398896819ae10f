//! File-backed key sinks for the two output modes.

use fvecarve_core::{BatchSink, KeySink, ValidatedKey};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Returns the split-mode path for the key at `index`: `<base>_<index>`.
pub fn key_file_path(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{index}"));
    PathBuf::from(name)
}

/// Opens a new output file with owner-only permissions on Unix.
fn create_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

/// Split mode: writes each key's raw bytes to its own file.
pub struct KeyFileSink {
    base: PathBuf,
    paths: Vec<PathBuf>,
}

impl KeyFileSink {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            paths: Vec::new(),
        }
    }

    /// Files written so far, in key order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl KeySink for KeyFileSink {
    fn write_key(&mut self, index: usize, key: &ValidatedKey) -> io::Result<()> {
        let path = key_file_path(&self.base, index);
        let mut file = create_private(&path)?;
        if let Err(e) = file.write_all(key.payload()).and_then(|()| file.sync_all()) {
            // A short key file must not pass for a usable one.
            drop(file);
            let _ = fs::remove_file(&path);
            debug!(path = %path.display(), "removed partial key file");
            return Err(e);
        }

        debug!(path = %path.display(), bytes = key.len(), "key file written");
        self.paths.push(path);
        Ok(())
    }
}

/// Batch mode: opens `path` as a record stream. Records are written
/// unbuffered, one `write_all` each.
pub fn batch_file(path: impl AsRef<Path>) -> io::Result<BatchSink<File>> {
    let file = create_private(path.as_ref())?;
    Ok(BatchSink::new(file))
}
