//! Sequential writer for a re-fetched file.
//!
//! Bytes land in `<target>.part` and only reach the target name through a
//! rename after a successful sync, so a failed re-fetch never leaves a
//! truncated file under the name the user sees.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const PART_SUFFIX: &str = ".part";

/// `file.pdf` → `file.pdf.part`.
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(PART_SUFFIX);
    PathBuf::from(o)
}

#[derive(Debug)]
pub struct PartFile {
    file: File,
    temp_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Creates (or truncates) the part file next to `final_path`.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let temp_path = part_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            file,
            temp_path,
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Syncs and renames onto `final_path`. Returns the byte count.
    pub fn finalize(self, final_path: &Path) -> io::Result<u64> {
        self.file.sync_all()?;
        let Self {
            file,
            temp_path,
            written,
        } = self;
        drop(file);
        std::fs::rename(&temp_path, final_path)?;
        Ok(written)
    }

    /// Removes the part file. Errors are logged, not returned.
    pub fn discard(self) {
        let Self { file, temp_path, .. } = self;
        drop(file);
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::warn!(path = %temp_path.display(), "failed to remove part file: {}", e);
        }
    }
}
