//! Writing extracted image bytes to the output image directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Destination for extracted image files.
pub trait ImageWriter {
    /// Write `bytes` as `filename`, returning the number of bytes written.
    fn write_image(&self, filename: &str, bytes: &[u8]) -> Result<u64>;

    /// Directory the files end up in.
    fn dir(&self) -> &Path;
}

/// Writes images into a directory on disk.
#[derive(Debug, Clone)]
pub struct FsImageWriter {
    dir: PathBuf,
}

impl FsImageWriter {
    /// Create the writer, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl ImageWriter for FsImageWriter {
    fn write_image(&self, filename: &str, bytes: &[u8]) -> Result<u64> {
        fs::write(self.dir.join(filename), bytes)?;
        Ok(bytes.len() as u64)
    }

    fn dir(&self) -> &Path {
        &self.dir
    }
}
