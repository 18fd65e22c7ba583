//! PNG frame output.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use vmnc_decoder::Frame;

/// Writes every `every`-th frame as `frame-NNNNNN.png` into a directory.
pub struct FrameWriter {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl FrameWriter {
    /// Creates the output directory if needed.
    pub fn create(dir: &Path, every: u64) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every: every.max(1),
            written: 0,
        })
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame-{index:06}.png"))
    }

    /// Writes `frame` if its index is selected. Returns the file written.
    ///
    /// Frames with no pixels are skipped, since PNG cannot hold them.
    pub fn write(&mut self, frame: &Frame) -> Result<Option<PathBuf>> {
        if frame.index % self.every != 0 {
            return Ok(None);
        }
        if frame.width == 0 || frame.height == 0 {
            debug!(
                "Skipping empty frame {} ({}x{})",
                frame.index, frame.width, frame.height
            );
            return Ok(None);
        }

        let path = self.path_for(frame.index);
        let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba())
            .with_context(|| format!("Frame {} has a short pixel buffer", frame.index))?;
        image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Wrote {}", path.display());
        self.written += 1;
        Ok(Some(path))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
