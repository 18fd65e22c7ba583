//! Chunked asynchronous input.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads a byte stream in chunks of a fixed size.
///
/// Every chunk is full except possibly the last one.
pub struct ChunkReader<R> {
    reader: R,
    buf: Vec<u8>,
    total: u64,
}

impl ChunkReader<Box<dyn AsyncRead + Unpin + Send>> {
    /// Opens `path`, or standard input for `-`.
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let reader: Box<dyn AsyncRead + Unpin + Send> = if path.as_os_str() == "-" {
            Box::new(tokio::io::stdin())
        } else {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(file)
        };
        Ok(Self::new(reader, chunk_size))
    }
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0; chunk_size.max(1)],
            total: 0,
        }
    }

    /// Returns the next chunk, or `None` at end of input.
    pub async fn next_chunk(&mut self) -> Result<Option<&[u8]>> {
        let mut filled = 0;
        while filled < self.buf.len() {
            let n = self
                .reader
                .read(&mut self.buf[filled..])
                .await
                .context("Failed to read input")?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.total += filled as u64;

        if filled == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buf[..filled]))
    }

    /// Bytes read so far.
    pub fn total(&self) -> u64 {
        self.total
    }
}
