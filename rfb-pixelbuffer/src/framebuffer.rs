//! Persistent framebuffer.
//!
//! [`FrameBuffer`] owns the decoded image across records. It is reallocated
//! (zeroed) whenever the pixel format or the dimensions change and otherwise
//! only has sub-regions rewritten.
//!
//! # Memory Layout
//!
//! Row-major, each row padded to a 4-byte boundary. For width W, height H and
//! bytes-per-pixel B:
//!
//! ```text
//! stride     = round_up(W * B, 4) bytes
//! total size = stride * H bytes
//! pixel (x, y) starts at offset: y * stride + x * B
//! ```
//!
//! Unlike the pixel-based strides used elsewhere in RFB viewers, the stride
//! here is measured in **bytes**.
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::{FrameBuffer, PixelFormat};
//! use rfb_common::Rect;
//!
//! let mut fb = FrameBuffer::new(3, 2, PixelFormat::bgr233());
//! assert_eq!(fb.stride(), 4);
//! assert_eq!(fb.data().len(), 8);
//!
//! fb.fill_rect(Rect::new(0, 0, 3, 1), &[0x07]).unwrap();
//! assert_eq!(fb.row(0), &[0x07, 0x07, 0x07]);
//! ```

use crate::PixelFormat;
use anyhow::{anyhow, bail, Result};
use rfb_common::{Point, Rect};

/// Row order used when copying a block within the same buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    TopToBottom,
    BottomToTop,
}

impl CopyDirection {
    /// Pick the row order for moving a block from row `src_y` to row `dst_y`.
    ///
    /// When the destination lies below the source, a top-to-bottom walk would
    /// read source rows that were already overwritten, so rows go bottom-up.
    /// Horizontal overlap within a row is handled by the per-row move.
    pub fn for_rows(src_y: i32, dst_y: i32) -> Self {
        if dst_y > src_y {
            Self::BottomToTop
        } else {
            Self::TopToBottom
        }
    }
}

/// Byte stride of a row of `width` pixels, rounded up to 4 bytes.
pub fn stride_for(width: u32, bytes_per_pixel: u8) -> usize {
    (width as usize * bytes_per_pixel as usize + 3) & !3
}

/// The persistent decoded image.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Row stride in bytes.
    stride: usize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed framebuffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = stride_for(width, format.bytes_per_pixel());
        Self {
            width,
            height,
            format,
            stride,
            data: vec![0u8; stride * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel() as usize
    }

    /// The whole buffer including row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The pixels of row `y`, without padding.
    ///
    /// # Panics
    ///
    /// Panics if `y` is outside the buffer.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {} out of range (height {})", y, self.height);
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.bytes_per_pixel()]
    }

    /// The bytes of the pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.bytes_per_pixel();
        let offset = self.offset(x as usize, y as usize);
        Some(&self.data[offset..offset + bpp])
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        y * self.stride + x * self.bytes_per_pixel()
    }

    /// Validates that a rectangle is within buffer bounds.
    fn validate_rect(&self, rect: Rect) -> Result<()> {
        if !rect.fits_within(self.width, self.height) {
            return Err(anyhow!(
                "Rectangle out of bounds: {:?} (buffer size: {}x{})",
                rect,
                self.width,
                self.height
            ));
        }
        Ok(())
    }

    /// Fill a rectangle with a single pixel value.
    pub fn fill_rect(&mut self, rect: Rect, pixel: &[u8]) -> Result<()> {
        self.validate_rect(rect)?;

        let bpp = self.bytes_per_pixel();
        if pixel.len() != bpp {
            bail!("Invalid pixel size: got {} bytes, expected {}", pixel.len(), bpp);
        }

        let row_len = rect.width as usize * bpp;
        for y in 0..rect.height as usize {
            let start = self.offset(rect.x as usize, rect.y as usize + y);
            for dst in self.data[start..start + row_len].chunks_exact_mut(bpp) {
                dst.copy_from_slice(pixel);
            }
        }
        Ok(())
    }

    /// Copy tightly packed pixel data into a rectangle.
    pub fn image_rect(&mut self, rect: Rect, pixels: &[u8]) -> Result<()> {
        self.validate_rect(rect)?;

        let row_len = rect.width as usize * self.bytes_per_pixel();
        let expected = row_len * rect.height as usize;
        if pixels.len() != expected {
            bail!(
                "Invalid image size: got {} bytes, expected {}",
                pixels.len(),
                expected
            );
        }
        if row_len == 0 {
            return Ok(());
        }

        for (y, src) in pixels.chunks_exact(row_len).enumerate() {
            let start = self.offset(rect.x as usize, rect.y as usize + y);
            self.data[start..start + row_len].copy_from_slice(src);
        }
        Ok(())
    }

    /// Copy a `dest`-sized block whose top-left corner is at `src` to `dest`.
    ///
    /// Source and destination may overlap.
    pub fn copy_rect(&mut self, dest: Rect, src: Point) -> Result<()> {
        self.validate_rect(dest)?;
        let src_rect = Rect::new(src.x, src.y, dest.width, dest.height);
        self.validate_rect(src_rect)?;

        if dest.is_empty() || (src.x == dest.x && src.y == dest.y) {
            return Ok(());
        }

        let row_len = dest.width as usize * self.bytes_per_pixel();
        let move_row = |data: &mut Vec<u8>, stride: usize, bpp: usize, row: usize| {
            let from = (src.y as usize + row) * stride + src.x as usize * bpp;
            let to = (dest.y as usize + row) * stride + dest.x as usize * bpp;
            data.copy_within(from..from + row_len, to);
        };

        let bpp = self.bytes_per_pixel();
        let rows = dest.height as usize;
        match CopyDirection::for_rows(src.y, dest.y) {
            CopyDirection::TopToBottom => {
                for row in 0..rows {
                    move_row(&mut self.data, self.stride, bpp, row);
                }
            }
            CopyDirection::BottomToTop => {
                for row in (0..rows).rev() {
                    move_row(&mut self.data, self.stride, bpp, row);
                }
            }
        }
        Ok(())
    }
}
