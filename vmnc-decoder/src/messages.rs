//! Events produced by [`VmncDecoder::feed`](crate::VmncDecoder::feed).

use bytes::Bytes;
use rfb_pixelbuffer::PixelFormat;
use rfb_protocol::DecodeError;
use std::time::Duration;

/// Events sent from the decoder to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The buffered input ends inside a record.
    ///
    /// At least this many more bytes are needed before the record can be
    /// decoded. Always at least 1.
    NeedMoreBytes(usize),

    /// A format rectangle replaced the pixel format or the dimensions.
    ///
    /// Emitted before the [`Event::FrameReady`] of the same record, so the
    /// application can renegotiate its output before the first frame in the
    /// new format arrives.
    FormatChanged {
        /// New framebuffer width in pixels.
        width: u32,
        /// New framebuffer height in pixels.
        height: u32,
        /// The pixel format now in effect.
        pixel_format: PixelFormat,
    },

    /// A record was applied and the composited image is ready.
    FrameReady(Frame),

    /// The stream is invalid.
    ///
    /// The session stays failed until [`VmncDecoder::reset`](crate::VmncDecoder::reset).
    Error(DecodeError),
}

/// One composited output image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pixel rows of `stride` bytes each, in `pixel_format`.
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including padding.
    pub stride: usize,
    pub pixel_format: PixelFormat,
    /// Zero-based position in the output sequence.
    pub index: u64,
    /// Presentation time, when a frame rate is configured.
    pub pts: Option<Duration>,
    /// Display duration, when a frame rate is configured.
    pub duration: Option<Duration>,
}

impl Frame {
    /// Raw bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.pixel_format.bytes_per_pixel() as usize;
        let offset = y as usize * self.stride + x as usize * bpp;
        self.data.get(offset..offset + bpp)
    }

    /// Visible bytes of row `y`, without stride padding.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride;
        let len = self.width as usize * self.pixel_format.bytes_per_pixel() as usize;
        self.data.get(start..start + len)
    }

    /// Converts the image to tightly packed RGBA8.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixel_format
            .image_to_rgba(&self.data, self.width, self.height, self.stride)
    }
}

/// Running totals for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Records applied.
    pub records: u64,
    /// Frames emitted.
    pub frames: u64,
    /// Format changes observed.
    pub format_changes: u64,
    /// Bytes consumed by applied records.
    pub bytes: u64,
}
