//! Active pixel format.
//!
//! A [`PixelFormat`] is built from the 16-byte descriptor carried by a format
//! rectangle and stays immutable until a different descriptor replaces it.
//!
//! # True Color Model
//!
//! Only **true color** formats are accepted: each pixel directly encodes RGB
//! values using bit fields. Color-map (palette) formats are rejected when the
//! descriptor is converted.
//!
//! # Pixel Format Components
//!
//! - **bits_per_pixel**: Storage size in bits (8, 16 or 32)
//! - **depth**: Significant bits
//! - **big_endian**: Byte order for multi-byte pixels
//! - **red/green/blue_max**: Maximum value for each color channel
//! - **red/green/blue_shift**: Bit position of the least significant bit of each channel
//!
//! Channel masks are derived as `max << shift`.
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::PixelFormat;
//!
//! let pf = PixelFormat::rgb888();
//! assert_eq!(pf.bytes_per_pixel(), 4);
//! assert_eq!(pf.red_mask(), 0x00FF_0000);
//!
//! let pixel = [0xCC, 0xBB, 0xAA, 0x00]; // Little-endian: 0x00AABBCC
//! assert_eq!(pf.to_rgba(&pixel), [0xAA, 0xBB, 0xCC, 0xFF]);
//! ```

use rfb_protocol::{DecodeError, PixelFormatDescriptor};

/// Describes how framebuffer pixels are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct PixelFormat {
    /// Bits used per pixel: 8, 16 or 32.
    pub bits_per_pixel: u8,

    /// Actual color depth (sum of significant bits).
    pub depth: u8,

    /// Byte order for multi-byte pixels (`true` = big endian).
    pub big_endian: bool,

    /// Always `true` for an accepted format.
    pub true_color: bool,

    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,

    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,

    /// Descriptor this format was created from.
    descriptor: PixelFormatDescriptor,
}

impl PixelFormat {
    /// Validate a descriptor and build the format from it.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` for a bit depth other than 8, 16 or 32, or for a
    /// palette-indexed format.
    pub fn from_descriptor(descriptor: PixelFormatDescriptor) -> Result<Self, DecodeError> {
        let bits_per_pixel = descriptor.bits_per_pixel();
        if !matches!(bits_per_pixel, 8 | 16 | 32) {
            return Err(DecodeError::invalid(format!(
                "unsupported bits per pixel {}",
                bits_per_pixel
            )));
        }
        if !descriptor.true_color() {
            return Err(DecodeError::invalid("palette-indexed pixel formats are not supported"));
        }

        let (red_max, green_max, blue_max) = descriptor.channel_max();
        let (red_shift, green_shift, blue_shift) = descriptor.channel_shift();
        Ok(Self {
            bits_per_pixel,
            depth: descriptor.depth(),
            big_endian: descriptor.big_endian(),
            true_color: true,
            red_max,
            green_max,
            blue_max,
            red_shift,
            green_shift,
            blue_shift,
            descriptor,
        })
    }

    /// Little-endian 32bpp format with 8 bits per channel, red at bit 16.
    pub fn rgb888() -> Self {
        Self::from_fields(32, 24, false, (255, 255, 255), (16, 8, 0))
    }

    /// 8bpp format with 3 bits red, 3 bits green and 2 bits blue.
    pub fn bgr233() -> Self {
        Self::from_fields(8, 8, false, (7, 7, 3), (0, 3, 6))
    }

    fn from_fields(
        bits_per_pixel: u8,
        depth: u8,
        big_endian: bool,
        max: (u16, u16, u16),
        shift: (u8, u8, u8),
    ) -> Self {
        let descriptor =
            PixelFormatDescriptor::new(bits_per_pixel, depth, big_endian, true, max, shift);
        Self {
            bits_per_pixel,
            depth,
            big_endian,
            true_color: true,
            red_max: max.0,
            green_max: max.1,
            blue_max: max.2,
            red_shift: shift.0,
            green_shift: shift.1,
            blue_shift: shift.2,
            descriptor,
        }
    }

    /// Returns bytes-per-pixel (storage width): 1, 2 or 4.
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bits_per_pixel.div_ceil(8)
    }

    /// The descriptor this format was built from.
    pub fn descriptor(&self) -> &PixelFormatDescriptor {
        &self.descriptor
    }

    pub fn red_mask(&self) -> u32 {
        channel_mask(self.red_max, self.red_shift)
    }

    pub fn green_mask(&self) -> u32 {
        channel_mask(self.green_max, self.green_shift)
    }

    pub fn blue_mask(&self) -> u32 {
        channel_mask(self.blue_max, self.blue_shift)
    }

    /// Assemble a pixel value from its stored bytes.
    fn pixel_value(&self, pixel: &[u8]) -> u32 {
        let bpp = self.bytes_per_pixel() as usize;
        let mut value = 0u32;
        if self.big_endian {
            for &byte in pixel.iter().take(bpp) {
                value = (value << 8) | byte as u32;
            }
        } else {
            for (i, &byte) in pixel.iter().take(bpp).enumerate() {
                value |= (byte as u32) << (i * 8);
            }
        }
        value
    }

    /// Converts one stored pixel to RGBA8888 `[R, G, B, 255]`.
    ///
    /// Channels with a zero maximum read as 0. Short input is treated as
    /// zero-extended.
    pub fn to_rgba(&self, pixel: &[u8]) -> [u8; 4] {
        let value = self.pixel_value(pixel);
        let scale = |shift: u8, max: u16| -> u8 {
            if max == 0 {
                return 0;
            }
            let component = value.checked_shr(shift as u32).unwrap_or(0) & max as u32;
            ((component * 255) / max as u32) as u8
        };
        [
            scale(self.red_shift, self.red_max),
            scale(self.green_shift, self.green_max),
            scale(self.blue_shift, self.blue_max),
            255,
        ]
    }

    /// Convert a strided image in this format to tightly packed RGBA8888.
    pub fn image_to_rgba(&self, data: &[u8], width: u32, height: u32, stride: usize) -> Vec<u8> {
        let bpp = self.bytes_per_pixel() as usize;
        let row_len = width as usize * bpp;
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for row in data.chunks(stride.max(1)).take(height as usize) {
            for pixel in row[..row_len.min(row.len())].chunks_exact(bpp) {
                rgba.extend_from_slice(&self.to_rgba(pixel));
            }
        }
        rgba
    }
}

/// `max << shift`, with shifts past the pixel width masking nothing.
fn channel_mask(max: u16, shift: u8) -> u32 {
    (max as u32).checked_shl(shift as u32).unwrap_or(0)
}
