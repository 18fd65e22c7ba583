//! Core wire types of a VMnc record.
//!
//! - [`RecordHeader`] - Record tag and rectangle count
//! - [`Rectangle`] - 12-byte rectangle header with encoding tag
//! - [`PixelFormatDescriptor`] - 16-byte pixel format payload of a `WMVi` rectangle
//! - Encoding tag constants

use crate::io::{RfbReader, RfbWriter};
use crate::DecodeError;
use std::fmt;

/// Record tag of a rectangle batch, the only record kind defined.
pub const RECORD_TAG_RECTANGLES: u8 = 0;

/// Size of the record header (tag, padding, rectangle count).
pub const RECORD_HEADER_LEN: usize = 4;

/// Size of a rectangle header on the wire.
pub const RECTANGLE_HEADER_LEN: usize = 12;

/// Size of a `WMVi` pixel format payload.
pub const PIXEL_FORMAT_LEN: usize = 16;

/// Number of leading descriptor bytes that identify a pixel format; the rest
/// is padding.
pub const PIXEL_FORMAT_SIGNIFICANT_LEN: usize = 13;

//
// Encoding tags
//

/// Raw encoding - uncompressed pixel data.
pub const ENCODING_RAW: u32 = 0;

/// CopyRect encoding - copy from another framebuffer region.
pub const ENCODING_COPYRECT: u32 = 1;

/// Hextile encoding - 16x16 tile-based compression.
pub const ENCODING_HEXTILE: u32 = 5;

/// `WMVd`: cursor shape.
pub const ENCODING_CURSOR_SHAPE: u32 = u32::from_be_bytes(*b"WMVd");

/// `WMVe`: cursor visibility flags.
pub const ENCODING_CURSOR_VISIBILITY: u32 = u32::from_be_bytes(*b"WMVe");

/// `WMVf`: cursor position, carried in the rectangle header.
pub const ENCODING_CURSOR_POSITION: u32 = u32::from_be_bytes(*b"WMVf");

/// `WMVg`: keyboard state (10-byte payload, no decodable effect).
pub const ENCODING_KEYBOARD_STATE: u32 = u32::from_be_bytes(*b"WMVg");

/// `WMVh`: VM state (4-byte payload, no decodable effect).
pub const ENCODING_VM_STATE: u32 = u32::from_be_bytes(*b"WMVh");

/// `WMVi`: pixel format and framebuffer dimensions.
pub const ENCODING_PIXEL_FORMAT: u32 = u32::from_be_bytes(*b"WMVi");

/// Keyboard-state payload length.
pub const KEYBOARD_STATE_LEN: usize = 10;

/// VM-state payload length.
pub const VM_STATE_LEN: usize = 4;

/// Render an encoding tag for logs: vendor tags as their four characters,
/// standard tags as numbers.
pub fn encoding_name(encoding: u32) -> String {
    let bytes = encoding.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        encoding.to_string()
    }
}

/// Header of one record.
///
/// # Wire Format
///
/// - 1 byte: record tag (only [`RECORD_TAG_RECTANGLES`] is defined)
/// - 1 byte: padding
/// - 2 bytes: number of rectangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub tag: u8,
    pub rectangles: u16,
}

impl RecordHeader {
    /// Read a record header, rejecting unknown record tags.
    pub fn read_from(reader: &mut RfbReader<'_>) -> Result<Self, DecodeError> {
        reader.ensure(RECORD_HEADER_LEN)?;
        let tag = reader.read_u8()?;
        if tag != RECORD_TAG_RECTANGLES {
            return Err(DecodeError::invalid(format!("unknown record tag {}", tag)));
        }
        reader.skip(1)?;
        let rectangles = reader.read_u16()?;
        Ok(Self { tag, rectangles })
    }

    /// Write this header.
    pub fn write_to(&self, writer: &mut RfbWriter) {
        writer.write_u8(self.tag);
        writer.write_u8(0);
        writer.write_u16(self.rectangles);
    }
}

/// Rectangle header.
///
/// # Wire Format
///
/// Rectangle header is 12 bytes:
/// - 2 bytes: x position
/// - 2 bytes: y position
/// - 2 bytes: width
/// - 2 bytes: height
/// - 4 bytes: encoding tag
///
/// The tag-specific payload follows the header and is consumed by the
/// matching rectangle decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: u32,
}

impl Rectangle {
    /// Read a rectangle header.
    pub fn read_from(reader: &mut RfbReader<'_>) -> Result<Self, DecodeError> {
        reader.ensure(RECTANGLE_HEADER_LEN)?;
        Ok(Self {
            x: reader.read_u16()?,
            y: reader.read_u16()?,
            width: reader.read_u16()?,
            height: reader.read_u16()?,
            encoding: reader.read_u32()?,
        })
    }

    /// Write a rectangle header.
    pub fn write_to(&self, writer: &mut RfbWriter) {
        writer.write_u16(self.x);
        writer.write_u16(self.y);
        writer.write_u16(self.width);
        writer.write_u16(self.height);
        writer.write_u32(self.encoding);
    }

    /// Convert to geometry coordinates.
    pub fn bounds(&self) -> rfb_common::Rect {
        rfb_common::Rect::from_wire(self.x, self.y, self.width, self.height)
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{} {}x{}] {}",
            self.x,
            self.y,
            self.width,
            self.height,
            encoding_name(self.encoding)
        )
    }
}

/// Pixel format payload of a `WMVi` rectangle.
///
/// # Wire Format
///
/// 16 bytes:
/// - 1 byte: bits_per_pixel
/// - 1 byte: depth
/// - 1 byte: big_endian flag
/// - 1 byte: true_color flag
/// - 2 bytes each: red_max, green_max, blue_max
/// - 1 byte each: red_shift, green_shift, blue_shift
/// - 3 bytes: padding
///
/// The raw bytes are kept so that a repeated format rectangle can be detected
/// by comparing the significant prefix byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormatDescriptor {
    raw: [u8; PIXEL_FORMAT_LEN],
}

impl PixelFormatDescriptor {
    /// Wrap raw descriptor bytes.
    pub const fn from_bytes(raw: [u8; PIXEL_FORMAT_LEN]) -> Self {
        Self { raw }
    }

    /// Read a 16-byte descriptor.
    pub fn read_from(reader: &mut RfbReader<'_>) -> Result<Self, DecodeError> {
        let bytes = reader.read_bytes(PIXEL_FORMAT_LEN)?;
        let mut raw = [0u8; PIXEL_FORMAT_LEN];
        raw.copy_from_slice(bytes);
        Ok(Self { raw })
    }

    /// Build a true-colour descriptor from its fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bits_per_pixel: u8,
        depth: u8,
        big_endian: bool,
        true_color: bool,
        max: (u16, u16, u16),
        shift: (u8, u8, u8),
    ) -> Self {
        let mut raw = [0u8; PIXEL_FORMAT_LEN];
        raw[0] = bits_per_pixel;
        raw[1] = depth;
        raw[2] = big_endian as u8;
        raw[3] = true_color as u8;
        raw[4..6].copy_from_slice(&max.0.to_be_bytes());
        raw[6..8].copy_from_slice(&max.1.to_be_bytes());
        raw[8..10].copy_from_slice(&max.2.to_be_bytes());
        raw[10] = shift.0;
        raw[11] = shift.1;
        raw[12] = shift.2;
        Self { raw }
    }

    /// Write the descriptor bytes.
    pub fn write_to(&self, writer: &mut RfbWriter) {
        writer.write_bytes(&self.raw);
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; PIXEL_FORMAT_LEN] {
        &self.raw
    }

    /// The bytes that identify the format (padding excluded).
    pub fn significant_bytes(&self) -> &[u8] {
        &self.raw[..PIXEL_FORMAT_SIGNIFICANT_LEN]
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.raw[0]
    }

    pub fn depth(&self) -> u8 {
        self.raw[1]
    }

    pub fn big_endian(&self) -> bool {
        self.raw[2] != 0
    }

    pub fn true_color(&self) -> bool {
        self.raw[3] != 0
    }

    /// Channel maxima as (red, green, blue).
    pub fn channel_max(&self) -> (u16, u16, u16) {
        (
            u16::from_be_bytes([self.raw[4], self.raw[5]]),
            u16::from_be_bytes([self.raw[6], self.raw[7]]),
            u16::from_be_bytes([self.raw[8], self.raw[9]]),
        )
    }

    /// Channel shifts as (red, green, blue).
    pub fn channel_shift(&self) -> (u8, u8, u8) {
        (self.raw[10], self.raw[11], self.raw[12])
    }
}
