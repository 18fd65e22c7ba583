//! Rectangle decoders for VMnc records.
//!
//! This crate defines the [`RectDecoder`] trait every rectangle decoder
//! implements, the closed [`RectKind`] set they are dispatched over, and the
//! [`RecordParser`] that walks a record rectangle by rectangle.
//!
//! # Key Concepts
//!
//! - **Delimited input**: Decoders read from an [`RfbReader`] over a byte range that
//!   may end mid-record; running out of bytes is `InsufficientData`, never a partial decode
//! - **One traversal, two sinks**: Decoders describe their effects to a [`RectSink`].
//!   [`ProbeSink`] discards them to measure a record; [`ApplySink`] writes them into the
//!   framebuffer and cursor state
//! - **Fail-fast policy**: Every length and bounds check happens before the sink is called
//! - **Format view**: Pixel sizes come from a per-record [`FormatView`] that format
//!   rectangles update in both modes, so probing never touches decoder state
//!
//! # Encoding Types
//!
//! - [`ENCODING_RAW`] (0): Uncompressed pixel data
//! - [`ENCODING_COPYRECT`] (1): Copy from another framebuffer region
//! - [`ENCODING_HEXTILE`] (5): Tiled encoding with sub-rectangles
//!
//! Vendor rectangles (`WMVd` .. `WMVi`) carry cursor shape, cursor
//! visibility, cursor position, keyboard state, VM state and the pixel format.
//!
//! # Example
//!
//! ```
//! use rfb_encodings::{DecoderState, ENCODING_PIXEL_FORMAT, ENCODING_RAW};
//! use rfb_protocol::{PixelFormatDescriptor, RecordHeader, Rectangle, RfbWriter};
//!
//! let mut out = RfbWriter::new();
//! RecordHeader { tag: 0, rectangles: 2 }.write_to(&mut out);
//! Rectangle { x: 0, y: 0, width: 2, height: 1, encoding: ENCODING_PIXEL_FORMAT }.write_to(&mut out);
//! PixelFormatDescriptor::new(8, 8, false, true, (7, 7, 3), (0, 3, 6)).write_to(&mut out);
//! Rectangle { x: 0, y: 0, width: 2, height: 1, encoding: ENCODING_RAW }.write_to(&mut out);
//! out.write_bytes(&[0x07, 0xC0]);
//! let record = out.freeze();
//!
//! let mut state = DecoderState::new();
//! assert_eq!(state.probe(&record).unwrap(), record.len());
//! let outcome = state.apply(&record).unwrap();
//! assert!(outcome.format_changed);
//! assert_eq!(state.framebuffer().unwrap().row(0), &[0x07, 0xC0]);
//! ```

use rfb_common::Rect;
use rfb_pixelbuffer::stride_for;

pub use rfb_pixelbuffer::{FrameBuffer, PixelFormat};
pub use rfb_protocol::messages::{
    ENCODING_COPYRECT, ENCODING_CURSOR_POSITION, ENCODING_CURSOR_SHAPE,
    ENCODING_CURSOR_VISIBILITY, ENCODING_HEXTILE, ENCODING_KEYBOARD_STATE, ENCODING_PIXEL_FORMAT,
    ENCODING_RAW, ENCODING_VM_STATE,
};
pub use rfb_protocol::{DecodeError, Rectangle, RfbReader};

// Pixel rectangles
pub mod raw;
pub use raw::RawDecoder;

pub mod copyrect;
pub use copyrect::CopyRectDecoder;

pub mod hextile;
pub use hextile::{HextileDecoder, TileFlags};

// Vendor rectangles
pub mod format;
pub use format::PixelFormatDecoder;

pub mod cursor;
pub use cursor::{
    CursorBitmap, CursorImage, CursorKind, CursorPixels, CursorPositionDecoder, CursorShape,
    CursorShapeDecoder, CursorState, CursorVisibilityDecoder,
};

pub mod vmstate;
pub use vmstate::{KeyboardStateDecoder, VmStateDecoder};

// Traversal
pub mod sink;
pub use sink::{ApplySink, ProbeSink, RectSink};

pub mod record;
pub use record::{DecoderState, RecordOutcome, RecordParser};

/// Core trait for all rectangle decoders.
///
/// # Contract
///
/// Implementors must:
/// - Read exactly the payload bytes their encoding defines, starting at the
///   reader's current position (just past the rectangle header)
/// - Validate everything before calling the sink, so that an error never
///   follows a partial effect for the same rectangle
/// - Describe effects only through the sink, never through other state
pub trait RectDecoder {
    /// Decode one rectangle's payload.
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError>;
}

/// The closed set of rectangle kinds a record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RectKind {
    Raw,
    CopyRect,
    Hextile,
    PixelFormat,
    CursorShape,
    CursorVisibility,
    CursorPosition,
    KeyboardState,
    VmState,
}

impl RectKind {
    /// Look up the kind for an encoding tag.
    pub fn from_encoding(encoding: u32) -> Option<Self> {
        Some(match encoding {
            ENCODING_RAW => Self::Raw,
            ENCODING_COPYRECT => Self::CopyRect,
            ENCODING_HEXTILE => Self::Hextile,
            ENCODING_PIXEL_FORMAT => Self::PixelFormat,
            ENCODING_CURSOR_SHAPE => Self::CursorShape,
            ENCODING_CURSOR_VISIBILITY => Self::CursorVisibility,
            ENCODING_CURSOR_POSITION => Self::CursorPosition,
            ENCODING_KEYBOARD_STATE => Self::KeyboardState,
            ENCODING_VM_STATE => Self::VmState,
            _ => return None,
        })
    }

    /// Whether the rectangle must fit an established framebuffer.
    ///
    /// Only the format rectangle may arrive before a format exists, and its
    /// size declares the framebuffer rather than addressing it.
    pub fn requires_format(self) -> bool {
        !matches!(self, Self::PixelFormat)
    }

    /// Run the matching decoder, returning the number of payload bytes consumed.
    pub fn decode<S: RectSink>(
        self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<usize, DecodeError> {
        let start = reader.position();
        match self {
            Self::Raw => RawDecoder.decode(rect, reader, view, sink),
            Self::CopyRect => CopyRectDecoder.decode(rect, reader, view, sink),
            Self::Hextile => HextileDecoder.decode(rect, reader, view, sink),
            Self::PixelFormat => PixelFormatDecoder.decode(rect, reader, view, sink),
            Self::CursorShape => CursorShapeDecoder.decode(rect, reader, view, sink),
            Self::CursorVisibility => CursorVisibilityDecoder.decode(rect, reader, view, sink),
            Self::CursorPosition => CursorPositionDecoder.decode(rect, reader, view, sink),
            Self::KeyboardState => KeyboardStateDecoder.decode(rect, reader, view, sink),
            Self::VmState => VmStateDecoder.decode(rect, reader, view, sink),
        }?;
        Ok(reader.position() - start)
    }
}

/// Default cap on framebuffer storage: 256 MiB.
pub const DEFAULT_MAX_FRAMEBUFFER_BYTES: usize = 256 * 1024 * 1024;

/// The pixel format and framebuffer size in effect at a point in a record.
///
/// A record starts from the decoder's committed state; format rectangles
/// replace the view as they are traversed. Probe and apply passes therefore
/// size every later rectangle identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatView {
    format: Option<PixelFormat>,
    width: u32,
    height: u32,
    max_framebuffer_bytes: usize,
}

impl Default for FormatView {
    fn default() -> Self {
        Self {
            format: None,
            width: 0,
            height: 0,
            max_framebuffer_bytes: DEFAULT_MAX_FRAMEBUFFER_BYTES,
        }
    }
}

impl FormatView {
    /// View with no established format.
    pub fn empty() -> Self {
        Self::default()
    }

    /// View of an existing framebuffer, or empty when there is none.
    pub fn of(framebuffer: Option<&FrameBuffer>) -> Self {
        match framebuffer {
            Some(fb) => Self {
                format: Some(*fb.format()),
                width: fb.width(),
                height: fb.height(),
                ..Self::default()
            },
            None => Self::empty(),
        }
    }

    /// Cap the framebuffer size a format rectangle may declare.
    pub fn with_max_framebuffer_bytes(mut self, max_framebuffer_bytes: usize) -> Self {
        self.max_framebuffer_bytes = max_framebuffer_bytes;
        self
    }

    pub fn max_framebuffer_bytes(&self) -> usize {
        self.max_framebuffer_bytes
    }

    /// Check that a `width x height` framebuffer in `format` fits the cap.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` when the padded storage size overflows or exceeds
    /// the cap.
    pub fn check_allocation(
        &self,
        format: &PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<(), DecodeError> {
        let size = stride_for(width, format.bytes_per_pixel()).checked_mul(height as usize);
        match size {
            Some(size) if size <= self.max_framebuffer_bytes => Ok(()),
            _ => Err(DecodeError::invalid(format!(
                "framebuffer {}x{} at {} bpp exceeds the {} byte limit",
                width, height, format.bits_per_pixel, self.max_framebuffer_bytes
            ))),
        }
    }

    /// The active pixel format.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` before the first format rectangle.
    pub fn format(&self) -> Result<&PixelFormat, DecodeError> {
        self.format
            .as_ref()
            .ok_or_else(|| DecodeError::invalid("rectangle before any pixel format"))
    }

    pub fn is_established(&self) -> bool {
        self.format.is_some()
    }

    /// Bytes per pixel of the active format.
    pub fn bytes_per_pixel(&self) -> Result<usize, DecodeError> {
        Ok(self.format()?.bytes_per_pixel() as usize)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Replace the format and dimensions.
    pub fn replace(&mut self, format: PixelFormat, width: u32, height: u32) {
        self.format = Some(format);
        self.width = width;
        self.height = height;
    }

    /// Check that a rectangle lies inside the framebuffer.
    pub fn check_bounds(&self, rect: Rect, what: &str) -> Result<(), DecodeError> {
        if !rect.fits_within(self.width, self.height) {
            return Err(DecodeError::invalid(format!(
                "{} {:?} exceeds framebuffer {}x{}",
                what, rect, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// `width * height * bytes_per_pixel` without overflow.
pub(crate) fn pixel_bytes(width: u16, height: u16, bytes_per_pixel: usize) -> Result<usize, DecodeError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(bytes_per_pixel))
        .ok_or_else(|| DecodeError::invalid("pixel payload length overflows"))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Record builders shared by the decoder tests.

    use super::*;
    use rfb_protocol::{PixelFormatDescriptor, RecordHeader, RfbWriter};

    /// 8bpp true-colour descriptor.
    pub fn bgr233() -> PixelFormatDescriptor {
        PixelFormatDescriptor::new(8, 8, false, true, (7, 7, 3), (0, 3, 6))
    }

    /// 32bpp little-endian true-colour descriptor.
    pub fn rgb888() -> PixelFormatDescriptor {
        PixelFormatDescriptor::new(32, 24, false, true, (255, 255, 255), (16, 8, 0))
    }

    /// Builds one record from rectangles and payloads.
    #[derive(Default)]
    pub struct RecordBuilder {
        rects: Vec<(Rectangle, Vec<u8>)>,
    }

    impl RecordBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rect(mut self, x: u16, y: u16, width: u16, height: u16, encoding: u32, payload: &[u8]) -> Self {
            self.rects.push((
                Rectangle { x, y, width, height, encoding },
                payload.to_vec(),
            ));
            self
        }

        pub fn format(self, width: u16, height: u16, descriptor: PixelFormatDescriptor) -> Self {
            self.rect(0, 0, width, height, ENCODING_PIXEL_FORMAT, descriptor.as_bytes())
        }

        pub fn build(self) -> Vec<u8> {
            let mut out = RfbWriter::new();
            RecordHeader {
                tag: 0,
                rectangles: self.rects.len() as u16,
            }
            .write_to(&mut out);
            for (rect, payload) in &self.rects {
                rect.write_to(&mut out);
                out.write_bytes(payload);
            }
            out.freeze().to_vec()
        }
    }

    /// Decoder state with an established format and framebuffer.
    pub fn state_with_format(width: u16, height: u16, descriptor: PixelFormatDescriptor) -> DecoderState {
        let mut state = DecoderState::new();
        let record = RecordBuilder::new().format(width, height, descriptor).build();
        state.apply(&record).expect("format record applies");
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        for (encoding, kind) in [
            (ENCODING_RAW, RectKind::Raw),
            (ENCODING_COPYRECT, RectKind::CopyRect),
            (ENCODING_HEXTILE, RectKind::Hextile),
            (ENCODING_PIXEL_FORMAT, RectKind::PixelFormat),
            (ENCODING_CURSOR_SHAPE, RectKind::CursorShape),
            (ENCODING_CURSOR_VISIBILITY, RectKind::CursorVisibility),
            (ENCODING_CURSOR_POSITION, RectKind::CursorPosition),
            (ENCODING_KEYBOARD_STATE, RectKind::KeyboardState),
            (ENCODING_VM_STATE, RectKind::VmState),
        ] {
            assert_eq!(RectKind::from_encoding(encoding), Some(kind));
        }
    }

    #[test]
    fn test_unknown_encodings() {
        for encoding in [2u32, 7, 16, 0x574D_5663, 0x574D_566A, 0xFFFF_FF20] {
            assert_eq!(RectKind::from_encoding(encoding), None);
        }
    }

    #[test]
    fn test_only_format_skips_bounds() {
        assert!(!RectKind::PixelFormat.requires_format());
        assert!(RectKind::CursorPosition.requires_format());
        assert!(RectKind::Raw.requires_format());
    }

    #[test]
    fn test_format_view_empty() {
        let view = FormatView::empty();
        assert!(!view.is_established());
        assert!(matches!(view.format(), Err(DecodeError::InvalidRecord(_))));
    }

    #[test]
    fn test_format_view_bounds() {
        let mut view = FormatView::empty();
        view.replace(PixelFormat::bgr233(), 4, 4);
        assert!(view.check_bounds(Rect::new(0, 0, 4, 4), "rect").is_ok());
        assert!(view.check_bounds(Rect::new(1, 0, 4, 4), "rect").is_err());
        assert!(view.check_bounds(Rect::new(0, 0, 0, 0), "rect").is_ok());
        assert_eq!(view.bytes_per_pixel().unwrap(), 1);
    }

    #[test]
    fn test_format_view_allocation_cap() {
        let format = PixelFormat::rgb888();
        let view = FormatView::empty().with_max_framebuffer_bytes(64);
        assert!(view.check_allocation(&format, 4, 4).is_ok());
        assert!(matches!(
            view.check_allocation(&format, 4, 5),
            Err(DecodeError::InvalidRecord(_))
        ));
        // Rows are padded to four bytes.
        let view = FormatView::empty().with_max_framebuffer_bytes(8);
        assert!(view.check_allocation(&PixelFormat::bgr233(), 5, 1).is_ok());
        assert!(view.check_allocation(&PixelFormat::bgr233(), 5, 2).is_err());
        assert!(view.check_allocation(&PixelFormat::bgr233(), 0, 1000).is_ok());
    }

    #[test]
    fn test_format_view_default_cap() {
        let view = FormatView::empty();
        assert_eq!(view.max_framebuffer_bytes(), DEFAULT_MAX_FRAMEBUFFER_BYTES);
        assert!(view
            .check_allocation(&PixelFormat::rgb888(), u16::MAX as u32, u16::MAX as u32)
            .is_err());
    }

    #[test]
    fn test_pixel_bytes() {
        assert_eq!(pixel_bytes(4, 4, 4).unwrap(), 64);
        assert_eq!(pixel_bytes(0, 100, 4).unwrap(), 0);
    }
}
