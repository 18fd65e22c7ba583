//! `WMVi` pixel format rectangles.
//!
//! The payload is a 16-byte pixel format descriptor; the rectangle's width and
//! height are the new framebuffer dimensions and its position must be the
//! origin. A descriptor whose significant bytes and dimensions match the
//! format already in effect changes nothing. Anything else replaces the format
//! wholesale and reallocates a zeroed framebuffer, provided the new storage
//! fits the view's size cap.

use crate::{DecodeError, FormatView, PixelFormat, RectDecoder, RectSink, Rectangle, RfbReader};
use rfb_protocol::PixelFormatDescriptor;
use tracing::debug;

/// Decoder for `WMVi` pixel format rectangles.
pub struct PixelFormatDecoder;

impl RectDecoder for PixelFormatDecoder {
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        let descriptor = PixelFormatDescriptor::read_from(reader)?;

        if rect.x != 0 || rect.y != 0 {
            return Err(DecodeError::invalid(format!(
                "pixel format rectangle at ({}, {}) instead of the origin",
                rect.x, rect.y
            )));
        }

        let width = rect.width as u32;
        let height = rect.height as u32;
        if let Ok(current) = view.format() {
            if current.descriptor().significant_bytes() == descriptor.significant_bytes()
                && view.dimensions() == (width, height)
            {
                debug!(
                    target: "rfb_encodings::framing",
                    "Pixel format unchanged: {}x{}", width, height
                );
                return Ok(());
            }
        }

        let format = PixelFormat::from_descriptor(descriptor)?;
        view.check_allocation(&format, width, height)?;
        debug!(
            target: "rfb_encodings::framing",
            "Pixel format: {}x{} bpp={} depth={} big_endian={} masks=({:#x}, {:#x}, {:#x})",
            width,
            height,
            format.bits_per_pixel,
            format.depth,
            format.big_endian,
            format.red_mask(),
            format.green_mask(),
            format.blue_mask()
        );
        view.replace(format, width, height);
        sink.set_pixel_format(format, width, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{bgr233, rgb888, state_with_format, RecordBuilder};
    use crate::{DecodeError, DecoderState, ENCODING_PIXEL_FORMAT, ENCODING_RAW};
    use rfb_pixelbuffer::stride_for;
    use rfb_protocol::PixelFormatDescriptor;

    #[test]
    fn test_first_format_allocates_zeroed_framebuffer() {
        for (w, h, desc, bpp) in [(5u16, 3u16, bgr233(), 1u8), (7, 2, rgb888(), 4)] {
            let mut state = DecoderState::new();
            let record = RecordBuilder::new().format(w, h, desc).build();
            let outcome = state.apply(&record).unwrap();
            assert!(outcome.format_changed);

            let fb = state.framebuffer().unwrap();
            assert_eq!(fb.dimensions(), (w as u32, h as u32));
            assert_eq!(fb.data().len(), stride_for(w as u32, bpp) * h as usize);
            assert!(fb.data().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_identical_format_is_noop() {
        let mut state = state_with_format(2, 1, bgr233());
        let paint = RecordBuilder::new().rect(0, 0, 2, 1, ENCODING_RAW, &[4, 5]).build();
        state.apply(&paint).unwrap();

        // Only padding differs.
        let mut raw = *bgr233().as_bytes();
        raw[14] = 0xEE;
        let record = RecordBuilder::new()
            .format(2, 1, PixelFormatDescriptor::from_bytes(raw))
            .build();
        let outcome = state.apply(&record).unwrap();
        assert!(!outcome.format_changed);
        assert_eq!(outcome.length, record.len());
        assert_eq!(state.framebuffer().unwrap().row(0), &[4, 5]);
    }

    #[test]
    fn test_new_dimensions_reallocate() {
        let mut state = state_with_format(2, 1, bgr233());
        let paint = RecordBuilder::new().rect(0, 0, 2, 1, ENCODING_RAW, &[4, 5]).build();
        state.apply(&paint).unwrap();

        let record = RecordBuilder::new().format(3, 2, bgr233()).build();
        assert!(state.apply(&record).unwrap().format_changed);
        let fb = state.framebuffer().unwrap();
        assert_eq!(fb.dimensions(), (3, 2));
        assert!(fb.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_new_descriptor_replaces_format() {
        let mut state = state_with_format(2, 2, bgr233());
        let record = RecordBuilder::new().format(2, 2, rgb888()).build();
        assert!(state.apply(&record).unwrap().format_changed);
        assert_eq!(state.pixel_format().unwrap().bits_per_pixel, 32);
    }

    #[test]
    fn test_not_at_origin() {
        let state = DecoderState::new();
        let record = RecordBuilder::new()
            .rect(1, 0, 4, 4, ENCODING_PIXEL_FORMAT, bgr233().as_bytes())
            .build();
        assert!(matches!(state.probe(&record), Err(DecodeError::InvalidRecord(_))));
    }

    #[test]
    fn test_unsupported_formats() {
        let state = DecoderState::new();
        for desc in [
            PixelFormatDescriptor::new(24, 24, false, true, (255, 255, 255), (16, 8, 0)),
            PixelFormatDescriptor::new(8, 8, false, false, (0, 0, 0), (0, 0, 0)),
        ] {
            let record = RecordBuilder::new().format(4, 4, desc).build();
            assert!(matches!(state.probe(&record), Err(DecodeError::InvalidRecord(_))));
        }
    }

    #[test]
    fn test_short_descriptor() {
        let state = DecoderState::new();
        let record = RecordBuilder::new()
            .rect(0, 0, 4, 4, ENCODING_PIXEL_FORMAT, &bgr233().as_bytes()[..10])
            .build();
        assert_eq!(
            state.probe(&record),
            Err(DecodeError::InsufficientData { needed: record.len() + 6 })
        );
    }

    #[test]
    fn test_oversized_framebuffer_rejected() {
        // 4x4 at 32bpp needs 64 bytes.
        let record = RecordBuilder::new().format(4, 4, rgb888()).build();

        let mut state = DecoderState::with_max_framebuffer_bytes(63);
        assert!(matches!(state.probe(&record), Err(DecodeError::InvalidRecord(_))));
        assert!(matches!(state.apply(&record), Err(DecodeError::InvalidRecord(_))));
        assert!(state.framebuffer().is_none());

        let mut state = DecoderState::with_max_framebuffer_bytes(64);
        assert_eq!(state.probe(&record).unwrap(), record.len());
        assert!(state.apply(&record).unwrap().format_changed);
    }

    #[test]
    fn test_oversized_framebuffer_keeps_current_format() {
        let mut state = state_with_format(2, 1, bgr233());
        let paint = RecordBuilder::new().rect(0, 0, 2, 1, ENCODING_RAW, &[4, 5]).build();
        state.apply(&paint).unwrap();

        let huge = RecordBuilder::new().format(u16::MAX, u16::MAX, rgb888()).build();
        assert!(matches!(state.apply(&huge), Err(DecodeError::InvalidRecord(_))));
        assert_eq!(state.pixel_format().unwrap().bits_per_pixel, 8);
        assert_eq!(state.framebuffer().unwrap().row(0), &[4, 5]);
    }

    #[test]
    fn test_format_sizes_later_rectangles_in_probe() {
        // The probe pass must size the raw rectangle with the new 32bpp format.
        let state = state_with_format(2, 1, bgr233());
        let record = RecordBuilder::new()
            .format(2, 1, rgb888())
            .rect(0, 0, 2, 1, ENCODING_RAW, &[1; 8])
            .build();
        assert_eq!(state.probe(&record).unwrap(), record.len());
        assert_eq!(state.pixel_format().unwrap().bits_per_pixel, 8);
    }
}
