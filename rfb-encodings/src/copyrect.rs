//! CopyRect encoding decoder - copy rectangle from another framebuffer location.
//!
//! CopyRect encoding (type 1) instructs the decoder to copy a block from one
//! location of the framebuffer to another.
//!
//! # Wire Format
//!
//! ```text
//! +----------+----------+
//! | src_x    | src_y    |  2 bytes each (u16, network byte order)
//! +----------+----------+
//! ```
//!
//! The rectangle's `x`, `y`, `width`, and `height` fields specify the **destination**
//! rectangle. The `src_x` and `src_y` fields specify the **source** location.
//!
//! # Overlapping Rectangles
//!
//! Source and destination may overlap. The framebuffer picks the row order from
//! the relative vertical position of the two blocks and moves each row with
//! `memmove` semantics.

use crate::{DecodeError, FormatView, RectDecoder, RectSink, Rectangle, RfbReader};
use rfb_common::{Point, Rect};

/// Decoder for CopyRect encoding - copy pixels from another framebuffer location.
pub struct CopyRectDecoder;

impl RectDecoder for CopyRectDecoder {
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        reader.ensure(4)?;
        let src_x = reader.read_u16()?;
        let src_y = reader.read_u16()?;

        let source = Rect::from_wire(src_x, src_y, rect.width, rect.height);
        view.check_bounds(source, "copy source")?;

        if rect.width == 0 || rect.height == 0 || (src_x == rect.x && src_y == rect.y) {
            return Ok(());
        }
        sink.copy_rect(rect.bounds(), Point::new(src_x as i32, src_y as i32))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{bgr233, state_with_format, RecordBuilder};
    use crate::{DecodeError, DecoderState, ENCODING_COPYRECT, ENCODING_RAW};
    use pretty_assertions::assert_eq;

    /// 4x4 8bpp state with pixel (x, y) = y * 16 + x.
    fn numbered() -> DecoderState {
        let mut state = state_with_format(4, 4, bgr233());
        let pixels: Vec<u8> = (0..4u8)
            .flat_map(|y| (0..4u8).map(move |x| y * 16 + x))
            .collect();
        let record = RecordBuilder::new()
            .rect(0, 0, 4, 4, ENCODING_RAW, &pixels)
            .build();
        state.apply(&record).unwrap();
        state
    }

    fn rows(state: &DecoderState) -> Vec<Vec<u8>> {
        let fb = state.framebuffer().unwrap();
        (0..fb.height()).map(|y| fb.row(y).to_vec()).collect()
    }

    #[test]
    fn test_copy_quadrant() {
        let mut state = numbered();
        let record = RecordBuilder::new()
            .rect(2, 0, 2, 2, ENCODING_COPYRECT, &[0, 0, 0, 0])
            .build();
        state.apply(&record).unwrap();
        assert_eq!(rows(&state)[0], vec![0, 1, 0, 1]);
        assert_eq!(rows(&state)[1], vec![16, 17, 16, 17]);
    }

    #[test]
    fn test_self_copy_is_noop() {
        let mut state = numbered();
        let before = rows(&state);
        let record = RecordBuilder::new()
            .rect(1, 1, 2, 2, ENCODING_COPYRECT, &[0, 1, 0, 1])
            .build();
        state.apply(&record).unwrap();
        assert_eq!(rows(&state), before);
    }

    #[test]
    fn test_copy_one_pixel_right() {
        let mut state = numbered();
        let record = RecordBuilder::new()
            .rect(1, 0, 3, 4, ENCODING_COPYRECT, &[0, 0, 0, 0])
            .build();
        state.apply(&record).unwrap();
        assert_eq!(
            rows(&state),
            vec![
                vec![0, 0, 1, 2],
                vec![16, 16, 17, 18],
                vec![32, 32, 33, 34],
                vec![48, 48, 49, 50],
            ]
        );
    }

    #[test]
    fn test_source_out_of_bounds() {
        let mut state = numbered();
        let before = rows(&state);
        let record = RecordBuilder::new()
            .rect(0, 0, 2, 2, ENCODING_COPYRECT, &[0, 3, 0, 0])
            .build();
        assert!(matches!(state.apply(&record), Err(DecodeError::InvalidRecord(_))));
        assert_eq!(rows(&state), before);
    }

    #[test]
    fn test_short_payload() {
        let state = numbered();
        let record = RecordBuilder::new()
            .rect(0, 0, 2, 2, ENCODING_COPYRECT, &[0, 3])
            .build();
        assert_eq!(
            state.probe(&record),
            Err(DecodeError::InsufficientData { needed: record.len() + 2 })
        );
    }
}
