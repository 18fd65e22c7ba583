//! Property tests for header framing.
//!
//! A truncated header must always report `InsufficientData` with a length
//! beyond what was supplied, and a complete one must parse identically no
//! matter how much trailing data follows.

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use crate::io::{RfbReader, RfbWriter};
    use crate::DecodeError;
    use proptest::prelude::*;

    fn arbitrary_rectangle() -> impl Strategy<Value = Rectangle> {
        (
            any::<u16>(),
            any::<u16>(),
            any::<u16>(),
            any::<u16>(),
            prop::sample::select(vec![
                ENCODING_RAW,
                ENCODING_COPYRECT,
                ENCODING_HEXTILE,
                ENCODING_CURSOR_SHAPE,
                ENCODING_PIXEL_FORMAT,
            ]),
        )
            .prop_map(|(x, y, width, height, encoding)| Rectangle {
                x,
                y,
                width,
                height,
                encoding,
            })
    }

    proptest! {
        /// Every strict prefix of a rectangle header is insufficient.
        #[test]
        fn test_rectangle_truncation(rect in arbitrary_rectangle(), cut in 0usize..RECTANGLE_HEADER_LEN) {
            let mut writer = RfbWriter::new();
            rect.write_to(&mut writer);
            let bytes = writer.freeze();

            let mut reader = RfbReader::new(&bytes[..cut]);
            match Rectangle::read_from(&mut reader) {
                Err(DecodeError::InsufficientData { needed }) => prop_assert!(needed > cut),
                other => prop_assert!(false, "unexpected result {:?}", other),
            }
        }

        /// Trailing payload bytes never change how a header parses.
        #[test]
        fn test_rectangle_with_trailing_payload(
            rect in arbitrary_rectangle(),
            payload in prop::collection::vec(any::<u8>(), 0..64)
        ) {
            let mut writer = RfbWriter::new();
            rect.write_to(&mut writer);
            writer.write_bytes(&payload);
            let bytes = writer.freeze();

            let mut reader = RfbReader::new(&bytes);
            prop_assert_eq!(Rectangle::read_from(&mut reader).unwrap(), rect);
            prop_assert_eq!(reader.remaining(), payload.len());
        }

        /// Record headers parse for every rectangle count.
        #[test]
        fn test_record_header_counts(count in any::<u16>()) {
            let header = RecordHeader { tag: RECORD_TAG_RECTANGLES, rectangles: count };
            let mut writer = RfbWriter::new();
            header.write_to(&mut writer);
            let bytes = writer.freeze();

            let mut reader = RfbReader::new(&bytes);
            prop_assert_eq!(RecordHeader::read_from(&mut reader).unwrap(), header);
            prop_assert_eq!(reader.position(), RECORD_HEADER_LEN);
        }
    }
}
