//! Record traversal and committed decoder state.
//!
//! [`RecordParser::parse`] walks one record: header, then for each rectangle
//! the 12-byte header, kind lookup, bounds check and the kind's decoder. The
//! same traversal runs for probing and applying; only the sink differs.
//!
//! [`DecoderState`] owns what survives between records (the framebuffer,
//! which carries the pixel format, and the cursor) and offers the two modes:
//! [`DecoderState::probe`] measures a record without side effects and
//! [`DecoderState::apply`] commits it.

use crate::cursor::CursorState;
use crate::sink::{ApplySink, ProbeSink, RectSink};
use crate::{
    DecodeError, FormatView, FrameBuffer, PixelFormat, RectKind, DEFAULT_MAX_FRAMEBUFFER_BYTES,
};
use rfb_protocol::messages::encoding_name;
use rfb_protocol::{RecordHeader, Rectangle, RfbReader};
use tracing::debug;

/// Walks the rectangles of a record.
pub struct RecordParser;

impl RecordParser {
    /// Traverse the record at the start of `bytes`, reporting effects to `sink`.
    ///
    /// Returns the record's total length. `view` starts as the committed format
    /// and follows any format rectangles in the record.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` when `bytes` ends inside the record; its `needed`
    ///   is the shortest total length that could get further
    /// - `InvalidRecord` for an unknown record tag or encoding, a rectangle
    ///   before any pixel format or outside the framebuffer, or a malformed
    ///   payload
    pub fn parse<S: RectSink>(
        bytes: &[u8],
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<usize, DecodeError> {
        let mut reader = RfbReader::new(bytes);
        let header = RecordHeader::read_from(&mut reader)?;
        debug!(
            target: "rfb_encodings::framing",
            "Record start: rectangles={} available={}",
            header.rectangles,
            bytes.len()
        );

        for index in 0..header.rectangles {
            let rect = Rectangle::read_from(&mut reader)?;
            let kind = RectKind::from_encoding(rect.encoding).ok_or_else(|| {
                DecodeError::invalid(format!(
                    "unknown encoding {} in rectangle {}",
                    encoding_name(rect.encoding),
                    index
                ))
            })?;

            if kind.requires_format() {
                view.format()?;
                view.check_bounds(rect.bounds(), "rectangle")?;
            }

            let offset = reader.position();
            let consumed = kind.decode(&rect, &mut reader, view, sink)?;
            debug!(
                target: "rfb_encodings::framing",
                "Rectangle {} {}: offset={} bytes_consumed={}",
                index,
                rect,
                offset,
                consumed
            );
        }

        debug!(
            target: "rfb_encodings::framing",
            "Record end: length={}",
            reader.position()
        );
        Ok(reader.position())
    }
}

/// Result of applying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Total record length in bytes.
    pub length: usize,
    /// Whether a format rectangle replaced the framebuffer.
    pub format_changed: bool,
}

/// State that persists across records.
#[derive(Debug, Clone)]
pub struct DecoderState {
    framebuffer: Option<FrameBuffer>,
    cursor: CursorState,
    max_framebuffer_bytes: usize,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            framebuffer: None,
            cursor: CursorState::default(),
            max_framebuffer_bytes: DEFAULT_MAX_FRAMEBUFFER_BYTES,
        }
    }
}

impl DecoderState {
    /// Empty state: no format, no framebuffer, hidden cursor without an image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty state whose format rectangles may not declare a framebuffer
    /// larger than `max_framebuffer_bytes`.
    pub fn with_max_framebuffer_bytes(max_framebuffer_bytes: usize) -> Self {
        Self {
            max_framebuffer_bytes,
            ..Self::default()
        }
    }

    pub fn max_framebuffer_bytes(&self) -> usize {
        self.max_framebuffer_bytes
    }

    /// The framebuffer, once a format has been established.
    pub fn framebuffer(&self) -> Option<&FrameBuffer> {
        self.framebuffer.as_ref()
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    /// The active pixel format, once established.
    pub fn pixel_format(&self) -> Option<&PixelFormat> {
        self.framebuffer.as_ref().map(FrameBuffer::format)
    }

    /// Discard the framebuffer and cursor. The size cap is kept.
    pub fn reset(&mut self) {
        self.framebuffer = None;
        self.cursor = CursorState::default();
    }

    fn view(&self) -> FormatView {
        FormatView::of(self.framebuffer.as_ref())
            .with_max_framebuffer_bytes(self.max_framebuffer_bytes)
    }

    /// Measure the record at the start of `bytes` without changing anything.
    pub fn probe(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        let mut view = self.view();
        RecordParser::parse(bytes, &mut view, &mut ProbeSink)
    }

    /// Apply the record at the start of `bytes`.
    ///
    /// The record is probed first, so an incomplete or invalid record leaves
    /// the state exactly as it was.
    pub fn apply(&mut self, bytes: &[u8]) -> Result<RecordOutcome, DecodeError> {
        let length = self.probe(bytes)?;

        let mut view = self.view();
        let mut sink = ApplySink::new(&mut self.framebuffer, &mut self.cursor);
        let applied = RecordParser::parse(&bytes[..length], &mut view, &mut sink)?;
        debug_assert_eq!(applied, length);

        Ok(RecordOutcome {
            length,
            format_changed: sink.format_changed(),
        })
    }

    /// Probe (`apply == false`) or apply the record at the start of `bytes`,
    /// returning its length.
    pub fn parse(&mut self, bytes: &[u8], apply: bool) -> Result<usize, DecodeError> {
        if apply {
            self.apply(bytes).map(|outcome| outcome.length)
        } else {
            self.probe(bytes)
        }
    }
}
