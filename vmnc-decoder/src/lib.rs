//! Incremental VMnc stream decoder.
//!
//! This crate turns a VMnc byte stream, delivered in arbitrarily sized
//! chunks, into a sequence of composited frames. It is built on the record
//! traversal and rectangle decoders of `rfb-encodings`.
//!
//! # Features
//!
//! - **Chunk-agnostic input**: [`VmncDecoder::feed`] buffers partial records
//!   and reports how many more bytes the next record needs
//! - **Atomic records**: a record is applied completely or not at all
//! - **Cursor compositing**: colour cursors are drawn over each output frame
//! - **Frame timing**: an optional frame rate stamps presentation times
//!
//! # Quick Start
//!
//! ```
//! use rfb_encodings::{ENCODING_PIXEL_FORMAT, ENCODING_RAW};
//! use rfb_protocol::{PixelFormatDescriptor, RecordHeader, Rectangle, RfbWriter};
//! use vmnc_decoder::{DecoderConfig, Event, VmncDecoder};
//!
//! let mut out = RfbWriter::new();
//! RecordHeader { tag: 0, rectangles: 2 }.write_to(&mut out);
//! Rectangle { x: 0, y: 0, width: 2, height: 1, encoding: ENCODING_PIXEL_FORMAT }.write_to(&mut out);
//! PixelFormatDescriptor::new(8, 8, false, true, (7, 7, 3), (0, 3, 6)).write_to(&mut out);
//! Rectangle { x: 0, y: 0, width: 2, height: 1, encoding: ENCODING_RAW }.write_to(&mut out);
//! out.write_bytes(&[0x07, 0xC0]);
//! let record = out.freeze();
//!
//! let mut decoder = VmncDecoder::new(DecoderConfig::default());
//! let (head, tail) = record.split_at(10);
//! // The first rectangle header alone ends at byte 16.
//! assert_eq!(decoder.feed(head), vec![Event::NeedMoreBytes(6)]);
//!
//! let events = decoder.feed(tail);
//! assert!(matches!(events[0], Event::FormatChanged { width: 2, height: 1, .. }));
//! match &events[1] {
//!     Event::FrameReady(frame) => assert_eq!(frame.row(0), Some(&[0x07, 0xC0][..])),
//!     other => panic!("unexpected event {other:?}"),
//! }
//! ```
//!
//! # Error Handling
//!
//! Running out of input is never an error: it produces
//! [`Event::NeedMoreBytes`]. A malformed record produces [`Event::Error`] and
//! latches the session as failed. The decoder does not search for a later
//! record boundary; call [`VmncDecoder::reset`] to start over.

#![forbid(unsafe_code)]

pub mod compositor;
pub mod config;
pub mod errors;
pub mod messages;

pub use compositor::Compositor;
pub use config::{DecoderConfig, Framerate};
pub use errors::ConfigError;
pub use messages::{Event, Frame, SessionStats};
pub use rfb_protocol::DecodeError;

use bytes::{Buf, Bytes, BytesMut};
use rfb_encodings::{CursorState, DecoderState, FrameBuffer, PixelFormat};
use tracing::{debug, warn};

/// A decoding session over one VMnc stream.
///
/// Owns the framebuffer and cursor state for the lifetime of the stream.
#[derive(Debug)]
pub struct VmncDecoder {
    config: DecoderConfig,
    state: DecoderState,
    compositor: Compositor,
    buffer: BytesMut,
    failure: Option<DecodeError>,
    stats: SessionStats,
}

impl VmncDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        let state = DecoderState::with_max_framebuffer_bytes(config.max_framebuffer_bytes);
        Self {
            config,
            state,
            compositor: Compositor::new(),
            buffer: BytesMut::new(),
            failure: None,
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Appends `bytes` to the stream and decodes every complete record.
    ///
    /// Each applied record yields a [`Event::FrameReady`], preceded by
    /// [`Event::FormatChanged`] when the record changed the format. If the
    /// buffered input ends inside a record the last event is
    /// [`Event::NeedMoreBytes`]. Once the stream has failed every call returns
    /// the same [`Event::Error`].
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        if let Some(error) = &self.failure {
            return vec![Event::Error(error.clone())];
        }

        self.buffer.extend_from_slice(bytes);
        let mut buffer = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();

        while !buffer.is_empty() {
            match self.decode_record(&buffer) {
                Ok((length, record_events)) => {
                    buffer.advance(length);
                    events.extend(record_events);
                }
                Err(error) if error.is_recoverable() => {
                    events.push(Event::NeedMoreBytes(error.missing_bytes(buffer.len())));
                    break;
                }
                Err(error) => {
                    buffer.clear();
                    events.push(Event::Error(error));
                    break;
                }
            }
        }

        self.buffer = buffer;
        events
    }

    /// Measures the record at the start of `bytes` without changing anything.
    pub fn probe(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.state.probe(bytes)
    }

    /// Applies the record at the start of `bytes`, bypassing the input buffer.
    ///
    /// Returns the record length and the events it produced. An
    /// `InsufficientData` error leaves the session untouched; an
    /// `InvalidRecord` error fails it.
    pub fn decode_record(&mut self, bytes: &[u8]) -> Result<(usize, Vec<Event>), DecodeError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let outcome = match self.state.apply(bytes) {
            Ok(outcome) => outcome,
            Err(DecodeError::InsufficientData { needed }) if needed > self.config.max_buffered_bytes => {
                return Err(self.fail(DecodeError::invalid(format!(
                    "record needs at least {} bytes, more than the {} byte buffer limit",
                    needed, self.config.max_buffered_bytes
                ))));
            }
            Err(error) if error.is_recoverable() => return Err(error),
            Err(error) => return Err(self.fail(error)),
        };

        self.stats.records += 1;
        self.stats.bytes += outcome.length as u64;
        debug!(
            "Record {}: {} bytes, format_changed={}",
            self.stats.records, outcome.length, outcome.format_changed
        );

        let mut events = Vec::with_capacity(2);
        if outcome.format_changed {
            if let Some(fb) = self.state.framebuffer() {
                self.stats.format_changes += 1;
                events.push(Event::FormatChanged {
                    width: fb.width(),
                    height: fb.height(),
                    pixel_format: *fb.format(),
                });
            }
        }
        match self.composite() {
            Some(frame) => events.push(Event::FrameReady(frame)),
            None => debug!("No pixel format established yet, no frame emitted"),
        }

        Ok((outcome.length, events))
    }

    /// Composites the current framebuffer and cursor into the next frame.
    ///
    /// Returns `None` until a pixel format has been established.
    pub fn composite(&mut self) -> Option<Frame> {
        let fb = self.state.framebuffer()?;
        let data = self.compositor.compose(fb, self.state.cursor());

        let index = self.stats.frames;
        self.stats.frames += 1;
        let framerate = self.config.framerate;

        Some(Frame {
            data: Bytes::from(data),
            width: fb.width(),
            height: fb.height(),
            stride: fb.stride(),
            pixel_format: *fb.format(),
            index,
            pts: framerate.map(|rate| rate.pts(index)),
            duration: framerate.map(|rate| rate.frame_duration()),
        })
    }

    pub fn framebuffer(&self) -> Option<&FrameBuffer> {
        self.state.framebuffer()
    }

    pub fn cursor(&self) -> &CursorState {
        self.state.cursor()
    }

    pub fn pixel_format(&self) -> Option<&PixelFormat> {
        self.state.pixel_format()
    }

    /// Bytes received but not yet consumed by a complete record.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// The error that failed the stream, if any.
    pub fn failure(&self) -> Option<&DecodeError> {
        self.failure.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Discards all state: framebuffer, cursor, buffered input, counters
    /// and any latched failure.
    pub fn reset(&mut self) {
        debug!("Resetting decoder session");
        self.state.reset();
        self.compositor.reset();
        self.buffer.clear();
        self.failure = None;
        self.stats = SessionStats::default();
    }

    fn fail(&mut self, error: DecodeError) -> DecodeError {
        warn!("Stream failed after {} records: {}", self.stats.records, error);
        self.failure = Some(error.clone());
        error
    }
}

impl Default for VmncDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}
