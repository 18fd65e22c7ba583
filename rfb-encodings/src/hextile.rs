//! Hextile encoding decoder - Tiled encoding with multiple sub-encodings.
//!
//! Hextile (type 5) divides rectangles into 16x16 pixel tiles (with smaller
//! tiles at the right and bottom edges), and each tile picks its own
//! sub-encoding. Tiles are visited left-to-right, top-to-bottom.
//!
//! # Wire Format
//!
//! For each 16x16 tile in the rectangle (smaller at edges):
//!
//! ```text
//! +------------------+
//! | tile_type        |  1 byte (bit flags)
//! +------------------+
//! | [raw_pixels]     |  tile_w * tile_h * bpp bytes (if RAW bit set)
//! +------------------+
//! | [background]     |  bpp bytes (if BACKGROUND_SPECIFIED)
//! +------------------+
//! | [foreground]     |  bpp bytes (if FOREGROUND_SPECIFIED)
//! +------------------+
//! | [num_subrects]   |  1 byte (if ANY_SUBRECTS)
//! +------------------+
//! | [subrects...]    |  For each subrect:
//! |   [pixel]        |    bpp bytes (if SUBRECTS_COLOURED)
//! |   xy             |    1 byte: x=(xy>>4), y=(xy&0xF)
//! |   wh             |    1 byte: w=((wh>>4)+1), h=((wh&0xF)+1)
//! +------------------+
//! ```
//!
//! # State Persistence
//!
//! Background and foreground colors persist across tiles **within a single
//! rectangle** and start out as an all-zero pixel for every rectangle.
//!
//! # Atomic Tiles
//!
//! Each tile is parsed completely into a [`TilePaint`] before anything is
//! painted, so a tile that runs out of bytes or carries a bad sub-rectangle
//! leaves the framebuffer untouched.

use crate::{pixel_bytes, DecodeError, FormatView, RectDecoder, RectSink, Rectangle, RfbReader};
use bitflags::bitflags;
use rfb_common::Rect;

bitflags! {
    /// Hextile tile type flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TileFlags: u8 {
        /// Tile is raw uncompressed pixels (other flags ignored).
        const RAW = 1 << 0;
        /// Background color follows.
        const BACKGROUND_SPECIFIED = 1 << 1;
        /// Foreground color follows.
        const FOREGROUND_SPECIFIED = 1 << 2;
        /// Subrectangles present.
        const ANY_SUBRECTS = 1 << 3;
        /// Subrects each have a color.
        const SUBRECTS_COLOURED = 1 << 4;
    }
}

/// Standard Hextile tile size (tiles at rectangle edges may be smaller).
pub const TILE_SIZE: u16 = 16;

/// All-zero pixel, sized for the widest supported format.
const ZERO_PIXEL: [u8; 4] = [0; 4];

/// One sub-rectangle of a tile, in tile-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subrect<'a> {
    pub color: &'a [u8],
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub height: u8,
}

/// Everything a tile paints, borrowed from the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilePaint<'a> {
    Raw(&'a [u8]),
    Solid {
        background: &'a [u8],
        subrects: Vec<Subrect<'a>>,
    },
}

impl TilePaint<'_> {
    /// Paint the tile whose framebuffer area is `tile`.
    pub fn paint<S: RectSink>(&self, tile: Rect, sink: &mut S) -> Result<(), DecodeError> {
        match self {
            Self::Raw(pixels) => sink.image_rect(tile, pixels),
            Self::Solid {
                background,
                subrects,
            } => {
                sink.fill_rect(tile, background)?;
                for sr in subrects {
                    let area = Rect::new(
                        tile.x + sr.x as i32,
                        tile.y + sr.y as i32,
                        sr.width as u32,
                        sr.height as u32,
                    );
                    sink.fill_rect(area, sr.color)?;
                }
                Ok(())
            }
        }
    }
}

/// Colors carried from one tile to the next within a rectangle.
struct TileColors<'a> {
    background: &'a [u8],
    foreground: &'a [u8],
}

/// Parse one tile of `tile_w x tile_h` pixels.
fn read_tile<'a>(
    reader: &mut RfbReader<'a>,
    colors: &mut TileColors<'a>,
    tile_w: u16,
    tile_h: u16,
    bytes_per_pixel: usize,
) -> Result<TilePaint<'a>, DecodeError> {
    let flags = TileFlags::from_bits_retain(reader.read_u8()?);

    if flags.contains(TileFlags::RAW) {
        let len = pixel_bytes(tile_w, tile_h, bytes_per_pixel)?;
        return Ok(TilePaint::Raw(reader.read_bytes(len)?));
    }

    if flags.contains(TileFlags::BACKGROUND_SPECIFIED) {
        colors.background = reader.read_bytes(bytes_per_pixel)?;
    }
    if flags.contains(TileFlags::FOREGROUND_SPECIFIED) {
        colors.foreground = reader.read_bytes(bytes_per_pixel)?;
    }

    let mut subrects = Vec::new();
    if flags.contains(TileFlags::ANY_SUBRECTS) {
        let count = reader.read_u8()? as usize;
        let coloured = flags.contains(TileFlags::SUBRECTS_COLOURED);
        let per_subrect = if coloured { bytes_per_pixel + 2 } else { 2 };
        reader.ensure(count * per_subrect)?;

        subrects.reserve(count);
        for i in 0..count {
            let color = if coloured {
                reader.read_bytes(bytes_per_pixel)?
            } else {
                colors.foreground
            };
            let xy = reader.read_u8()?;
            let wh = reader.read_u8()?;
            let sr = Subrect {
                color,
                x: xy >> 4,
                y: xy & 0x0F,
                width: (wh >> 4) + 1,
                height: (wh & 0x0F) + 1,
            };

            if (sr.x + sr.width) as u16 > tile_w || (sr.y + sr.height) as u16 > tile_h {
                return Err(DecodeError::invalid(format!(
                    "hextile subrect {} at ({}, {}) size {}x{} exceeds {}x{} tile",
                    i, sr.x, sr.y, sr.width, sr.height, tile_w, tile_h
                )));
            }
            subrects.push(sr);
        }
    }

    Ok(TilePaint::Solid {
        background: colors.background,
        subrects,
    })
}

/// Decoder for Hextile encoding.
pub struct HextileDecoder;

impl RectDecoder for HextileDecoder {
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        let bytes_per_pixel = view.bytes_per_pixel()?;
        let zero = &ZERO_PIXEL[..bytes_per_pixel];
        let mut colors = TileColors {
            background: zero,
            foreground: zero,
        };

        let mut ty = 0u16;
        while ty < rect.height {
            let tile_h = TILE_SIZE.min(rect.height - ty);

            let mut tx = 0u16;
            while tx < rect.width {
                let tile_w = TILE_SIZE.min(rect.width - tx);

                let paint = read_tile(reader, &mut colors, tile_w, tile_h, bytes_per_pixel)?;
                let tile = Rect::new(
                    rect.x as i32 + tx as i32,
                    rect.y as i32 + ty as i32,
                    tile_w as u32,
                    tile_h as u32,
                );
                paint.paint(tile, sink)?;

                tx += tile_w;
            }
            ty += tile_h;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bgr233, rgb888, state_with_format, RecordBuilder};
    use crate::{DecoderState, ENCODING_HEXTILE, ENCODING_RAW};
    use pretty_assertions::assert_eq;

    fn rows(state: &DecoderState) -> Vec<Vec<u8>> {
        let fb = state.framebuffer().unwrap();
        (0..fb.height()).map(|y| fb.row(y).to_vec()).collect()
    }

    fn hextile(state: &mut DecoderState, x: u16, y: u16, w: u16, h: u16, payload: &[u8]) -> Result<usize, DecodeError> {
        let record = RecordBuilder::new()
            .rect(x, y, w, h, ENCODING_HEXTILE, payload)
            .build();
        state.apply(&record).map(|outcome| outcome.length)
    }

    #[test]
    fn test_empty_rectangle() {
        let mut state = state_with_format(4, 4, bgr233());
        let len = hextile(&mut state, 0, 0, 0, 4, &[]).unwrap();
        assert_eq!(len, 4 + 12);
    }

    #[test]
    fn test_raw_tile_matches_raw_rectangle() {
        let pixels: Vec<u8> = (0..12u8).map(|i| i * 7 + 1).collect();

        let mut via_raw = state_with_format(5, 4, bgr233());
        let raw = RecordBuilder::new()
            .rect(1, 1, 4, 3, ENCODING_RAW, &pixels)
            .build();
        via_raw.apply(&raw).unwrap();

        let mut via_hextile = state_with_format(5, 4, bgr233());
        let mut payload = vec![TileFlags::RAW.bits()];
        payload.extend_from_slice(&pixels);
        hextile(&mut via_hextile, 1, 1, 4, 3, &payload).unwrap();

        assert_eq!(rows(&via_hextile), rows(&via_raw));
    }

    #[test]
    fn test_raw_tile_ignores_other_flags() {
        let mut state = state_with_format(2, 1, bgr233());
        let flags = TileFlags::RAW | TileFlags::BACKGROUND_SPECIFIED | TileFlags::ANY_SUBRECTS;
        hextile(&mut state, 0, 0, 2, 1, &[flags.bits(), 9, 8]).unwrap();
        assert_eq!(rows(&state), vec![vec![9, 8]]);
    }

    #[test]
    fn test_background_only() {
        let mut state = state_with_format(3, 2, bgr233());
        hextile(&mut state, 0, 0, 3, 2, &[TileFlags::BACKGROUND_SPECIFIED.bits(), 0x2A]).unwrap();
        assert_eq!(rows(&state), vec![vec![0x2A; 3], vec![0x2A; 3]]);
    }

    #[test]
    fn test_initial_background_is_zero() {
        let mut state = state_with_format(2, 1, bgr233());
        hextile(&mut state, 0, 0, 2, 1, &[TileFlags::RAW.bits(), 5, 5]).unwrap();
        hextile(&mut state, 0, 0, 2, 1, &[0x00]).unwrap();
        assert_eq!(rows(&state), vec![vec![0, 0]]);
    }

    #[test]
    fn test_background_persists_across_tiles() {
        // 32x1: two tiles, the second reuses the first tile's background.
        let mut state = state_with_format(32, 1, bgr233());
        let payload = [
            TileFlags::BACKGROUND_SPECIFIED.bits(),
            0x33,
            TileFlags::ANY_SUBRECTS.bits(),
            0,
        ];
        hextile(&mut state, 0, 0, 32, 1, &payload).unwrap();
        assert_eq!(rows(&state), vec![vec![0x33; 32]]);
    }

    #[test]
    fn test_colors_reset_per_rectangle() {
        let mut state = state_with_format(2, 1, bgr233());
        hextile(&mut state, 0, 0, 1, 1, &[TileFlags::BACKGROUND_SPECIFIED.bits(), 0x44]).unwrap();
        hextile(&mut state, 1, 0, 1, 1, &[0x00]).unwrap();
        assert_eq!(rows(&state), vec![vec![0x44, 0x00]]);
    }

    #[test]
    fn test_foreground_monochrome_subrects() {
        let mut state = state_with_format(4, 4, bgr233());
        let flags = TileFlags::BACKGROUND_SPECIFIED
            | TileFlags::FOREGROUND_SPECIFIED
            | TileFlags::ANY_SUBRECTS;
        // One 2x2 subrect at (1, 1).
        let payload = [flags.bits(), 0x01, 0x09, 1, 0x11, 0x11];
        hextile(&mut state, 0, 0, 4, 4, &payload).unwrap();
        assert_eq!(
            rows(&state),
            vec![
                vec![1, 1, 1, 1],
                vec![1, 9, 9, 1],
                vec![1, 9, 9, 1],
                vec![1, 1, 1, 1],
            ]
        );
    }

    #[test]
    fn test_foreground_persists_across_tiles() {
        let mut state = state_with_format(17, 1, bgr233());
        let first = TileFlags::FOREGROUND_SPECIFIED | TileFlags::ANY_SUBRECTS;
        let second = TileFlags::ANY_SUBRECTS;
        let payload = [first.bits(), 0x55, 1, 0x00, 0x00, second.bits(), 1, 0x00, 0x00];
        hextile(&mut state, 0, 0, 17, 1, &payload).unwrap();
        let row = &rows(&state)[0];
        assert_eq!(row[0], 0x55);
        assert_eq!(row[1], 0x00);
        assert_eq!(row[16], 0x55);
    }

    #[test]
    fn test_colored_subrects_32bpp() {
        let mut state = state_with_format(2, 1, rgb888());
        let flags = TileFlags::ANY_SUBRECTS | TileFlags::SUBRECTS_COLOURED;
        let payload = [
            flags.bits(),
            2,
            0xAA, 0xBB, 0xCC, 0x00, 0x00, 0x00,
            0x11, 0x22, 0x33, 0x00, 0x10, 0x00,
        ];
        hextile(&mut state, 0, 0, 2, 1, &payload).unwrap();
        assert_eq!(
            rows(&state)[0],
            vec![0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22, 0x33, 0x00]
        );
    }

    #[test]
    fn test_edge_tiles_are_cropped() {
        // 18x17 rectangle: tiles 16x16, 2x16, 16x1, 2x1.
        let mut state = state_with_format(18, 17, bgr233());
        let bg = TileFlags::BACKGROUND_SPECIFIED.bits();
        let payload = [bg, 1, bg, 2, bg, 3, bg, 4];
        let len = hextile(&mut state, 0, 0, 18, 17, &payload).unwrap();
        assert_eq!(len, 4 + 12 + payload.len());

        let rows = rows(&state);
        assert_eq!(rows[0][15], 1);
        assert_eq!(rows[0][16], 2);
        assert_eq!(rows[15][17], 2);
        assert_eq!(rows[16][0], 3);
        assert_eq!(rows[16][17], 4);
    }

    #[test]
    fn test_subrect_out_of_tile_is_invalid() {
        let mut state = state_with_format(4, 4, bgr233());
        let before = rows(&state);
        let flags = TileFlags::BACKGROUND_SPECIFIED | TileFlags::ANY_SUBRECTS;
        // 2-wide subrect at x=3 in a 4-wide tile.
        let payload = [flags.bits(), 7, 1, 0x30, 0x10];
        let err = hextile(&mut state, 0, 0, 4, 4, &payload).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRecord(_)));
        assert_eq!(rows(&state), before);
    }

    #[test]
    fn test_subrect_at_boundary() {
        let mut state = state_with_format(4, 4, bgr233());
        let flags = TileFlags::FOREGROUND_SPECIFIED | TileFlags::ANY_SUBRECTS;
        // 1x1 subrect at (3, 3).
        let payload = [flags.bits(), 6, 1, 0x33, 0x00];
        hextile(&mut state, 0, 0, 4, 4, &payload).unwrap();
        assert_eq!(rows(&state)[3], vec![0, 0, 0, 6]);
    }

    #[test]
    fn test_truncation_reports_insufficient() {
        let state = state_with_format(4, 4, bgr233());
        let flags = TileFlags::BACKGROUND_SPECIFIED
            | TileFlags::ANY_SUBRECTS
            | TileFlags::SUBRECTS_COLOURED;
        let payload = [flags.bits(), 7, 2, 1, 0x00, 0x00, 2, 0x11, 0x00];
        let record = RecordBuilder::new()
            .rect(0, 0, 4, 4, ENCODING_HEXTILE, &payload)
            .build();

        assert_eq!(state.probe(&record).unwrap(), record.len());
        for cut in 0..record.len() {
            let err = state.probe(&record[..cut]).unwrap_err();
            assert!(err.is_recoverable(), "cut at {} gave {:?}", cut, err);
        }
    }

    #[test]
    fn test_unknown_tile_bits_are_ignored() {
        let mut state = state_with_format(2, 1, bgr233());
        let flags = 0xE0 | TileFlags::BACKGROUND_SPECIFIED.bits();
        hextile(&mut state, 0, 0, 2, 1, &[flags, 0x12]).unwrap();
        assert_eq!(rows(&state), vec![vec![0x12, 0x12]]);
    }
}
