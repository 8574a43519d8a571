//! Seven-segment clock glyphs
//!
//! Digits are built from rectangles so the same glyph can be drawn filled
//! (interactive) or as outlines only (ambient).

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
};
use heapless::Vec;

/// A clock glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Digit(u8),
    Colon,
}

/// How glyph segments are painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphStyle {
    Filled,
    Outline,
}

// Segment bits: a b c d e f g
const A: u8 = 1 << 0;
const B: u8 = 1 << 1;
const C: u8 = 1 << 2;
const D: u8 = 1 << 3;
const E: u8 = 1 << 4;
const F: u8 = 1 << 5;
const G: u8 = 1 << 6;

const DIGITS: [u8; 10] = [
    A | B | C | D | E | F,
    B | C,
    A | B | G | E | D,
    A | B | G | C | D,
    F | G | B | C,
    A | F | G | C | D,
    A | F | G | E | D | C,
    A | B | C,
    A | B | C | D | E | F | G,
    A | B | C | D | F | G,
];

impl Glyph {
    pub fn as_char(&self) -> char {
        match self {
            Glyph::Digit(digit) => char::from(b'0' + (*digit).min(9)),
            Glyph::Colon => ':',
        }
    }

    /// The two glyphs of a zero-padded number below 100.
    pub fn pair(value: u8) -> [Glyph; 2] {
        [Glyph::Digit(value / 10 % 10), Glyph::Digit(value % 10)]
    }

    /// Rectangles making up this glyph inside `area`.
    pub fn segments(&self, area: &Rectangle) -> Vec<Rectangle, 7> {
        let mut out = Vec::new();
        let t = thickness(area.size);
        let Point { x, y } = area.top_left;
        let (w, h) = (area.size.width as i32, area.size.height as i32);
        let t_i = t as i32;

        match self {
            Glyph::Colon => {
                let dot_x = x + (w - t_i) / 2;
                for dot_y in [y + h / 3 - t_i / 2, y + 2 * h / 3 - t_i / 2] {
                    let _ = out.push(Rectangle::new(Point::new(dot_x, dot_y), Size::new(t, t)));
                }
            }
            Glyph::Digit(digit) => {
                let bits = DIGITS[(*digit).min(9) as usize];
                let mid_y = y + (h - t_i) / 2;
                let bar = Size::new((w - 2 * t_i).max(1) as u32, t);
                let upper = Size::new(t, (mid_y - (y + t_i)).max(1) as u32);
                let lower = Size::new(t, ((y + h - t_i) - (mid_y + t_i)).max(1) as u32);

                let all = [
                    (A, Rectangle::new(Point::new(x + t_i, y), bar)),
                    (B, Rectangle::new(Point::new(x + w - t_i, y + t_i), upper)),
                    (C, Rectangle::new(Point::new(x + w - t_i, mid_y + t_i), lower)),
                    (D, Rectangle::new(Point::new(x + t_i, y + h - t_i), bar)),
                    (E, Rectangle::new(Point::new(x, mid_y + t_i), lower)),
                    (F, Rectangle::new(Point::new(x, y + t_i), upper)),
                    (G, Rectangle::new(Point::new(x + t_i, mid_y), bar)),
                ];
                for (bit, segment) in all {
                    if bits & bit != 0 {
                        let _ = out.push(segment);
                    }
                }
            }
        }
        out
    }

    /// Paint the glyph.
    pub fn draw<D>(
        &self,
        area: &Rectangle,
        style: GlyphStyle,
        color: Rgb565,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let style = match style {
            GlyphStyle::Filled => PrimitiveStyle::with_fill(color),
            GlyphStyle::Outline => PrimitiveStyleBuilder::new()
                .stroke_color(color)
                .stroke_width(1)
                .stroke_alignment(StrokeAlignment::Inside)
                .build(),
        };

        for segment in self.segments(area) {
            segment.into_styled(style).draw(target)?;
        }
        Ok(())
    }
}

/// Segment thickness for a digit cell.
pub fn thickness(cell: Size) -> u32 {
    (cell.width / 5).max(2)
}

/// Width of the colon cell next to digits of `cell` size.
pub fn colon_width(cell: Size) -> u32 {
    thickness(cell) * 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::ContainsPoint;

    #[test]
    fn segment_counts() {
        let area = Rectangle::new(Point::zero(), Size::new(30, 52));
        let expected = [6, 2, 5, 5, 4, 5, 6, 3, 7, 6];
        for (digit, count) in expected.iter().enumerate() {
            assert_eq!(Glyph::Digit(digit as u8).segments(&area).len(), *count);
        }
        assert_eq!(Glyph::Colon.segments(&area).len(), 2);
    }

    #[test]
    fn segments_stay_inside_cell() {
        let area = Rectangle::new(Point::new(10, 20), Size::new(26, 44));
        for digit in 0..10 {
            for segment in Glyph::Digit(digit).segments(&area) {
                assert!(area.contains(segment.top_left));
                assert!(area.contains(segment.bottom_right().unwrap()));
            }
        }
    }

    #[test]
    fn pairs_are_zero_padded() {
        assert_eq!(Glyph::pair(7), [Glyph::Digit(0), Glyph::Digit(7)]);
        assert_eq!(Glyph::pair(23), [Glyph::Digit(2), Glyph::Digit(3)]);
        assert_eq!(Glyph::Digit(4).as_char(), '4');
    }
}
