//! UI definitions module
//!
//! A watch face turns [`DisplayState`] into a [`Frame`]: a short display list
//! that can be inspected, and painted onto any `Rgb565` draw target.

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Text},
};
use heapless::{String, Vec};
use profont::{PROFONT_14_POINT, PROFONT_18_POINT, PROFONT_24_POINT};

use crate::{icon::IconBitmap, state::DisplayState, state::FaceShape};

pub mod segments;
mod sunshine_watchface;

pub use segments::{Glyph, GlyphStyle};
pub use sunshine_watchface::SunshineWatchface;

const MAX_COMMANDS: usize = 16;
const DIVIDER_WIDTH: u32 = 2;

pub trait WatchFace {
    /// Adapt the layout to the screen shape
    fn set_shape(&mut self, shape: FaceShape);

    /// Compose the frame for `state` inside `bounds`
    fn layout<'a>(&self, state: &'a DisplayState, bounds: Rectangle) -> Frame<'a>;
}

/// Fonts used for text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFont {
    Date,
    MaxTemperature,
    MinTemperature,
}

impl TextFont {
    pub fn mono_font(&self) -> &'static MonoFont<'static> {
        match self {
            TextFont::Date => &PROFONT_14_POINT,
            TextFont::MaxTemperature => &PROFONT_24_POINT,
            TextFont::MinTemperature => &PROFONT_18_POINT,
        }
    }

    /// Rendered width of `text` in pixels.
    pub fn text_width(&self, text: &str) -> u32 {
        let font = self.mono_font();
        text.chars().count() as u32 * (font.character_size.width + font.character_spacing)
    }

    pub fn height(&self) -> u32 {
        self.mono_font().character_size.height
    }
}

/// One drawing operation of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand<'a> {
    /// Reset every pixel of the screen
    Clear(Rgb565),
    FillRect {
        area: Rectangle,
        color: Rgb565,
    },
    Line {
        start: Point,
        end: Point,
        color: Rgb565,
    },
    Glyph {
        glyph: Glyph,
        area: Rectangle,
        style: GlyphStyle,
        color: Rgb565,
    },
    /// Text on an alphabetic baseline at `position`
    Text {
        text: &'a str,
        position: Point,
        font: TextFont,
        alignment: Alignment,
        color: Rgb565,
    },
    Icon {
        bitmap: &'a IconBitmap,
        top_left: Point,
    },
}

/// Display list for one paint request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame<'a> {
    commands: Vec<DrawCommand<'a>, MAX_COMMANDS>,
}

impl<'a> Frame<'a> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand<'a>) {
        if self.commands.push(command).is_err() {
            warn!("frame full, dropping draw command");
        }
    }

    pub fn commands(&self) -> &[DrawCommand<'a>] {
        &self.commands
    }

    /// Clock glyphs in drawing order, e.g. `09:41`.
    pub fn glyph_text(&self) -> String<8> {
        let mut text = String::new();
        for command in &self.commands {
            if let DrawCommand::Glyph { glyph, .. } = command {
                let _ = text.push(glyph.as_char());
            }
        }
        text
    }

    /// Paint the frame onto `target`.
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        for command in &self.commands {
            match *command {
                DrawCommand::Clear(color) => target.clear(color)?,
                DrawCommand::FillRect { area, color } => {
                    area.into_styled(PrimitiveStyle::with_fill(color))
                        .draw(target)?;
                }
                DrawCommand::Line { start, end, color } => {
                    Line::new(start, end)
                        .into_styled(PrimitiveStyle::with_stroke(color, DIVIDER_WIDTH))
                        .draw(target)?;
                }
                DrawCommand::Glyph {
                    glyph,
                    area,
                    style,
                    color,
                } => glyph.draw(&area, style, color, target)?,
                DrawCommand::Text {
                    text,
                    position,
                    font,
                    alignment,
                    color,
                } => {
                    let style = MonoTextStyle::new(font.mono_font(), color);
                    Text::with_alignment(text, position, style, alignment).draw(target)?;
                }
                DrawCommand::Icon { bitmap, top_left } => {
                    let area = Rectangle::new(top_left, bitmap.size());
                    target.fill_contiguous(&area, bitmap.pixels().iter().copied())?;
                }
            }
        }
        Ok(())
    }
}
