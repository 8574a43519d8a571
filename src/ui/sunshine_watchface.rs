//! Sunshine watch face
//!
//! Interactive: blue background, clock above a short divider, the date just
//! above the divider and the weather (icon, max, min) below it.
//! Ambient: black screen with the clock as outlines, nothing else.

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::*,
    primitives::Rectangle,
    text::Alignment,
};

use super::{
    segments::{self, Glyph, GlyphStyle},
    DrawCommand, Frame, TextFont, WatchFace,
};
use crate::{
    config::FaceConfig,
    state::{DisplayState, FaceShape},
};

#[derive(Debug, Clone)]
pub struct SunshineWatchface {
    config: FaceConfig,
    shape: FaceShape,
}

impl Default for SunshineWatchface {
    fn default() -> Self {
        Self::new(FaceConfig::default())
    }
}

impl SunshineWatchface {
    pub fn new(config: FaceConfig) -> Self {
        Self {
            config,
            shape: FaceShape::default(),
        }
    }

    pub fn shape(&self) -> FaceShape {
        self.shape
    }

    /// Size of one clock digit on the current screen shape.
    pub fn digit_size(&self) -> Size {
        match self.shape {
            FaceShape::Round => self.config.digit_size_round,
            FaceShape::Square => self.config.digit_size_square,
        }
    }

    /// `HH:MM` centred on `center_x`, glyph bottoms on `baseline`.
    fn clock<'a>(
        &self,
        frame: &mut Frame<'a>,
        state: &DisplayState,
        center_x: i32,
        baseline: i32,
        style: GlyphStyle,
        color: Rgb565,
    ) {
        let digit = self.digit_size();
        let colon = Size::new(segments::colon_width(digit), digit.height);
        let spacing = self.config.digit_spacing as i32;
        let advance = digit.width as i32 + spacing;
        let top = baseline - digit.height as i32;

        let colon_left = center_x - colon.width as i32 / 2;
        let colon_right = colon_left + colon.width as i32;

        let [h0, h1] = Glyph::pair(state.hour);
        let [m0, m1] = Glyph::pair(state.minute);
        let cells = [
            (h0, colon_left - 2 * advance, digit),
            (h1, colon_left - spacing - digit.width as i32, digit),
            (Glyph::Colon, colon_left, colon),
            (m0, colon_right + spacing, digit),
            (m1, colon_right + spacing + advance, digit),
        ];

        for (glyph, x, size) in cells {
            frame.push(DrawCommand::Glyph {
                glyph,
                area: Rectangle::new(Point::new(x, top), size),
                style,
                color,
            });
        }
    }

    fn ambient<'a>(&self, state: &'a DisplayState, bounds: Rectangle) -> Frame<'a> {
        let mut frame = Frame::new();
        let center = bounds.center();
        // Low-bit displays only have full-on pixels
        let color = if state.low_bit_ambient {
            Rgb565::WHITE
        } else {
            self.config.ambient_foreground
        };

        frame.push(DrawCommand::Clear(self.config.ambient_background));
        let baseline = center.y + self.digit_size().height as i32 / 2;
        self.clock(&mut frame, state, center.x, baseline, GlyphStyle::Outline, color);
        frame
    }

    fn interactive<'a>(&self, state: &'a DisplayState, bounds: Rectangle) -> Frame<'a> {
        let mut frame = Frame::new();
        let center = bounds.center();
        let line_height = self.config.line_height as i32;
        let foreground = self.config.foreground;

        frame.push(DrawCommand::FillRect {
            area: bounds,
            color: self.config.background,
        });

        frame.push(DrawCommand::Line {
            start: Point::new(center.x - line_height, center.y),
            end: Point::new(center.x + line_height, center.y),
            color: foreground,
        });

        frame.push(DrawCommand::Text {
            text: state.date.as_str(),
            position: Point::new(center.x, center.y - line_height * 2 / 3),
            font: TextFont::Date,
            alignment: Alignment::Center,
            color: foreground,
        });

        self.clock(
            &mut frame,
            state,
            center.x,
            center.y - line_height * 2,
            GlyphStyle::Filled,
            foreground,
        );

        // Weather row: [icon] MAX min
        let below = center.y + line_height * 2;
        let max = state.max_temperature();
        let min = state.min_temperature();
        let half_max = TextFont::MaxTemperature.text_width(max) as i32 / 2;
        let gap = self.config.icon_gap as i32;

        if !max.is_empty() {
            frame.push(DrawCommand::Text {
                text: max,
                position: Point::new(center.x, below),
                font: TextFont::MaxTemperature,
                alignment: Alignment::Center,
                color: foreground,
            });
        }

        if !min.is_empty() {
            frame.push(DrawCommand::Text {
                text: min,
                position: Point::new(center.x + half_max + gap, below),
                font: TextFont::MinTemperature,
                alignment: Alignment::Left,
                color: foreground,
            });
        }

        if let Some(icon) = &state.icon {
            let text_middle = below - TextFont::MaxTemperature.height() as i32 / 2;
            let top_left = Point::new(
                center.x - half_max - gap - icon.width() as i32,
                text_middle - icon.height() as i32 / 2,
            );
            frame.push(DrawCommand::Icon {
                bitmap: icon,
                top_left,
            });
        }

        frame
    }
}

impl WatchFace for SunshineWatchface {
    fn set_shape(&mut self, shape: FaceShape) {
        self.shape = shape;
    }

    fn layout<'a>(&self, state: &'a DisplayState, bounds: Rectangle) -> Frame<'a> {
        if state.ambient_mode {
            self.ambient(state, bounds)
        } else {
            self.interactive(state, bounds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BACKGROUND_COLOR, icon::IconBitmap, ui::tests::Screen};
    use heapless::String;
    use proptest::prelude::*;

    fn screen_bounds() -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(240, 240))
    }

    fn weather_state() -> DisplayState {
        DisplayState {
            hour: 9,
            minute: 5,
            date: String::try_from("Sat 17 Oct 2026").unwrap(),
            max_temperature: Some(String::try_from("25°").unwrap()),
            min_temperature: Some(String::try_from("10°").unwrap()),
            icon: Some(IconBitmap::filled(16, 16, Rgb565::YELLOW).unwrap()),
            ..DisplayState::default()
        }
    }

    proptest! {
        #[test]
        fn clock_glyphs_are_zero_padded_24h(hour in 0u8..24, minute in 0u8..60, ambient: bool) {
            let face = SunshineWatchface::default();
            let state = DisplayState { hour, minute, ambient_mode: ambient, ..DisplayState::default() };

            let frame = face.layout(&state, screen_bounds());
            let expected = format!("{:02}:{:02}", hour, minute);
            let text = frame.glyph_text();
            prop_assert_eq!(text.as_str(), expected.as_str());
        }
    }

    #[test]
    fn ambient_draws_outlines_only() {
        let face = SunshineWatchface::default();
        let mut state = weather_state();
        state.ambient_mode = true;

        let frame = face.layout(&state, screen_bounds());
        for command in frame.commands() {
            match command {
                DrawCommand::Clear(color) => assert_eq!(*color, Rgb565::BLACK),
                DrawCommand::Glyph { style, .. } => assert_eq!(*style, GlyphStyle::Outline),
                other => panic!("unexpected ambient command {:?}", other),
            }
        }

        let mut screen = Screen::new(240, 240);
        frame.draw(&mut screen).unwrap();
        assert_eq!(screen.count(BACKGROUND_COLOR), 0);
        assert!(screen.count(Rgb565::BLACK) < 240 * 240);
    }

    #[test]
    fn low_bit_ambient_uses_full_white() {
        let face = SunshineWatchface::default();
        let state = DisplayState {
            ambient_mode: true,
            low_bit_ambient: true,
            ..DisplayState::default()
        };

        let frame = face.layout(&state, screen_bounds());
        assert!(frame.commands().iter().all(|command| match command {
            DrawCommand::Glyph { color, .. } => *color == Rgb565::WHITE,
            _ => true,
        }));
    }

    #[test]
    fn interactive_shows_date_and_weather() {
        let face = SunshineWatchface::default();
        let state = weather_state();
        let bounds = screen_bounds();

        let frame = face.layout(&state, bounds);
        let commands = frame.commands();
        assert_eq!(
            commands[0],
            DrawCommand::FillRect {
                area: bounds,
                color: BACKGROUND_COLOR
            }
        );

        let texts: std::vec::Vec<&str> = commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(*text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["Sat 17 Oct 2026", "25°", "10°"]);

        let icon = commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Icon { top_left, .. } => Some(*top_left),
                _ => None,
            })
            .unwrap();
        // Icon sits left of the centred maximum temperature
        assert!(icon.x + 16 <= 120);

        let mut screen = Screen::new(240, 240);
        frame.draw(&mut screen).unwrap();
        assert!(screen.count(Rgb565::YELLOW) >= 16 * 16);
    }

    #[test]
    fn missing_weather_renders_blank() {
        let face = SunshineWatchface::default();
        let state = DisplayState {
            date: String::try_from("Sat 17 Oct 2026").unwrap(),
            ..DisplayState::default()
        };

        let frame = face.layout(&state, screen_bounds());
        let texts = frame
            .commands()
            .iter()
            .filter(|command| matches!(command, DrawCommand::Text { .. }))
            .count();
        assert_eq!(texts, 1);
        assert!(!frame
            .commands()
            .iter()
            .any(|command| matches!(command, DrawCommand::Icon { .. })));
    }

    #[test]
    fn clock_is_centred_and_follows_shape() {
        let mut face = SunshineWatchface::default();
        let state = DisplayState::default();

        let glyph_areas = |face: &SunshineWatchface| {
            let frame = face.layout(&state, screen_bounds());
            frame
                .commands()
                .iter()
                .filter_map(|command| match command {
                    DrawCommand::Glyph { area, .. } => Some(*area),
                    _ => None,
                })
                .collect::<std::vec::Vec<_>>()
        };

        let square = glyph_areas(&face);
        face.set_shape(FaceShape::Round);
        let round = glyph_areas(&face);

        assert!(round[0].size.height < square[0].size.height);
        for areas in [&square, &round] {
            let left = areas[0].top_left.x;
            let right = 240 - (areas[4].top_left.x + areas[4].size.width as i32);
            assert!((left - right).abs() <= 2, "left {} right {}", left, right);
        }
    }
}
