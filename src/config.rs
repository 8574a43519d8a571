//! Watch face configuration

use embedded_graphics::{geometry::Size, pixelcolor::Rgb565};

/// Data path the companion publishes weather under.
pub const WEATHER_PATH: &str = "/weather";
/// Key holding the weather icon asset.
pub const ICON_KEY: &str = "icon";
/// Key holding the maximum temperature.
pub const MAX_TEMP_KEY: &str = "title";
/// Key holding the minimum temperature.
pub const MIN_TEMP_KEY: &str = "content";

/// Redraw interval in interactive mode.
pub const INTERACTIVE_UPDATE_RATE_MS: u64 = 500;
/// Upper bound for connecting and reading an icon asset.
pub const ICON_FETCH_TIMEOUT_MS: u64 = 500;

/// "blue_bkg" of the Sunshine palette (#03A9F4).
pub const BACKGROUND_COLOR: Rgb565 = Rgb565::new(0x03 >> 3, 0xA9 >> 2, 0xF4 >> 3);
pub const FOREGROUND_COLOR: Rgb565 = Rgb565::new(31, 63, 31);
pub const AMBIENT_BACKGROUND: Rgb565 = Rgb565::new(0, 0, 0);
/// Outline colour in ambient mode on displays with full colour depth.
pub const AMBIENT_COLOR: Rgb565 = Rgb565::new(24, 48, 24);

/// Layout and style of the watch face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceConfig {
    /// Distance unit of the layout, also half the divider length
    pub line_height: u32,
    /// Clock digit cell on round screens
    pub digit_size_round: Size,
    /// Clock digit cell on square screens
    pub digit_size_square: Size,
    /// Gap between the two digits of a number
    pub digit_spacing: u32,
    /// Gap between the icon and the temperatures
    pub icon_gap: u32,
    pub background: Rgb565,
    pub foreground: Rgb565,
    pub ambient_background: Rgb565,
    pub ambient_foreground: Rgb565,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            line_height: 20,
            digit_size_round: Size::new(26, 44),
            digit_size_square: Size::new(30, 52),
            digit_spacing: 6,
            icon_gap: 6,
            background: BACKGROUND_COLOR,
            foreground: FOREGROUND_COLOR,
            ambient_background: AMBIENT_BACKGROUND,
            ambient_foreground: AMBIENT_COLOR,
        }
    }
}
