//! State shown by the watch face

use chrono::NaiveDateTime;
use heapless::String;

use crate::{
    icon::IconBitmap,
    sync::data::{WeatherPayload, VALUE_LEN},
    time::{self, DATE_LEN},
};

/// Screen shape reported by the window insets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaceShape {
    Round,
    #[default]
    Square,
}

/// Everything a frame is drawn from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub hour: u8,
    pub minute: u8,
    pub date: String<DATE_LEN>,
    pub max_temperature: Option<String<VALUE_LEN>>,
    pub min_temperature: Option<String<VALUE_LEN>>,
    pub icon: Option<IconBitmap>,
    pub ambient_mode: bool,
    pub low_bit_ambient: bool,
}

impl DisplayState {
    /// Refresh the time fields from a local wall-clock time.
    pub fn set_time(&mut self, local: &NaiveDateTime) {
        let (hour, minute) = time::hour_minute(local);
        self.hour = hour;
        self.minute = minute;
        self.date = time::format_date(local);
    }

    /// Take over the temperatures of a payload. The icon follows once fetched.
    pub fn apply_weather(&mut self, weather: &WeatherPayload) {
        self.max_temperature = weather.max_temperature.clone();
        self.min_temperature = weather.min_temperature.clone();
    }

    /// Maximum temperature, empty when unknown.
    pub fn max_temperature(&self) -> &str {
        self.max_temperature.as_deref().unwrap_or("")
    }

    /// Minimum temperature, empty when unknown.
    pub fn min_temperature(&self) -> &str {
        self.min_temperature.as_deref().unwrap_or("")
    }
}
