//! Data items exchanged with the companion
//!
//! A data item is a path plus a small key-value map. The phone writes them
//! `postcard`-encoded over BLE; binary blobs travel separately and are only
//! referenced from the map by an [`AssetRef`].

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::{ICON_KEY, MAX_TEMP_KEY, MIN_TEMP_KEY, WEATHER_PATH};

pub const PATH_LEN: usize = 32;
pub const KEY_LEN: usize = 16;
pub const VALUE_LEN: usize = 16;
pub const MAX_ENTRIES: usize = 8;

/// Upper bound of an encoded data item.
pub const MAX_ITEM_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataError {
    /// Item does not fit into the output buffer
    Encode,
    /// Bytes are not a valid item
    Decode,
    /// Map has no room for another entry, or a string is too long
    Full,
}

/// Opaque handle of a blob held by the companion link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssetRef(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataValue {
    Text(String<VALUE_LEN>),
    Asset(AssetRef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMap {
    entries: Vec<(String<KEY_LEN>, DataValue), MAX_ENTRIES>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: &str, value: DataValue) -> Result<(), DataError> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
            return Ok(());
        }

        let key = String::try_from(key).map_err(|_| DataError::Full)?;
        self.entries
            .push((key, value))
            .map_err(|_| DataError::Full)
    }

    pub fn put_string(&mut self, key: &str, value: &str) -> Result<(), DataError> {
        let value = String::try_from(value).map_err(|_| DataError::Full)?;
        self.insert(key, DataValue::Text(value))
    }

    pub fn put_asset(&mut self, key: &str, asset: AssetRef) -> Result<(), DataError> {
        self.insert(key, DataValue::Asset(asset))
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Text stored under `key`; `None` if absent or not text.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            DataValue::Text(text) => Some(text.as_str()),
            DataValue::Asset(_) => None,
        }
    }

    /// Asset stored under `key`; `None` if absent or not an asset.
    pub fn get_asset(&self, key: &str) -> Option<AssetRef> {
        match self.get(key)? {
            DataValue::Asset(asset) => Some(*asset),
            DataValue::Text(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One replicated item of the device-sync channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub path: String<PATH_LEN>,
    pub map: DataMap,
}

impl DataItem {
    pub fn new(path: &str, map: DataMap) -> Result<Self, DataError> {
        Ok(Self {
            path: String::try_from(path).map_err(|_| DataError::Full)?,
            map,
        })
    }

    /// Decode an item written by the companion
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DataError> {
        postcard::from_bytes(bytes).map_err(|_| DataError::Decode)
    }

    /// Encode into `buf`, returning the used part
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], DataError> {
        postcard::to_slice(self, buf).map_err(|_| DataError::Encode)
    }

    /// Weather carried by this item, if it lives under the weather path.
    pub fn weather(&self) -> Option<WeatherPayload> {
        if self.path != WEATHER_PATH {
            return None;
        }
        Some(WeatherPayload::from_map(&self.map))
    }
}

/// Weather as published by the companion. Replaced wholesale on arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherPayload {
    pub max_temperature: Option<String<VALUE_LEN>>,
    pub min_temperature: Option<String<VALUE_LEN>>,
    pub icon: Option<AssetRef>,
}

impl WeatherPayload {
    pub fn from_map(map: &DataMap) -> Self {
        let text = |key: &str| -> Option<String<VALUE_LEN>> {
            map.get_string(key).and_then(|s| String::try_from(s).ok())
        };

        Self {
            max_temperature: text(MAX_TEMP_KEY),
            min_temperature: text(MIN_TEMP_KEY),
            icon: map.get_asset(ICON_KEY),
        }
    }

    /// Build the data item a companion publishes for this weather.
    pub fn to_item(&self) -> Result<DataItem, DataError> {
        let mut map = DataMap::new();
        if let Some(max) = &self.max_temperature {
            map.put_string(MAX_TEMP_KEY, max)?;
        }
        if let Some(min) = &self.min_temperature {
            map.put_string(MIN_TEMP_KEY, min)?;
        }
        if let Some(icon) = self.icon {
            map.put_asset(ICON_KEY, icon)?;
        }
        DataItem::new(WEATHER_PATH, map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_item(max: &str, min: &str, icon: u32) -> DataItem {
        let mut map = DataMap::new();
        map.put_string("title", max).unwrap();
        map.put_string("content", min).unwrap();
        map.put_asset("icon", AssetRef(icon)).unwrap();
        DataItem::new("/weather", map).unwrap()
    }

    #[test]
    fn extracts_weather_under_fixed_keys() {
        let weather = weather_item("25°", "10°", 7).weather().unwrap();

        assert_eq!(weather.max_temperature.as_deref(), Some("25°"));
        assert_eq!(weather.min_temperature.as_deref(), Some("10°"));
        assert_eq!(weather.icon, Some(AssetRef(7)));
    }

    #[test]
    fn ignores_other_paths() {
        let mut item = weather_item("25°", "10°", 7);
        item.path = String::try_from("/forecast").unwrap();
        assert_eq!(item.weather(), None);
    }

    #[test]
    fn missing_or_mistyped_keys_are_empty() {
        let mut map = DataMap::new();
        map.put_asset("title", AssetRef(1)).unwrap();
        let item = DataItem::new("/weather", map).unwrap();

        assert_eq!(item.weather(), Some(WeatherPayload::default()));
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut map = DataMap::new();
        map.put_string("title", "20°").unwrap();
        map.put_string("title", "21°").unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get_string("title"), Some("21°"));
    }

    #[test]
    fn map_capacity_is_bounded() {
        let mut map = DataMap::new();
        let keys = ["a", "b", "c", "d", "e", "f", "g", "h"];
        for key in keys {
            map.put_asset(key, AssetRef(0)).unwrap();
        }
        assert_eq!(map.put_asset("i", AssetRef(0)), Err(DataError::Full));
        assert_eq!(
            map.put_string("a", "a value that is far too long"),
            Err(DataError::Full)
        );
    }

    #[test]
    fn wire_format_survives_transport() {
        let item = weather_item("25°", "10°", 42);
        let mut buf = [0u8; MAX_ITEM_LEN];
        let encoded = item.to_slice(&mut buf).unwrap();

        assert_eq!(DataItem::from_bytes(encoded).unwrap(), item);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(DataItem::from_bytes(&[0xFF; 4]), Err(DataError::Decode));
    }

    #[test]
    fn payload_builds_item() {
        let payload = WeatherPayload {
            max_temperature: Some(String::try_from("31°").unwrap()),
            min_temperature: None,
            icon: Some(AssetRef(3)),
        };
        let item = payload.to_item().unwrap();
        assert_eq!(item.weather(), Some(payload));
    }
}
