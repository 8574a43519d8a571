//! Companion sync listener
//!
//! Tracks the connection to the device-sync channel and turns incoming data
//! items into weather updates. The listener never talks to the transport
//! itself: it tells the host what to do through [`RenderCommand`]s.

pub mod asset;
pub mod data;

use heapless::Vec;

use crate::engine::{push, Commands, RenderCommand};
use data::{DataError, DataItem, WeatherPayload};

/// Connection to the device-sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// What the transport reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent<'a> {
    Connected,
    /// Link dropped, the transport reconnects on its own
    Suspended,
    ConnectionFailed(i32),
    /// Items present on the channel when the snapshot was taken
    Snapshot(&'a [DataItem]),
    /// Items that changed since the last delivery
    DataChanged(&'a [DataItem]),
}

#[derive(Debug, Default)]
pub struct SyncListener {
    state: ConnectionState,
    listener_registered: bool,
}

impl SyncListener {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.listener_registered
    }

    /// Start connecting unless a connection exists or is under way.
    pub fn connect(&mut self, commands: &mut Commands) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        debug!("sync: connecting");
        self.state = ConnectionState::Connecting;
        push(commands, RenderCommand::Connect);
    }

    /// Drop the listener and the connection.
    pub fn disconnect(&mut self, commands: &mut Commands) {
        if self.listener_registered {
            self.listener_registered = false;
            push(commands, RenderCommand::RemoveListener);
        }
        if self.state != ConnectionState::Disconnected {
            debug!("sync: disconnecting");
            self.state = ConnectionState::Disconnected;
            push(commands, RenderCommand::Disconnect);
        }
    }

    /// Handle a transport report. Returns the weather items delivered with it.
    pub fn on_event<'a>(
        &mut self,
        event: SyncEvent<'a>,
        commands: &mut Commands,
    ) -> Option<&'a [DataItem]> {
        match event {
            SyncEvent::Connected => {
                if self.state == ConnectionState::Disconnected {
                    // Late report for a connection we already gave up
                    return None;
                }
                info!("sync: connected");
                self.state = ConnectionState::Connected;
                if !self.listener_registered {
                    self.listener_registered = true;
                    push(commands, RenderCommand::AddListener);
                }
                push(commands, RenderCommand::FetchSnapshot);
                None
            }
            SyncEvent::Suspended => {
                debug!("sync: connection suspended");
                if self.state == ConnectionState::Connected {
                    self.state = ConnectionState::Connecting;
                }
                None
            }
            SyncEvent::ConnectionFailed(code) => {
                error!("sync: connection failed with result {}", code);
                self.state = ConnectionState::Disconnected;
                if self.listener_registered {
                    self.listener_registered = false;
                    push(commands, RenderCommand::RemoveListener);
                }
                None
            }
            SyncEvent::Snapshot(items) | SyncEvent::DataChanged(items) => {
                if !self.listener_registered {
                    trace!("sync: dropping {} items, not listening", items.len());
                    return None;
                }
                Some(items)
            }
        }
    }
}

/// Latest weather among `items`, if any lives under the weather path.
pub fn latest_weather(items: &[DataItem]) -> Option<WeatherPayload> {
    items.iter().filter_map(DataItem::weather).last()
}

/// Items received from the companion, one per path. Answers snapshot
/// requests.
#[derive(Debug, Default)]
pub struct DataCache<const N: usize> {
    items: Vec<DataItem, N>,
}

impl<const N: usize> DataCache<N> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Store `item`, replacing the one with the same path.
    pub fn store(&mut self, item: DataItem) -> Result<(), DataError> {
        match self.items.iter_mut().find(|stored| stored.path == item.path) {
            Some(stored) => *stored = item,
            None => self.items.push(item).map_err(|_| DataError::Full)?,
        }
        Ok(())
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::{AssetRef, DataMap};

    fn item(path: &str, max: &str) -> DataItem {
        let mut map = DataMap::new();
        map.put_string("title", max).unwrap();
        map.put_asset("icon", AssetRef(9)).unwrap();
        DataItem::new(path, map).unwrap()
    }

    #[test]
    fn connect_subscribes_once() {
        let mut listener = SyncListener::default();
        let mut commands = Commands::new();

        listener.connect(&mut commands);
        listener.connect(&mut commands);
        assert_eq!(commands.as_slice(), &[RenderCommand::Connect]);
        assert_eq!(listener.state(), ConnectionState::Connecting);

        commands.clear();
        listener.on_event(SyncEvent::Connected, &mut commands);
        assert_eq!(
            commands.as_slice(),
            &[RenderCommand::AddListener, RenderCommand::FetchSnapshot]
        );

        // Reconnect after a suspension does not register a second listener
        commands.clear();
        listener.on_event(SyncEvent::Suspended, &mut commands);
        listener.on_event(SyncEvent::Connected, &mut commands);
        assert_eq!(commands.as_slice(), &[RenderCommand::FetchSnapshot]);
    }

    #[test]
    fn disconnect_removes_listener() {
        let mut listener = SyncListener::default();
        let mut commands = Commands::new();
        listener.connect(&mut commands);
        listener.on_event(SyncEvent::Connected, &mut commands);

        commands.clear();
        listener.disconnect(&mut commands);
        assert_eq!(
            commands.as_slice(),
            &[RenderCommand::RemoveListener, RenderCommand::Disconnect]
        );
        assert_eq!(listener.state(), ConnectionState::Disconnected);

        commands.clear();
        listener.disconnect(&mut commands);
        assert!(commands.is_empty());
    }

    #[test]
    fn failure_returns_to_disconnected() {
        let mut listener = SyncListener::default();
        let mut commands = Commands::new();
        listener.connect(&mut commands);
        listener.on_event(SyncEvent::ConnectionFailed(7), &mut commands);

        assert_eq!(listener.state(), ConnectionState::Disconnected);
        assert!(!listener.is_listening());
    }

    #[test]
    fn failure_after_connect_drops_listener_once() {
        let mut listener = SyncListener::default();
        let mut commands = Commands::new();
        listener.connect(&mut commands);
        listener.on_event(SyncEvent::Connected, &mut commands);

        commands.clear();
        listener.on_event(SyncEvent::ConnectionFailed(3), &mut commands);
        assert_eq!(commands.as_slice(), &[RenderCommand::RemoveListener]);
        assert!(!listener.is_listening());

        commands.clear();
        listener.disconnect(&mut commands);
        assert!(commands.is_empty());

        listener.connect(&mut commands);
        listener.on_event(SyncEvent::Connected, &mut commands);
        assert_eq!(
            commands.as_slice(),
            &[
                RenderCommand::Connect,
                RenderCommand::AddListener,
                RenderCommand::FetchSnapshot
            ]
        );
    }

    #[test]
    fn items_pass_only_while_listening() {
        let items = [item("/weather", "25°")];
        let mut listener = SyncListener::default();
        let mut commands = Commands::new();

        assert_eq!(
            listener.on_event(SyncEvent::DataChanged(&items), &mut commands),
            None
        );

        listener.connect(&mut commands);
        listener.on_event(SyncEvent::Connected, &mut commands);
        assert!(listener
            .on_event(SyncEvent::DataChanged(&items), &mut commands)
            .is_some());
    }

    #[test]
    fn latest_weather_filters_path() {
        let items = [
            item("/weather", "20°"),
            item("/other", "99°"),
            item("/weather", "25°"),
        ];
        let weather = latest_weather(&items).unwrap();
        assert_eq!(weather.max_temperature.as_deref(), Some("25°"));

        assert_eq!(latest_weather(&items[1..2]), None);
    }

    #[test]
    fn cache_keeps_one_item_per_path() {
        let mut cache = DataCache::<2>::new();
        cache.store(item("/weather", "20°")).unwrap();
        cache.store(item("/other", "1°")).unwrap();
        cache.store(item("/weather", "25°")).unwrap();

        assert_eq!(cache.items().len(), 2);
        let weather = latest_weather(cache.items()).unwrap();
        assert_eq!(weather.max_temperature.as_deref(), Some("25°"));

        assert_eq!(cache.store(item("/third", "0°")), Err(DataError::Full));
    }
}
