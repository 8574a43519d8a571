//! Companion link over BLE
//!
//! The phone connects as central and writes into the GATT server:
//! - weather service: postcard encoded data items and asset chunks
//! - current time service: clock and local time information
//!
//! The face asks for the link with [`LinkCommand::Open`]; the watch then
//! advertises until the phone connects, and again after every drop, until
//! [`LinkCommand::Close`].

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_sync::{
    blocking_mutex::{raw::ThreadModeRawMutex, Mutex},
    signal::Signal,
};
use embassy_time::Instant;
use heapless::Vec;
use nrf_softdevice::{
    ble::{
        advertisement_builder::{
            Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
            ServiceUuid16,
        },
        gatt_server, peripheral, Connection,
    },
    Softdevice,
};

use sunshine_watchface::{
    engine::LifecycleEvent,
    icon::AssetSource,
    sync::{
        asset::{AssetStore, ChunkStatus, ASSET_CAPACITY},
        data::{AssetRef, DataItem},
    },
    time::{offset_from_local_time_info, TimeReference},
};

use crate::{HostEvent, HOST_EVENTS};

/// Largest attribute write with the configured MTU
const ATT_PAYLOAD_LEN: usize = 244;

const WEATHER_SERVICE: [u8; 16] = 0x3a1f0001_0b5e_4c1c_8d2a_7f3c9e51d0a7u128.to_le_bytes();

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Incomplete, &[ServiceUuid16::CURRENT_TIME])
    .full_name("Sunshine")
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_128(ServiceList::Complete, &[WEATHER_SERVICE])
    .build();

/// Requests from the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LinkCommand {
    Open,
    Close,
}

/// Reports to the face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    /// Phone went away, advertising again
    Suspended,
    Failed(i32),
    Item(DataItem),
}

pub static LINK_CONTROL: Signal<ThreadModeRawMutex, LinkCommand> = Signal::new();

static ASSETS: Mutex<ThreadModeRawMutex, RefCell<AssetStore<ASSET_CAPACITY>>> =
    Mutex::new(RefCell::new(AssetStore::new()));
static ASSET_READY: Signal<ThreadModeRawMutex, AssetRef> = Signal::new();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub weather: WeatherService,
    pub time: CurrentTimeService,
}

#[nrf_softdevice::gatt_service(uuid = "3a1f0001-0b5e-4c1c-8d2a-7f3c9e51d0a7")]
pub struct WeatherService {
    #[characteristic(uuid = "3a1f0002-0b5e-4c1c-8d2a-7f3c9e51d0a7", write)]
    pub data_item: Vec<u8, ATT_PAYLOAD_LEN>,
    #[characteristic(uuid = "3a1f0003-0b5e-4c1c-8d2a-7f3c9e51d0a7", write)]
    pub asset_chunk: Vec<u8, ATT_PAYLOAD_LEN>,
}

#[nrf_softdevice::gatt_service(uuid = "1805")]
pub struct CurrentTimeService {
    #[characteristic(uuid = "2a2b", read, write)]
    pub current_time: [u8; 10],
    #[characteristic(uuid = "2a0f", read, write)]
    pub local_time_information: [u8; 2],
}

/// Assets uploaded by the phone. Waits for an upload that is not there yet;
/// the caller bounds the wait.
pub struct UploadedAssets;

impl AssetSource for UploadedAssets {
    type Error = ();

    async fn open<'b>(
        &mut self,
        asset: AssetRef,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b [u8]>, ()> {
        loop {
            let copied = ASSETS.lock(|store| {
                let store = store.borrow();
                let bytes = store.get(asset)?;
                let target = buf.get_mut(..bytes.len())?;
                target.copy_from_slice(bytes);
                Some(bytes.len())
            });
            if let Some(len) = copied {
                return Ok(Some(&buf[..len]));
            }
            ASSET_READY.wait().await;
        }
    }
}

#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Runs the link on behalf of the face.
#[embassy_executor::task]
pub async fn companion_link(sd: &'static Softdevice, server: &'static Server) -> ! {
    let mut open = false;
    loop {
        if !open {
            open = LINK_CONTROL.wait().await == LinkCommand::Open;
            continue;
        }

        let config = peripheral::Config::default();
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match select(
            peripheral::advertise_connectable(sd, adv, &config),
            LINK_CONTROL.wait(),
        )
        .await
        {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(err)) => {
                defmt::error!("advertising failed: {:?}", err);
                let code = match err {
                    peripheral::AdvertiseError::Timeout => 1,
                    peripheral::AdvertiseError::NoFreeConn => 2,
                    peripheral::AdvertiseError::Raw(_) => 3,
                };
                report(LinkEvent::Failed(code));
                open = false;
                continue;
            }
            Either::Second(command) => {
                open = command == LinkCommand::Open;
                continue;
            }
        };

        defmt::info!("companion connected");
        report(LinkEvent::Connected);
        open = serve(&conn, server).await;
        if !open {
            let _ = conn.disconnect();
        }
    }
}

/// Serve GATT writes until the phone drops or the face closes the link.
/// Returns whether the link is still wanted.
async fn serve(conn: &Connection, server: &Server) -> bool {
    loop {
        match select(
            gatt_server::run(conn, server, on_server_event),
            LINK_CONTROL.wait(),
        )
        .await
        {
            Either::First(_) => {
                defmt::info!("companion disconnected");
                report(LinkEvent::Suspended);
                return true;
            }
            Either::Second(LinkCommand::Close) => return false,
            Either::Second(LinkCommand::Open) => {}
        }
    }
}

fn on_server_event(event: ServerEvent) {
    match event {
        ServerEvent::Weather(WeatherServiceEvent::DataItemWrite(bytes)) => {
            match DataItem::from_bytes(&bytes) {
                Ok(item) => report(LinkEvent::Item(item)),
                Err(err) => defmt::warn!("dropping data item: {}", err),
            }
        }
        ServerEvent::Weather(WeatherServiceEvent::AssetChunkWrite(bytes)) => {
            match ASSETS.lock(|store| store.borrow_mut().write_chunk(&bytes)) {
                Ok(ChunkStatus::Complete(asset)) => ASSET_READY.signal(asset),
                Ok(ChunkStatus::Partial) => {}
                Err(err) => defmt::warn!("dropping asset chunk: {}", err),
            }
        }
        ServerEvent::Time(CurrentTimeServiceEvent::CurrentTimeWrite(bytes)) => {
            match TimeReference::from_cts_bytes(&bytes, Instant::now().as_millis()) {
                Ok(reference) => send(HostEvent::ClockSet(reference)),
                Err(err) => defmt::warn!("invalid current time: {}", err),
            }
        }
        ServerEvent::Time(CurrentTimeServiceEvent::LocalTimeInformationWrite(bytes)) => {
            match offset_from_local_time_info(&bytes) {
                Ok(offset) => send(HostEvent::Lifecycle(LifecycleEvent::TimeZoneChanged(offset))),
                Err(err) => defmt::warn!("invalid local time information: {}", err),
            }
        }
    }
}

fn report(event: LinkEvent) {
    send(HostEvent::Link(event));
}

fn send(event: HostEvent) {
    if HOST_EVENTS.try_send(event).is_err() {
        defmt::warn!("host event queue full");
    }
}
