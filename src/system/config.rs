//! System configuration

use core::mem;

use embassy_nrf::{
    config::{Config, Debug, HfclkSource, LfclkSource},
    interrupt::Priority,
};
use embassy_time::Duration;
use nrf_softdevice::raw;

/// Advertised name of the watch
pub const DEVICE_NAME: &[u8] = b"Sunshine";

/// Backlight level while the face is interactive
pub const INTERACTIVE_BRIGHTNESS: u8 = 4;
/// Backlight level in ambient mode
pub const AMBIENT_BRIGHTNESS: u8 = 1;

/// Time without input before the face falls back to ambient mode
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15);
/// Redraw period in ambient mode
pub const AMBIENT_TICK_MS: u64 = 60_000;

/// Data items kept for snapshots
pub const DATA_CACHE_LEN: usize = 4;

/// Peripheral setup for running next to the SoftDevice.
pub fn embassy_config() -> Config {
    // `Config` is `non_exhaustive`, start from the default
    let mut config = Config::default();

    config.hfclk_source = HfclkSource::ExternalXtal;
    config.lfclk_source = LfclkSource::ExternalXtal;

    // DC/DC regulator massively reduces runtime current consumption
    config.dcdc.reg1 = true;

    // Priorities 0, 1 and 4 are reserved for the SoftDevice
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;

    config.debug = Debug::Allowed;

    config
}

/// SoftDevice setup: one peripheral link with a large MTU for asset chunks.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 247 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}
