//! Side button
//!
//! The button only reads valid while its enable pin is driven high, and the
//! enable pin draws around 34µA when left high. It is therefore polled: enable,
//! sample, disable.

use debouncr::{debounce_2, Debouncer, Edge, Repeat2};
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_13, P0_15},
};
use embassy_time::{Duration, Timer};

/// Poll period of the button
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct Button {
    pin: Input<'static, P0_13>,
    enable: Output<'static, P0_15>,
    debouncer: Debouncer<u8, Repeat2>,
}

impl Button {
    pub fn new(pin: Input<'static, P0_13>, enable: Output<'static, P0_15>) -> Self {
        Self {
            pin,
            enable,
            debouncer: debounce_2(false),
        }
    }

    /// Sample the button once. True on a debounced press.
    pub async fn pressed(&mut self) -> bool {
        self.enable.set_high();
        // Output needs a moment to settle
        Timer::after(Duration::from_nanos(1)).await;

        let edge = self.debouncer.update(self.pin.is_high());
        self.enable.set_low();

        edge == Some(Edge::Rising)
    }
}
