//! Backlight control
//!
//! Three active-low pins, each switching the backlight supply through its own
//! resistor (2.2 kΩ, 100 Ω, 30 Ω). Their combinations give 7 levels and off.

use embassy_nrf::gpio::{AnyPin, Output};

pub const MAX_LEVEL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Error {
    OutOfBounds,
}

pub struct Backlight {
    low: Output<'static, AnyPin>,
    mid: Output<'static, AnyPin>,
    high: Output<'static, AnyPin>,
    level: u8,
}

impl Backlight {
    pub fn new(
        low: Output<'static, AnyPin>,
        mid: Output<'static, AnyPin>,
        high: Output<'static, AnyPin>,
        level: u8,
    ) -> Result<Self, Error> {
        let mut backlight = Self {
            low,
            mid,
            high,
            level: 0,
        };
        backlight.set(level)?;
        Ok(backlight)
    }

    /// Set the level between 0 (off) and [`MAX_LEVEL`].
    pub fn set(&mut self, level: u8) -> Result<(), Error> {
        if level > MAX_LEVEL {
            return Err(Error::OutOfBounds);
        }
        if level == self.level {
            return Ok(());
        }

        defmt::debug!("backlight level {}", level);
        for (bit, pin) in [&mut self.low, &mut self.mid, &mut self.high]
            .into_iter()
            .enumerate()
        {
            if level & (1 << bit) != 0 {
                pin.set_low();
            } else {
                pin.set_high();
            }
        }
        self.level = level;
        Ok(())
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}
