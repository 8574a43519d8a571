//! ST7789 panel
//!
//! 240x240 pixels on SPIM2. Frames produced by the watch face are painted
//! straight onto the panel, which keeps its content between frames.

use core::convert::Infallible;

use display_interface_spi::SPIInterface;
use embassy_nrf::{
    gpio::Output,
    peripherals::{P0_18, P0_25, P0_26, SPI2},
    spim::Spim,
};
use embassy_time::Delay;
use embedded_graphics::{prelude::*, primitives::Rectangle};
use mipidsi::{models::ST7789, Builder, Orientation};

use sunshine_watchface::{state::FaceShape, ui::Frame};

const LCD_W: u16 = 240;
const LCD_H: u16 = 240;

type Panel = mipidsi::Display<
    SPIInterface<Spim<'static, SPI2>, Output<'static, P0_18>, Output<'static, P0_25>>,
    ST7789,
    Output<'static, P0_26>,
>;

#[derive(Debug, defmt::Format)]
pub enum Error {
    /// Panel did not accept the init sequence
    Init,
}

impl From<mipidsi::error::InitError<Infallible>> for Error {
    fn from(_: mipidsi::error::InitError<Infallible>) -> Self {
        Error::Init
    }
}

pub struct Display {
    panel: Panel,
}

impl Display {
    pub fn new(
        spim: Spim<'static, SPI2>,
        cs: Output<'static, P0_25>,
        dc: Output<'static, P0_18>,
        rst: Output<'static, P0_26>,
    ) -> Result<Self, Error> {
        let panel = Builder::st7789(SPIInterface::new(spim, dc, cs))
            .with_display_size(LCD_W, LCD_H)
            .with_orientation(Orientation::Portrait(false))
            .init(&mut Delay, Some(rst))?;

        Ok(Self { panel })
    }

    /// The PineTime panel is square.
    pub fn shape(&self) -> FaceShape {
        FaceShape::Square
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(LCD_W as u32, LCD_H as u32))
    }

    pub fn render(&mut self, frame: &Frame<'_>) -> Result<(), mipidsi::Error> {
        frame.draw(&mut self.panel)
    }
}
