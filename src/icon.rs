//! Weather icon pipeline
//!
//! The icon arrives as an asset on the companion link. Fetching it means
//! reading the asset bytes, decoding them as a BMP, halving the image in
//! both dimensions while decoding and handing the small copy back together with the ticket
//! of the request, so only the newest request can ever be committed.

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::{OriginDimensions, Pixel, RgbColor, Size},
};
use heapless::Vec;
use tinybmp::Bmp;

use crate::sync::data::AssetRef;

/// Largest icon kept after halving, in pixels (a 64x64 source halves to this).
pub const MAX_ICON_PIXELS: usize = 32 * 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IconError {
    /// Link could not serve the asset
    Transport,
    /// Link answered without a stream
    NoStream,
    /// Bytes are not a supported image
    Decode,
    /// Halved image has more than [`MAX_ICON_PIXELS`]
    TooLarge,
    /// Image too small to be halved
    InvalidDimensions,
    /// Fetch did not finish in time
    Timeout,
}

/// Decoded icon in display pixel format, row major.
#[derive(Clone, PartialEq, Eq)]
pub struct IconBitmap {
    width: u32,
    height: u32,
    pixels: Vec<Rgb565, MAX_ICON_PIXELS>,
}

impl core::fmt::Debug for IconBitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IconBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl IconBitmap {
    /// Create a bitmap of one colour.
    pub fn filled(width: u32, height: u32, color: Rgb565) -> Result<Self, IconError> {
        if width == 0 || height == 0 {
            return Err(IconError::InvalidDimensions);
        }
        if u64::from(width) * u64::from(height) > MAX_ICON_PIXELS as u64 {
            return Err(IconError::TooLarge);
        }

        let mut pixels = Vec::new();
        pixels
            .resize((width * height) as usize, color)
            .map_err(|_| IconError::TooLarge)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode BMP bytes (any bit depth `tinybmp` understands) at half size,
    /// keeping the pixels at even columns of even rows.
    ///
    /// `tinybmp` reads `bytes` in place, so the full-size image never exists
    /// in memory.
    pub fn decode_halved(bytes: &[u8]) -> Result<Self, IconError> {
        let bmp = Bmp::<Rgb565>::from_slice(bytes).map_err(|_| IconError::Decode)?;
        let size = bmp.size();

        let mut icon = Self::filled(size.width / 2, size.height / 2, Rgb565::BLACK)?;
        for Pixel(point, color) in bmp.pixels() {
            if point.x >= 0 && point.y >= 0 && point.x % 2 == 0 && point.y % 2 == 0 {
                icon.set(point.x as u32 / 2, point.y as u32 / 2, color);
            }
        }
        Ok(icon)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Pixels in row-major order.
    pub fn pixels(&self) -> &[Rgb565] {
        &self.pixels
    }

    fn set(&mut self, x: u32, y: u32, color: Rgb565) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }
}

/// Identifies one icon fetch; only the latest ticket may commit its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IconTicket(u32);

impl IconTicket {
    pub fn sequence(&self) -> u32 {
        self.0
    }
}

/// A fetch the host has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IconRequest {
    pub ticket: IconTicket,
    pub asset: AssetRef,
}

/// Single in-flight slot for icon fetches.
#[derive(Debug, Default)]
pub struct IconSlot {
    latest: u32,
}

impl IconSlot {
    /// Start a fetch for `asset`, superseding any pending one.
    pub fn request(&mut self, asset: AssetRef) -> IconRequest {
        self.supersede();
        IconRequest {
            ticket: IconTicket(self.latest),
            asset,
        }
    }

    /// Invalidate the pending fetch without starting a new one.
    pub fn supersede(&mut self) {
        self.latest = self.latest.wrapping_add(1);
    }

    pub fn is_current(&self, ticket: IconTicket) -> bool {
        ticket.0 == self.latest
    }
}

/// Byte source for assets referenced by data items.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    type Error;

    /// Read `asset` into `buf`. `Ok(None)` when the link has no stream for it.
    async fn open<'b>(
        &mut self,
        asset: AssetRef,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b [u8]>, Self::Error>;
}

/// Fetch, decode and halve the icon behind `asset`.
///
/// The caller bounds the whole operation with its own timeout.
pub async fn load_icon<S: AssetSource>(
    source: &mut S,
    asset: AssetRef,
    buf: &mut [u8],
) -> Result<IconBitmap, IconError> {
    let bytes = source
        .open(asset, buf)
        .await
        .map_err(|_| IconError::Transport)?
        .ok_or(IconError::NoStream)?;

    let icon = IconBitmap::decode_halved(bytes)?;
    debug!("icon decoded: {}x{}", icon.width(), icon.height());
    Ok(icon)
}
