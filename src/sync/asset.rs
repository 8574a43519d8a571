//! Asset uploads
//!
//! The companion pushes the icon blob in chunks before it writes the data
//! item that references it. Each chunk starts with a 12 byte little endian
//! header: asset id, total length, offset of the payload.

use heapless::Vec;

use super::data::AssetRef;
use crate::icon::AssetSource;

/// Largest asset the watch keeps: a 64x64 BMP at 24 bits per pixel.
pub const ASSET_CAPACITY: usize = 54 + 64 * 64 * 3;
pub const CHUNK_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssetError {
    /// Chunk shorter than its header or longer than the announced total
    Malformed,
    /// Asset does not fit the store or the caller's buffer
    TooLarge,
    /// Chunk does not continue the upload in progress
    OutOfOrder,
}

/// Progress of an upload after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkStatus {
    Partial,
    Complete(AssetRef),
}

/// Holds the most recent asset.
#[derive(Debug)]
pub struct AssetStore<const N: usize> {
    asset: Option<AssetRef>,
    total: usize,
    data: Vec<u8, N>,
}

impl<const N: usize> Default for AssetStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AssetStore<N> {
    pub const fn new() -> Self {
        Self {
            asset: None,
            total: 0,
            data: Vec::new(),
        }
    }

    /// Append one chunk. An offset of zero starts a new upload and drops the
    /// stored asset.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<ChunkStatus, AssetError> {
        if chunk.len() < CHUNK_HEADER_LEN {
            return Err(AssetError::Malformed);
        }
        let field = |at: usize| {
            u32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]])
        };
        let asset = AssetRef(field(0));
        let total = field(4) as usize;
        let offset = field(8) as usize;
        let payload = &chunk[CHUNK_HEADER_LEN..];

        if offset == 0 {
            self.reset();
            if total > N {
                return Err(AssetError::TooLarge);
            }
            self.asset = Some(asset);
            self.total = total;
        } else if self.asset != Some(asset) || self.total != total || offset != self.data.len() {
            return Err(AssetError::OutOfOrder);
        }

        if self.data.len() + payload.len() > self.total {
            self.reset();
            return Err(AssetError::Malformed);
        }
        self.data
            .extend_from_slice(payload)
            .map_err(|_| AssetError::TooLarge)?;

        if self.data.len() == self.total {
            debug!("asset {} complete, {} bytes", asset.0, self.total);
            Ok(ChunkStatus::Complete(asset))
        } else {
            Ok(ChunkStatus::Partial)
        }
    }

    /// Bytes of `asset` once its upload finished.
    pub fn get(&self, asset: AssetRef) -> Option<&[u8]> {
        if self.asset == Some(asset) && self.data.len() == self.total {
            Some(&self.data)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.asset = None;
        self.total = 0;
        self.data.clear();
    }
}

impl<const N: usize> AssetSource for AssetStore<N> {
    type Error = AssetError;

    async fn open<'b>(
        &mut self,
        asset: AssetRef,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b [u8]>, AssetError> {
        let Some(bytes) = self.get(asset) else {
            return Ok(None);
        };
        let target = buf.get_mut(..bytes.len()).ok_or(AssetError::TooLarge)?;
        target.copy_from_slice(bytes);
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::{load_icon, tests::bmp24, IconError};
    use embassy_futures::block_on;
    use std::vec::Vec as StdVec;

    fn chunk(asset: u32, total: usize, offset: usize, payload: &[u8]) -> StdVec<u8> {
        let mut out = StdVec::new();
        out.extend_from_slice(&asset.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn upload<const N: usize>(store: &mut AssetStore<N>, asset: u32, blob: &[u8]) -> ChunkStatus {
        let mut status = ChunkStatus::Partial;
        for (i, part) in blob.chunks(100).enumerate() {
            status = store.write_chunk(&chunk(asset, blob.len(), i * 100, part)).unwrap();
        }
        status
    }

    #[test]
    fn assembles_chunks_in_order() {
        let mut store = AssetStore::<64>::new();
        assert_eq!(
            store.write_chunk(&chunk(3, 6, 0, b"abc")),
            Ok(ChunkStatus::Partial)
        );
        assert_eq!(store.get(AssetRef(3)), None);
        assert_eq!(
            store.write_chunk(&chunk(3, 6, 3, b"def")),
            Ok(ChunkStatus::Complete(AssetRef(3)))
        );
        assert_eq!(store.get(AssetRef(3)), Some(&b"abcdef"[..]));
        assert_eq!(store.get(AssetRef(4)), None);
    }

    #[test]
    fn rejects_bad_chunks() {
        let mut store = AssetStore::<8>::new();
        assert_eq!(store.write_chunk(&[0; 4]), Err(AssetError::Malformed));
        assert_eq!(
            store.write_chunk(&chunk(1, 9, 0, b"x")),
            Err(AssetError::TooLarge)
        );

        store.write_chunk(&chunk(1, 4, 0, b"ab")).unwrap();
        assert_eq!(
            store.write_chunk(&chunk(1, 4, 3, b"c")),
            Err(AssetError::OutOfOrder)
        );
        assert_eq!(
            store.write_chunk(&chunk(2, 4, 2, b"cd")),
            Err(AssetError::OutOfOrder)
        );
        assert_eq!(
            store.write_chunk(&chunk(1, 4, 2, b"cde")),
            Err(AssetError::Malformed)
        );
    }

    #[test]
    fn new_upload_replaces_old_asset() {
        let mut store = AssetStore::<16>::new();
        store.write_chunk(&chunk(1, 2, 0, b"ab")).unwrap();
        store.write_chunk(&chunk(2, 4, 0, b"cd")).unwrap();

        assert_eq!(store.get(AssetRef(1)), None);
        assert_eq!(store.get(AssetRef(2)), None);
    }

    #[test]
    fn uploaded_bitmap_loads_as_icon() {
        let blob = bmp24(12, 10, |_, _| [255, 255, 0]);
        let mut store = AssetStore::<ASSET_CAPACITY>::new();
        assert_eq!(upload(&mut store, 7, &blob), ChunkStatus::Complete(AssetRef(7)));

        let mut buf = [0u8; ASSET_CAPACITY];
        let icon = block_on(load_icon(&mut store, AssetRef(7), &mut buf)).unwrap();
        assert_eq!((icon.width(), icon.height()), (6, 5));

        assert_eq!(
            block_on(load_icon(&mut store, AssetRef(8), &mut buf)),
            Err(IconError::NoStream)
        );
        let mut small = [0u8; 16];
        assert_eq!(
            block_on(load_icon(&mut store, AssetRef(7), &mut small)),
            Err(IconError::Transport)
        );
    }

    #[test]
    fn largest_icon_source_fits_the_store() {
        let blob = bmp24(64, 64, |_, _| [0, 0, 255]);
        assert_eq!(blob.len(), ASSET_CAPACITY);

        let mut store = AssetStore::<ASSET_CAPACITY>::new();
        assert_eq!(upload(&mut store, 9, &blob), ChunkStatus::Complete(AssetRef(9)));

        let mut buf = [0u8; ASSET_CAPACITY];
        let icon = block_on(load_icon(&mut store, AssetRef(9), &mut buf)).unwrap();
        assert_eq!((icon.width(), icon.height()), (32, 32));

        let mut store = AssetStore::<ASSET_CAPACITY>::new();
        assert_eq!(
            store.write_chunk(&chunk(10, ASSET_CAPACITY + 1, 0, &[0; 8])),
            Err(AssetError::TooLarge)
        );
    }
}
