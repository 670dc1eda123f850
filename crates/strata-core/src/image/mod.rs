// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Decoded image resources and the format capabilities used to pick image sources.
//!
//! An [`ImageResource`] is either a raster image, decoded to tightly packed RGBA8
//! texels, or a block-compressed image whose mip chain was baked ahead of time.
//! Every consumer downstream of decoding matches on that distinction.

mod formats;

pub use self::formats::{ImageVariant, SupportedImageFormats};

use crate::asset::Asset;
use crate::renderer::TextureFormat;

/// A decoded raster image in RGBA8 layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// `width * height * 4` bytes, row-major, no padding.
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Bytes per texel.
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Returns the number of bytes in one row.
    pub fn bytes_per_row(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }
}

/// One pre-baked level of a compressed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    /// Width of the level in texels.
    pub width: u32,
    /// Height of the level in texels.
    pub height: u32,
    /// Block data for the level.
    pub data: Vec<u8>,
}

/// A block-compressed image with its mip chain, largest level first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    /// The GPU format the blocks are encoded in.
    pub format: TextureFormat,
    /// Levels ordered from the base level down.
    pub levels: Vec<MipLevel>,
}

/// A decoded image, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageResource {
    /// Uncompressed RGBA8 texels.
    Raster(RasterImage),
    /// Block-compressed levels.
    Compressed(CompressedImage),
}

impl Asset for ImageResource {}

impl ImageResource {
    /// Returns the width of the base level.
    pub fn width(&self) -> u32 {
        match self {
            ImageResource::Raster(image) => image.width,
            ImageResource::Compressed(image) => image.levels.first().map_or(0, |l| l.width),
        }
    }

    /// Returns the height of the base level.
    pub fn height(&self) -> u32 {
        match self {
            ImageResource::Raster(image) => image.height,
            ImageResource::Compressed(image) => image.levels.first().map_or(0, |l| l.height),
        }
    }

    /// Returns the number of levels carried by the image. Raster images carry one.
    pub fn mip_level_count(&self) -> u32 {
        match self {
            ImageResource::Raster(_) => 1,
            ImageResource::Compressed(image) => image.levels.len() as u32,
        }
    }

    /// Returns `true` for block-compressed images.
    pub fn is_compressed(&self) -> bool {
        matches!(self, ImageResource::Compressed(_))
    }

    /// Returns the CPU memory held by the decoded data.
    pub fn byte_length(&self) -> u64 {
        match self {
            ImageResource::Raster(image) => image.pixels.len() as u64,
            ImageResource::Compressed(image) => {
                image.levels.iter().map(|l| l.data.len() as u64).sum()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_reports_single_level() {
        let image = ImageResource::Raster(RasterImage {
            width: 3,
            height: 2,
            pixels: vec![0; 24],
        });
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.mip_level_count(), 1);
        assert_eq!(image.byte_length(), 24);
        assert!(!image.is_compressed());
    }

    #[test]
    fn compressed_reports_base_level_and_chain_length() {
        let image = ImageResource::Compressed(CompressedImage {
            format: TextureFormat::Bc7RgbaUnorm,
            levels: vec![
                MipLevel {
                    width: 4,
                    height: 4,
                    data: vec![0; 16],
                },
                MipLevel {
                    width: 2,
                    height: 2,
                    data: vec![0; 16],
                },
            ],
        });
        assert_eq!((image.width(), image.height()), (4, 4));
        assert_eq!(image.mip_level_count(), 2);
        assert_eq!(image.byte_length(), 32);
        assert!(image.is_compressed());
    }
}
