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

//! KTX2 container parsing and per-level transcoding.
//!
//! Only single-face, single-layer 2D textures are accepted. Levels stored in a
//! GPU format without supercompression are copied as-is; Basis Universal and
//! supercompressed levels are handed to a [`Transcoder`], by default a
//! [`BasisTranscoder`]. One failing level fails the whole image.

use super::super::AssetLoaderLane;
use super::BasisTranscoder;
use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;
use strata_core::image::{CompressedImage, ImageResource, MipLevel};
use strata_core::math::mip_dimension;
use strata_core::renderer::TextureFormat;

/// The twelve bytes every KTX2 file starts with.
pub const KTX2_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

const HEADER_LENGTH: usize = 80;
const LEVEL_INDEX_ENTRY_LENGTH: usize = 24;

/// Levels stored as-is.
pub const SUPERCOMPRESSION_NONE: u32 = 0;
/// ETC1S slices sharing the codebooks of the global data.
pub const SUPERCOMPRESSION_BASIS_LZ: u32 = 1;

/// Data format descriptor colour model of ETC1S payloads.
pub const KHR_DF_MODEL_ETC1S: u8 = 163;
/// Data format descriptor colour model of UASTC payloads.
pub const KHR_DF_MODEL_UASTC: u8 = 166;

const KHR_DF_CHANNEL_ALPHA: u8 = 15;
const KHR_DF_CHANNEL_UASTC_RGBA: u8 = 3;
const KHR_DF_CHANNEL_UASTC_RRRG: u8 = 5;
const DFD_BLOCK_HEADER_LENGTH: usize = 24;
const DFD_SAMPLE_LENGTH: usize = 16;

/// Errors raised while reading a KTX2 container.
#[derive(Debug, thiserror::Error)]
pub enum Ktx2Error {
    /// The data does not start with the KTX2 identifier.
    #[error("Not a KTX2 file")]
    InvalidIdentifier,
    /// The data ends before a structure it declares.
    #[error("KTX2 data truncated: {0}")]
    Truncated(&'static str),
    /// The container describes something other than a single 2D image.
    #[error("Unsupported KTX2 layout: {0}")]
    UnsupportedLayout(String),
    /// The Vulkan format has no texture format counterpart.
    #[error("Unsupported KTX2 vkFormat {0}")]
    UnsupportedFormat(u32),
    /// The levels are supercompressed and no transcoder was configured.
    #[error("No transcoder available for KTX2 supercompression scheme {0}")]
    TranscoderUnavailable(u32),
    /// A level does not hold the number of bytes its dimensions require.
    #[error("KTX2 level {level} holds {actual} bytes, expected {expected}")]
    LevelSize {
        /// The level index.
        level: u32,
        /// Bytes the dimensions require.
        expected: u64,
        /// Bytes present.
        actual: u64,
    },
    /// A transcoder failed on a level.
    #[error("Failed to transcode KTX2 level {level}: {message}")]
    Transcode {
        /// The level index.
        level: u32,
        /// The transcoder's message.
        message: String,
    },
}

/// Range of one level inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelIndex {
    /// Offset of the level data from the start of the file.
    pub byte_offset: u64,
    /// Length of the (possibly supercompressed) level data.
    pub byte_length: u64,
    /// Length once supercompression is removed.
    pub uncompressed_byte_length: u64,
}

/// The fields of a KTX2 header the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ktx2Header {
    /// Vulkan format of the texel blocks, `0` for Basis Universal payloads.
    pub vk_format: u32,
    /// Width of level 0.
    pub pixel_width: u32,
    /// Height of level 0.
    pub pixel_height: u32,
    /// Number of levels stored (at least one).
    pub level_count: u32,
    /// `0` none, `1` BasisLZ, `2` Zstandard, `3` ZLIB.
    pub supercompression_scheme: u32,
    /// Level ranges, level 0 first.
    pub levels: Vec<LevelIndex>,
    /// Colour model of the data format descriptor, if one is present.
    pub color_model: Option<u8>,
    /// `true` if the data format descriptor declares an alpha channel.
    pub has_alpha: bool,
    /// Byte range of the supercompression global data, empty when absent.
    pub global_data: Range<usize>,
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, Ktx2Error> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(Ktx2Error::Truncated("header"))
}

fn read_u64(bytes: &[u8], offset: usize) -> Result<u64, Ktx2Error> {
    bytes
        .get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(Ktx2Error::Truncated("level index"))
}

fn checked_range(
    bytes: &[u8],
    offset: u64,
    length: u64,
    what: &'static str,
) -> Result<Range<usize>, Ktx2Error> {
    match offset.checked_add(length) {
        Some(end) if end <= bytes.len() as u64 => Ok(offset as usize..end as usize),
        _ => Err(Ktx2Error::Truncated(what)),
    }
}

/// Reads the colour model and alpha presence from the basic descriptor block.
fn read_dfd(dfd: &[u8]) -> (Option<u8>, bool) {
    // The block follows the 4-byte total size.
    let Some(block) = dfd.get(4..) else {
        return (None, false);
    };
    let Some(&color_model) = block.get(8) else {
        return (None, false);
    };
    let block_size = block
        .get(4..8)
        .and_then(|b| b.try_into().ok())
        .map_or(0, |b| (u32::from_le_bytes(b) >> 16) as usize);
    let sample_count = block_size.saturating_sub(DFD_BLOCK_HEADER_LENGTH) / DFD_SAMPLE_LENGTH;
    let has_alpha = (0..sample_count)
        .filter_map(|sample| {
            block.get(DFD_BLOCK_HEADER_LENGTH + sample * DFD_SAMPLE_LENGTH + 3)
        })
        .map(|channel_type| channel_type & 0x0F)
        .any(|channel| match color_model {
            KHR_DF_MODEL_UASTC => {
                channel == KHR_DF_CHANNEL_UASTC_RGBA || channel == KHR_DF_CHANNEL_UASTC_RRRG
            }
            _ => channel == KHR_DF_CHANNEL_ALPHA,
        });
    (Some(color_model), has_alpha)
}

/// Returns `true` if `bytes` starts with the KTX2 identifier.
pub fn is_ktx2(bytes: &[u8]) -> bool {
    bytes.starts_with(&KTX2_IDENTIFIER)
}

/// Maps a Vulkan format to a texture format. Unorm and sRGB variants share one format.
pub fn texture_format_from_vk(vk_format: u32) -> Option<TextureFormat> {
    match vk_format {
        37 => Some(TextureFormat::Rgba8Unorm),
        43 => Some(TextureFormat::Rgba8UnormSrgb),
        131..=134 => Some(TextureFormat::Bc1RgbaUnorm),
        137 | 138 => Some(TextureFormat::Bc3RgbaUnorm),
        145 | 146 => Some(TextureFormat::Bc7RgbaUnorm),
        147 | 148 => Some(TextureFormat::Etc2Rgb8Unorm),
        151 | 152 => Some(TextureFormat::Etc2Rgba8Unorm),
        157 | 158 => Some(TextureFormat::Astc4x4Unorm),
        _ => None,
    }
}

impl Ktx2Header {
    /// Parses the header and level index of a KTX2 file.
    pub fn parse(bytes: &[u8]) -> Result<Self, Ktx2Error> {
        if !is_ktx2(bytes) {
            return Err(Ktx2Error::InvalidIdentifier);
        }
        if bytes.len() < HEADER_LENGTH {
            return Err(Ktx2Error::Truncated("header"));
        }

        let vk_format = read_u32(bytes, 12)?;
        let pixel_width = read_u32(bytes, 20)?;
        let pixel_height = read_u32(bytes, 24)?;
        let pixel_depth = read_u32(bytes, 28)?;
        let layer_count = read_u32(bytes, 32)?;
        let face_count = read_u32(bytes, 36)?;
        let level_count = read_u32(bytes, 40)?.max(1);
        let supercompression_scheme = read_u32(bytes, 44)?;
        let dfd_offset = read_u32(bytes, 48)?;
        let dfd_length = read_u32(bytes, 52)?;
        let sgd_offset = read_u64(bytes, 64)?;
        let sgd_length = read_u64(bytes, 72)?;

        if pixel_width == 0 || pixel_height == 0 {
            return Err(Ktx2Error::UnsupportedLayout(format!(
                "{pixel_width}x{pixel_height} texture"
            )));
        }
        if pixel_depth > 1 {
            return Err(Ktx2Error::UnsupportedLayout("3D texture".to_string()));
        }
        if layer_count > 1 {
            return Err(Ktx2Error::UnsupportedLayout("array texture".to_string()));
        }
        if face_count != 1 {
            return Err(Ktx2Error::UnsupportedLayout("cube map".to_string()));
        }

        let levels = (0..level_count as usize)
            .map(|level| {
                let at = HEADER_LENGTH + level * LEVEL_INDEX_ENTRY_LENGTH;
                let index = LevelIndex {
                    byte_offset: read_u64(bytes, at)?,
                    byte_length: read_u64(bytes, at + 8)?,
                    uncompressed_byte_length: read_u64(bytes, at + 16)?,
                };
                checked_range(bytes, index.byte_offset, index.byte_length, "level data")?;
                Ok(index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (color_model, has_alpha) = if dfd_length > 0 {
            let dfd = checked_range(
                bytes,
                u64::from(dfd_offset),
                u64::from(dfd_length),
                "data format descriptor",
            )?;
            read_dfd(&bytes[dfd])
        } else {
            (None, false)
        };
        let global_data = if sgd_length > 0 {
            checked_range(bytes, sgd_offset, sgd_length, "supercompression global data")?
        } else {
            0..0
        };

        Ok(Self {
            vk_format,
            pixel_width,
            pixel_height,
            level_count,
            supercompression_scheme,
            levels,
            color_model,
            has_alpha,
            global_data,
        })
    }

    /// Returns the dimensions of `level`.
    pub fn level_dimensions(&self, level: u32) -> (u32, u32) {
        (
            mip_dimension(self.pixel_width, level),
            mip_dimension(self.pixel_height, level),
        )
    }

    /// Returns `true` if the levels need a [`Transcoder`] before upload.
    pub fn needs_transcoding(&self) -> bool {
        self.supercompression_scheme != SUPERCOMPRESSION_NONE || self.vk_format == 0
    }
}

/// One level handed to a [`Transcoder`].
#[derive(Debug, Clone, Copy)]
pub struct LevelSource<'a> {
    /// The level index.
    pub level: u32,
    /// Width of the level in texels.
    pub width: u32,
    /// Height of the level in texels.
    pub height: u32,
    /// The level bytes as stored in the file.
    pub data: &'a [u8],
    /// The file's supercompression global data, empty when absent.
    pub global_data: &'a [u8],
}

/// Turns stored KTX2 levels into GPU-ready blocks.
pub trait Transcoder: Send + Sync + Debug {
    /// The format the transcoded levels are encoded in.
    fn target_format(&self, header: &Ktx2Header) -> Result<TextureFormat, Ktx2Error>;

    /// Produces the GPU-ready bytes for one level.
    fn transcode_level(
        &self,
        header: &Ktx2Header,
        source: LevelSource<'_>,
    ) -> Result<Vec<u8>, Ktx2Error>;

    /// Identifies the output of this transcoder. Images decoded by transcoders
    /// with different tags are never shared.
    fn cache_tag(&self) -> String;
}

/// Copies levels that are stored without supercompression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranscoder;

impl Transcoder for PassthroughTranscoder {
    fn target_format(&self, header: &Ktx2Header) -> Result<TextureFormat, Ktx2Error> {
        texture_format_from_vk(header.vk_format)
            .ok_or(Ktx2Error::UnsupportedFormat(header.vk_format))
    }

    fn transcode_level(
        &self,
        _header: &Ktx2Header,
        source: LevelSource<'_>,
    ) -> Result<Vec<u8>, Ktx2Error> {
        Ok(source.data.to_vec())
    }

    fn cache_tag(&self) -> String {
        "passthrough".to_string()
    }
}

/// A lane decoding KTX2 files into pre-baked mip chains.
#[derive(Debug, Clone)]
pub struct Ktx2LoaderLane {
    transcoder: Arc<dyn Transcoder>,
}

impl Default for Ktx2LoaderLane {
    fn default() -> Self {
        Self::with_transcoder(Arc::new(BasisTranscoder::default()))
    }
}

impl Ktx2LoaderLane {
    /// Creates a lane transcoding Basis Universal payloads to RGBA8.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lane that hands Basis Universal and supercompressed levels to
    /// `transcoder`.
    pub fn with_transcoder(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }

    /// Identifies the images this lane produces, see [`Transcoder::cache_tag`].
    pub fn cache_tag(&self) -> String {
        self.transcoder.cache_tag()
    }

    /// Parses and transcodes every level of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Result<CompressedImage, Ktx2Error> {
        let header = Ktx2Header::parse(bytes)?;
        let transcoder: &dyn Transcoder = if header.needs_transcoding() {
            self.transcoder.as_ref()
        } else {
            &PassthroughTranscoder
        };
        let global_data = &bytes[header.global_data.clone()];
        let format = transcoder.target_format(&header)?;

        let mut levels = Vec::with_capacity(header.levels.len());
        for (level, index) in (0u32..).zip(&header.levels) {
            let (width, height) = header.level_dimensions(level);
            let start = index.byte_offset as usize;
            let end = start + index.byte_length as usize;
            let data = transcoder.transcode_level(
                &header,
                LevelSource {
                    level,
                    width,
                    height,
                    data: &bytes[start..end],
                    global_data,
                },
            )?;

            let expected = format.level_byte_length(width, height);
            if data.len() as u64 != expected {
                return Err(Ktx2Error::LevelSize {
                    level,
                    expected,
                    actual: data.len() as u64,
                });
            }
            levels.push(MipLevel {
                width,
                height,
                data,
            });
        }

        log::debug!(
            "Decoded KTX2 {}x{} {:?} with {} level(s)",
            header.pixel_width,
            header.pixel_height,
            format,
            levels.len()
        );
        Ok(CompressedImage { format, levels })
    }
}

impl AssetLoaderLane<ImageResource> for Ktx2LoaderLane {
    fn load(&self, bytes: &[u8]) -> Result<ImageResource, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ImageResource::Compressed(self.decode(bytes)?))
    }
}
