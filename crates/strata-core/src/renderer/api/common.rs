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

//! Pixel formats shared by decoded images and GPU textures.

use crate::math::mip_dimension;

/// Device feature required for BC1/BC3/BC7 textures.
pub const FEATURE_TEXTURE_COMPRESSION_BC: &str = "texture-compression-bc";
/// Device feature required for ETC2 textures.
pub const FEATURE_TEXTURE_COMPRESSION_ETC2: &str = "texture-compression-etc2";
/// Device feature required for ASTC textures.
pub const FEATURE_TEXTURE_COMPRESSION_ASTC: &str = "texture-compression-astc";

/// Defines the memory format of texels in a texture.
///
/// Uncompressed formats store one texel per 4 bytes. Block-compressed formats
/// store fixed-size blocks covering a rectangle of texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    // 8-bit formats
    /// Four 8-bit unsigned normalized components (RGBA).
    Rgba8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA) in the sRGB color space.
    Rgba8UnormSrgb,
    // Block-compressed formats
    /// BC1 (DXT1), 4x4 blocks of 8 bytes.
    Bc1RgbaUnorm,
    /// BC3 (DXT5), 4x4 blocks of 16 bytes.
    Bc3RgbaUnorm,
    /// BC7, 4x4 blocks of 16 bytes.
    Bc7RgbaUnorm,
    /// ETC2 RGB, 4x4 blocks of 8 bytes.
    Etc2Rgb8Unorm,
    /// ETC2 RGBA (EAC alpha), 4x4 blocks of 16 bytes.
    Etc2Rgba8Unorm,
    /// ASTC 4x4, blocks of 16 bytes.
    Astc4x4Unorm,
}

impl TextureFormat {
    /// Returns `true` for block-compressed formats.
    pub fn is_compressed(&self) -> bool {
        !matches!(
            self,
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb
        )
    }

    /// Returns the device feature needed to create textures in this format, if any.
    pub fn required_feature(&self) -> Option<&'static str> {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => None,
            TextureFormat::Bc1RgbaUnorm
            | TextureFormat::Bc3RgbaUnorm
            | TextureFormat::Bc7RgbaUnorm => Some(FEATURE_TEXTURE_COMPRESSION_BC),
            TextureFormat::Etc2Rgb8Unorm | TextureFormat::Etc2Rgba8Unorm => {
                Some(FEATURE_TEXTURE_COMPRESSION_ETC2)
            }
            TextureFormat::Astc4x4Unorm => Some(FEATURE_TEXTURE_COMPRESSION_ASTC),
        }
    }

    /// Returns the texel footprint `(width, height)` of one block.
    ///
    /// Uncompressed formats report `(1, 1)`.
    pub fn block_dimensions(&self) -> (u32, u32) {
        if self.is_compressed() {
            (4, 4)
        } else {
            (1, 1)
        }
    }

    /// Returns the size in bytes of one block (one texel for uncompressed formats).
    pub fn block_size(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => 4,
            TextureFormat::Bc1RgbaUnorm | TextureFormat::Etc2Rgb8Unorm => 8,
            TextureFormat::Bc3RgbaUnorm
            | TextureFormat::Bc7RgbaUnorm
            | TextureFormat::Etc2Rgba8Unorm
            | TextureFormat::Astc4x4Unorm => 16,
        }
    }

    /// Returns the number of bytes in one row of blocks for a level of the given width.
    pub fn bytes_per_row(&self, width: u32) -> u32 {
        let (block_width, _) = self.block_dimensions();
        width.div_ceil(block_width) * self.block_size()
    }

    /// Returns the byte length of a `width` x `height` level in this format.
    pub fn level_byte_length(&self, width: u32, height: u32) -> u64 {
        let (_, block_height) = self.block_dimensions();
        u64::from(self.bytes_per_row(width)) * u64::from(height.div_ceil(block_height))
    }

    /// Returns the byte length of a full chain of `mip_level_count` levels starting at
    /// `width` x `height`.
    pub fn chain_byte_length(&self, width: u32, height: u32, mip_level_count: u32) -> u64 {
        (0..mip_level_count)
            .map(|level| {
                self.level_byte_length(mip_dimension(width, level), mip_dimension(height, level))
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_levels_are_four_bytes_per_texel() {
        assert_eq!(TextureFormat::Rgba8Unorm.level_byte_length(3, 2), 24);
        assert_eq!(TextureFormat::Rgba8Unorm.bytes_per_row(3), 12);
        assert!(!TextureFormat::Rgba8UnormSrgb.is_compressed());
    }

    #[test]
    fn block_formats_name_their_device_feature() {
        assert_eq!(TextureFormat::Rgba8Unorm.required_feature(), None);
        assert_eq!(
            TextureFormat::Bc7RgbaUnorm.required_feature(),
            Some(FEATURE_TEXTURE_COMPRESSION_BC)
        );
        assert_eq!(
            TextureFormat::Etc2Rgb8Unorm.required_feature(),
            Some(FEATURE_TEXTURE_COMPRESSION_ETC2)
        );
    }

    #[test]
    fn compressed_levels_round_up_to_whole_blocks() {
        assert_eq!(TextureFormat::Bc1RgbaUnorm.level_byte_length(4, 4), 8);
        assert_eq!(TextureFormat::Bc1RgbaUnorm.level_byte_length(1, 1), 8);
        assert_eq!(TextureFormat::Bc7RgbaUnorm.level_byte_length(5, 4), 32);
    }

    #[test]
    fn chain_length_sums_each_level() {
        // 4x4 + 2x2 + 1x1
        assert_eq!(TextureFormat::Rgba8Unorm.chain_byte_length(4, 4, 3), 84);
        // Every level of a 4x4 BC7 chain occupies one block.
        assert_eq!(TextureFormat::Bc7RgbaUnorm.chain_byte_length(4, 4, 3), 48);
    }
}
