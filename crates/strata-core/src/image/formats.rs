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

use crate::asset::TextureEntry;
use serde::{Deserialize, Serialize};

/// Which optional image formats the runtime can consume.
///
/// The snapshot is taken once when a loader is constructed and never changes
/// afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportedImageFormats {
    /// KTX2 / Basis Universal block-compressed textures.
    pub basis: bool,
    /// WebP images.
    pub webp: bool,
}

/// The image source chosen for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageVariant {
    /// The texture's base `source`.
    Base,
    /// The `KHR_texture_basisu` source.
    Basis,
    /// The `EXT_texture_webp` source.
    Webp,
}

impl ImageVariant {
    /// A short tag used when building cache keys.
    pub fn tag(&self) -> &'static str {
        match self {
            ImageVariant::Base => "base",
            ImageVariant::Basis => "basisu",
            ImageVariant::Webp => "webp",
        }
    }
}

impl SupportedImageFormats {
    /// Creates a descriptor from the two capability flags.
    pub const fn new(basis: bool, webp: bool) -> Self {
        Self { basis, webp }
    }

    /// Picks the image slot a texture should load.
    ///
    /// A supported block-compressed source wins over a supported WebP source,
    /// which wins over the base source. Returns `None` when the texture declares
    /// no usable source.
    pub fn select_image_source(&self, texture: &TextureEntry) -> Option<(usize, ImageVariant)> {
        if self.basis {
            if let Some(ext) = &texture.extensions.khr_texture_basisu {
                return Some((ext.source, ImageVariant::Basis));
            }
        }
        if self.webp {
            if let Some(ext) = &texture.extensions.ext_texture_webp {
                return Some((ext.source, ImageVariant::Webp));
            }
        }
        texture.source.map(|source| (source, ImageVariant::Base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{ExtensionSource, TextureExtensions};

    fn texture() -> TextureEntry {
        TextureEntry {
            source: Some(0),
            sampler: None,
            extensions: TextureExtensions {
                khr_texture_basisu: Some(ExtensionSource { source: 1 }),
                ext_texture_webp: Some(ExtensionSource { source: 2 }),
            },
        }
    }

    #[test]
    fn base_source_without_capabilities() {
        let formats = SupportedImageFormats::default();
        assert_eq!(
            formats.select_image_source(&texture()),
            Some((0, ImageVariant::Base))
        );
    }

    #[test]
    fn basis_preferred_over_webp() {
        let formats = SupportedImageFormats::new(true, true);
        assert_eq!(
            formats.select_image_source(&texture()),
            Some((1, ImageVariant::Basis))
        );
        let webp_only = SupportedImageFormats::new(false, true);
        assert_eq!(
            webp_only.select_image_source(&texture()),
            Some((2, ImageVariant::Webp))
        );
    }

    #[test]
    fn extension_only_texture_without_support_has_no_source() {
        let entry = TextureEntry {
            source: None,
            ..texture()
        };
        assert_eq!(
            SupportedImageFormats::default().select_image_source(&entry),
            None
        );
    }
}
