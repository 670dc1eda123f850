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

//! Container detection in front of the raster and KTX2 lanes.

use super::{is_ktx2, BasisTranscoder, Ktx2LoaderLane, RasterLoaderLane};
use crate::asset_lane::AssetLoaderLane;
use std::error::Error;
use std::sync::Arc;
use strata_core::image::ImageResource;
use strata_core::renderer::GraphicsDevice;

/// Media type of KTX2 containers.
pub const KTX2_MEDIA_TYPE: &str = "image/ktx2";

/// Routes fetched bytes to the KTX2 lane or the raster lane.
///
/// A source is treated as KTX2 when its bytes start with the KTX2 identifier or
/// when its declared media type is `image/ktx2`. Everything else is decoded as a
/// raster image.
#[derive(Debug, Clone, Default)]
pub struct ImageLoaderLane {
    raster: RasterLoaderLane,
    ktx2: Ktx2LoaderLane,
}

impl ImageLoaderLane {
    /// Creates a router using `ktx2` for block-compressed sources.
    pub fn new(ktx2: Ktx2LoaderLane) -> Self {
        Self {
            raster: RasterLoaderLane,
            ktx2,
        }
    }

    /// Creates a router transcoding Basis Universal payloads to the best block
    /// format `device` supports.
    pub fn for_device(device: &dyn GraphicsDevice) -> Self {
        Self::new(Ktx2LoaderLane::with_transcoder(Arc::new(
            BasisTranscoder::for_device(device),
        )))
    }

    /// Identifies the images this router produces. Routers with equal tags
    /// decode any source to the same image.
    pub fn cache_tag(&self) -> String {
        self.ktx2.cache_tag()
    }

    /// Returns `true` if the source takes the block-compressed path.
    pub fn is_compressed_source(bytes: &[u8], media_type: Option<&str>) -> bool {
        is_ktx2(bytes) || media_type.is_some_and(|m| m.eq_ignore_ascii_case(KTX2_MEDIA_TYPE))
    }

    /// Decodes `bytes`, using `media_type` as a hint.
    pub fn decode(
        &self,
        bytes: &[u8],
        media_type: Option<&str>,
    ) -> Result<ImageResource, Box<dyn Error + Send + Sync>> {
        if Self::is_compressed_source(bytes, media_type) {
            self.ktx2.load(bytes)
        } else {
            self.raster.load(bytes)
        }
    }
}

impl AssetLoaderLane<ImageResource> for ImageLoaderLane {
    fn load(&self, bytes: &[u8]) -> Result<ImageResource, Box<dyn Error + Send + Sync>> {
        self.decode(bytes, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_forces_the_ktx2_path() {
        assert!(ImageLoaderLane::is_compressed_source(b"", Some("image/KTX2")));
        assert!(!ImageLoaderLane::is_compressed_source(b"", Some("image/png")));
        assert!(!ImageLoaderLane::is_compressed_source(b"", None));
    }

    #[test]
    fn declared_ktx2_with_raster_bytes_fails_in_the_ktx2_lane() {
        let err = ImageLoaderLane::default()
            .decode(b"\x89PNG\r\n\x1a\n", Some(KTX2_MEDIA_TYPE))
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a KTX2 file");
    }
}
