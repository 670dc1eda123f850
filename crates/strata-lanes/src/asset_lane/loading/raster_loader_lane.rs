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

//! Raster image decoding.

use super::super::AssetLoaderLane;
use anyhow::Context;
use strata_core::image::{ImageResource, RasterImage};

/// A lane dedicated to decoding raster files (PNG, JPEG, WebP, ...) on the CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterLoaderLane;

impl AssetLoaderLane<ImageResource> for RasterLoaderLane {
    fn load(
        &self,
        bytes: &[u8],
    ) -> Result<ImageResource, Box<dyn std::error::Error + Send + Sync + 'static>> {
        // Decode the image using the `image` crate
        let img = image::load_from_memory(bytes).context("Failed to decode image from memory")?;

        // Convert to RGBA8, colour space untouched
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(ImageResource::Raster(RasterImage {
            width,
            height,
            pixels: rgba_img.into_raw(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba8() {
        let image = RasterLoaderLane.load(&encode_png(3, 2)).unwrap();
        match image {
            ImageResource::Raster(raster) => {
                assert_eq!((raster.width, raster.height), (3, 2));
                assert_eq!(raster.pixels.len(), 24);
                assert_eq!(&raster.pixels[..4], &[255, 0, 0, 255]);
            }
            ImageResource::Compressed(_) => panic!("expected a raster image"),
        }
    }

    #[test]
    fn garbage_is_an_error() {
        let err = RasterLoaderLane.load(b"not an image").unwrap_err();
        assert!(err.to_string().contains("Failed to decode image"));
    }
}
