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

use image::imageops::{self, FilterType};
use image::RgbaImage;
use strata_core::image::RasterImage;
use strata_core::math::{is_power_of_two, next_power_of_two};

/// Errors raised while resampling a raster image.
#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    /// The pixel buffer does not match the declared dimensions.
    #[error("Pixel buffer of {len} bytes does not hold a {width}x{height} RGBA8 image")]
    InvalidBuffer {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Buffer length.
        len: usize,
    },
}

/// Stretches `image` so both sides become the next power of two.
///
/// Images that already have power-of-two sides are returned unchanged. Resampling
/// is bilinear.
pub fn resize_to_power_of_two(image: &RasterImage) -> Result<RasterImage, ResampleError> {
    if is_power_of_two(image.width) && is_power_of_two(image.height) {
        return Ok(image.clone());
    }

    let source = RgbaImage::from_raw(image.width, image.height, image.pixels.clone()).ok_or(
        ResampleError::InvalidBuffer {
            width: image.width,
            height: image.height,
            len: image.pixels.len(),
        },
    )?;
    let width = next_power_of_two(image.width);
    let height = next_power_of_two(image.height);
    let resized = imageops::resize(&source, width, height, FilterType::Triangle);

    log::debug!(
        "Resampled {}x{} image to {width}x{height}",
        image.width,
        image.height
    );
    Ok(RasterImage {
        width,
        height,
        pixels: resized.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32) -> RasterImage {
        RasterImage {
            width,
            height,
            pixels: [10, 20, 30, 255].repeat((width * height) as usize),
        }
    }

    #[test]
    fn npot_image_grows_to_next_power_of_two() {
        let resized = resize_to_power_of_two(&solid(3, 2)).unwrap();
        assert_eq!((resized.width, resized.height), (4, 2));
        assert_eq!(resized.pixels.len(), 32);
        assert_eq!(&resized.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn pot_image_is_untouched() {
        let image = solid(1, 1);
        assert_eq!(resize_to_power_of_two(&image).unwrap(), image);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let image = RasterImage {
            width: 3,
            height: 3,
            pixels: vec![0; 8],
        };
        assert!(matches!(
            resize_to_power_of_two(&image),
            Err(ResampleError::InvalidBuffer { len: 8, .. })
        ));
    }
}
