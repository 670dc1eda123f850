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

//! The GPU-side half of texture loading, run under the scheduler's budget.

use super::error::TextureLoadError;
use super::sampler::SamplerPolicy;
use crate::scheduler::Job;
use std::borrow::Cow;
use std::sync::Arc;
use strata_core::image::{CompressedImage, ImageResource, RasterImage};
use strata_core::math::{full_mip_level_count, Extent3D, Origin3D};
use strata_core::renderer::{
    GraphicsDevice, ResourceError, Texture, TextureDescriptor, TextureFormat, TextureId,
};
use strata_lanes::image_lane::resize_to_power_of_two;

/// Creates and fills one texture from a decoded image.
pub(crate) struct TextureUploadJob<'a> {
    device: Arc<dyn GraphicsDevice>,
    image: &'a ImageResource,
    policy: SamplerPolicy,
    label: &'a str,
    result: Option<Result<Texture, TextureLoadError>>,
}

impl<'a> TextureUploadJob<'a> {
    pub(crate) fn new(
        device: Arc<dyn GraphicsDevice>,
        image: &'a ImageResource,
        policy: SamplerPolicy,
        label: &'a str,
    ) -> Self {
        Self {
            device,
            image,
            policy,
            label,
            result: None,
        }
    }

    /// Returns the outcome, or `None` if the job never ran.
    pub(crate) fn into_result(self) -> Option<Result<Texture, TextureLoadError>> {
        self.result
    }

    fn upload(&self) -> Result<Texture, TextureLoadError> {
        match self.image {
            ImageResource::Raster(raster) => self.upload_raster(raster),
            ImageResource::Compressed(compressed) => self.upload_compressed(compressed),
        }
    }

    fn upload_raster(&self, raster: &RasterImage) -> Result<Texture, TextureLoadError> {
        let raster = if self.policy.needs_power_of_two {
            Cow::Owned(resize_to_power_of_two(raster)?)
        } else {
            Cow::Borrowed(raster)
        };
        let mip_level_count = if self.policy.needs_mipmap {
            full_mip_level_count(raster.width, raster.height)
        } else {
            1
        };
        let descriptor = TextureDescriptor {
            label: Some(Cow::Borrowed(self.label)),
            size: Extent3D::new_2d(raster.width, raster.height),
            mip_level_count,
            format: TextureFormat::Rgba8Unorm,
        };
        let id = self.device.create_texture(&descriptor)?;

        self.fill(id, |device| {
            device.write_texture(
                id,
                0,
                &raster.pixels,
                Some(raster.bytes_per_row()),
                Origin3D::ZERO,
                descriptor.size,
            )?;
            if self.policy.needs_mipmap {
                device.generate_mipmaps(id)?;
            }
            Ok(())
        })?;

        Ok(self.texture(id, &descriptor))
    }

    fn upload_compressed(&self, image: &CompressedImage) -> Result<Texture, TextureLoadError> {
        let base = image
            .levels
            .first()
            .ok_or(TextureLoadError::Upload(ResourceError::OutOfBounds))?;
        let descriptor = TextureDescriptor {
            label: Some(Cow::Borrowed(self.label)),
            size: Extent3D::new_2d(base.width, base.height),
            mip_level_count: image.levels.len() as u32,
            format: image.format,
        };
        let id = self.device.create_texture(&descriptor)?;

        self.fill(id, |device| {
            for (level, mip) in (0u32..).zip(&image.levels) {
                device.write_texture(
                    id,
                    level,
                    &mip.data,
                    Some(image.format.bytes_per_row(mip.width)),
                    Origin3D::ZERO,
                    Extent3D::new_2d(mip.width, mip.height),
                )?;
            }
            Ok(())
        })?;

        Ok(self.texture(id, &descriptor))
    }

    /// Runs `writes`, destroying the texture if any of them fails.
    fn fill(
        &self,
        id: TextureId,
        writes: impl FnOnce(&dyn GraphicsDevice) -> Result<(), ResourceError>,
    ) -> Result<(), ResourceError> {
        writes(self.device.as_ref()).inspect_err(|_| {
            if let Err(e) = self.device.destroy_texture(id) {
                log::warn!("Failed to destroy partially uploaded texture {id:?}: {e}");
            }
        })
    }

    fn texture(&self, id: TextureId, descriptor: &TextureDescriptor) -> Texture {
        Texture {
            id,
            width: descriptor.size.width,
            height: descriptor.size.height,
            mip_level_count: descriptor.mip_level_count,
            format: descriptor.format,
            size_in_bytes: descriptor.size_in_bytes(),
            sampler: self.policy.sampler,
        }
    }
}

impl Job for TextureUploadJob<'_> {
    fn execute(&mut self) {
        self.result = Some(self.upload());
    }
}
