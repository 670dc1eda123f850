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

//! How a declared sampler is adjusted to the image it samples.

use strata_core::image::ImageResource;
use strata_core::renderer::Sampler;

/// The sampler a texture is created with and the preparation it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SamplerPolicy {
    pub sampler: Sampler,
    pub needs_mipmap: bool,
    pub needs_power_of_two: bool,
}

/// Returns the sampler a texture reference declares once UV transforms are
/// accounted for: a transformed reference never samples mip levels.
pub(crate) fn declared_sampler(sampler: Sampler, uses_texture_transform: bool) -> Sampler {
    if uses_texture_transform {
        sampler.without_mipmap()
    } else {
        sampler
    }
}

/// Decides how `image` is uploaded for `sampler`.
///
/// A compressed image carrying a single level cannot be mipmapped on the GPU, so a
/// mipmapped sampler falls back to its base-level filter. Raster images are
/// stretched to power-of-two sides whenever the sampler mipmaps or repeats.
pub(crate) fn resolve(sampler: Sampler, image: &ImageResource, name: &str) -> SamplerPolicy {
    let sampler = match image {
        ImageResource::Compressed(_)
            if sampler.requires_mipmap() && image.mip_level_count() <= 1 =>
        {
            let fallback = sampler.without_mipmap();
            log::warn!(
                "Compressed image '{name}' has no mip levels; minification filter {} replaced by {}",
                sampler.min_filter_gl(),
                fallback.min_filter_gl()
            );
            fallback
        }
        _ => sampler,
    };

    let needs_mipmap = sampler.requires_mipmap();
    let needs_power_of_two = !image.is_compressed() && sampler.requires_power_of_two();
    SamplerPolicy {
        sampler,
        needs_mipmap,
        needs_power_of_two,
    }
}
