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

//! Structural keys identifying shared cache entries.

use std::fmt;
use std::sync::Arc;
use strata_core::image::ImageVariant;
use strata_core::io::Resource;
use strata_core::renderer::Sampler;

/// Identifies one shared resource in a [`ResourceCache`](super::ResourceCache).
///
/// Keys are cheap to clone and compare by their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Creates a key from its textual form.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Key of an image stored at its own location.
    ///
    /// The key is the absolute location, so every asset referencing the same URL
    /// shares one decoded image whatever base it was declared against. `decoder`
    /// tags the decoder output so differently transcoded copies never mix.
    pub fn image(image: &Resource, variant: ImageVariant, decoder: &str) -> Self {
        Self::new(format!("image:{}:{decoder}:{}", variant.tag(), image.url()))
    }

    /// Key of an image embedded in an asset, addressed by its slot.
    pub fn embedded_image(
        asset: &Resource,
        image_index: usize,
        variant: ImageVariant,
        decoder: &str,
    ) -> Self {
        Self::new(format!(
            "image:{}:{decoder}:{}#images/{image_index}",
            variant.tag(),
            asset.url()
        ))
    }

    /// Key of the uploaded GPU texture behind a texture key.
    pub fn gpu_texture(texture: &CacheKey) -> Self {
        Self::new(format!("gpu:{}", texture.as_str()))
    }

    /// Key of the GPU texture produced from `image` when sampled with `sampler`.
    pub fn texture(image: &CacheKey, sampler: &Sampler) -> Self {
        Self::new(format!("texture:{sampler}:{}", image.as_str()))
    }

    /// Returns the textual form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
