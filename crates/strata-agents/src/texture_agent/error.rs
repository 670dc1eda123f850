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

use std::error::Error;
use std::sync::Arc;
use strata_core::io::FetchError;
use strata_core::renderer::{InvalidSamplerCode, ResourceError};
use strata_data::CacheError;
use strata_lanes::image_lane::ResampleError;

/// An invalid combination of loader options, detected before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required option was not provided.
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),
    /// The texture info points past the description's textures.
    #[error("Texture index {0} is out of range")]
    TextureIndexOutOfRange(usize),
    /// The texture has no source the supported formats can load.
    #[error("Texture {0} has no loadable image source")]
    NoImageSource(usize),
    /// The selected image slot does not exist.
    #[error("Image index {0} is out of range")]
    ImageIndexOutOfRange(usize),
    /// The texture points past the description's samplers.
    #[error("Sampler index {0} is out of range")]
    SamplerIndexOutOfRange(usize),
    /// A sampler field holds an unknown code.
    #[error("Invalid sampler: {0}")]
    InvalidSampler(#[from] InvalidSamplerCode),
    /// The image is stored in a way the loader cannot fetch.
    #[error("Image {image} is not supported: {reason}")]
    UnsupportedImage {
        /// The image index.
        image: usize,
        /// Why it cannot be loaded.
        reason: &'static str,
    },
    /// The image URI cannot be resolved against the base resource.
    #[error("Invalid image location: {0}")]
    InvalidUri(FetchError),
}

/// A failure to fetch or decode one image.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    /// The bytes could not be read.
    #[error("Failed to load image: {name}\n{source}")]
    Fetch {
        /// The image's display name.
        name: String,
        /// The fetch failure.
        source: FetchError,
    },
    /// The bytes could not be decoded.
    #[error("Failed to load image: {name}\n{source}")]
    Decode {
        /// The image's display name.
        name: String,
        /// The decoder failure.
        source: Box<dyn Error + Send + Sync>,
    },
    /// The decoding task did not complete.
    #[error("Failed to load image: {name}\ndecoding task failed: {message}")]
    Task {
        /// The image's display name.
        name: String,
        /// The runtime's message.
        message: String,
    },
    /// The image was unloaded and can no longer be read.
    #[error("Failed to load image: {name}\nimage resource was unloaded")]
    Unloaded {
        /// The image's display name.
        name: String,
    },
}

/// A failure of a [`TextureLoader`](super::TextureLoader) after construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TextureLoadError {
    /// The image could not be fetched or decoded.
    #[error("Failed to load texture\n{0}")]
    Image(Arc<ImageLoadError>),
    /// The texture could not be created or filled.
    #[error("Failed to load texture\n{0}")]
    Upload(ResourceError),
    /// The image could not be resampled to power-of-two sides.
    #[error("Failed to load texture\n{0}")]
    Resample(Arc<ResampleError>),
    /// The image could not be acquired from the cache.
    #[error("Failed to load texture\n{0}")]
    Cache(Arc<CacheError>),
}

impl From<ResourceError> for TextureLoadError {
    fn from(err: ResourceError) -> Self {
        TextureLoadError::Upload(err)
    }
}

impl From<ResampleError> for TextureLoadError {
    fn from(err: ResampleError) -> Self {
        TextureLoadError::Resample(Arc::new(err))
    }
}

/// A failure of [`TextureLoader::acquire_shared`](super::TextureLoader::acquire_shared).
#[derive(Debug, thiserror::Error)]
pub enum SharedLoaderError {
    /// The options are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The cache refused the loader.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_error_chains_every_cause() {
        let err = TextureLoadError::Image(Arc::new(ImageLoadError::Fetch {
            name: "image.png".to_string(),
            source: FetchError::Status {
                code: 404,
                reason: "Not Found".to_string(),
            },
        }));
        assert_eq!(
            err.to_string(),
            "Failed to load texture\nFailed to load image: image.png\n404 Not Found"
        );
    }
}
