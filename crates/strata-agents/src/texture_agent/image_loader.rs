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

use super::error::ImageLoadError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_core::image::ImageResource;
use strata_core::io::Resource;
use strata_data::CacheResource;
use strata_lanes::asset_lane::ImageLoaderLane;
use tokio::sync::OnceCell;

/// Fetches and decodes one image, once, for every consumer that shares it.
///
/// The first call to [`load`](Self::load) starts the work; concurrent and later
/// callers await the same outcome. Failures are never retried: a fresh loader
/// must be created for a new attempt, which the cache does once every holder of
/// the failed one has released it.
pub struct ImageResourceLoader {
    name: String,
    resource: Resource,
    media_type: Option<String>,
    decoder: ImageLoaderLane,
    outcome: OnceCell<Result<(), Arc<ImageLoadError>>>,
    image: Mutex<Option<Arc<ImageResource>>>,
    unloaded: AtomicBool,
    fetch_count: AtomicUsize,
}

impl std::fmt::Debug for ImageResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResourceLoader")
            .field("name", &self.name)
            .field("url", &self.resource.url().as_str())
            .field("loaded", &self.outcome.initialized())
            .finish()
    }
}

impl ImageResourceLoader {
    /// Creates a loader for the image at `resource`. Nothing is fetched yet.
    ///
    /// `name` identifies the image in error messages; `media_type` is a hint
    /// used to route the bytes to the right decoder.
    pub fn new(
        name: impl Into<String>,
        resource: Resource,
        media_type: Option<String>,
        decoder: ImageLoaderLane,
    ) -> Self {
        Self {
            name: name.into(),
            resource,
            media_type,
            decoder,
            outcome: OnceCell::new(),
            image: Mutex::new(None),
            unloaded: AtomicBool::new(false),
            fetch_count: AtomicUsize::new(0),
        }
    }

    fn image_slot(&self) -> MutexGuard<'_, Option<Arc<ImageResource>>> {
        self.image.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the image's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns where the image is read from.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns the decoded image, fetching and decoding it on the first call.
    pub async fn load(&self) -> Result<Arc<ImageResource>, Arc<ImageLoadError>> {
        if self.unloaded.load(Ordering::Acquire) {
            return Err(self.unloaded_error());
        }

        self.outcome
            .get_or_init(|| self.fetch_and_decode())
            .await
            .clone()?;

        self.image_slot()
            .clone()
            .ok_or_else(|| self.unloaded_error())
    }

    async fn fetch_and_decode(&self) -> Result<(), Arc<ImageLoadError>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        log::debug!("Loading image '{}' from {}", self.name, self.resource.url());

        let bytes = self.resource.fetch_bytes().await.map_err(|source| {
            Arc::new(ImageLoadError::Fetch {
                name: self.name.clone(),
                source,
            })
        })?;

        let decoder = self.decoder.clone();
        let media_type = self.media_type.clone();
        let decoded =
            tokio::task::spawn_blocking(move || decoder.decode(&bytes, media_type.as_deref()))
                .await
                .map_err(|e| {
                    Arc::new(ImageLoadError::Task {
                        name: self.name.clone(),
                        message: e.to_string(),
                    })
                })?
                .map_err(|source| {
                    Arc::new(ImageLoadError::Decode {
                        name: self.name.clone(),
                        source,
                    })
                })?;

        log::info!(
            "Image '{}' decoded: {}x{}, {} level(s), compressed={}",
            self.name,
            decoded.width(),
            decoded.height(),
            decoded.mip_level_count(),
            decoded.is_compressed()
        );

        if self.unloaded.load(Ordering::Acquire) {
            return Err(self.unloaded_error());
        }
        *self.image_slot() = Some(Arc::new(decoded));
        Ok(())
    }

    fn unloaded_error(&self) -> Arc<ImageLoadError> {
        Arc::new(ImageLoadError::Unloaded {
            name: self.name.clone(),
        })
    }

    /// Returns the decoded image if it is resident.
    pub fn image(&self) -> Option<Arc<ImageResource>> {
        self.image_slot().clone()
    }

    /// Returns how many times the bytes were fetched.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Returns `true` once [`unload`](CacheResource::unload) has run.
    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }
}

impl CacheResource for ImageResourceLoader {
    fn unload(&self) {
        if !self.unloaded.swap(true, Ordering::AcqRel) {
            log::debug!("Unloading image '{}'", self.name);
        }
        self.image_slot().take();
    }

    fn byte_length(&self) -> u64 {
        self.image_slot().as_ref().map_or(0, |image| image.byte_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;
    use strata_core::io::{FetchError, ResourceFetcher};
    use url::Url;

    #[derive(Debug)]
    struct StaticFetcher(Result<Vec<u8>, u16>);

    #[async_trait]
    impl ResourceFetcher for StaticFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Vec<u8>, FetchError> {
            self.0.clone().map_err(|code| FetchError::Status {
                code,
                reason: "Not Found".to_string(),
            })
        }
    }

    fn png() -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbaImage::new(2, 2)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn loader(response: Result<Vec<u8>, u16>) -> ImageResourceLoader {
        let resource = Resource::parse(
            "https://example.com/image.png",
            Arc::new(StaticFetcher(response)),
        )
        .unwrap();
        ImageResourceLoader::new("image.png", resource, None, ImageLoaderLane::default())
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let loader = loader(Ok(png()));

        let (a, b) = tokio::join!(loader.load(), loader.load());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.fetch_count(), 1);
        assert_eq!(loader.byte_length(), 16);
        assert!(loader.load().await.is_ok());
        assert_eq!(loader.fetch_count(), 1);
    }

    #[tokio::test]
    async fn failure_is_reported_with_the_image_name_and_not_retried() {
        let loader = loader(Err(404));

        let err = loader.load().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to load image: image.png\n404 Not Found");
        assert!(loader.load().await.is_err());
        assert_eq!(loader.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unload_frees_pixels_and_rejects_later_loads() {
        let loader = loader(Ok(png()));
        loader.load().await.unwrap();

        loader.unload();
        loader.unload();

        assert_eq!(loader.byte_length(), 0);
        assert!(loader.is_unloaded());
        assert!(matches!(
            loader.load().await.unwrap_err().as_ref(),
            ImageLoadError::Unloaded { .. }
        ));
    }
}
