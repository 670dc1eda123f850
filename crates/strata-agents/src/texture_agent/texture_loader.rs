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

use super::error::{ConfigError, SharedLoaderError, TextureLoadError};
use super::image_loader::ImageResourceLoader;
use super::sampler::{self, SamplerPolicy};
use super::upload_job::TextureUploadJob;
use super::uploaded_texture::UploadedTexture;
use crate::context::FrameState;
use crate::scheduler::{Job, JobType};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_core::asset::{AssetDescription, TextureInfo};
use strata_core::image::{ImageResource, SupportedImageFormats};
use strata_core::io::Resource;
use strata_core::renderer::{GpuTexture, Sampler, Texture};
use strata_data::{CacheHandle, CacheKey, CacheResource, ResourceCache};
use strata_lanes::asset_lane::ImageLoaderLane;
use tokio::sync::OnceCell;

/// The lifecycle of a [`TextureLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderState {
    /// Constructed, `load()` not called yet.
    Unloaded,
    /// Waiting for the image to be fetched and decoded.
    Loading,
    /// The image is decoded; `process()` uploads it when the budget allows.
    Processing,
    /// The texture is on the GPU.
    Ready,
    /// Loading or uploading failed.
    Failed,
    /// `destroy()` was called.
    Destroyed,
}

/// Named construction options of a [`TextureLoader`].
///
/// Every field except `asynchronous` and `image_decoder` is required.
#[derive(Debug, Clone, Default)]
pub struct TextureLoaderOptions {
    /// The cache shared by every loader.
    pub resource_cache: Option<Arc<ResourceCache>>,
    /// The description declaring the texture.
    pub asset_description: Option<Arc<AssetDescription>>,
    /// The reference to load.
    pub texture_info: Option<TextureInfo>,
    /// The location of the description itself.
    pub asset_resource: Option<Resource>,
    /// The location relative image URIs resolve against.
    pub base_resource: Option<Resource>,
    /// Which optional image formats can be consumed.
    pub supported_image_formats: Option<SupportedImageFormats>,
    /// `false` uploads on the next `process()` whatever the scheduler's budget.
    /// Defaults to `true`.
    pub asynchronous: Option<bool>,
    /// The decoders used for the image. Defaults to raster plus KTX2 with Basis
    /// Universal payloads transcoded to RGBA8.
    pub image_decoder: Option<ImageLoaderLane>,
}

/// What the options resolve to, computed once at construction.
#[derive(Debug)]
struct ResolvedTexture {
    image_name: String,
    image_resource: Resource,
    media_type: Option<String>,
    image_key: CacheKey,
    texture_key: CacheKey,
    gpu_key: CacheKey,
    declared_sampler: Sampler,
}

#[derive(Debug)]
struct LoaderInner {
    state: LoaderState,
    image_handle: Option<CacheHandle>,
    image: Option<Arc<ImageResource>>,
    policy: Option<SamplerPolicy>,
    texture: Option<(CacheHandle, Arc<UploadedTexture>)>,
    error: Option<TextureLoadError>,
}

/// Loads one texture reference of an asset description onto the GPU.
///
/// `load().await` brings the image in; `process()` must then be polled once per
/// frame until the loader is ready, failed or destroyed. A loader that is never
/// polled never uploads. Loaders of the same (image, sampler) pair share one GPU
/// texture through the cache.
#[derive(Debug)]
pub struct TextureLoader {
    cache: Arc<ResourceCache>,
    resolved: ResolvedTexture,
    decoder: ImageLoaderLane,
    asynchronous: bool,
    destroyed: AtomicBool,
    outcome: OnceCell<Result<(), TextureLoadError>>,
    inner: Mutex<LoaderInner>,
}

impl TextureLoader {
    /// Validates `options` and creates an idle loader. Nothing is fetched.
    pub fn new(options: TextureLoaderOptions) -> Result<Self, ConfigError> {
        let cache = options
            .resource_cache
            .ok_or(ConfigError::MissingOption("resource_cache"))?;
        let description = options
            .asset_description
            .ok_or(ConfigError::MissingOption("asset_description"))?;
        let texture_info = options
            .texture_info
            .ok_or(ConfigError::MissingOption("texture_info"))?;
        let asset_resource = options
            .asset_resource
            .ok_or(ConfigError::MissingOption("asset_resource"))?;
        let base_resource = options
            .base_resource
            .ok_or(ConfigError::MissingOption("base_resource"))?;
        let formats = options
            .supported_image_formats
            .ok_or(ConfigError::MissingOption("supported_image_formats"))?;

        let texture = description
            .texture(texture_info.index)
            .ok_or(ConfigError::TextureIndexOutOfRange(texture_info.index))?;
        let (image_index, variant) = formats
            .select_image_source(texture)
            .ok_or(ConfigError::NoImageSource(texture_info.index))?;
        let image = description
            .image(image_index)
            .ok_or(ConfigError::ImageIndexOutOfRange(image_index))?;
        let declared_sampler = match texture.sampler {
            Some(index) => Sampler::from_entry(
                description
                    .sampler(index)
                    .ok_or(ConfigError::SamplerIndexOutOfRange(index))?,
            )?,
            None => Sampler::default(),
        };
        let declared_sampler =
            sampler::declared_sampler(declared_sampler, texture_info.uses_texture_transform());

        let uri = image.uri.as_deref().ok_or(ConfigError::UnsupportedImage {
            image: image_index,
            reason: "images stored in buffer views are not supported",
        })?;
        let image_resource = base_resource.derive(uri).map_err(ConfigError::InvalidUri)?;
        let decoder = options.image_decoder.unwrap_or_default();
        let decoder_tag = decoder.cache_tag();
        let image_key = if image_resource.is_data_uri() {
            CacheKey::embedded_image(&asset_resource, image_index, variant, &decoder_tag)
        } else {
            CacheKey::image(&image_resource, variant, &decoder_tag)
        };
        let texture_key = CacheKey::texture(&image_key, &declared_sampler);
        let gpu_key = CacheKey::gpu_texture(&texture_key);
        let image_name = match (&image.name, image_resource.is_data_uri()) {
            (_, false) => uri.to_string(),
            (Some(name), true) => name.clone(),
            (None, true) => format!("images[{image_index}]"),
        };
        let media_type = image
            .mime_type
            .clone()
            .or_else(|| image_resource.media_type());

        Ok(Self {
            cache,
            resolved: ResolvedTexture {
                image_name,
                image_resource,
                media_type,
                image_key,
                texture_key,
                gpu_key,
                declared_sampler,
            },
            decoder,
            asynchronous: options.asynchronous.unwrap_or(true),
            destroyed: AtomicBool::new(false),
            outcome: OnceCell::new(),
            inner: Mutex::new(LoaderInner {
                state: LoaderState::Unloaded,
                image_handle: None,
                image: None,
                policy: None,
                texture: None,
                error: None,
            }),
        })
    }

    /// Returns the loader registered in `options.resource_cache` for the same
    /// (image, sampler) pair, creating it if needed.
    ///
    /// The reference must be given back with `ResourceCache::release`; the last
    /// release destroys the loader and its texture.
    pub fn acquire_shared(
        options: TextureLoaderOptions,
    ) -> Result<(CacheHandle, Arc<TextureLoader>), SharedLoaderError> {
        let loader = Self::new(options)?;
        let cache = Arc::clone(&loader.cache);
        let key = loader.resolved.texture_key.clone();
        Ok(cache.acquire(&key, || Ok::<_, Infallible>(loader))?)
    }

    fn lock(&self) -> MutexGuard<'_, LoaderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches and decodes the image through the shared cache.
    ///
    /// Resolves once the image is ready for upload. If the loader is destroyed
    /// while waiting, resolves `Ok(())` without a texture. Every call, concurrent
    /// or later, resolves to the outcome of the first.
    pub async fn load(&self) -> Result<(), TextureLoadError> {
        self.outcome
            .get_or_init(|| self.load_image())
            .await
            .clone()
    }

    async fn load_image(&self) -> Result<(), TextureLoadError> {
        let image_loader = {
            let mut inner = self.lock();
            if self.is_destroyed() {
                return Ok(());
            }

            let resolved = &self.resolved;
            let acquired = match inner.image_handle {
                // A cancelled load() left its reference behind.
                Some(handle) => self
                    .cache
                    .get::<ImageResourceLoader>(handle)
                    .map(|image_loader| (handle, image_loader)),
                None => self.cache.acquire(&resolved.image_key, || {
                    Ok::<_, Infallible>(ImageResourceLoader::new(
                        resolved.image_name.clone(),
                        resolved.image_resource.clone(),
                        resolved.media_type.clone(),
                        self.decoder.clone(),
                    ))
                }),
            };
            let (handle, image_loader) = match acquired {
                Ok(acquired) => acquired,
                Err(e) => return Err(Self::fail(&mut inner, TextureLoadError::Cache(Arc::new(e)))),
            };
            inner.image_handle = Some(handle);
            inner.state = LoaderState::Loading;
            log::debug!("Texture '{}' loading", resolved.texture_key);
            image_loader
        };

        let outcome = image_loader.load().await;

        let mut inner = self.lock();
        if self.is_destroyed() {
            log::debug!(
                "Texture '{}' destroyed while loading; result discarded",
                self.resolved.texture_key
            );
            return Ok(());
        }

        match outcome {
            Ok(image) => {
                inner.policy = Some(sampler::resolve(
                    self.resolved.declared_sampler,
                    &image,
                    &self.resolved.image_name,
                ));
                inner.image = Some(image);
                inner.state = LoaderState::Processing;
                Ok(())
            }
            Err(e) => {
                self.release_image(&mut inner);
                Err(Self::fail(&mut inner, TextureLoadError::Image(e)))
            }
        }
    }

    /// Advances the upload. Returns `Ok(true)` once the texture is ready.
    ///
    /// Does nothing before the image is decoded. While processing, each call offers
    /// one upload job to the frame's scheduler, which may postpone it.
    pub fn process(&self, frame_state: &mut FrameState<'_>) -> Result<bool, TextureLoadError> {
        if self.is_destroyed() {
            return Ok(false);
        }
        let mut inner = self.lock();
        match inner.state {
            LoaderState::Ready => return Ok(true),
            LoaderState::Failed => {
                return match &inner.error {
                    Some(e) => Err(e.clone()),
                    None => Ok(false),
                }
            }
            LoaderState::Processing => {}
            LoaderState::Unloaded | LoaderState::Loading | LoaderState::Destroyed => {
                return Ok(false)
            }
        }

        let (Some(image), Some(policy)) = (inner.image.clone(), inner.policy) else {
            return Ok(false);
        };

        // Another loader of the same pair may have uploaded it already.
        match self
            .cache
            .acquire_existing::<UploadedTexture>(&self.resolved.gpu_key)
        {
            Ok(Some(shared)) => {
                log::debug!(
                    "Texture '{}' reuses an existing upload",
                    self.resolved.texture_key
                );
                return Ok(self.ready(&mut inner, shared));
            }
            Ok(None) => {}
            Err(e) => {
                self.release_image(&mut inner);
                return Err(Self::fail(&mut inner, TextureLoadError::Cache(Arc::new(e))));
            }
        }

        let device = Arc::clone(frame_state.device);
        let label = self.resolved.texture_key.as_str();
        let mut job = TextureUploadJob::new(Arc::clone(&device), &image, policy, label);

        let executed = if self.asynchronous {
            frame_state.job_scheduler.execute(&mut job, JobType::Texture)
        } else {
            job.execute();
            true
        };
        if !executed {
            log::debug!(
                "Texture '{}' upload postponed at frame {}",
                self.resolved.texture_key,
                frame_state.frame_number
            );
            return Ok(false);
        }

        match job.into_result() {
            Some(Ok(texture)) => {
                log::info!(
                    "Texture '{}' ready: {}x{}, {} level(s), {} bytes",
                    self.resolved.texture_key,
                    texture.width,
                    texture.height,
                    texture.mip_level_count,
                    texture.size_in_bytes
                );
                let mut upload = Some(UploadedTexture::new(GpuTexture::new(texture, device)));
                let acquired = self.cache.acquire(&self.resolved.gpu_key, || {
                    upload.take().ok_or("texture already uploaded")
                });
                if let Some(redundant) = upload {
                    // Lost a race with another loader of the same pair.
                    redundant.unload();
                }
                match acquired {
                    Ok(shared) => Ok(self.ready(&mut inner, shared)),
                    Err(e) => {
                        self.release_image(&mut inner);
                        Err(Self::fail(&mut inner, TextureLoadError::Cache(Arc::new(e))))
                    }
                }
            }
            Some(Err(e)) => {
                self.release_image(&mut inner);
                Err(Self::fail(&mut inner, e))
            }
            None => Ok(false),
        }
    }

    fn ready(&self, inner: &mut LoaderInner, shared: (CacheHandle, Arc<UploadedTexture>)) -> bool {
        inner.texture = Some(shared);
        inner.state = LoaderState::Ready;
        self.release_image(inner);
        true
    }

    fn fail(inner: &mut LoaderInner, error: TextureLoadError) -> TextureLoadError {
        log::debug!("Texture load failed: {error}");
        inner.state = LoaderState::Failed;
        inner.error = Some(error.clone());
        error
    }

    fn release_image(&self, inner: &mut LoaderInner) {
        inner.image = None;
        if let Some(handle) = inner.image_handle.take() {
            if let Err(e) = self.cache.release(handle) {
                log::warn!(
                    "Failed to release image '{}': {e}",
                    self.resolved.image_key
                );
            }
        }
    }

    /// Returns the texture once the loader is ready.
    pub fn texture(&self) -> Option<Texture> {
        let inner = self.lock();
        match inner.state {
            LoaderState::Ready => inner
                .texture
                .as_ref()
                .map(|(_, uploaded)| uploaded.texture().clone()),
            _ => None,
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LoaderState {
        self.lock().state
    }

    /// Returns the sampler the texture is (or will be) created with.
    ///
    /// Before the image is decoded this is the declared sampler; afterwards it
    /// includes any fallback the image forced.
    pub fn sampler(&self) -> Sampler {
        self.lock()
            .policy
            .map_or(self.resolved.declared_sampler, |policy| policy.sampler)
    }

    /// Returns the key identifying this (image, sampler) pair.
    pub fn cache_key(&self) -> &CacheKey {
        &self.resolved.texture_key
    }

    /// Returns the key of the shared image.
    pub fn image_cache_key(&self) -> &CacheKey {
        &self.resolved.image_key
    }

    /// Returns `true` once [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Releases the image reference and the GPU texture reference. Idempotent.
    ///
    /// The GPU texture is destroyed once no other loader holds it. A pending
    /// `load()` still resolves, without producing a texture.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut inner = self.lock();
        inner.state = LoaderState::Destroyed;
        self.release_image(&mut inner);
        if let Some((handle, _)) = inner.texture.take() {
            if let Err(e) = self.cache.release(handle) {
                log::warn!(
                    "Failed to release texture '{}': {e}",
                    self.resolved.texture_key
                );
            }
        }
        log::debug!("Texture '{}' destroyed", self.resolved.texture_key);
    }
}

impl CacheResource for TextureLoader {
    fn unload(&self) {
        self.destroy();
    }
}

impl Drop for TextureLoader {
    fn drop(&mut self) {
        self.destroy();
    }
}
