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

//! Streams every texture referenced by the materials of a glTF description onto a
//! headless device, ticking the job scheduler like a render loop would.
//!
//! Run with: `cargo run -p strata-sandbox -- path/to/model.gltf`

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use strata_agents::{
    FrameState, JobScheduler, JobSchedulerConfig, LoaderState, TextureLoader,
    TextureLoaderOptions,
};
use strata_core::asset::{AssetDescription, MaterialChannel};
use strata_core::io::Resource;
use strata_core::renderer::GraphicsDevice;
use strata_core::SupportedImageFormats;
use strata_data::{CacheHandle, ResourceCache};
use strata_infra::{HeadlessDevice, SchemeFetcher};
use strata_lanes::asset_lane::ImageLoaderLane;
use url::Url;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path or URL of the glTF JSON description.
    asset: String,
    /// TOML file with `[scheduler]` and `[formats]` tables.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Give up after this many frames.
    #[arg(long, default_value_t = 600)]
    max_frames: u64,
    /// Upload on the first frame after decoding, ignoring the scheduler's budget.
    #[arg(long)]
    synchronous: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    scheduler: JobSchedulerConfig,
    formats: SupportedImageFormats,
}

impl SandboxConfig {
    fn load(path: Option<&PathBuf>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }
}

fn asset_url(asset: &str) -> Result<Url> {
    match Url::parse(asset) {
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => {
            let path = std::fs::canonicalize(asset)
                .with_context(|| format!("Asset not found: {asset}"))?;
            Url::from_file_path(&path)
                .map_err(|()| anyhow::anyhow!("Not an absolute path: {}", path.display()))
        }
    }
}

struct StreamedTexture {
    handle: CacheHandle,
    loader: Arc<TextureLoader>,
    settled: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = SandboxConfig::load(args.config.as_ref())?;

    let fetcher = Arc::new(SchemeFetcher::new());
    let asset_resource = Resource::new(asset_url(&args.asset)?, fetcher);
    let bytes = asset_resource
        .fetch_bytes()
        .await
        .with_context(|| format!("Failed to fetch {}", asset_resource.url()))?;
    let description = Arc::new(
        AssetDescription::from_json(&bytes).context("Failed to parse the asset description")?,
    );

    let device = Arc::new(HeadlessDevice::new());
    let gpu: Arc<dyn GraphicsDevice> = device.clone();
    let formats = SupportedImageFormats::new(config.formats.basis, config.formats.webp);
    let decoder = ImageLoaderLane::for_device(gpu.as_ref());
    log::info!(
        "Supported image formats: {formats:?}, decoder '{}'",
        decoder.cache_tag()
    );

    let cache = Arc::new(ResourceCache::new());
    let mut streamed: HashMap<String, StreamedTexture> = HashMap::new();
    let mut extra_handles = Vec::new();
    for (material_index, material) in description.materials.iter().enumerate() {
        for channel in MaterialChannel::ALL {
            let Some(texture_info) = material.texture_info(channel) else {
                continue;
            };
            let options = TextureLoaderOptions {
                resource_cache: Some(cache.clone()),
                asset_description: Some(description.clone()),
                texture_info: Some(texture_info.clone()),
                asset_resource: Some(asset_resource.clone()),
                base_resource: Some(asset_resource.clone()),
                supported_image_formats: Some(formats),
                asynchronous: Some(!args.synchronous),
                image_decoder: Some(decoder.clone()),
            };
            let (handle, loader) = match TextureLoader::acquire_shared(options) {
                Ok(acquired) => acquired,
                Err(e) => {
                    log::error!("Material {material_index} {channel:?}: {e}");
                    continue;
                }
            };
            let key = loader.cache_key().to_string();
            if streamed.contains_key(&key) {
                extra_handles.push(handle);
            } else {
                streamed.insert(
                    key,
                    StreamedTexture {
                        handle,
                        loader,
                        settled: false,
                    },
                );
            }
        }
    }
    log::info!(
        "Streaming {} texture(s) for {} material(s)",
        streamed.len(),
        description.materials.len()
    );

    for texture in streamed.values() {
        let loader = Arc::clone(&texture.loader);
        // Failures surface through process() below.
        tokio::spawn(async move {
            let _ = loader.load().await;
        });
    }

    let mut scheduler = JobScheduler::new(&config.scheduler);
    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    for frame_number in 1..=args.max_frames {
        interval.tick().await;
        scheduler.reset_budgets();
        let mut frame = FrameState::new(frame_number, &gpu, &mut scheduler);

        for texture in streamed.values_mut().filter(|t| !t.settled) {
            match texture.loader.process(&mut frame) {
                Ok(ready) => texture.settled = ready,
                Err(e) => {
                    log::error!("{e}");
                    texture.settled = true;
                }
            }
        }
        if streamed.values().all(|t| t.settled) {
            log::info!("All textures settled after {frame_number} frame(s)");
            break;
        }
    }

    for (key, texture) in &streamed {
        match (texture.loader.state(), texture.loader.texture()) {
            (LoaderState::Ready, Some(t)) => println!(
                "{key}: {}x{} {:?}, {} level(s), {} bytes",
                t.width, t.height, t.format, t.mip_level_count, t.size_in_bytes
            ),
            (state, _) => println!("{key}: {state:?}"),
        }
    }
    let statistics = cache.statistics();
    println!(
        "Cache: {} entries, {} image bytes, {} texture bytes. Device: {} bytes of VRAM.",
        statistics.entry_count,
        statistics.images_byte_length,
        statistics.textures_byte_length,
        device.vram_allocated_bytes()
    );

    let handles = streamed
        .into_values()
        .map(|texture| texture.handle)
        .chain(extra_handles);
    for handle in handles {
        cache.release(handle)?;
    }
    Ok(())
}
